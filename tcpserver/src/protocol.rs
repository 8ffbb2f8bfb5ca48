//! TCP 게임 프로토콜 정의
//!
//! 클라이언트와 서버 간 통신을 위한 envelope 프로토콜을 정의합니다.
//!
//! # 프로토콜 구조
//!
//! ```text
//! [4바이트 길이 헤더 (big-endian)][JSON envelope]
//! ```
//!
//! JSON envelope 필드:
//!
//! ```text
//! { "type", "id", "ts", "game_id", "version", "payload" }
//! ```
//!
//! # 사용 예시
//!
//! ```rust,no_run
//! # use tcpserver::protocol::Envelope;
//! let ping = Envelope::pong("G-1");
//! let bytes = ping.to_bytes().unwrap();
//! let decoded = Envelope::from_bytes(&bytes).unwrap();
//! assert_eq!(decoded.msg_type, "PONG");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{CurrentTime, MessageIdGenerator};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::game::{Board, Coord, ErrorCode, GameError, GameOutcome, GameResult, GameSnapshot};
use crate::tool::error::{TcpResult, TcpServerError};

/// 프로토콜 버전
pub const PROTOCOL_VERSION: &str = "1.0";

/// 길이 헤더 크기
pub const HEADER_LEN: usize = 4;

/// 기본 최대 프레임 크기 (64 KiB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// 메시지 타입 문자열
pub mod message_type {
    pub const PLAYER_JOINED: &str = "PLAYER_JOINED";
    pub const RESUME: &str = "RESUME";
    pub const MOVE: &str = "MOVE";
    pub const PING: &str = "PING";

    pub const GAME_STATE: &str = "GAME_STATE";
    pub const GAME_OVER: &str = "GAME_OVER";
    pub const MOVE_OK: &str = "MOVE_OK";
    pub const ERROR: &str = "ERROR";
    pub const PONG: &str = "PONG";
}

/// 와이어 envelope
///
/// 모든 메시지는 이 구조로 감싸서 전송됩니다. `payload`의 모양은 `msg_type`에 따라 다릅니다.
/// 누락된 필드는 기본값으로 채워집니다.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub id: String,
    #[serde(rename = "ts", alias = "timestamp")]
    pub timestamp: i64,
    pub game_id: String,
    #[serde(rename = "version", alias = "protocol_version")]
    pub protocol_version: String,
    pub payload: Value,
}

/// 수신 프레임 해석 결과
#[derive(Debug, Clone)]
pub enum Inbound {
    /// 정상적으로 해석된 envelope
    Envelope(Envelope),
    /// 프레임은 온전하지만 envelope으로 해석할 수 없음
    Malformed(String),
}

impl Envelope {
    /// 새 envelope 생성 (새 ID와 현재 타임스탬프 부여)
    pub fn new(msg_type: &str, game_id: &str, payload: Value) -> Self {
        Self {
            msg_type: msg_type.to_string(),
            id: MessageIdGenerator::next_id(),
            timestamp: CurrentTime::now_millis(),
            game_id: game_id.to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            payload,
        }
    }

    /// `GAME_STATE{board, players, next_player_id, turn, status, version}`
    pub fn game_state(game_id: &str, snapshot: &GameSnapshot) -> Self {
        Self::new(message_type::GAME_STATE, game_id, json!(snapshot))
    }

    /// `GAME_OVER{result, winning_line, final_state}`
    pub fn game_over(game_id: &str, outcome: &GameOutcome, final_state: &GameSnapshot) -> Self {
        let payload = GameOverPayload {
            result: outcome.result,
            winning_line: outcome.winning_line,
            final_state: final_state.clone(),
        };
        Self::new(message_type::GAME_OVER, game_id, json!(payload))
    }

    /// `MOVE_OK{version, board}`
    pub fn move_ok(game_id: &str, version: u64, board: &Board) -> Self {
        let payload = MoveOkPayload {
            version,
            board: board.clone(),
        };
        Self::new(message_type::MOVE_OK, game_id, json!(payload))
    }

    /// `ERROR{code, message}`
    pub fn error(game_id: &str, err: &GameError) -> Self {
        let payload = ErrorPayload {
            code: err.code(),
            message: err.to_string(),
        };
        Self::new(message_type::ERROR, game_id, json!(payload))
    }

    /// `PONG{}`
    pub fn pong(game_id: &str) -> Self {
        Self::new(message_type::PONG, game_id, json!({}))
    }

    /// envelope을 길이 헤더가 붙은 바이너리로 직렬화합니다.
    ///
    /// ```text
    /// [4바이트 길이][JSON 데이터]
    /// ```
    pub fn to_bytes(&self) -> TcpResult<Vec<u8>> {
        let data = serde_json::to_vec(self)?;
        let length = u32::try_from(data.len()).map_err(|_| {
            TcpServerError::protocol_error(Some(self.msg_type.clone()), "메시지가 너무 큽니다")
        })?;

        let mut result = Vec::with_capacity(HEADER_LEN + data.len());
        result.extend_from_slice(&length.to_be_bytes()); // 4바이트 길이 헤더
        result.extend_from_slice(&data); // JSON 데이터

        Ok(result)
    }

    /// 길이 헤더가 붙은 바이너리에서 envelope을 역직렬화합니다.
    pub fn from_bytes(data: &[u8]) -> TcpResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(TcpServerError::protocol_error(None, "메시지가 너무 짧습니다"));
        }

        let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if data.len() < HEADER_LEN + length {
            return Err(TcpServerError::protocol_error(None, "메시지 길이가 맞지 않습니다"));
        }

        let envelope = serde_json::from_slice(&data[HEADER_LEN..HEADER_LEN + length])?;
        Ok(envelope)
    }

    /// 스트림에서 프레임 하나를 읽습니다.
    ///
    /// # Errors
    ///
    /// * 스트림 종료 또는 읽기 실패 시 (연결 종료 신호)
    /// * 프레임 길이가 `max_frame_bytes`를 넘을 때
    ///
    /// JSON 해석 실패는 에러가 아니라 `Inbound::Malformed`로 반환되어
    /// 연결을 유지한 채 `BAD_PAYLOAD`로 응답할 수 있습니다.
    pub async fn read_from_stream<R>(stream: &mut R, max_frame_bytes: usize) -> TcpResult<Inbound>
    where
        R: AsyncRead + Unpin,
    {
        // 길이 헤더 읽기 (4바이트)
        let mut length_bytes = [0u8; HEADER_LEN];
        stream.read_exact(&mut length_bytes).await?;
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length > max_frame_bytes {
            return Err(TcpServerError::protocol_error(
                None,
                &format!("프레임 크기 초과: {}바이트 (최대 {}바이트)", length, max_frame_bytes),
            ));
        }

        // 메시지 데이터 읽기
        let mut buffer = vec![0u8; length];
        stream.read_exact(&mut buffer).await?;

        match serde_json::from_slice::<Envelope>(&buffer) {
            Ok(envelope) => Ok(Inbound::Envelope(envelope)),
            Err(e) => Ok(Inbound::Malformed(e.to_string())),
        }
    }

    /// 스트림에 envelope을 씁니다.
    pub async fn write_to_stream<W>(&self, stream: &mut W) -> TcpResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let data = self.to_bytes()?;
        stream.write_all(&data).await?;
        stream.flush().await?;
        Ok(())
    }
}

/// `ERROR` payload
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

/// `MOVE_OK` payload
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MoveOkPayload {
    pub version: u64,
    pub board: Board,
}

/// `GAME_OVER` payload
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GameOverPayload {
    pub result: GameResult,
    pub winning_line: Option<[Coord; 3]>,
    pub final_state: GameSnapshot,
}

/// `PLAYER_JOINED` payload
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct JoinRequest {
    pub player_id: String,
    #[serde(default)]
    pub nickname: String,
}

/// `RESUME` payload
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ResumeRequest {
    pub player_id: String,
    #[serde(default)]
    pub known_version: Option<u64>,
}

/// `MOVE` payload
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MoveRequest {
    pub player_id: String,
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub turn: Option<u64>,
    #[serde(default)]
    pub msg_id: Option<String>,
}

/// 클라이언트 요청 분류 결과
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    Join(JoinRequest),
    Resume(ResumeRequest),
    Move(MoveRequest),
    Ping,
    Unknown(String),
}

impl ClientRequest {
    /// envelope의 `type`과 `payload`로 요청을 분류합니다.
    ///
    /// 알 수 없는 타입은 에러가 아니라 `Unknown`으로 반환합니다.
    /// 필수 필드가 없거나 타입이 맞지 않으면 `BAD_PAYLOAD`입니다.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, GameError> {
        fn parse<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, GameError> {
            T::deserialize(payload).map_err(|e| GameError::BadPayload(e.to_string()))
        }

        let request = match envelope.msg_type.as_str() {
            message_type::PLAYER_JOINED => ClientRequest::Join(parse(&envelope.payload)?),
            message_type::RESUME => ClientRequest::Resume(parse(&envelope.payload)?),
            message_type::MOVE => ClientRequest::Move(parse(&envelope.payload)?),
            message_type::PING => ClientRequest::Ping,
            other => ClientRequest::Unknown(other.to_string()),
        };

        Ok(request)
    }
}

impl MoveRequest {
    /// 중복 제거 키
    ///
    /// `msg_id`가 있으면 그것을, 없으면 envelope ID를 사용합니다.
    /// 둘 다 비어 있으면 `None`이며 중복 제거 없이 처리됩니다.
    pub fn request_id<'a>(&'a self, envelope: &'a Envelope) -> Option<&'a str> {
        self.msg_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| Some(envelope.id.as_str()).filter(|id| !id.is_empty()))
    }
}
