//! TCP 서버 테스트 모듈
//!
//! 각 기능별로 분리된 테스트 파일들을 관리합니다.
//! 실제 소켓 대신 `tokio::io::duplex` 스트림으로 연결 핸들러를 구동합니다.

pub mod test_handler;

use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::time::{timeout, Duration};

use crate::handler::{ConnectionHandler, MessageHandler};
use crate::protocol::{Envelope, Inbound, DEFAULT_MAX_FRAME_BYTES};
use crate::service::{ConnectionService, DedupCache, GameRoom, HeartbeatService};

/// 테스트 게임 ID
pub const TEST_GAME_ID: &str = "G-1";

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_TIMEOUT: Duration = Duration::from_millis(100);

/// 테스트용 서버 구성
pub struct TestServer {
    pub room: Arc<GameRoom>,
    pub connection_service: Arc<ConnectionService>,
    pub heartbeat_service: Arc<HeartbeatService>,
    pub connection_handler: Arc<ConnectionHandler>,
}

impl TestServer {
    pub fn new() -> Self {
        Self::with_grace(Duration::from_secs(30))
    }

    /// 하트비트 유예 시간을 지정해 생성 (백그라운드 루프는 시작하지 않음)
    pub fn with_grace(grace: Duration) -> Self {
        let room = Arc::new(GameRoom::new(TEST_GAME_ID, DedupCache::default()));
        let connection_service = Arc::new(ConnectionService::new(16));
        let heartbeat_service = Arc::new(HeartbeatService::new(
            connection_service.clone(),
            Duration::from_secs(10),
            grace,
        ));
        let message_handler = Arc::new(MessageHandler::new(
            room.clone(),
            connection_service.clone(),
            heartbeat_service.clone(),
        ));
        let connection_handler = Arc::new(ConnectionHandler::new(
            connection_service.clone(),
            message_handler,
            DEFAULT_MAX_FRAME_BYTES,
        ));

        Self {
            room,
            connection_service,
            heartbeat_service,
            connection_handler,
        }
    }

    /// 새 클라이언트 연결
    pub fn connect(&self) -> TestClient {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_reader, server_writer) = tokio::io::split(server);

        let handler = self.connection_handler.clone();
        tokio::spawn(async move {
            let _ = handler.serve(server_reader, server_writer, "duplex".to_string()).await;
        });

        let (reader, writer) = tokio::io::split(client);
        TestClient { reader, writer }
    }

    /// 플레이어가 바인딩될 때까지 대기
    pub async fn wait_bound(&self, player_id: &str, bound: bool) {
        for _ in 0..100 {
            if self.connection_service.is_bound(player_id) == bound {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("플레이어 {} 바인딩 상태가 {}가 되지 않았습니다", player_id, bound);
    }
}

/// 테스트용 클라이언트
pub struct TestClient {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
}

impl TestClient {
    pub async fn send(&mut self, msg_type: &str, payload: Value) -> Envelope {
        let envelope = Envelope::new(msg_type, TEST_GAME_ID, payload);
        envelope.write_to_stream(&mut self.writer).await.unwrap();
        envelope
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    pub async fn recv(&mut self) -> Envelope {
        let inbound = timeout(RECV_TIMEOUT, Envelope::read_from_stream(&mut self.reader, DEFAULT_MAX_FRAME_BYTES))
            .await
            .expect("응답 시간 초과")
            .expect("연결이 끊어졌습니다");

        match inbound {
            Inbound::Envelope(envelope) => envelope,
            Inbound::Malformed(e) => panic!("서버가 잘못된 프레임을 보냈습니다: {}", e),
        }
    }

    /// 다음 메시지를 읽고 타입을 확인합니다.
    pub async fn recv_type(&mut self, msg_type: &str) -> Envelope {
        let envelope = self.recv().await;
        assert_eq!(envelope.msg_type, msg_type, "예상하지 못한 메시지: {:?}", envelope);
        envelope
    }

    /// `ERROR` 메시지를 받아 코드 문자열을 반환
    pub async fn recv_error_code(&mut self) -> String {
        let envelope = self.recv_type("ERROR").await;
        envelope.payload["code"].as_str().unwrap_or_default().to_string()
    }

    /// 일정 시간 동안 아무 메시지도 오지 않아야 함
    pub async fn expect_silence(&mut self) {
        let result = timeout(SILENCE_TIMEOUT, Envelope::read_from_stream(&mut self.reader, DEFAULT_MAX_FRAME_BYTES)).await;
        if let Ok(Ok(inbound)) = result {
            panic!("메시지가 오지 않아야 합니다: {:?}", inbound);
        }
    }

    /// 서버가 연결을 닫을 때까지 남은 메시지를 모두 읽어 반환
    pub async fn drain_until_closed(&mut self) -> Vec<Envelope> {
        let mut drained = Vec::new();
        loop {
            let result = timeout(RECV_TIMEOUT, Envelope::read_from_stream(&mut self.reader, DEFAULT_MAX_FRAME_BYTES))
                .await
                .expect("연결 종료 대기 시간 초과");

            match result {
                Ok(Inbound::Envelope(envelope)) => drained.push(envelope),
                Ok(Inbound::Malformed(e)) => panic!("서버가 잘못된 프레임을 보냈습니다: {}", e),
                Err(e) => {
                    assert!(e.is_disconnect(), "EOF가 아닌 에러: {}", e);
                    return drained;
                }
            }
        }
    }
}

/// 두 플레이어가 입장해 게임이 시작된 상태를 만들고, 입장 관련 메시지는 모두 소비합니다.
pub async fn start_game(server: &TestServer) -> (TestClient, TestClient) {
    let mut p1 = server.connect();
    let mut p2 = server.connect();

    p1.send("PLAYER_JOINED", serde_json::json!({"player_id": "p1", "nickname": "alice"})).await;
    p1.recv_type("GAME_STATE").await;

    p2.send("PLAYER_JOINED", serde_json::json!({"player_id": "p2", "nickname": "bob"})).await;
    p2.recv_type("GAME_STATE").await; // 개인 응답
    p2.recv_type("GAME_STATE").await; // 시작 브로드캐스트
    p1.recv_type("GAME_STATE").await;

    (p1, p2)
}
