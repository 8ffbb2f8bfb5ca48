//! 메시지 핸들러
//!
//! 연결별로 수신한 envelope을 분류하고 게임 방, 세션 레지스트리,
//! 하트비트 서비스를 호출한 뒤 결과를 전송합니다.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::game::GameError;
use crate::protocol::{ClientRequest, Envelope, Inbound, JoinRequest, MoveRequest, ResumeRequest};
use crate::service::connection_service::{ConnectionHandle, ConnectionService};
use crate::service::heartbeat_service::HeartbeatService;
use crate::service::room_service::{GameRoom, MoveDisposition};
use crate::tool::error::{ErrorHandler, ErrorSeverity};

/// 연결 상태
///
/// `Connected` → `Joined`/`Resumed` → `Closed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// 소켓은 열렸지만 플레이어가 정해지지 않음
    Connected,
    /// `PLAYER_JOINED`로 바인딩됨
    Joined(String),
    /// `RESUME`으로 바인딩됨
    Resumed(String),
    /// 종료됨
    Closed,
}

impl ConnectionState {
    /// 바인딩된 플레이어 ID
    pub fn player_id(&self) -> Option<&str> {
        match self {
            ConnectionState::Joined(id) | ConnectionState::Resumed(id) => Some(id),
            ConnectionState::Connected | ConnectionState::Closed => None,
        }
    }
}

/// 메시지 핸들러
pub struct MessageHandler {
    room: Arc<GameRoom>,
    connection_service: Arc<ConnectionService>,
    heartbeat_service: Arc<HeartbeatService>,
}

impl MessageHandler {
    pub fn new(
        room: Arc<GameRoom>,
        connection_service: Arc<ConnectionService>,
        heartbeat_service: Arc<HeartbeatService>,
    ) -> Self {
        Self {
            room,
            connection_service,
            heartbeat_service,
        }
    }

    /// 수신 프레임 처리
    pub async fn handle_inbound(&self, handle: &ConnectionHandle, state: &mut ConnectionState, inbound: Inbound) {
        match inbound {
            Inbound::Envelope(envelope) => self.handle_envelope(handle, state, envelope).await,
            Inbound::Malformed(reason) => {
                debug!("연결 {} 해석 불가 프레임: {}", handle.conn_id(), reason);
                self.reply(handle, self.error_envelope(&GameError::BadPayload(reason)));
            }
        }
    }

    /// envelope 하나를 처리합니다.
    ///
    /// 바인딩된 연결에서 온 메시지는 종류와 관계없이 마지막 수신 시각을 갱신합니다.
    pub async fn handle_envelope(&self, handle: &ConnectionHandle, state: &mut ConnectionState, envelope: Envelope) {
        if let Some(player_id) = state.player_id() {
            self.connection_service.touch(player_id, handle.conn_id());
        }

        let request = match ClientRequest::from_envelope(&envelope) {
            Ok(request) => request,
            Err(e) => {
                debug!("연결 {} 잘못된 {} payload: {}", handle.conn_id(), envelope.msg_type, e);
                self.reply(handle, self.error_envelope(&e));
                return;
            }
        };

        match request {
            ClientRequest::Join(request) => self.handle_join(handle, state, request),
            ClientRequest::Resume(request) => self.handle_resume(handle, state, request),
            ClientRequest::Move(request) => self.handle_move(handle, state, &envelope, &request),
            ClientRequest::Ping => {
                // 실패는 handle_heartbeat 안에서 기록됨
                let _ = self.heartbeat_service.handle_heartbeat(handle, self.room.game_id()).await;
            }
            ClientRequest::Unknown(msg_type) => {
                warn!("연결 {} 알 수 없는 메시지 타입: {}", handle.conn_id(), msg_type);
                self.reply(handle, self.error_envelope(&GameError::BadType(msg_type)));
            }
        }
    }

    fn handle_join(&self, handle: &ConnectionHandle, state: &mut ConnectionState, request: JoinRequest) {
        let joined = match self.room.join(&request.player_id, &request.nickname) {
            Ok(joined) => joined,
            Err(e) => {
                info!("플레이어 {} 입장 거부: {}", request.player_id, e);
                self.reply(handle, self.error_envelope(&e));
                return;
            }
        };

        self.bind(handle, state, &request.player_id);
        *state = ConnectionState::Joined(request.player_id.clone());
        info!("플레이어 {} ({}) 입장 ← 연결 {}", request.player_id, request.nickname, handle.conn_id());

        self.reply(handle, joined.snapshot.clone());
        if joined.started {
            self.fan_out(&joined.snapshot);
        }
    }

    fn handle_resume(&self, handle: &ConnectionHandle, state: &mut ConnectionState, request: ResumeRequest) {
        let resumed = match self.room.resume(&request.player_id, request.known_version) {
            Ok(resumed) => resumed,
            Err(e) => {
                info!("플레이어 {} 재접속 거부: {}", request.player_id, e);
                self.reply(handle, self.error_envelope(&e));
                return;
            }
        };

        self.bind(handle, state, &request.player_id);
        *state = ConnectionState::Resumed(request.player_id.clone());
        info!("플레이어 {} 재접속 ← 연결 {}", request.player_id, handle.conn_id());

        self.reply(handle, resumed.snapshot.clone());
        if resumed.in_progress {
            self.fan_out(&resumed.snapshot);
        }
    }

    /// `MOVE` 처리
    ///
    /// 이 연결이 이미 다른 플레이어로 바인딩되어 있으면 그 플레이어 이름으로는 둘 수 없습니다.
    fn handle_move(&self, handle: &ConnectionHandle, state: &ConnectionState, envelope: &Envelope, request: &MoveRequest) {
        if let Some(bound) = state.player_id().filter(|bound| *bound != request.player_id) {
            warn!(
                "연결 {} ({}로 바인딩됨)이 플레이어 {}의 수를 보냄",
                handle.conn_id(),
                bound,
                request.player_id
            );
            let err = GameError::BadPayload(format!("connection is bound to {}", bound));
            self.reply(handle, self.error_envelope(&err));
            return;
        }

        let request_id = request.request_id(envelope);

        match self.room.submit_move(request, request_id) {
            MoveDisposition::Replayed(response) | MoveDisposition::Rejected(response) => {
                self.reply_to_player(&request.player_id, handle, response);
            }
            MoveDisposition::Applied { ack, broadcast } => {
                self.reply_to_player(&request.player_id, handle, ack);
                self.fan_out(&broadcast);
            }
        }
    }

    /// 연결을 플레이어에 바인딩합니다.
    ///
    /// 이 연결이 이전에 다른 플레이어로 바인딩되어 있었다면 그 바인딩을 먼저 해제합니다.
    fn bind(&self, handle: &ConnectionHandle, state: &ConnectionState, player_id: &str) {
        if let Some(previous) = state.player_id().filter(|previous| *previous != player_id) {
            self.connection_service.unbind(previous, handle.conn_id());
        }

        if let Some(displaced) = self.connection_service.bind(player_id, handle.clone()) {
            debug!(
                "플레이어 {}의 이전 연결 {} ({})은 더 이상 추적되지 않습니다",
                player_id,
                displaced.conn_id(),
                displaced.addr()
            );
        }
    }

    fn error_envelope(&self, err: &GameError) -> Envelope {
        Envelope::error(self.room.game_id(), err)
    }

    /// 요청을 보낸 연결에 응답
    fn reply(&self, handle: &ConnectionHandle, envelope: Envelope) {
        if let Err(e) = handle.send(envelope) {
            ErrorHandler::handle_error(e, ErrorSeverity::Info, "MessageHandler", "reply");
        }
    }

    /// 플레이어의 현재 연결에 응답하고, 바인딩된 연결이 없으면 요청을 보낸 연결로 보냅니다.
    fn reply_to_player(&self, player_id: &str, handle: &ConnectionHandle, envelope: Envelope) {
        if !self.connection_service.is_bound(player_id) {
            self.reply(handle, envelope);
            return;
        }

        if let Err(e) = self.connection_service.send_to_player(player_id, envelope) {
            ErrorHandler::handle_error(e, ErrorSeverity::Info, "MessageHandler", "reply_to_player");
        }
    }

    /// 모든 연결된 플레이어에게 전송. 개별 실패는 기록만 합니다.
    fn fan_out(&self, envelope: &Envelope) {
        for report in self.connection_service.broadcast(envelope) {
            if let Err(e) = report.result {
                ErrorHandler::handle_error(
                    e,
                    ErrorSeverity::Warning,
                    "MessageHandler",
                    &format!("broadcast → {}", report.player_id),
                );
            }
        }
    }
}
