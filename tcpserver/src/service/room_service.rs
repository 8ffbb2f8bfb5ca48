//! 게임 방 서비스
//!
//! 하나의 게임 상태와 그 방의 중복 요청 캐시를 소유합니다.
//! 모든 상태 변경은 게임 잠금 안에서 처리되고, 결과 envelope만 돌려줍니다.
//! 네트워크 전송은 호출자가 잠금을 놓은 뒤에 합니다.
//!
//! 잠금 순서: 게임 상태 → 중복 캐시.

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::game::{GameError, GameState, GameStatus, JoinOutcome};
use crate::protocol::{Envelope, MoveRequest};
use crate::service::dedup_service::DedupCache;

/// 입장 결과
#[derive(Debug, Clone)]
pub struct JoinResult {
    /// 입장한 플레이어에게 보낼 현재 상태
    pub snapshot: Envelope,
    /// 이번 입장으로 게임이 시작되었는지 여부
    pub started: bool,
}

/// 재접속 결과
#[derive(Debug, Clone)]
pub struct ResumeResult {
    pub snapshot: Envelope,
    pub in_progress: bool,
}

/// `MOVE` 처리 결과
#[derive(Debug, Clone)]
pub enum MoveDisposition {
    /// 이미 처리한 요청. 저장된 응답을 그대로 다시 보냄
    Replayed(Envelope),
    /// 규칙 위반. 요청한 플레이어에게만 보냄
    Rejected(Envelope),
    /// 적용 성공. `ack`은 요청자에게, `broadcast`는 모든 연결에
    Applied { ack: Envelope, broadcast: Envelope },
}

/// 게임 방
pub struct GameRoom {
    game_id: String,
    state: Mutex<GameState>,
    dedup: DedupCache,
}

impl GameRoom {
    pub fn new(game_id: &str, dedup: DedupCache) -> Self {
        info!("게임 방 {} 생성 (중복 제거 윈도우 {:?})", game_id, dedup.window());
        Self {
            game_id: game_id.to_string(),
            state: Mutex::new(GameState::new()),
            dedup,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// 플레이어 입장
    pub fn join(&self, player_id: &str, nickname: &str) -> Result<JoinResult, GameError> {
        let (outcome, snapshot) = {
            let mut state = self.state.lock();
            let outcome = state.join(player_id, nickname)?;
            (outcome, state.snapshot())
        };

        let started = matches!(outcome, JoinOutcome::Seated { started: true });
        if started {
            info!("🎮 게임 {} 시작 (플레이어: {})", self.game_id, snapshot.players.len());
        }

        Ok(JoinResult {
            snapshot: Envelope::game_state(&self.game_id, &snapshot),
            started,
        })
    }

    /// 기존 플레이어 재접속
    ///
    /// 명단에 없는 플레이어는 `UNKNOWN_PLAYER`, 클라이언트가 아는 버전이
    /// 서버보다 앞서 있으면 `VERSION_AHEAD`입니다.
    pub fn resume(&self, player_id: &str, known_version: Option<u64>) -> Result<ResumeResult, GameError> {
        let snapshot = {
            let state = self.state.lock();
            if !state.is_seated(player_id) {
                return Err(GameError::UnknownPlayer(player_id.to_string()));
            }
            if let Some(client) = known_version {
                if client > state.version() {
                    return Err(GameError::VersionAhead {
                        server: state.version(),
                        client,
                    });
                }
            }
            state.snapshot()
        };

        Ok(ResumeResult {
            in_progress: snapshot.status == GameStatus::InProgress,
            snapshot: Envelope::game_state(&self.game_id, &snapshot),
        })
    }

    /// `MOVE` 처리
    ///
    /// 중복 조회, 검증/적용, 결과 기록을 하나의 게임 잠금 안에서 수행하므로
    /// 같은 요청 ID가 동시에 들어와도 상태 변경은 한 번만 일어납니다.
    /// 요청 ID가 없거나 좌석이 없는 플레이어의 요청은 중복 캐시를 거치지 않습니다.
    pub fn submit_move(&self, request: &MoveRequest, request_id: Option<&str>) -> MoveDisposition {
        let mut state = self.state.lock();

        let dedup_key = request_id.filter(|_| state.is_seated(&request.player_id));
        if let Some(key) = dedup_key {
            if let Some(previous) = self.dedup.lookup(&request.player_id, key) {
                debug!("중복 요청 {} (플레이어 {}) → 저장된 응답 재전송", key, request.player_id);
                return MoveDisposition::Replayed(previous);
            }
        }

        let applied = state
            .validate_move(&request.player_id, request.x, request.y, request.turn)
            .and_then(|()| state.apply_move(&request.player_id, request.x, request.y));

        let (response, disposition) = match applied {
            Err(e) => {
                debug!("플레이어 {} 수 거부: {}", request.player_id, e);
                let response = Envelope::error(&self.game_id, &e);
                (response.clone(), MoveDisposition::Rejected(response))
            }
            Ok(outcome) => {
                let snapshot = state.snapshot();
                let ack = Envelope::move_ok(&self.game_id, snapshot.version, &snapshot.board);
                let broadcast = match outcome {
                    Some(outcome) => {
                        info!("🏁 게임 {} 종료: {:?}", self.game_id, outcome.result);
                        Envelope::game_over(&self.game_id, &outcome, &snapshot)
                    }
                    None => Envelope::game_state(&self.game_id, &snapshot),
                };

                debug!(
                    "플레이어 {} 수 ({}, {}) 적용 → 버전 {}",
                    request.player_id, request.x, request.y, snapshot.version
                );
                (ack.clone(), MoveDisposition::Applied { ack, broadcast })
            }
        };

        if let Some(key) = dedup_key {
            self.dedup.record(&request.player_id, key, response);
        }
        disposition
    }

    /// 현재 상태 envelope
    pub fn snapshot(&self) -> Envelope {
        let snapshot = self.state.lock().snapshot();
        Envelope::game_state(&self.game_id, &snapshot)
    }

    /// 현재 상태 버전
    pub fn version(&self) -> u64 {
        self.state.lock().version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ErrorCode;
    use crate::protocol::{message_type, ErrorPayload, GameOverPayload};
    use std::sync::Arc;

    fn started_room() -> GameRoom {
        let room = GameRoom::new("G-1", DedupCache::default());
        room.join("p1", "alice").unwrap();
        room.join("p2", "bob").unwrap();
        room
    }

    fn mv(player_id: &str, x: i64, y: i64, turn: Option<u64>) -> MoveRequest {
        MoveRequest {
            player_id: player_id.to_string(),
            x,
            y,
            turn,
            msg_id: None,
        }
    }

    fn error_code(envelope: &Envelope) -> ErrorCode {
        assert_eq!(envelope.msg_type, message_type::ERROR);
        serde_json::from_value::<ErrorPayload>(envelope.payload.clone()).unwrap().code
    }

    #[test]
    fn test_second_join_starts_game() {
        let room = GameRoom::new("G-1", DedupCache::default());
        assert!(!room.join("p1", "").unwrap().started);

        let second = room.join("p2", "").unwrap();
        assert!(second.started);
        assert_eq!(second.snapshot.payload["status"], "IN_PROGRESS");
        assert_eq!(second.snapshot.payload["next_player_id"], "p1");

        // 재입장은 게임을 다시 시작하지 않음
        assert!(!room.join("p1", "").unwrap().started);
        assert_eq!(room.join("p3", "").unwrap_err().code(), ErrorCode::RoomFull);
    }

    #[test]
    fn test_resume_checks() {
        let room = started_room();
        room.submit_move(&mv("p1", 1, 1, Some(0)), Some("m-1"));

        assert_eq!(room.resume("ghost", None).unwrap_err().code(), ErrorCode::UnknownPlayer);
        assert_eq!(room.resume("p1", Some(2)).unwrap_err().code(), ErrorCode::VersionAhead);

        let resumed = room.resume("p1", Some(1)).unwrap();
        assert!(resumed.in_progress);
        assert_eq!(resumed.snapshot.payload["version"], 1);
        assert!(room.resume("p2", None).is_ok());
    }

    #[test]
    fn test_duplicate_move_is_replayed_verbatim() {
        let room = started_room();

        let MoveDisposition::Applied { ack, broadcast } = room.submit_move(&mv("p1", 1, 1, Some(0)), Some("m-1")) else {
            panic!("적용되어야 합니다");
        };
        assert_eq!(ack.msg_type, message_type::MOVE_OK);
        assert_eq!(broadcast.msg_type, message_type::GAME_STATE);
        assert_eq!(room.version(), 1);

        match room.submit_move(&mv("p1", 1, 1, Some(0)), Some("m-1")) {
            MoveDisposition::Replayed(replayed) => {
                assert_eq!(replayed.to_bytes().unwrap(), ack.to_bytes().unwrap());
            }
            other => panic!("재전송이어야 합니다: {:?}", other),
        }
        assert_eq!(room.version(), 1);
    }

    #[test]
    fn test_rejected_move_is_also_remembered() {
        let room = started_room();

        let MoveDisposition::Rejected(first) = room.submit_move(&mv("p2", 0, 0, None), Some("m-9")) else {
            panic!("거부되어야 합니다");
        };
        assert_eq!(error_code(&first), ErrorCode::NotYourTurn);

        assert!(matches!(
            room.submit_move(&mv("p2", 0, 0, None), Some("m-9")),
            MoveDisposition::Replayed(env) if env == first
        ));
    }

    #[test]
    fn test_top_row_win_broadcasts_game_over() {
        let room = started_room();
        let moves = [("p1", 0, 0), ("p2", 0, 1), ("p1", 1, 0), ("p2", 1, 1)];
        for (turn, (player, x, y)) in moves.iter().enumerate() {
            let id = format!("m-{}", turn);
            assert!(matches!(
                room.submit_move(&mv(player, *x, *y, Some(turn as u64)), Some(id.as_str())),
                MoveDisposition::Applied { .. }
            ));
        }

        let MoveDisposition::Applied { broadcast, .. } = room.submit_move(&mv("p1", 2, 0, Some(4)), Some("m-4")) else {
            panic!("적용되어야 합니다");
        };
        assert_eq!(broadcast.msg_type, message_type::GAME_OVER);

        let payload: GameOverPayload = serde_json::from_value(broadcast.payload).unwrap();
        assert_eq!(payload.winning_line, Some([(0, 0), (1, 0), (2, 0)]));
        assert_eq!(payload.final_state.status, GameStatus::GameOver);

        let MoveDisposition::Rejected(after) = room.submit_move(&mv("p2", 2, 2, None), Some("m-5")) else {
            panic!("거부되어야 합니다");
        };
        assert_eq!(error_code(&after), ErrorCode::NotInProgress);
    }

    #[test]
    fn test_concurrent_duplicates_apply_once() {
        let room = Arc::new(started_room());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let room = room.clone();
                std::thread::spawn(move || room.submit_move(&mv("p1", 2, 2, Some(0)), Some("same-id")))
            })
            .collect();

        let results: Vec<MoveDisposition> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let applied = results
            .iter()
            .filter(|r| matches!(r, MoveDisposition::Applied { .. }))
            .count();

        assert_eq!(applied, 1);
        assert_eq!(room.version(), 1);
    }

    #[test]
    fn test_racing_moves_loser_sees_turn_error() {
        let room = started_room();
        room.submit_move(&mv("p1", 0, 0, Some(0)), Some("a"));

        // 두 번째 p2 요청은 서로 다른 ID지만 같은 턴을 주장
        assert!(matches!(
            room.submit_move(&mv("p2", 1, 0, Some(1)), Some("b")),
            MoveDisposition::Applied { .. }
        ));
        let MoveDisposition::Rejected(loser) = room.submit_move(&mv("p2", 2, 0, Some(1)), Some("c")) else {
            panic!("거부되어야 합니다");
        };
        assert_eq!(error_code(&loser), ErrorCode::NotYourTurn);
    }

    #[test]
    fn test_moves_without_request_id_are_all_applied() {
        let room = started_room();

        for (turn, (player, x, y)) in [("p1", 0, 0), ("p2", 1, 0), ("p1", 2, 2)].into_iter().enumerate() {
            assert!(
                matches!(room.submit_move(&mv(player, x, y, None), None), MoveDisposition::Applied { .. }),
                "{}번째 수가 적용되어야 합니다",
                turn
            );
        }

        assert_eq!(room.version(), 3);
        assert_eq!(room.dedup.len_for("p1"), 0);
        assert_eq!(room.snapshot().payload["board"][2][2], "X");
    }

    #[test]
    fn test_unseated_players_are_not_cached() {
        let room = started_room();

        for i in 0..100 {
            let ghost = format!("ghost-{}", i);
            let MoveDisposition::Rejected(response) = room.submit_move(&mv(&ghost, 0, 0, None), Some("m-1")) else {
                panic!("거부되어야 합니다");
            };
            assert_eq!(error_code(&response), ErrorCode::NotYourTurn);
            assert_eq!(room.dedup.len_for(&ghost), 0);
        }

        // 좌석이 있는 플레이어는 그대로 기록됨
        room.submit_move(&mv("p1", 1, 1, Some(0)), Some("m-1"));
        assert_eq!(room.dedup.len_for("p1"), 1);
        assert_eq!(room.version(), 1);
    }
}
