//! 게임 상태 머신
//!
//! 보드, 플레이어 명단, 턴 카운터, 상태, 버전을 관리합니다.
//! I/O가 없는 순수 로직이며, 동시성 보호는 호출자(`GameRoom`)가 담당합니다.
//!
//! # 불변 조건
//!
//! - `status == InProgress` ⇔ 명단에 2명이 있고 게임이 끝나지 않음
//! - `version`은 적용된 수마다 정확히 1씩 증가하고 감소하지 않음
//! - `next_player_id`는 두 명단 항목 사이를 엄격히 번갈아 이동

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::board::{Board, Coord, Symbol};
use super::error::GameError;

/// 방 최대 인원
pub const MAX_PLAYERS: usize = 2;

/// 게임 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Waiting,
    InProgress,
    GameOver,
}

/// 게임 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "X_WIN")]
    XWin,
    #[serde(rename = "O_WIN")]
    OWin,
    #[serde(rename = "DRAW")]
    Draw,
}

impl GameResult {
    fn win_for(symbol: Symbol) -> Self {
        match symbol {
            Symbol::X => GameResult::XWin,
            Symbol::O => GameResult::OWin,
        }
    }
}

/// 종료된 게임의 결과와 승리 라인
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub result: GameResult,
    pub winning_line: Option<[Coord; 3]>,
}

/// 플레이어 정보
///
/// 심볼과 좌석은 최초 입장 시 결정되며 재접속 후에도 바뀌지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub nickname: String,
    pub symbol: Symbol,
    pub seat: u8,
}

/// 입장 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// 새로 좌석을 배정받음. `started`는 이번 입장으로 게임이 시작되었는지 여부
    Seated { started: bool },
    /// 이미 명단에 있는 플레이어 (재접속 경로)
    AlreadySeated,
}

/// 직렬화 가능한 상태 스냅샷
///
/// `GAME_STATE` payload 및 `GAME_OVER.final_state`로 그대로 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub board: Board,
    pub players: Vec<Player>,
    pub next_player_id: Option<String>,
    pub turn: u64,
    pub status: GameStatus,
    pub version: u64,
}

/// 게임 상태
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    players: Vec<Player>,
    turn: u64,
    status: GameStatus,
    next_player_id: Option<String>,
    version: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            players: Vec::with_capacity(MAX_PLAYERS),
            turn: 0,
            status: GameStatus::Waiting,
            next_player_id: None,
            version: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn next_player_id(&self) -> Option<&str> {
        self.next_player_id.as_deref()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn is_seated(&self, player_id: &str) -> bool {
        self.player(player_id).is_some()
    }

    /// 플레이어 입장
    ///
    /// 이미 명단에 있으면 아무것도 바꾸지 않고 성공합니다.
    /// 두 번째 플레이어가 들어오면 WAITING → IN_PROGRESS로 전이하고
    /// 첫 번째 플레이어(X)가 선공합니다.
    pub fn join(&mut self, player_id: &str, nickname: &str) -> Result<JoinOutcome, GameError> {
        if self.is_seated(player_id) {
            return Ok(JoinOutcome::AlreadySeated);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }

        let seat = self.players.len() as u8;
        self.players.push(Player {
            player_id: player_id.to_string(),
            nickname: nickname.to_string(),
            symbol: Symbol::for_seat(seat),
            seat,
        });
        debug!("플레이어 {} 입장 (좌석 {}, 심볼 {})", player_id, seat, Symbol::for_seat(seat));

        let started = self.players.len() == MAX_PLAYERS && self.status == GameStatus::Waiting;
        if started {
            self.status = GameStatus::InProgress;
            self.next_player_id = Some(self.players[0].player_id.clone());
        }

        Ok(JoinOutcome::Seated { started })
    }

    /// 수 검증
    ///
    /// 검사 순서: NOT_IN_PROGRESS → NOT_YOUR_TURN → OUT_OF_BOUNDS → CELL_TAKEN → TURN_MISMATCH.
    /// `claimed_turn`이 `None`이면 턴 카운터 검사는 건너뜁니다.
    pub fn validate_move(
        &self,
        player_id: &str,
        x: i64,
        y: i64,
        claimed_turn: Option<u64>,
    ) -> Result<(), GameError> {
        if self.status != GameStatus::InProgress {
            return Err(GameError::NotInProgress);
        }

        let expected = self.next_player_id.as_deref().unwrap_or_default();
        if player_id != expected {
            return Err(GameError::NotYourTurn {
                expected: expected.to_string(),
            });
        }

        if !Board::in_bounds(x, y) {
            return Err(GameError::OutOfBounds);
        }

        if !self.board.is_empty_at(x as usize, y as usize) {
            return Err(GameError::CellTaken);
        }

        if let Some(client) = claimed_turn {
            if client != self.turn {
                return Err(GameError::TurnMismatch {
                    server: self.turn,
                    client,
                });
            }
        }

        Ok(())
    }

    /// 수 적용
    ///
    /// 게임 규칙 전제 조건을 다시 확인한 뒤 보드에 심볼을 기록하고
    /// 턴과 버전을 1씩 올립니다. 게임이 끝나면 결과를, 계속되면 `None`을 반환합니다.
    pub fn apply_move(
        &mut self,
        player_id: &str,
        x: i64,
        y: i64,
    ) -> Result<Option<GameOutcome>, GameError> {
        self.validate_move(player_id, x, y, None)?;

        let symbol = self
            .player(player_id)
            .map(|p| p.symbol)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.to_string()))?;
        let (x, y) = (x as usize, y as usize);

        self.board.place(x, y, symbol);
        self.turn += 1;
        self.version += 1;

        if let Some(line) = self.board.winning_line(symbol) {
            self.status = GameStatus::GameOver;
            return Ok(Some(GameOutcome {
                result: GameResult::win_for(symbol),
                winning_line: Some(line),
            }));
        }

        if self.board.is_full() {
            self.status = GameStatus::GameOver;
            return Ok(Some(GameOutcome {
                result: GameResult::Draw,
                winning_line: None,
            }));
        }

        self.next_player_id = self
            .players
            .iter()
            .find(|p| p.player_id != player_id)
            .map(|p| p.player_id.clone());
        Ok(None)
    }

    /// 현재 상태 스냅샷
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board: self.board.clone(),
            players: self.players.clone(),
            next_player_id: match self.status {
                GameStatus::InProgress => self.next_player_id.clone(),
                _ => None,
            },
            turn: self.turn,
            status: self.status,
            version: self.version,
        }
    }
}
