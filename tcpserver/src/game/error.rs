//! 게임 에러 정의
//!
//! 클라이언트에게 `ERROR` envelope으로 전달되는 모든 실패를 정의합니다.
//! 어떤 에러도 게임 상태를 변경하지 않습니다.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 와이어 에러 코드
///
/// `ERROR{code, message}` payload의 `code` 필드 값입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomFull,
    NotInProgress,
    NotYourTurn,
    OutOfBounds,
    CellTaken,
    TurnMismatch,
    UnknownPlayer,
    VersionAhead,
    BadType,
    BadPayload,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RoomFull => "ROOM_FULL",
            ErrorCode::NotInProgress => "NOT_IN_PROGRESS",
            ErrorCode::NotYourTurn => "NOT_YOUR_TURN",
            ErrorCode::OutOfBounds => "OUT_OF_BOUNDS",
            ErrorCode::CellTaken => "CELL_TAKEN",
            ErrorCode::TurnMismatch => "TURN_MISMATCH",
            ErrorCode::UnknownPlayer => "UNKNOWN_PLAYER",
            ErrorCode::VersionAhead => "VERSION_AHEAD",
            ErrorCode::BadType => "BAD_TYPE",
            ErrorCode::BadPayload => "BAD_PAYLOAD",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 게임/프로토콜 에러
///
/// - 용량 위반: `RoomFull`
/// - 게임 규칙 위반: `NotInProgress`, `NotYourTurn`, `OutOfBounds`, `CellTaken`, `TurnMismatch`
/// - 프로토콜 위반: `UnknownPlayer`, `VersionAhead`, `BadType`, `BadPayload`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Two players already joined.")]
    RoomFull,

    #[error("Game not in progress.")]
    NotInProgress,

    #[error("Expected {expected}.")]
    NotYourTurn { expected: String },

    #[error("x,y must be in [0,2].")]
    OutOfBounds,

    #[error("Cell already filled.")]
    CellTaken,

    #[error("Server turn {server}, got {client}.")]
    TurnMismatch { server: u64, client: u64 },

    #[error("Player {0} never joined.")]
    UnknownPlayer(String),

    #[error("Client version {client} is ahead of server version {server}.")]
    VersionAhead { server: u64, client: u64 },

    #[error("Unsupported type {0}")]
    BadType(String),

    #[error("Malformed payload: {0}")]
    BadPayload(String),
}

impl GameError {
    /// 와이어 에러 코드 반환
    pub fn code(&self) -> ErrorCode {
        match self {
            GameError::RoomFull => ErrorCode::RoomFull,
            GameError::NotInProgress => ErrorCode::NotInProgress,
            GameError::NotYourTurn { .. } => ErrorCode::NotYourTurn,
            GameError::OutOfBounds => ErrorCode::OutOfBounds,
            GameError::CellTaken => ErrorCode::CellTaken,
            GameError::TurnMismatch { .. } => ErrorCode::TurnMismatch,
            GameError::UnknownPlayer(_) => ErrorCode::UnknownPlayer,
            GameError::VersionAhead { .. } => ErrorCode::VersionAhead,
            GameError::BadType(_) => ErrorCode::BadType,
            GameError::BadPayload(_) => ErrorCode::BadPayload,
        }
    }
}
