//! 틱택토 게임 상태 머신
//!
//! 네트워크와 무관한 순수 게임 로직입니다.

pub mod board;
pub mod error;
pub mod state;

pub use board::{Board, Coord, Symbol};
pub use error::{ErrorCode, GameError};
pub use state::{GameOutcome, GameResult, GameSnapshot, GameState, GameStatus, JoinOutcome, Player};
