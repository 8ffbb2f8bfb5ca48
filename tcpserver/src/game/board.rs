//! 3×3 보드
//!
//! 좌표계: `x`는 열, `y`는 행입니다. 와이어에는 `board[y][x]` 형태의
//! 행 우선 배열로 직렬화됩니다.

use serde::{Deserialize, Serialize};

/// 보드 한 변의 길이
pub const BOARD_SIZE: usize = 3;

/// 좌표 (x, y)
pub type Coord = (usize, usize);

/// 승리 판정 라인 8개 (행 3, 열 3, 대각선 2)
pub const WIN_LINES: [[Coord; 3]; 8] = [
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(2, 0), (1, 1), (0, 2)],
];

/// 플레이어 심볼
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// 좌석 번호로 심볼 결정 (0 = X, 1 = O)
    pub fn for_seat(seat: u8) -> Self {
        if seat == 0 {
            Symbol::X
        } else {
            Symbol::O
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::X => f.write_str("X"),
            Symbol::O => f.write_str("O"),
        }
    }
}

/// 게임 보드
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Option<Symbol>; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// 좌표가 보드 범위 안인지 확인합니다.
    ///
    /// 와이어에서 음수도 들어올 수 있으므로 부호 있는 정수를 받습니다.
    pub fn in_bounds(x: i64, y: i64) -> bool {
        (0..BOARD_SIZE as i64).contains(&x) && (0..BOARD_SIZE as i64).contains(&y)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Symbol> {
        self.cells[y][x]
    }

    pub fn is_empty_at(&self, x: usize, y: usize) -> bool {
        self.cells[y][x].is_none()
    }

    pub(crate) fn place(&mut self, x: usize, y: usize, symbol: Symbol) {
        self.cells[y][x] = Some(symbol);
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_some)
    }

    /// `symbol`이 완성한 첫 번째 승리 라인을 찾습니다.
    pub fn winning_line(&self, symbol: Symbol) -> Option<[Coord; 3]> {
        WIN_LINES
            .iter()
            .find(|line| line.iter().all(|&(x, y)| self.cells[y][x] == Some(symbol)))
            .copied()
    }

    /// 행 우선 셀 배열
    pub fn rows(&self) -> &[[Option<Symbol>; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }
}
