//! TCP 서버 라이브러리
//!
//! 2인용 틱택토 게임의 권한 있는(authoritative) TCP 서버 구현입니다.
//! 서버가 유일한 게임 상태를 보유하고, 클라이언트는 요청만 보냅니다.
//!
//! # 주요 기능
//!
//! - **게임 상태 머신**: 3×3 보드, 명단, 턴, 상태, 단조 증가 버전
//! - **세션 레지스트리**: 플레이어 ID → 현재 연결 (last writer wins)
//! - **재접속**: `RESUME`과 `known_version`으로 상태 복구
//! - **중복 제거**: 같은 `MOVE` 요청 ID는 한 번만 적용하고 같은 응답을 재전송
//! - **하트비트 시스템**: 유예 시간 동안 조용한 연결 정리 (좌석은 유지)
//!
//! # 아키텍처
//!
//! ```text
//! TCP Server
//! ├── Service Layer
//! │   ├── TcpGameService (accept 루프, 생명주기)
//! │   ├── GameRoom (게임 상태 + DedupCache)
//! │   ├── ConnectionService (세션 레지스트리)
//! │   └── HeartbeatService (하트비트 관리)
//! ├── Handler Layer
//! │   ├── ConnectionHandler (소켓 읽기/쓰기 루프)
//! │   └── MessageHandler (요청 분배)
//! ├── Game (순수 게임 로직)
//! ├── Tool (에러 처리)
//! └── Protocol (길이 헤더 + JSON envelope)
//! ```
//!
//! # 사용 예시
//!
//! ```rust,no_run
//! use tcpserver::{validate_config, TcpGameService, TcpServerConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = TcpServerConfig::from_env()?;
//! validate_config(&config)?;
//!
//! let service = TcpGameService::new(config);
//! service.start().await?;
//! # Ok(())
//! # }
//! ```

/// 환경 설정 관리
pub mod config;

/// 게임 상태 머신
pub mod game;

/// 메시지 프로토콜 정의
///
/// 길이 헤더가 붙은 JSON envelope과 요청/응답 payload 타입을 정의합니다.
pub mod protocol;

/// 서비스 레이어
pub mod service;

/// 요청 처리 핸들러 레이어
pub mod handler;

/// 공통 유틸리티 도구들
pub mod tool;

#[cfg(test)]
mod tests;

pub use config::{validate_config, TcpServerConfig};
pub use game::{ErrorCode, GameError, GameState, GameStatus};
pub use protocol::{ClientRequest, Envelope, Inbound};
pub use service::{ConnectionService, GameRoom, HeartbeatService, TcpGameService};
