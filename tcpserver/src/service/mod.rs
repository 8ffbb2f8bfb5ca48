//! TCP 서버 서비스 레이어
//!
//! 게임 방, 세션 레지스트리, 중복 요청 캐시, 하트비트, 서버 생명주기를 담당합니다.
//!
//! # 서비스 구조
//!
//! ```text
//! Service Layer
//! ├── TcpGameService (서버 생명주기, accept 루프)
//! ├── GameRoom (게임 상태 + 중복 캐시, 단일 잠금)
//! ├── ConnectionService (플레이어 → 연결, 전송, 브로드캐스트)
//! ├── DedupCache (MOVE 요청 ID → 저장된 응답)
//! └── HeartbeatService (무응답 플레이어 정리)
//! ```

/// 연결 관리 서비스
///
/// 플레이어 ID와 현재 연결의 매핑, 전송, 브로드캐스트, 통계를 담당합니다.
pub mod connection_service;

/// 중복 요청 캐시
pub mod dedup_service;

/// 하트비트 관리 서비스
///
/// 일정 주기로 세션을 검사해 유예 시간을 넘긴 연결을 끊습니다.
pub mod heartbeat_service;

/// 게임 방 서비스
pub mod room_service;

/// TCP 서버 서비스
pub mod tcp_service;

pub use connection_service::{ConnectionHandle, ConnectionService, ConnectionStats, DeliveryReport};
pub use dedup_service::DedupCache;
pub use heartbeat_service::{HeartbeatService, HeartbeatStats};
pub use room_service::{GameRoom, JoinResult, MoveDisposition, ResumeResult};
pub use tcp_service::{ServerStats, TcpGameService};
