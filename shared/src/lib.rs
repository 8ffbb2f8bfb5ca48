//! 공유 라이브러리
//!
//! 서버 크레이트들이 함께 사용하는 로깅 초기화, 시간, ID 생성 유틸리티를 제공합니다.

pub mod logging;
pub mod tool;

pub use logging::{init_logging, LoggingConfig, ServiceType};
pub use tool::{CurrentTime, MessageIdGenerator};
