//! TCP 서버 공통 유틸리티 모듈
//!
//! 에러 정의와 에러 로깅 기능을 제공합니다.

pub mod error;

pub use error::{ErrorHandler, ErrorSeverity, TcpResult, TcpServerError};
