//! 공통 에러 처리 시스템
//!
//! TCP 서버 인프라(연결, 프레이밍, 하트비트, 설정)에서 발생하는 에러를 관리합니다.
//! 게임 규칙 에러는 `crate::game::GameError`가 담당합니다.

use thiserror::Error;
use tracing::{error, info, warn};

/// TCP 서버 에러 타입
///
/// 서버에서 발생할 수 있는 인프라 에러를 분류합니다.
/// 어느 것도 서버 전체를 중단시키지 않으며, 해당 연결 또는 수신자 단위로 처리됩니다.
#[derive(Error, Debug, Clone)]
pub enum TcpServerError {
    /// 연결 관련 에러
    #[error("연결 에러 [연결 {}] [{}]: {message}", fmt_opt(.conn_id), fmt_opt(.addr))]
    Connection {
        conn_id: Option<u64>,
        addr: Option<String>,
        message: String,
    },

    /// 프로토콜(프레이밍) 관련 에러
    #[error("프로토콜 에러 [타입: {}]: {message}", fmt_opt(.message_type))]
    Protocol {
        message_type: Option<String>,
        message: String,
    },

    /// 하트비트 관련 에러
    #[error("하트비트 에러 [플레이어 {}] [작업: {operation}]: {message}", fmt_opt(.player_id))]
    Heartbeat {
        player_id: Option<String>,
        operation: String,
        message: String,
    },

    /// 네트워크 관련 에러
    #[error("네트워크 에러 [{}] [작업: {operation}]: {message}", fmt_opt(.addr))]
    Network {
        addr: Option<String>,
        operation: String,
        message: String,
    },

    /// 직렬화/역직렬화 에러
    #[error("직렬화 에러 [타입: {data_type}]: {message}")]
    Serialization { data_type: String, message: String },

    /// 설정 관련 에러
    #[error("설정 에러 [키: {key}]: {message}")]
    Configuration { key: String, message: String },
}

fn fmt_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorSeverity {
    /// 정보성 - 정상 동작 중 발생하는 예상 가능한 상황
    Info,
    /// 경고 - 주의가 필요하지만 서비스는 계속 가능
    Warning,
    /// 에러 - 기능에 영향을 주지만 복구 가능
    Error,
}

/// 에러 핸들러
///
/// 에러를 중앙에서 로깅하는 구조체입니다.
pub struct ErrorHandler;

impl ErrorHandler {
    /// 에러를 처리하고 로깅합니다.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use tcpserver::tool::error::{ErrorHandler, ErrorSeverity, TcpServerError};
    /// let error = TcpServerError::connection_error(Some(3), None, "전송 채널 닫힘");
    ///
    /// ErrorHandler::handle_error(
    ///     error,
    ///     ErrorSeverity::Warning,
    ///     "ConnectionService",
    ///     "broadcast",
    /// );
    /// ```
    pub fn handle_error(error: TcpServerError, severity: ErrorSeverity, component: &str, operation: &str) {
        let log_message = format!("[{}] [{}] {}", component, operation, error);

        match severity {
            ErrorSeverity::Info => info!("{}", log_message),
            ErrorSeverity::Warning => warn!("{}", log_message),
            ErrorSeverity::Error => error!("{}", log_message),
        }
    }
}

/// 에러 생성 헬퍼 함수들
impl TcpServerError {
    /// 연결 에러 생성
    pub fn connection_error(conn_id: Option<u64>, addr: Option<String>, message: &str) -> Self {
        Self::Connection {
            conn_id,
            addr,
            message: message.to_string(),
        }
    }

    /// 프로토콜 에러 생성
    pub fn protocol_error(message_type: Option<String>, message: &str) -> Self {
        Self::Protocol {
            message_type,
            message: message.to_string(),
        }
    }

    /// 하트비트 에러 생성
    pub fn heartbeat_error(player_id: Option<String>, operation: &str, message: &str) -> Self {
        Self::Heartbeat {
            player_id,
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// 네트워크 에러 생성
    pub fn network_error(addr: Option<String>, operation: &str, message: &str) -> Self {
        Self::Network {
            addr,
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// 설정 에러 생성
    pub fn configuration_error(key: &str, message: &str) -> Self {
        Self::Configuration {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    /// 스트림 종료(EOF)로 인한 에러인지 확인
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Network { operation, .. } if operation == "eof")
    }
}

/// 결과 타입 별칭
pub type TcpResult<T> = Result<T, TcpServerError>;

/// 에러 변환 트레이트 구현
impl From<std::io::Error> for TcpServerError {
    fn from(err: std::io::Error) -> Self {
        let operation = if err.kind() == std::io::ErrorKind::UnexpectedEof {
            "eof"
        } else {
            "io_operation"
        };

        Self::network_error(None, operation, &err.to_string())
    }
}

impl From<serde_json::Error> for TcpServerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            data_type: "json".to_string(),
            message: err.to_string(),
        }
    }
}
