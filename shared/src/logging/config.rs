//! 로깅 설정 관리
//!
//! 로깅 시스템의 설정 파라미터와 서비스 타입 정의를 담당합니다.

use serde::{Deserialize, Serialize};

/// 서비스 타입 열거형
///
/// 로그 target 접두사와 기본 필터를 구분하는 데 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    /// TCP 게임 서버
    TcpServer,
}

impl ServiceType {
    /// 서비스 타입을 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::TcpServer => "tcpserver",
        }
    }

    /// 로그 접두사 반환
    pub fn log_prefix(&self) -> &'static str {
        match self {
            ServiceType::TcpServer => "tcp",
        }
    }
}

/// 로깅 시스템 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `RUST_LOG`이 없을 때 사용할 기본 레벨 (기본값: "info")
    pub level: String,

    /// ANSI 색상 출력 여부 (기본값: true)
    pub ansi: bool,

    /// 로그에 target(모듈 경로) 표시 여부 (기본값: true)
    pub with_target: bool,

    /// 로그에 스레드 ID 표시 여부 (기본값: false)
    pub with_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            with_target: true,
            with_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LOG_LEVEL") {
            if !val.trim().is_empty() {
                config.level = val.trim().to_lowercase();
            }
        }

        if let Ok(val) = std::env::var("LOG_ANSI") {
            config.ansi = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("LOG_WITH_TARGET") {
            config.with_target = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("LOG_THREAD_IDS") {
            config.with_thread_ids = val.to_lowercase() == "true";
        }

        config
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> anyhow::Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        if !LEVELS.contains(&self.level.as_str()) {
            return Err(anyhow::anyhow!("알 수 없는 로그 레벨: {}", self.level));
        }

        Ok(())
    }
}
