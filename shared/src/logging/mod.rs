//! 통합 로깅 시스템
//!
//! `tracing` 기반 로깅을 각 서비스에서 같은 방식으로 초기화하도록 돕습니다.
//!
//! # 사용 예시
//! ```rust,no_run
//! use shared::logging::{init_logging, LoggingConfig, ServiceType};
//!
//! init_logging(ServiceType::TcpServer, &LoggingConfig::from_env()).unwrap();
//! tracing::info!("서버 시작");
//! ```

pub mod config;

pub use config::{LoggingConfig, ServiceType};

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// 로깅 시스템 초기화 함수
///
/// `RUST_LOG`이 설정되어 있으면 그 필터를 우선 사용하고,
/// 없으면 `config.level`을 기본 레벨로 사용합니다.
///
/// # Errors
/// * 설정 검증 실패 시
/// * 전역 subscriber가 이미 설치되어 있을 때
pub fn init_logging(service_type: ServiceType, config: &LoggingConfig) -> Result<()> {
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids)
        .try_init()
        .map_err(|e| anyhow!("로깅 초기화 실패 [{}]: {}", service_type.as_str(), e))?;

    tracing::debug!(
        service = service_type.as_str(),
        prefix = service_type.log_prefix(),
        level = %config.level,
        "로깅 시스템 초기화 완료"
    );
    Ok(())
}
