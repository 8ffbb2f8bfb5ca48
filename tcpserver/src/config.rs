//! TCP 서버 환경 설정 모듈
//!
//! .env 파일에서 환경변수를 로드하고 관리합니다.

use anyhow::Result;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::protocol::DEFAULT_MAX_FRAME_BYTES;
use crate::tool::error::TcpServerError;

/// TCP 서버 설정 구조체
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// TCP 서버 호스트 주소
    pub host: String,
    /// TCP 서버 포트 번호
    pub port: u16,
    /// 게임 방 ID (모든 envelope의 `game_id`)
    pub game_id: String,
    /// 하트비트 검사 주기 (초)
    pub heartbeat_interval_secs: u64,
    /// 하트비트 유예 시간 (초)
    pub heartbeat_grace_secs: u64,
    /// 중복 제거 윈도우 (초)
    pub dedup_window_secs: u64,
    /// 최대 프레임 크기 (바이트)
    pub max_frame_bytes: usize,
    /// 최대 동시 연결 수
    pub max_connections: usize,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 12345,
            game_id: "G-1".to_string(),
            heartbeat_interval_secs: 10,
            heartbeat_grace_secs: 30,
            dedup_window_secs: 300,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            max_connections: 64,
        }
    }
}

impl TcpServerConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 로드 순서:
    /// 1. 상위 디렉토리의 .env 파일
    /// 2. 현재 디렉토리의 .env 파일
    /// 3. 시스템 환경변수
    /// 4. 기본값
    pub fn from_env() -> Result<Self> {
        // .env 파일 로드 시도
        Self::load_env_file();

        let defaults = Self::default();
        let config = Self {
            host: std::env::var("tcp_host").unwrap_or(defaults.host),
            port: env_or("tcp_port", defaults.port),
            game_id: std::env::var("game_id").unwrap_or(defaults.game_id),
            heartbeat_interval_secs: env_or("heartbeat_interval_secs", defaults.heartbeat_interval_secs),
            heartbeat_grace_secs: env_or("heartbeat_grace_secs", defaults.heartbeat_grace_secs),
            dedup_window_secs: env_or("dedup_window_secs", defaults.dedup_window_secs),
            max_frame_bytes: env_or("max_frame_bytes", defaults.max_frame_bytes),
            max_connections: env_or("max_connections", defaults.max_connections),
        };

        info!("TCP 서버 설정 로드 완료: {:?}", config);
        Ok(config)
    }

    /// TCP 서버 바인딩 주소를 반환합니다.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_grace(&self) -> Duration {
        Duration::from_secs(self.heartbeat_grace_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    /// .env 파일을 로드합니다.
    fn load_env_file() {
        // 여러 위치에서 .env 파일 찾기
        let env_paths = ["../.env", ".env", "../../.env"];

        let mut loaded = false;
        for path in env_paths {
            if Path::new(path).exists() && dotenv::from_filename(path).is_ok() {
                info!(".env 파일 로드 성공: {}", path);
                loaded = true;
                break;
            }
        }

        if !loaded {
            warn!(".env 파일을 찾을 수 없습니다. 기본값과 시스템 환경변수를 사용합니다.");
        }
    }
}

/// 환경변수를 파싱하고, 없거나 잘못된 값이면 기본값을 사용합니다.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("환경변수 {}의 값 '{}'을 해석할 수 없어 기본값을 사용합니다", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn invalid(key: &str, message: String) -> anyhow::Error {
    TcpServerError::configuration_error(key, &message).into()
}

/// 설정 검증 유틸리티
pub fn validate_config(config: &TcpServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(invalid("tcp_port", format!("유효하지 않은 TCP 포트 번호: {}", config.port)));
    }

    if config.host.is_empty() {
        return Err(invalid("tcp_host", "TCP 호스트 주소가 비어있습니다".to_string()));
    }

    if config.game_id.is_empty() {
        return Err(invalid("game_id", "게임 ID가 비어있습니다".to_string()));
    }

    if config.heartbeat_interval_secs == 0 || config.heartbeat_grace_secs == 0 {
        return Err(invalid(
            "heartbeat_interval_secs",
            "하트비트 주기와 유예 시간은 0보다 커야 합니다".to_string(),
        ));
    }

    if config.heartbeat_grace_secs < config.heartbeat_interval_secs {
        return Err(invalid(
            "heartbeat_grace_secs",
            format!(
                "하트비트 유예 시간({}초)이 검사 주기({}초)보다 짧습니다",
                config.heartbeat_grace_secs, config.heartbeat_interval_secs
            ),
        ));
    }

    if config.dedup_window_secs == 0 {
        return Err(invalid("dedup_window_secs", "중복 제거 윈도우는 0보다 커야 합니다".to_string()));
    }

    if config.max_frame_bytes == 0 {
        return Err(invalid("max_frame_bytes", "최대 프레임 크기는 0보다 커야 합니다".to_string()));
    }

    if config.max_connections == 0 {
        return Err(invalid("max_connections", "최대 연결 수는 0보다 커야 합니다".to_string()));
    }

    Ok(())
}
