//! 틱택토 TCP 게임 서버

use anyhow::{Context, Result};
use shared::{init_logging, CurrentTime, LoggingConfig, ServiceType};
use std::sync::Arc;
use tracing::{error, info};

use tcpserver::{validate_config, TcpGameService, TcpServerConfig};

/// TCP 서버 메인 진입점
///
/// 환경변수 (괄호 안은 기본값):
/// - tcp_host ("127.0.0.1"), tcp_port (12345), game_id ("G-1")
/// - heartbeat_interval_secs (10), heartbeat_grace_secs (30)
/// - dedup_window_secs (300), max_frame_bytes (65536), max_connections (64)
/// - RUST_LOG / LOG_LEVEL: 로그 필터
#[tokio::main]
async fn main() -> Result<()> {
    // 로깅 설정
    init_logging(ServiceType::TcpServer, &LoggingConfig::from_env())?;

    // 환경 설정 로드 및 검증
    let config = TcpServerConfig::from_env()?;
    validate_config(&config).context("TCP 서버 설정 검증 실패")?;

    info!("=== TCP 서버 설정 ({}) ===", CurrentTime::new().current_time);
    info!("TCP 서버: {}", config.bind_address());
    info!("게임 ID: {}", config.game_id);
    info!(
        "하트비트: {}초 간격 / {}초 유예",
        config.heartbeat_interval_secs, config.heartbeat_grace_secs
    );
    info!("====================");

    let service = Arc::new(TcpGameService::new(config));
    let listener = service.bind().await?;

    let mut server_handle = {
        let service = service.clone();
        tokio::spawn(async move { service.serve(listener).await })
    };

    // 종료 시그널 또는 서버 태스크의 조기 종료 대기
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("종료 시그널 대기 실패")?;
            info!("종료 시그널 수신, 서버를 중지합니다...");
        }
        finished = &mut server_handle => {
            let served = finished.context("서버 태스크 비정상 종료")?;
            if let Err(e) = &served {
                error!("TCP 서버 실행 오류: {:#}", e);
            }
            service.stop().await?;
            return served;
        }
    }

    service.stop().await?;
    server_handle
        .await
        .context("서버 태스크 종료 대기 실패")?
        .context("TCP 서버 실행 오류")?;

    Ok(())
}
