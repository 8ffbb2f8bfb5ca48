//! TCP 서버 메인 서비스
//!
//! TCP 서버의 생명주기와 전반적인 관리를 담당합니다.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::config::TcpServerConfig;
use crate::handler::{ConnectionHandler, MessageHandler};
use crate::service::connection_service::{wait_until_closed, ConnectionService};
use crate::service::dedup_service::DedupCache;
use crate::service::heartbeat_service::HeartbeatService;
use crate::service::room_service::GameRoom;
use crate::tool::error::{ErrorHandler, ErrorSeverity};

/// TCP 게임 서버 서비스
pub struct TcpGameService {
    config: TcpServerConfig,
    room: Arc<GameRoom>,
    connection_service: Arc<ConnectionService>,
    heartbeat_service: Arc<HeartbeatService>,
    connection_handler: Arc<ConnectionHandler>,
    is_running: Arc<Mutex<bool>>,
    shutdown_tx: watch::Sender<bool>,
}

impl TcpGameService {
    /// 새로운 TCP 게임 서비스 생성
    pub fn new(config: TcpServerConfig) -> Self {
        let room = Arc::new(GameRoom::new(&config.game_id, DedupCache::new(config.dedup_window())));
        let connection_service = Arc::new(ConnectionService::new(config.max_connections));
        let heartbeat_service = Arc::new(HeartbeatService::new(
            connection_service.clone(),
            config.heartbeat_interval(),
            config.heartbeat_grace(),
        ));
        let message_handler = Arc::new(MessageHandler::new(
            room.clone(),
            connection_service.clone(),
            heartbeat_service.clone(),
        ));
        let connection_handler = Arc::new(ConnectionHandler::new(
            connection_service.clone(),
            message_handler,
            config.max_frame_bytes,
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            room,
            connection_service,
            heartbeat_service,
            connection_handler,
            is_running: Arc::new(Mutex::new(false)),
            shutdown_tx,
        }
    }

    /// 기본 설정으로 서비스 생성
    pub fn with_default_config() -> Self {
        Self::new(TcpServerConfig::default())
    }

    /// 설정된 주소에 리스너를 바인드합니다.
    pub async fn bind(&self) -> Result<TcpListener> {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("TCP 리스너 바인드 실패: {}", bind_addr))?;

        info!("✅ TCP 서버가 {}에서 실행 중입니다", listener.local_addr()?);
        Ok(listener)
    }

    /// 서버 시작 (바인드 후 `stop()`까지 연결 수락)
    pub async fn start(&self) -> Result<()> {
        info!("🚀 TCP 게임 서버 시작 중... ({})", self.config.bind_address());
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// 주어진 리스너로 연결 수락 루프를 실행합니다.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        {
            let mut is_running = self.is_running.lock().await;
            if *is_running {
                warn!("TCP 서버가 이미 실행 중입니다");
                return Ok(());
            }
            *is_running = true;
        }

        // 하트비트 시스템 시작
        self.heartbeat_service
            .start()
            .await
            .context("하트비트 시스템 시작 실패")?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                _ = wait_until_closed(&mut shutdown_rx) => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let connection_handler = self.connection_handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = connection_handler.handle_connection(stream, addr).await {
                                ErrorHandler::handle_error(e, ErrorSeverity::Warning, "TcpGameService", "handle_connection");
                            }
                        });
                    }
                    Err(e) => {
                        ErrorHandler::handle_error(e.into(), ErrorSeverity::Error, "TcpGameService", "accept");
                        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                    }
                },
            }
        }

        info!("연결 수락 루프 종료");
        Ok(())
    }

    /// 서버 중지
    pub async fn stop(&self) -> Result<()> {
        let mut is_running = self.is_running.lock().await;

        if !*is_running {
            warn!("TCP 서버가 이미 중지되어 있습니다");
            return Ok(());
        }

        info!("🛑 TCP 게임 서버 중지 중...");

        *is_running = false;
        drop(is_running);

        self.shutdown_tx.send_replace(true);

        // 하트비트 시스템 중지
        self.heartbeat_service
            .stop()
            .await
            .context("하트비트 시스템 중지 실패")?;

        // 모든 연결 종료
        self.connection_service.close_all_connections();

        info!("✅ TCP 게임 서버가 성공적으로 중지되었습니다");
        Ok(())
    }

    /// 서버 실행 상태 확인
    pub async fn is_running(&self) -> bool {
        *self.is_running.lock().await
    }

    /// 서버 통계 조회
    pub async fn get_server_stats(&self) -> ServerStats {
        let connection_stats = self.connection_service.get_connection_stats();

        ServerStats {
            is_running: self.is_running().await,
            open_connections: self.connection_service.get_connection_count(),
            bound_sessions: self.connection_service.get_session_count(),
            peak_connections: connection_stats.peak_connections,
            heartbeat_running: self.heartbeat_service.is_running().await,
            uptime_seconds: self.connection_service.get_uptime_seconds(),
            max_connections: self.config.max_connections,
            bind_address: self.config.bind_address(),
            game_id: self.room.game_id().to_string(),
            game_version: self.room.version(),
        }
    }

    /// 설정 조회
    pub fn get_config(&self) -> &TcpServerConfig {
        &self.config
    }
}

/// 서버 통계 정보
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServerStats {
    pub is_running: bool,
    pub open_connections: usize,
    pub bound_sessions: usize,
    pub peak_connections: u32,
    pub heartbeat_running: bool,
    pub uptime_seconds: u64,
    pub max_connections: usize,
    pub bind_address: String,
    pub game_id: String,
    pub game_version: u64,
}
