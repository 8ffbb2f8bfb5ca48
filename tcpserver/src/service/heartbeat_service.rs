//! 하트비트 서비스
//!
//! 플레이어 연결 상태 모니터링과 타임아웃 관리를 담당합니다.
//! 유예 시간 동안 아무 메시지도 보내지 않은 플레이어의 연결을 끊지만
//! 게임 명단의 좌석은 남겨 두므로 이후 `RESUME`으로 복귀할 수 있습니다.

use anyhow::Result;
use shared::CurrentTime;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::protocol::Envelope;
use crate::service::connection_service::{ConnectionHandle, ConnectionService};
use crate::tool::error::{ErrorHandler, ErrorSeverity, TcpResult, TcpServerError};

/// 기본 검사 주기
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// 기본 유예 시간
pub const DEFAULT_HEARTBEAT_GRACE: Duration = Duration::from_secs(30);

/// 하트비트 서비스
pub struct HeartbeatService {
    connection_service: Arc<ConnectionService>,
    is_running: Arc<Mutex<bool>>,
    cleanup_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    heartbeat_interval: Duration,
    grace_period: Duration,
    heartbeat_stats: Arc<Mutex<HeartbeatStats>>,
}

/// 하트비트 통계
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct HeartbeatStats {
    pub total_heartbeats: u64,
    pub timeout_cleanups: u64,
    #[serde(skip)]
    pub last_cleanup_time: Option<Instant>,
    /// 마지막 정리 시간 (Unix timestamp)
    pub last_cleanup_timestamp: Option<i64>,
    pub active_sessions: u32,
}

impl HeartbeatService {
    /// 새로운 하트비트 서비스 생성
    pub fn new(connection_service: Arc<ConnectionService>, heartbeat_interval: Duration, grace_period: Duration) -> Self {
        Self {
            connection_service,
            is_running: Arc::new(Mutex::new(false)),
            cleanup_handle: Arc::new(Mutex::new(None)),
            heartbeat_interval,
            grace_period,
            heartbeat_stats: Arc::new(Mutex::new(HeartbeatStats::default())),
        }
    }

    /// 기본 설정으로 생성 (10초 간격, 30초 유예)
    pub fn with_default_config(connection_service: Arc<ConnectionService>) -> Self {
        Self::new(connection_service, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_HEARTBEAT_GRACE)
    }

    /// 하트비트 시스템 시작
    pub async fn start(&self) -> Result<()> {
        let mut is_running = self.is_running.lock().await;

        if *is_running {
            warn!("하트비트 시스템이 이미 실행 중입니다");
            return Ok(());
        }

        *is_running = true;
        drop(is_running);

        info!(
            "🔄 하트비트 시스템 시작 ({:?} 간격, {:?} 유예)",
            self.heartbeat_interval, self.grace_period
        );

        let connection_service = self.connection_service.clone();
        let is_running_ref = self.is_running.clone();
        let stats_ref = self.heartbeat_stats.clone();
        let period = self.heartbeat_interval;
        let grace = self.grace_period;

        let handle = tokio::spawn(async move {
            let mut cleanup_interval = interval(period);
            cleanup_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while *is_running_ref.lock().await {
                cleanup_interval.tick().await;
                Self::run_cleanup(&connection_service, &stats_ref, grace).await;
            }

            info!("하트비트 정리 작업 종료");
        });

        // 핸들 저장
        *self.cleanup_handle.lock().await = Some(handle);

        Ok(())
    }

    /// 하트비트 시스템 중지
    pub async fn stop(&self) -> Result<()> {
        let mut is_running = self.is_running.lock().await;

        if !*is_running {
            warn!("하트비트 시스템이 이미 중지되어 있습니다");
            return Ok(());
        }

        *is_running = false;
        drop(is_running);

        info!("🛑 하트비트 시스템 중지 중...");

        if let Some(handle) = self.cleanup_handle.lock().await.take() {
            handle.abort();
            debug!("하트비트 정리 작업 핸들 종료됨");
        }

        info!("✅ 하트비트 시스템 중지 완료");
        Ok(())
    }

    /// 하트비트 시스템 실행 상태 확인
    pub async fn is_running(&self) -> bool {
        *self.is_running.lock().await
    }

    /// 수동으로 타임아웃된 플레이어 정리
    ///
    /// 제거된 플레이어 ID 목록을 반환합니다.
    pub async fn cleanup_now(&self) -> Vec<String> {
        let evicted = Self::run_cleanup(&self.connection_service, &self.heartbeat_stats, self.grace_period).await;

        if evicted.is_empty() {
            debug!("정리할 타임아웃 연결이 없습니다");
        } else {
            info!("수동 하트비트 정리: {}개 연결 해제", evicted.len());
        }
        evicted
    }

    async fn run_cleanup(
        connection_service: &ConnectionService,
        stats_ref: &Mutex<HeartbeatStats>,
        grace: Duration,
    ) -> Vec<String> {
        let start_time = Instant::now();
        let evicted = connection_service.evict_stale(grace);
        let current_sessions = connection_service.get_session_count();

        let mut stats = stats_ref.lock().await;
        if !evicted.is_empty() {
            stats.timeout_cleanups += evicted.len() as u64;
            stats.last_cleanup_time = Some(start_time);
            stats.last_cleanup_timestamp = Some(CurrentTime::now_secs());
            info!("하트비트 타임아웃 정리: {:?} (남은 세션: {}개)", evicted, current_sessions);
        } else if current_sessions > 0 {
            debug!("하트비트 체크 완료 - 활성 세션: {}개", current_sessions);
        }
        stats.active_sessions = current_sessions as u32;

        evicted
    }

    /// 하트비트 처리 (클라이언트의 `PING`)
    ///
    /// 마지막 수신 시각은 디스패처가 모든 수신 메시지에 대해 이미 갱신하므로
    /// 여기서는 `PONG` 응답과 통계만 처리합니다.
    pub async fn handle_heartbeat(&self, handle: &ConnectionHandle, game_id: &str) -> TcpResult<()> {
        if let Err(e) = handle.send(Envelope::pong(game_id)) {
            let tcp_error = TcpServerError::heartbeat_error(None, "send_pong", &e.to_string());
            ErrorHandler::handle_error(tcp_error.clone(), ErrorSeverity::Warning, "HeartbeatService", "handle_heartbeat");
            return Err(tcp_error);
        }

        self.heartbeat_stats.lock().await.total_heartbeats += 1;

        debug!("연결 {} 하트비트 처리 완료", handle.conn_id());
        Ok(())
    }

    /// 하트비트 통계 조회
    pub async fn get_heartbeat_stats(&self) -> HeartbeatStats {
        self.heartbeat_stats.lock().await.clone()
    }

    /// 하트비트 설정 조회 (검사 주기, 유예 시간)
    pub fn get_config(&self) -> (Duration, Duration) {
        (self.heartbeat_interval, self.grace_period)
    }
}
