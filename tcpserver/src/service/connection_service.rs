//! 연결 서비스
//!
//! 플레이어 ID → 현재 연결 매핑(세션 레지스트리), 마지막 수신 시각 추적,
//! 개별 전송 및 브로드캐스트를 담당합니다.
//!
//! # 잠금 규칙
//!
//! - 세션 맵은 `DashMap` 하나로 관리하며, 맵 참조를 쥔 채 다른 맵 연산이나 전송을 하지 않습니다.
//! - 브로드캐스트는 먼저 연결 목록을 복사한 뒤 잠금 없이 전송합니다.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::protocol::Envelope;
use crate::tool::error::{TcpResult, TcpServerError};

/// 연결로 나가는 envelope 수신 채널 (writer 태스크가 소유)
pub type OutboundRx = mpsc::UnboundedReceiver<Envelope>;

/// 연결 종료 신호 수신자
pub type CloseRx = watch::Receiver<bool>;

/// 개별 연결 핸들
///
/// 복제해도 같은 소켓을 가리킵니다. 전송은 채널에 넣기만 하므로 블로킹되지 않습니다.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    conn_id: u64,
    addr: String,
    outbound: mpsc::UnboundedSender<Envelope>,
    close_tx: Arc<watch::Sender<bool>>,
    connected_at: Instant,
}

impl ConnectionHandle {
    /// 새 핸들과 writer/reader 쪽에서 사용할 채널을 생성합니다.
    pub fn new(conn_id: u64, addr: String) -> (Self, OutboundRx, CloseRx) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = watch::channel(false);

        let handle = Self {
            conn_id,
            addr,
            outbound,
            close_tx: Arc::new(close_tx),
            connected_at: Instant::now(),
        };
        (handle, outbound_rx, close_rx)
    }

    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// envelope 전송 요청
    ///
    /// 연결이 이미 닫혔거나 writer 태스크가 종료되었으면 실패합니다.
    pub fn send(&self, envelope: Envelope) -> TcpResult<()> {
        if self.is_closed() {
            return Err(TcpServerError::connection_error(
                Some(self.conn_id),
                Some(self.addr.clone()),
                "이미 닫힌 연결입니다",
            ));
        }

        self.outbound.send(envelope).map_err(|_| {
            TcpServerError::connection_error(Some(self.conn_id), Some(self.addr.clone()), "전송 채널이 닫혔습니다")
        })
    }

    /// 연결 종료 신호를 보냅니다. reader/writer 태스크가 이를 보고 소켓을 닫습니다.
    pub fn close(&self) {
        self.close_tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.close_tx.borrow()
    }
}

/// 종료 신호가 올 때까지 대기합니다.
///
/// 신호를 보낼 수 있는 핸들이 모두 사라져도 종료로 간주합니다.
pub async fn wait_until_closed(close_rx: &mut CloseRx) {
    while !*close_rx.borrow_and_update() {
        if close_rx.changed().await.is_err() {
            return;
        }
    }
}

/// 세션 레지스트리 항목
#[derive(Debug, Clone)]
struct SessionEntry {
    handle: ConnectionHandle,
    last_seen: Instant,
    bound_at: Instant,
}

/// 브로드캐스트 수신자별 전송 결과
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub player_id: String,
    pub conn_id: u64,
    pub result: TcpResult<()>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// 연결 통계
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    pub total_connections: u64,
    pub current_connections: u32,
    pub peak_connections: u32,
    pub rejected_connections: u64,
    pub total_messages: u64,
    pub failed_messages: u64,
    pub timeout_disconnections: u64,
}

/// 연결 서비스
pub struct ConnectionService {
    sessions: DashMap<String, SessionEntry>,
    next_conn_id: AtomicU64,
    open_connections: AtomicUsize,
    max_connections: usize,
    server_start_time: Instant,
    connection_stats: Mutex<ConnectionStats>,
}

impl ConnectionService {
    /// 새로운 연결 서비스 생성
    pub fn new(max_connections: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            next_conn_id: AtomicU64::new(1),
            open_connections: AtomicUsize::new(0),
            max_connections,
            server_start_time: Instant::now(),
            connection_stats: Mutex::new(ConnectionStats::default()),
        }
    }

    /// 새로운 소켓 연결 등록
    ///
    /// 최대 연결 수를 넘으면 거부합니다. 이 시점의 연결은 아직 어떤 플레이어에도 묶여 있지 않습니다.
    pub fn register_connection(&self, addr: String) -> TcpResult<(ConnectionHandle, OutboundRx, CloseRx)> {
        let current = self.open_connections.fetch_add(1, Ordering::SeqCst);
        if current >= self.max_connections {
            self.open_connections.fetch_sub(1, Ordering::SeqCst);
            self.update_connection_stats(|stats| stats.rejected_connections += 1);
            warn!("최대 연결 수 초과: {}/{} ({})", current, self.max_connections, addr);
            return Err(TcpServerError::connection_error(None, Some(addr), "서버가 가득 참"));
        }

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let channels = ConnectionHandle::new(conn_id, addr);

        self.update_connection_stats(|stats| {
            stats.total_connections += 1;
            stats.current_connections += 1;
            stats.peak_connections = stats.peak_connections.max(stats.current_connections);
        });

        debug!("연결 {} 등록 ({})", conn_id, channels.0.addr());
        Ok(channels)
    }

    /// 소켓 연결 해제
    ///
    /// `player_id`에 이 연결이 아직 묶여 있으면 세션도 함께 제거합니다.
    /// 명단의 좌석은 게임 상태에 그대로 남습니다.
    pub fn release_connection(&self, handle: &ConnectionHandle, player_id: Option<&str>) {
        self.open_connections.fetch_sub(1, Ordering::SeqCst);
        self.update_connection_stats(|stats| {
            stats.current_connections = stats.current_connections.saturating_sub(1);
        });

        if let Some(player_id) = player_id {
            if self.unbind(player_id, handle.conn_id()) {
                info!("플레이어 {} 연결 {} 해제", player_id, handle.conn_id());
            }
        }
        handle.close();

        debug!(
            "연결 {} 반환 (접속 시간 {:?})",
            handle.conn_id(),
            handle.connected_at().elapsed()
        );
    }

    /// 플레이어에 연결 바인딩 (last writer wins)
    ///
    /// 기존에 다른 연결이 묶여 있었다면 그 핸들을 반환합니다.
    /// 반환된 연결은 더 이상 추적되지 않습니다.
    pub fn bind(&self, player_id: &str, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let now = Instant::now();
        let conn_id = handle.conn_id();
        let previous = self.sessions.insert(
            player_id.to_string(),
            SessionEntry {
                handle,
                last_seen: now,
                bound_at: now,
            },
        );

        match previous {
            Some(entry) if entry.handle.conn_id() != conn_id => {
                warn!(
                    "플레이어 {} 연결 교체: {} → {} (이전 연결은 {:?} 동안 바인딩, 추적 해제)",
                    player_id,
                    entry.handle.conn_id(),
                    conn_id,
                    now.saturating_duration_since(entry.bound_at)
                );
                Some(entry.handle)
            }
            _ => {
                debug!("플레이어 {} ← 연결 {}", player_id, conn_id);
                None
            }
        }
    }

    /// 플레이어 바인딩 해제
    ///
    /// 현재 묶인 연결이 `conn_id`일 때만 제거하므로, 교체된 옛 연결이
    /// 종료되면서 새 바인딩을 지우는 일이 없습니다.
    pub fn unbind(&self, player_id: &str, conn_id: u64) -> bool {
        self.sessions
            .remove_if(player_id, |_, entry| entry.handle.conn_id() == conn_id)
            .is_some()
    }

    /// 마지막 수신 시각 갱신
    pub fn touch(&self, player_id: &str, conn_id: u64) -> bool {
        match self.sessions.get_mut(player_id) {
            Some(mut entry) if entry.handle.conn_id() == conn_id => {
                entry.last_seen = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// 플레이어가 현재 연결되어 있는지 확인
    pub fn is_bound(&self, player_id: &str) -> bool {
        self.sessions.contains_key(player_id)
    }

    /// 플레이어의 현재 연결 핸들
    pub fn bound_connection(&self, player_id: &str) -> Option<ConnectionHandle> {
        self.sessions.get(player_id).map(|entry| entry.handle.clone())
    }

    /// 특정 플레이어에게 메시지 전송
    pub fn send_to_player(&self, player_id: &str, envelope: Envelope) -> TcpResult<()> {
        let handle = self.bound_connection(player_id).ok_or_else(|| {
            TcpServerError::connection_error(None, None, &format!("플레이어 {}의 연결이 없습니다", player_id))
        })?;

        let result = handle.send(envelope);
        self.record_delivery(result.is_ok());
        result
    }

    /// 모든 연결된 플레이어에게 브로드캐스트
    ///
    /// 수신자 목록을 먼저 복사하고 잠금 없이 전송합니다.
    /// 개별 실패는 수신자별 `DeliveryReport`로만 보고되고 전파되지 않습니다.
    pub fn broadcast(&self, envelope: &Envelope) -> Vec<DeliveryReport> {
        let recipients: Vec<(String, ConnectionHandle)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().handle.clone()))
            .collect();

        let reports: Vec<DeliveryReport> = recipients
            .into_iter()
            .map(|(player_id, handle)| {
                let result = handle.send(envelope.clone());
                self.record_delivery(result.is_ok());
                DeliveryReport {
                    player_id,
                    conn_id: handle.conn_id(),
                    result,
                }
            })
            .collect();

        debug!(
            "브로드캐스트 {} 완료: {}/{} 성공",
            envelope.msg_type,
            reports.iter().filter(|r| r.is_delivered()).count(),
            reports.len()
        );
        reports
    }

    /// `grace`보다 오래 조용한 세션을 제거하고 연결을 닫습니다.
    ///
    /// 제거된 플레이어 ID 목록을 반환합니다.
    pub fn evict_stale(&self, grace: Duration) -> Vec<String> {
        let now = Instant::now();
        let stale: Vec<(String, u64)> = self
            .sessions
            .iter()
            .filter(|entry| now.saturating_duration_since(entry.last_seen) > grace)
            .map(|entry| (entry.key().clone(), entry.handle.conn_id()))
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for (player_id, conn_id) in stale {
            // 스캔 이후 재접속/갱신된 세션은 건드리지 않음
            let removed = self.sessions.remove_if(&player_id, |_, entry| {
                entry.handle.conn_id() == conn_id && now.saturating_duration_since(entry.last_seen) > grace
            });

            if let Some((_, entry)) = removed {
                entry.handle.close();
                warn!("플레이어 {} 하트비트 타임아웃으로 연결 {} 해제", player_id, conn_id);
                evicted.push(player_id);
            }
        }

        if !evicted.is_empty() {
            self.update_connection_stats(|stats| stats.timeout_disconnections += evicted.len() as u64);
        }

        evicted
    }

    /// 열린 소켓 연결 수 (바인딩 여부와 무관)
    pub fn get_connection_count(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// 플레이어에 바인딩된 세션 수
    pub fn get_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// 모든 세션의 연결 종료
    pub fn close_all_connections(&self) {
        let count = self.sessions.len();
        for entry in self.sessions.iter() {
            entry.handle.close();
        }
        self.sessions.clear();

        info!("모든 플레이어 연결 해제: {}개", count);
    }

    /// 서버 업타임 (초)
    pub fn get_uptime_seconds(&self) -> u64 {
        self.server_start_time.elapsed().as_secs()
    }

    /// 연결 통계 조회
    pub fn get_connection_stats(&self) -> ConnectionStats {
        self.connection_stats.lock().clone()
    }

    fn record_delivery(&self, delivered: bool) {
        self.update_connection_stats(|stats| {
            if delivered {
                stats.total_messages += 1;
            } else {
                stats.failed_messages += 1;
            }
        });
    }

    /// 연결 통계 업데이트
    fn update_connection_stats<F>(&self, update_fn: F)
    where
        F: FnOnce(&mut ConnectionStats),
    {
        update_fn(&mut *self.connection_stats.lock());
    }
}
