//! 중복 요청 캐시
//!
//! 플레이어별로 `MOVE` 요청 ID → 저장된 응답 envelope을 보관합니다.
//! 같은 요청이 윈도우 안에 다시 오면 저장된 응답을 그대로 재전송합니다.
//! 오래된 항목은 해당 플레이어의 다음 기록 시점에 정리됩니다.

use dashmap::DashMap;
use std::collections::HashMap;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::protocol::Envelope;

/// 기본 중복 제거 윈도우 (5분)
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct DedupEntry {
    recorded_at: Instant,
    response: Envelope,
}

/// 중복 요청 캐시
pub struct DedupCache {
    window: Duration,
    entries: DashMap<String, HashMap<String, DedupEntry>>,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

impl DedupCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 저장된 응답 조회
    pub fn lookup(&self, player_id: &str, request_id: &str) -> Option<Envelope> {
        self.entries
            .get(player_id)
            .and_then(|requests| requests.get(request_id).map(|entry| entry.response.clone()))
    }

    /// 응답 기록 후 윈도우를 벗어난 항목 정리
    pub fn record(&self, player_id: &str, request_id: &str, response: Envelope) {
        self.record_at(player_id, request_id, response, Instant::now());
    }

    /// `now` 기준으로 기록합니다.
    pub fn record_at(&self, player_id: &str, request_id: &str, response: Envelope, now: Instant) {
        let mut requests = self.entries.entry(player_id.to_string()).or_default();
        requests.insert(
            request_id.to_string(),
            DedupEntry {
                recorded_at: now,
                response,
            },
        );

        let before = requests.len();
        let window = self.window;
        requests.retain(|_, entry| now.saturating_duration_since(entry.recorded_at) <= window);

        let purged = before - requests.len();
        if purged > 0 {
            debug!("플레이어 {} 중복 캐시 정리: {}개", player_id, purged);
        }
    }

    /// 플레이어별 보관 중인 요청 수
    pub fn len_for(&self, player_id: &str) -> usize {
        self.entries.get(player_id).map(|requests| requests.len()).unwrap_or(0)
    }
}
