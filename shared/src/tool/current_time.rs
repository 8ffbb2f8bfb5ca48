use chrono::{DateTime, Local, Utc};

pub struct CurrentTime {
    pub current_time: String,
}

impl CurrentTime {
    pub fn new() -> Self {
        let now: DateTime<Local> = Local::now();
        Self {
            current_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// 현재 Unix 타임스탬프 (밀리초)
    ///
    /// 와이어 envelope의 `ts` 필드에 사용합니다.
    pub fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// 현재 Unix 타임스탬프 (초)
    pub fn now_secs() -> i64 {
        Utc::now().timestamp()
    }
}

impl Default for CurrentTime {
    fn default() -> Self {
        Self::new()
    }
}
