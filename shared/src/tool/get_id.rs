//! 메시지 ID 생성 유틸리티

use uuid::Uuid;

/// 메시지 ID 생성기
///
/// 서버가 보내는 모든 envelope의 `id` 필드를 채웁니다.
/// UUID v4를 사용하므로 별도의 공유 카운터가 필요 없습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageIdGenerator;

impl MessageIdGenerator {
    /// 새로운 메시지 ID를 생성합니다.
    pub fn next_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_generation() {
        let a = MessageIdGenerator::next_id();
        let b = MessageIdGenerator::next_id();

        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
