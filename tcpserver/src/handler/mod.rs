//! TCP 서버 핸들러 레이어
//!
//! 연결별 읽기/쓰기 루프와 수신 메시지 분배를 담당합니다.

pub mod connection_handler;
pub mod message_handler;

pub use connection_handler::ConnectionHandler;
pub use message_handler::{ConnectionState, MessageHandler};
