pub mod current_time;
pub mod get_id;

// Re-export commonly used types
pub use current_time::CurrentTime;
pub use get_id::MessageIdGenerator;
