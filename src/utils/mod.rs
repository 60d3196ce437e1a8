pub mod log_cache;
pub mod session_locks;
