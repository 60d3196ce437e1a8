pub mod attendance;
pub mod role;
pub mod store;
pub mod store_user;
