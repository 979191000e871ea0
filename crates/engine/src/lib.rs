pub mod dispatch;
pub mod store;
