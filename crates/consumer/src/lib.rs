pub mod consumer;
pub mod kafka;
pub mod source;
