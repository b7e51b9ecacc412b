pub mod cancellation;
pub mod channel;
pub mod sink;
