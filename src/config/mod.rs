pub mod catalog;
pub mod error;
pub mod service;

pub use catalog::Catalog;
pub use error::ConfigError;
pub use service::{ServiceConfig, ServiceType};
