pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::{Config, StoreConfig};
pub use error::HunterError;
pub use types::*;
