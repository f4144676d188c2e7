mod bridge;
mod config;
mod error;

pub use bridge::HttpPersistenceBridge;
pub use config::BridgeConfig;
pub use error::BridgeError;
