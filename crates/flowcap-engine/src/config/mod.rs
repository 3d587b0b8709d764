pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{BridgeConfig, CaptureConfig, FlowcapConfig, StoreConfig};
