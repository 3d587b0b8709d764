pub mod background;
pub mod capture;
pub mod classifier;
pub mod clipboard;
pub mod config;
pub mod favorites;
pub mod router;
pub mod settings;
pub mod store;
pub mod synthesizer;
pub mod template_source;
pub mod transfer;

pub use flowcap_common::action;
pub use flowcap_common::events;
pub use flowcap_common::protocol;
