// Pipeline configuration: JSON settings file and defaults.

pub mod store;
pub mod types;
