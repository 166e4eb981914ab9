pub mod config;
pub mod error;
pub mod listings;
pub mod store;
pub mod telemetry;
pub mod wizard;
