pub mod config;
pub mod gate;

pub use config::ConfigError;
pub use gate::GateError;
