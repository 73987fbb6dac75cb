pub mod config;
pub mod error;
pub mod rule;

pub use config::Config;
pub use error::*;
pub use rule::*;
