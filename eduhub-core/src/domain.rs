pub mod config;
pub mod health;
pub mod platform;
pub mod state;

pub use config::*;
pub use health::*;
pub use platform::*;
pub use state::*;
