pub mod config;
pub mod observability;
pub mod platform;

pub use platform::Platform;
