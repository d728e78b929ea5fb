pub mod clean;
pub mod setup;
pub mod status;
pub mod usage;
