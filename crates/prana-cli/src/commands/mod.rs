pub mod breathe;
pub mod config;
pub mod stages;
pub mod stats;
