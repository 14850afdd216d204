pub mod config;
pub mod consul;
pub mod controller;
pub mod fleet;
pub mod server;

// Re-export for main.rs
pub use crate::config::{Config, LogFormat};
pub use crate::controller::{Reconciler, Verdict};
