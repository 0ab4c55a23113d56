pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod strategies;
#[cfg(test)]
pub mod test_helpers;
