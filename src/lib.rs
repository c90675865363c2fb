pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod query;
pub mod scheduler;
pub mod translate;
pub mod window;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{Result, ShipperError};
