pub mod aggregator;
pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod payload;
pub mod ramp;
pub mod worker;
