pub mod config;
pub mod metrics;
pub mod prices;
pub mod service;
pub mod staging;

pub mod error;
pub mod logger;
