pub mod classifier;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod service;
pub mod store;
