//! Core proxy engine module

pub mod batch;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod models;
pub mod speech;
