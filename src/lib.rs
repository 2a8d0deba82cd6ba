// src/lib.rs

//! Daily readings scraper, cache and HTTP service.

pub mod error;
pub mod models;
pub mod scheduler;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
