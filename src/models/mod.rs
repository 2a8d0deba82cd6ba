// src/models/mod.rs

//! Domain models for the readings service.

mod config;
mod reading;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, ExtractorConfig, ScheduleConfig, ServerConfig, StoreConfig,
};
pub use reading::{MassHeader, ReadingEntry, ReadingRecord, ReadingsCollection, ReadingsPage};
