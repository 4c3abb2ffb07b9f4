pub mod analyzers;
pub mod chart;
pub mod config;
pub mod error;
pub mod ingest;
pub mod menu;
pub mod output;
pub mod record;
pub mod roster;
