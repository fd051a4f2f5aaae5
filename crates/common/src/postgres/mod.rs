mod api_key_repository;
mod client;
mod config;
mod meter_writer;

pub use api_key_repository::*;
pub use client::*;
pub use config::*;
pub use meter_writer::*;
