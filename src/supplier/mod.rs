// src/supplier/mod.rs
pub mod client;
pub mod models;

pub use models::{DateRange, DriverRecord, SessionState};
