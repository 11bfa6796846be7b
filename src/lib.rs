// src/lib.rs
//
// Weekly driver-earnings extraction from the supplier dashboard: session
// capture and encrypted storage, panel-scoped DOM extraction, and styled
// report output, exposed as commands the CLI front end composes.
pub mod commands;
pub mod config;
pub mod driver;
pub mod extract;
pub mod report;
pub mod session;
pub mod supplier;
pub mod utils;
