// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("No element matched selector: {0}")]
    NotFound(String),

    #[error("Browser protocol call failed: {0}")]
    Protocol(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("No saved session found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Session file is corrupt or was written with a different key")]
    Crypto,

    #[error("Key provider failed: {0}")]
    Key(String),

    #[error("Session state is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("Session state is unusable: {0}")]
    State(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Could not find driver table.")]
    NoDriverRows,

    #[error("No driver data was extracted.")]
    NoRecords,

    #[error("Browser interaction failed: {0}")]
    Driver(#[from] DriverError),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Could not read report back: {0}")]
    ReadBack(String),

    #[error("Report has no \"{0}\" sheet")]
    MissingSheet(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser driver failed: {0}")]
    Driver(#[from] DriverError),

    #[error("Session vault failed: {0}")]
    Vault(#[from] VaultError),

    #[error("Dashboard request failed: {0}")]
    Client(#[from] ClientError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),
}
