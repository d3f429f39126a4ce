use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

pub type WarroomResult<T> = Result<T, WarroomError>;

#[derive(Debug, Error)]
pub enum WarroomError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors raised while validating or assembling the dashboard configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing sheet id: {0}")]
    MissingSheetId(String),

    #[error("Invalid cache TTL: {0}")]
    InvalidCacheTtl(String),

    #[error("Invalid locator config: {0}")]
    InvalidLocatorConfig(String),

    #[error("Invalid sheet label: {0}")]
    InvalidSheetLabel(String),
}

/// Errors raised while downloading the exported workbook.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Workbook download failed: {0}")]
    Download(String),

    #[error("Workbook download returned HTTP {status}: {msg}")]
    HttpStatus { status: u16, msg: String },

    #[error("Workbook response body could not be read: {0}")]
    Body(String),
}

/// Errors raised while opening a workbook or reading a sheet out of it.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Workbook is not a readable xlsx file: {0}")]
    InvalidWorkbook(String),

    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("Failed to read sheet '{sheet}': {msg}")]
    ReadFailed { sheet: String, msg: String },
}

/// Errors related to data frames, parsing, and derived reports.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid group key value: '{0}'")]
    InvalidGroupKeyValue(String),

    #[error("Invalid calendar month: year {year}, month {month}")]
    InvalidCalendarMonth { year: i32, month: u32 },

    #[error("Failed date conversion: {0}")]
    DateConversion(String),

    #[error("Failed to parse integer: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("Failed to parse float: {0}")]
    ParseFloat(#[from] ParseFloatError),

    #[error("Failed to parse enum: {0}")]
    ParseEnum(#[from] strum::ParseError),
}

/// Errors related to file I/O and serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Failed to write data: {0}")]
    WriteFailed(String),
}
