use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ryzen_smu driver not loaded (missing {0})")]
    DriverNotLoaded(PathBuf),

    #[error("Invalid ACPI table: {0}")]
    InvalidTable(String),

    #[error("AOD OperationRegion not found")]
    RegionNotFound,

    #[error("Failed to map physical address 0x{addr:x}: {source}")]
    Map {
        addr: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// A convenient alias
pub type TelemetryResult<T> = Result<T, TelemetryError>;
