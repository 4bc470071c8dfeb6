pub mod config;
pub mod decode;
pub mod error;
pub mod session;
pub mod smu;
pub mod utils;

pub use config::Config;
pub use error::{TelemetryError, TelemetryResult};
pub use session::{Session, Summary};
