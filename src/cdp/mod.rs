pub mod channel;
pub mod discovery;
pub mod error;
pub mod protocol;

pub use channel::{COMMAND_TIMEOUT, CdpChannel, PendingTable};
pub use discovery::{ScannerConfig, TargetScanner};
pub use error::CdpError;
