//! Library crate for hostprobe-rs: TCP connect scanning, service labels and a port-based OS guess.
pub mod catalog;
pub mod error;
pub mod fingerprint;
pub mod ports;
pub mod report;
pub mod scanner;
pub mod types;

pub use error::{Result, ScanError};
pub use scanner::{scan, scan_with_cancel, scan_with_observer, ScanConfig};
pub use types::{OsGuess, PortResult, PortState, ScanReport};
