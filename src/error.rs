use thiserror::Error;

/// Result alias used by the scanning library.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that stop a scan before or while it runs.
///
/// Per-port I/O faults are not errors at this level: they are recorded on the
/// port's [`PortResult`](crate::types::PortResult) and the scan carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Bad port, range, timeout or concurrency value. Nothing was scanned.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The target could not be resolved to any address.
    #[error("host unreachable: {target}")]
    HostUnreachable { target: String },

    /// The user interrupted the scan.
    #[error("scan cancelled by user")]
    Cancelled,
}

impl ScanError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ScanError::InvalidArgument(msg.into())
    }

    /// Process exit code for this error. Cancellation is distinct from faults.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScanError::InvalidArgument(_) => 2,
            ScanError::HostUnreachable { .. } => 1,
            ScanError::Cancelled => 130,
        }
    }
}
