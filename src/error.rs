use std::time::Duration;
use thiserror::Error;

/// Creates an anyhow error with the current file and line number
#[macro_export]
macro_rules! file_error {
    ($($arg:tt)*) => {
        ::anyhow::anyhow!(
            "[{}:{}] {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|f| f.to_string_lossy())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*)
        )
    };
}

/// Creates an anyhow error with the current file and line number, and includes a source error
#[macro_export]
macro_rules! file_error_with_source {
    ($source:expr, $($arg:tt)*) => {
        ::anyhow::anyhow!(
            "[{}:{}] {}: {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|f| f.to_string_lossy())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*),
            $source
        )
    };
}

/// Everything that can go wrong in one read-holding-registers exchange.
///
/// Variants split into two families: transport failures (the link itself
/// misbehaved) and protocol failures (the device answered, but not with
/// registers). The acquisition loop treats both as transient.
#[derive(Debug, Error)]
pub enum ModbusError {
    #[error("register count {0} out of range, must be 1..=125")]
    InvalidCount(u16),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error talking to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{phase} to {addr} timed out after {}s", .timeout.as_secs_f64())]
    Timeout {
        addr: String,
        phase: &'static str,
        timeout: Duration,
    },

    #[error("incomplete response: {0} bytes received, header needs 7")]
    TruncatedHeader(usize),

    #[error("no response payload after header")]
    EmptyResponse,

    #[error("exception response: {}", hex(.0))]
    Exception(Vec<u8>),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ModbusError {
    /// Connect, timeout and short-read failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Io { .. }
                | Self::Timeout { .. }
                | Self::TruncatedHeader(_)
                | Self::EmptyResponse
        )
    }

    /// Device-signalled exceptions and frames we could not make sense of.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Exception(_) | Self::Malformed(_))
    }

    /// Exception code from an exception response, if this is one.
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            Self::Exception(raw) => raw.get(1).copied(),
            _ => None,
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
