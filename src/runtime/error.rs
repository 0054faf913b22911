use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to reach container runtime at `{path}`: {source}")]
    Unreachable {
        path: PathBuf,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
    #[error("runtime call `{endpoint}` timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    #[error("container vanished during `{endpoint}`")]
    Vanished { endpoint: String },
    #[error("unexpected status {status} from `{endpoint}`")]
    UnexpectedStatus {
        endpoint: String,
        status: hyper::StatusCode,
    },
    #[error("failed to read response body of `{endpoint}`: {source}")]
    Body {
        endpoint: String,
        #[source]
        source: hyper::Error,
    },
    #[error("malformed response from `{endpoint}`: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid request uri for `{endpoint}`: {source}")]
    InvalidUri {
        endpoint: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a runtime failure, carried in snapshot entries
/// and rendered as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The control socket could not be reached.
    Unreachable,
    /// The call did not complete within its timeout budget.
    Timeout,
    /// The container disappeared between enumeration and query.
    Vanished,
    /// The runtime answered with something we could not interpret.
    Protocol,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::Timeout => "timeout",
            Self::Vanished => "vanished",
            Self::Protocol => "protocol",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Vanished { .. } => ErrorKind::Vanished,
            Self::UnexpectedStatus { .. }
            | Self::Body { .. }
            | Self::Decode { .. }
            | Self::InvalidUri { .. } => ErrorKind::Protocol,
        }
    }
}
