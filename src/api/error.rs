use thiserror::Error;

/// Failure of a single market-data request, classified where it is detected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Server answered with a non-2xx status
    #[error("HTTP error: status {status}")]
    HttpStatus { status: u16 },
    /// Request never completed (DNS, connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(String),
    /// Body parsed but lacked the expected fields
    #[error("Invalid response shape: {0}")]
    InvalidResponseShape(String),
}

/// Closed set of user-facing error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Http,
    Connection,
    Generic,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::HttpStatus { .. } => FetchErrorKind::Http,
            FetchError::Transport(_) => FetchErrorKind::Connection,
            FetchError::InvalidResponseShape(_) => FetchErrorKind::Generic,
        }
    }

    pub fn display_text(&self) -> &'static str {
        self.kind().display_text()
    }
}

impl FetchErrorKind {
    /// Text shown in place of the numeric fields
    pub fn display_text(self) -> &'static str {
        match self {
            FetchErrorKind::Http => "API Error",
            FetchErrorKind::Connection => "Connection Error",
            FetchErrorKind::Generic => "Error loading",
        }
    }
}
