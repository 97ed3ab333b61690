//! Error types for sprint deck generation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a sprint deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read, or write a file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is missing, malformed, or incomplete.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tracker rejected the session token.
    #[error("Could not get JIRA data. Check your JSESSIONID, it may have expired.")]
    SessionExpired,

    /// The tracker answered with a non-success status other than 401.
    #[error("Tracker returned {status}: {body}")]
    TrackerStatus { status: u16, body: String },

    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The tracker response was not valid board data.
    #[error("Invalid tracker response: {0}")]
    InvalidResponse(String),

    /// The board data contains no sprint.
    #[error("Board data contains no active sprint")]
    NoActiveSprint,

    /// An issue references an epic that is not in the board data.
    #[error("Issue {issue} references unknown epic {epic}")]
    UnknownEpic { issue: String, epic: String },

    /// An issue references a status that is not in the board data.
    #[error("Issue {issue} references unknown status {status}")]
    UnknownStatus { issue: String, status: String },

    /// The template presentation cannot host the generated slides.
    #[error("Template error: {0}")]
    Template(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    Xml(String),
}

impl Error {
    /// Whether this error came from loading or validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
