//! Server error types.

use std::net::SocketAddr;

use metis_directory::DirectoryError;
use thiserror::Error;

use crate::http::HttpResponse;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving requests.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or rejected session. The message is returned to the client.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// The access evaluator denied the request.
    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Directory(#[from] DirectoryError),

    /// Session token could not be signed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Bind failed.
    #[error("failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::Unauthorized(_) => 401,
            ServerError::Forbidden => 403,
            ServerError::NotFound
            | ServerError::Directory(DirectoryError::MissingReference { .. }) => 404,
            ServerError::BadRequest(_) => 400,
            ServerError::Directory(DirectoryError::Conflict { .. }) => 409,
            _ => 500,
        }
    }

    /// Converts the error into a `{"error": ...}` response.
    ///
    /// Internal failures are reported generically; their detail only goes
    /// to the log.
    pub fn to_response(&self) -> HttpResponse {
        let status = self.status();
        if status == 500 {
            HttpResponse::error(status, "Internal server error")
        } else {
            HttpResponse::error(status, &self.to_string())
        }
    }
}
