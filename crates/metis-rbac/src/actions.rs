//! Actions an identity may attempt on a container.
//!
//! There are exactly two: reading and writing. Creating a container and
//! creating an item inside a container are both writes.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Action requested against a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read a container or the items inside it.
    Read,

    /// Create a container, or create an item inside one.
    ///
    /// There is no update or delete; writes are append-only.
    Write,
}

impl Action {
    /// Maps an HTTP method to the action it performs.
    ///
    /// `GET` reads, `POST` writes. Other methods, `HEAD` included, have no
    /// mapping.
    pub fn for_http_method(method: &str) -> Option<Action> {
        match method {
            "GET" => Some(Action::Read),
            "POST" => Some(Action::Write),
            _ => None,
        }
    }

    /// Returns the lowercase wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an action name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid action: {0} (expected read or write)")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("read") {
            Ok(Action::Read)
        } else if s.eq_ignore_ascii_case("write") {
            Ok(Action::Write)
        } else {
            Err(ParseActionError(s.to_string()))
        }
    }
}
