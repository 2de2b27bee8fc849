//! Error types shared by the bot core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

/// Reply payload for a refused request: the text to send and an optional
/// sticker that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refusal {
    pub message: &'static str,
    pub sticker: Option<&'static str>,
    /// Send the sticker as a reply to the offending message instead of a
    /// plain chat message.
    pub sticker_as_reply: bool,
}

impl Refusal {
    /// A text-only refusal.
    pub fn text(message: &'static str) -> Self {
        Refusal {
            message,
            sticker: None,
            sticker_as_reply: false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BotError {
    /// Missing or malformed command arguments. Carries the usage text that
    /// is replied verbatim.
    #[error("{0}")]
    Usage(&'static str),

    /// The caller failed an access check.
    #[error("{}", .0.message)]
    Permission(Refusal),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Duplicate(&'static str),

    /// The media search produced nothing usable on two consecutive queries.
    #[error("no results for {0:?}")]
    NoResults(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("stock lookup error: {0}")]
    Stock(String),
}
