//! Failure types for the hover-preview pipeline.
//!
//! None of these ever reach the user. Each one maps to a degraded outcome:
//! no preview, a preview without aspect correction, or a silently discarded
//! stale result.

/// The background fetch of a detail page failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success status.
    Status(u16),
    /// The request never produced a response.
    Network(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Status(code) => write!(f, "HTTP {code}"),
            TransportError::Network(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// A listing item does not lead to a usable detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingLink,
    InvalidHref { href: String, reason: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MissingLink => write!(f, "item has no link with an href"),
            ParseError::InvalidHref { href, reason } => {
                write!(f, "cannot resolve href {href:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// A sprite or preview image could not be loaded and decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLoadError {
    Status(u16),
    Network(String),
    Decode(String),
}

impl std::fmt::Display for ImageLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageLoadError::Status(code) => write!(f, "image request failed: HTTP {code}"),
            ImageLoadError::Network(msg) => write!(f, "image request failed: {msg}"),
            ImageLoadError::Decode(msg) => write!(f, "image decode failed: {msg}"),
        }
    }
}

impl std::error::Error for ImageLoadError {}

/// An async continuation found that its hover session is no longer current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleSession {
    pub stage: &'static str,
}

impl std::fmt::Display for StaleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hover session went stale at stage={}", self.stage)
    }
}

impl std::error::Error for StaleSession {}
