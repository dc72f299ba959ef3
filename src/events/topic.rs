//! # Subscription topics.
//!
//! A listener subscribes either to an exact event name (`"queue.stalled"`) or
//! to a prefix wildcard (`"kernel.*"`). A bare `"*"` matches every event.

use std::fmt;

/// Parsed subscription pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Topic {
    /// Matches one event name exactly.
    Exact(String),
    /// Matches every event name starting with the stored prefix (dot included).
    Prefix(String),
}

impl Topic {
    /// Parses `"a.b"` as [`Topic::Exact`] and `"a.*"` / `"*"` as [`Topic::Prefix`].
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => Topic::Prefix(prefix.to_string()),
            None => Topic::Exact(pattern.to_string()),
        }
    }

    /// True if an event named `topic` is delivered to this subscription.
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Topic::Exact(name) => name == topic,
            Topic::Prefix(prefix) => topic.starts_with(prefix.as_str()),
        }
    }
}

impl From<&str> for Topic {
    fn from(pattern: &str) -> Self {
        Topic::parse(pattern)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Exact(name) => f.write_str(name),
            Topic::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}
