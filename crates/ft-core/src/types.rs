//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a remote host under management
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hostname(pub String);

impl Hostname {
    /// Create a new hostname
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the raw hostname string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Hostname {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Hostname {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_display() {
        let hostname = Hostname::new("web-01");
        assert_eq!(format!("{}", hostname), "web-01");
        assert_eq!(hostname.as_str(), "web-01");
    }

    #[test]
    fn test_hostname_equality() {
        assert_eq!(Hostname::from("a"), Hostname::new("a"));
        assert_ne!(Hostname::from("a"), Hostname::from("b"));
    }
}
