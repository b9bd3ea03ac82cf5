//! Secret handling for database passwords
//!
//! Passwords are held in memory that is zeroed on drop and never rendered by
//! `Debug` or `Display`.

use std::fmt;

use zeroize::Zeroizing;

/// A password that zeros its contents on drop
#[derive(Clone)]
pub struct Secret {
    inner: Zeroizing<String>,
}

impl Secret {
    /// Create a new Secret
    pub fn new(s: impl Into<String>) -> Self {
        Self {
            inner: Zeroizing::new(s.into()),
        }
    }

    /// Expose the secret value for handing to a child process
    pub fn expose(&self) -> &str {
        self.inner.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret([REDACTED])");
        assert_eq!(secret.to_string(), "[REDACTED]");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }

    #[test]
    fn test_secret_expose() {
        let secret = Secret::from("p1");
        assert_eq!(secret.expose(), "p1");
        assert!(!secret.is_empty());
        assert!(Secret::new("").is_empty());
    }
}
