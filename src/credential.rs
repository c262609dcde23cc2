use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Raw secret material carried by an authentication token or info
/// (a submitted password, a stored password hash, a bearer token).
///
/// `Credential` can never leak through formatting or persistence:
///
/// - Debug and Display output is always `[REDACTED]`
/// - Serialization always writes an empty value, so a credential can never
///   reach long-lived session state through serde
/// - [`scrub`](Self::scrub) zeroes the bytes in place before dropping them
///
/// # Examples
///
/// ```
/// use route_auth::Credential;
///
/// let mut password = Credential::from("hunter2");
/// assert_eq!(format!("{:?}", password), "[REDACTED]");
/// assert_eq!(password.expose_secret(), b"hunter2");
///
/// password.scrub();
/// assert!(password.is_empty());
/// ```
// BREAKING CHANGE WARNING: Do NOT derive Clone or Copy.
// Credentials must not be duplicated carelessly; a clone would survive a scrub.
#[derive(Default)]
pub struct Credential {
    // BREAKING CHANGE WARNING: This field MUST remain private.
    inner: Vec<u8>,
}

impl Credential {
    /// Wraps secret bytes.
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Returns an empty credential.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Explicitly exposes the secret bytes.
    ///
    /// # Security Warning
    ///
    /// Do not log or display the returned value.
    pub fn expose_secret(&self) -> &[u8] {
        &self.inner
    }

    /// Exposes the secret as UTF-8, if it is valid UTF-8.
    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.inner).ok()
    }

    /// Returns true if no secret material is held.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Zeroes and clears the secret material.
    pub fn scrub(&mut self) {
        self.inner.zeroize();
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.scrub();
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl fmt::Debug for Credential {
    /// BREAKING CHANGE WARNING: This MUST unconditionally return "[REDACTED]".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Credential {
    /// BREAKING CHANGE WARNING: This MUST unconditionally return "[REDACTED]".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_none()
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(Self::empty())
    }
}
