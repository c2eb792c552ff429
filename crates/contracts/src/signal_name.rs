//! SignalName - cheap-to-clone hierarchical name, and the DestinationKey
//! derived from it.
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Hierarchical signal or destination name of the form `/segment/segment...`.
///
/// Internally uses `Arc<str>`: names are created once when a mapping or
/// router is set up and then cloned on every outbound message.
///
/// # Examples
/// ```
/// use contracts::SignalName;
///
/// let name: SignalName = "/synth1/freq".into();
/// let name2 = name.clone();  // O(1) - just increments ref count
/// assert_eq!(name, name2);
/// assert_eq!(name.as_str(), "/synth1/freq");
/// ```
#[derive(Clone, Default)]
pub struct SignalName(Arc<str>);

impl SignalName {
    /// Create a new SignalName from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shared handle to the name, e.g. for metric labels.
    #[inline]
    pub fn shared(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }

    /// Destination key (first path segment) of this name.
    pub fn destination_key(&self) -> DestinationKey {
        DestinationKey::parse(&self.0)
    }

    /// Name with `suffix` appended, e.g. `/synth1/freq` + `/get`.
    pub fn with_suffix(&self, suffix: &str) -> String {
        let mut out = String::with_capacity(self.0.len() + suffix.len());
        out.push_str(&self.0);
        out.push_str(suffix);
        out
    }
}

impl Deref for SignalName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for SignalName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SignalName {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SignalName {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SignalName {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalName({:?})", self.0)
    }
}

impl PartialEq for SignalName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for SignalName {}

impl PartialEq<str> for SignalName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for SignalName {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Hash for SignalName {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for SignalName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SignalName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

/// First path segment of a destination name, e.g. `/synth1` for
/// `/synth1/freq`.
///
/// Two names address the same destination router iff their keys are equal,
/// whatever sub-path follows the first segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey(Arc<str>);

impl DestinationKey {
    /// Parse the key out of a raw name. The key runs up to (excluding) the
    /// second `/`, or to the end of the name if there is none.
    pub fn parse(name: &str) -> Self {
        let end = match name.get(1..).and_then(|rest| rest.find('/')) {
            Some(pos) => pos + 1,
            None => name.len(),
        };
        Self(Arc::from(&name[..end]))
    }

    /// Get the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
