use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Identifier of a participant inside a room.
///
/// Ids are ordered lexicographically. The ordering is the only input to the
/// negotiation roles of a pair: the greater id sends the initial offer and
/// plays the impolite side during glare, the smaller id is polite.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Whether `self` creates the initial offer towards `remote`.
    pub fn is_initiator_towards(&self, remote: &PeerId) -> bool {
        self.cmp(remote) == Ordering::Greater
    }

    /// Whether `self` yields (rolls back its own offer) when glare happens with `remote`.
    pub fn is_polite_towards(&self, remote: &PeerId) -> bool {
        self.cmp(remote) == Ordering::Less
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.trim().to_owned())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s.trim().to_owned())
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
