// Ballot representation: roles, character references, submitted rankings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position tags a ballot may rank characters under. The set is closed:
/// a submission carrying any other tag is rejected as malformed, and the
/// stats view zero-fills exactly these six.
///
/// Declaration order drives `BTreeMap` iteration and therefore the key
/// order of every JSON view built from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "C")]
    Center,
    #[serde(rename = "PF")]
    PowerForward,
    #[serde(rename = "SF")]
    SmallForward,
    #[serde(rename = "SG")]
    ShootingGuard,
    #[serde(rename = "PG")]
    PointGuard,
    #[serde(rename = "SW")]
    Swingman,
}

impl Role {
    /// Every role, in stats display order.
    pub const ALL: [Role; 6] = [
        Role::Center,
        Role::PowerForward,
        Role::SmallForward,
        Role::ShootingGuard,
        Role::PointGuard,
        Role::Swingman,
    ];

    /// Parse a position tag into a Role. Accepts any casing; returns None
    /// for tags outside the closed set.
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" => Some(Role::Center),
            "PF" => Some(Role::PowerForward),
            "SF" => Some(Role::SmallForward),
            "SG" => Some(Role::ShootingGuard),
            "PG" => Some(Role::PointGuard),
            "SW" => Some(Role::Swingman),
            _ => None,
        }
    }

    /// Return the wire tag for this role.
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Center => "C",
            Role::PowerForward => "PF",
            Role::SmallForward => "SF",
            Role::ShootingGuard => "SG",
            Role::PointGuard => "PG",
            Role::Swingman => "SW",
        }
    }
}

/// A character as referenced inside a ballot's ranked list. `name` and `gen`
/// are the submitter's snapshot; the aggregator prefers the catalog record
/// for the same id and falls back to these when the character was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gen: f64,
}

/// Role-keyed ranked character lists. List position is the rank: index 0 is
/// first place.
pub type Rankings = BTreeMap<Role, Vec<CharacterRef>>;

/// A stored survey response.
#[derive(Debug, Clone, Serialize)]
pub struct Ballot {
    pub id: i64,
    pub client_id: String,
    pub rankings: Rankings,
    pub feedback: Option<String>,
    /// Store-assigned timestamp, passed through as text.
    pub created_at: String,
}

/// Whether a rankings mapping actually ranks anything: at least one role
/// with at least one entry. `{"C": []}` does not count.
pub fn has_ranked_entry(rankings: &Rankings) -> bool {
    rankings.values().any(|list| !list.is_empty())
}
