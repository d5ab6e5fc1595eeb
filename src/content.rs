// Catalog record types: characters, teams, tips, events.

use serde::{Deserialize, Serialize};

/// A playable character in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    /// Position tag string (e.g. "PG"). Stored as entered.
    pub position: String,
    /// Generation is real-valued: half generations such as 3.5 exist.
    pub gen: f64,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
    /// Opaque JSON blob of display stats, passed through unparsed.
    pub stats_json: Option<String>,
    pub created_at: String,
}

/// Minimal character record used as the authoritative lookup during ballot
/// aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterBrief {
    pub name: String,
    pub gen: f64,
}

/// Deserializer for patch fields where a JSON `null` must stay
/// distinguishable from an absent key. With `#[serde(default)]`, an absent
/// key stays `None`; a present key becomes `Some(inner)`, null included.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update for a character. Absent fields are left untouched; an
/// explicit `null` clears a nullable column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterPatch {
    pub name: Option<String>,
    pub gen: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub stats_json: Option<Option<String>>,
}

impl CharacterPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gen.is_none()
            && self.avatar_url.is_none()
            && self.description.is_none()
            && self.stats_json.is_none()
    }
}

/// A team record, one per generation in practice.
#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub id: i64,
    pub gen: f64,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: String,
}

/// A strategy/guide article.
#[derive(Debug, Clone, Serialize)]
pub struct Tip {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub cover_url: Option<String>,
    pub summary: Option<String>,
    pub content_md: Option<String>,
    pub updated_at: String,
}

/// Partial update for a tip. Any update refreshes the row's `updated_at`;
/// an explicit `null` clears a nullable column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TipPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub cover_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub content_md: Option<Option<String>>,
}

impl TipPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.cover_url.is_none()
            && self.summary.is_none()
            && self.content_md.is_none()
    }
}

/// A site event announcement.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub cover_url: Option<String>,
    pub time_range: Option<String>,
    pub body_md: Option<String>,
    pub link: Option<String>,
    pub updated_at: String,
}

/// Partial update for an event. Any update refreshes the row's `updated_at`;
/// an explicit `null` clears a nullable column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub cover_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub time_range: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub body_md: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub link: Option<Option<String>>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.cover_url.is_none()
            && self.time_range.is_none()
            && self.body_md.is_none()
            && self.link.is_none()
    }
}

/// Parse a generation filter value from a query string.
///
/// Accepts plain numbers ("3.5") and "gen"-prefixed forms ("gen3.5", "Gen 5").
/// Returns `None` for anything that does not reduce to a number, and callers
/// treat that as "no filter" or "no results" per endpoint.
pub fn parse_gen_filter(raw: &str) -> Option<f64> {
    let lowered = raw.trim().to_lowercase();
    let stripped = lowered.replace("gen", "");
    stripped.trim().parse::<f64>().ok()
}
