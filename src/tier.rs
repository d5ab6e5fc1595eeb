// Tier scoring: generation decay with per-character adjustments.

use serde::Serialize;

use crate::config::TierScoringConfig;
use crate::content::Character;

/// One scored row on a tier board, ready for the wire.
#[derive(Debug, Clone, Serialize)]
pub struct TierEntry {
    pub id: i64,
    pub name: String,
    pub avatar_url: Option<String>,
    pub position: String,
    pub gen: f64,
    pub score: f64,
}

/// Score every character and sort best first.
///
/// score = base_score - (gen - 1) * gen_step + adjustment, clamped to
/// [min_score, max_score]. Adjustments are looked up by character name;
/// absent names adjust by zero. Ties break toward the older row.
pub fn compute_tier(characters: &[Character], cfg: &TierScoringConfig) -> Vec<TierEntry> {
    let mut entries: Vec<TierEntry> = characters
        .iter()
        .map(|character| {
            let adjustment = cfg.adjustments.get(&character.name).copied().unwrap_or(0.0);
            let raw = cfg.base_score - (character.gen - 1.0) * cfg.gen_step + adjustment;
            TierEntry {
                id: character.id,
                name: character.name.clone(),
                avatar_url: character.avatar_url.clone(),
                position: character.position.clone(),
                gen: character.gen,
                score: raw.clamp(cfg.min_score, cfg.max_score),
            }
        })
        .collect();

    entries.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    entries
}
