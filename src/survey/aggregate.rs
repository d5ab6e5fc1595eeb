// Vote aggregation: per-role, per-character tallies across stored ballots.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::content::CharacterBrief;
use crate::survey::ballot::{Ballot, Role};

/// Accumulated results for one character within one role.
///
/// `rankings` keeps every rank the character received (1 = first place), in
/// ballot order. `avg_rank` is `total_score / total_votes` rounded to two
/// decimals, so lower is better.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterStat {
    pub name: String,
    pub gen: f64,
    pub total_votes: u32,
    pub total_score: u32,
    pub rankings: Vec<u32>,
    pub avg_rank: f64,
}

/// Role -> character id -> accumulated stat. BTreeMaps keep the JSON output
/// stable across runs.
pub type PositionStats = BTreeMap<Role, BTreeMap<i64, CharacterStat>>;

/// Fold ballots into per-role, per-character tallies.
///
/// A character's rank is its 1-based position in the ballot's list. Name and
/// gen come from `directory` when the id is known there; otherwise the
/// ballot's embedded values are taken, first occurrence winning. Every list
/// occurrence counts, including repeats of the same id within one list.
pub fn aggregate(ballots: &[Ballot], directory: &HashMap<i64, CharacterBrief>) -> PositionStats {
    let mut stats = PositionStats::new();

    for ballot in ballots {
        for (role, entries) in &ballot.rankings {
            for (index, entry) in entries.iter().enumerate() {
                let rank = (index + 1) as u32;
                let stat = stats
                    .entry(*role)
                    .or_default()
                    .entry(entry.id)
                    .or_insert_with(|| {
                        let (name, gen) = match directory.get(&entry.id) {
                            Some(brief) => (brief.name.clone(), brief.gen),
                            None => (entry.name.clone(), entry.gen),
                        };
                        CharacterStat {
                            name,
                            gen,
                            total_votes: 0,
                            total_score: 0,
                            rankings: Vec::new(),
                            avg_rank: 0.0,
                        }
                    });
                stat.total_votes += 1;
                stat.total_score += rank;
                stat.rankings.push(rank);
            }
        }
    }

    for by_character in stats.values_mut() {
        for stat in by_character.values_mut() {
            if stat.total_votes > 0 {
                stat.avg_rank = round2(f64::from(stat.total_score) / f64::from(stat.total_votes));
            }
        }
    }

    stats
}

/// Round to two decimal places, half away from zero.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
