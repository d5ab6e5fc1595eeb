// Survey workflow: ballot validation, duplicate enforcement, stats, results.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::db::Database;
use crate::survey::aggregate::{aggregate, PositionStats};
use crate::survey::ballot::{has_ranked_entry, Ballot, Rankings, Role};
use crate::survey::guard::VoteGuard;

/// Errors surfaced by survey operations. Validation failures and duplicate
/// submissions are distinguishable; everything else is a store fault.
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("invalid ballot: {0}")]
    InvalidBallot(String),

    #[error("a ballot has already been recorded for this client")]
    DuplicateVote,

    #[error("survey store unavailable: {0}")]
    Store(#[from] anyhow::Error),
}

/// Participation counters for the stats endpoint.
///
/// `total_participants` counts every stored row, malformed ones included.
/// `position_participation` has an entry for every role, zero-filled, and
/// counts one per ballot that placed at least one character in that role.
#[derive(Debug, Serialize)]
pub struct SurveyStats {
    pub total_participants: i64,
    pub today_participants: i64,
    pub position_participation: BTreeMap<Role, i64>,
}

/// Full results payload: raw ballots plus aggregated tallies.
#[derive(Debug, Serialize)]
pub struct SurveyResults {
    pub total_participants: i64,
    pub surveys: Vec<Ballot>,
    pub position_stats: PositionStats,
}

/// Coordinates ballot intake and read-side aggregation over one store.
pub struct SurveyService {
    db: Arc<Database>,
    guard: VoteGuard,
}

impl SurveyService {
    pub fn new(db: Arc<Database>) -> Self {
        let guard = VoteGuard::new(Arc::clone(&db));
        Self { db, guard }
    }

    /// Record one ballot for `client_id`. Rejects ballots that place no
    /// character anywhere and clients that already voted. Returns the stored
    /// ballot id.
    pub fn submit(
        &self,
        client_id: &str,
        rankings: &Rankings,
        feedback: Option<&str>,
    ) -> Result<i64, SurveyError> {
        if client_id.is_empty() {
            return Err(SurveyError::InvalidBallot(
                "client identity is required".to_string(),
            ));
        }
        if !has_ranked_entry(rankings) {
            return Err(SurveyError::InvalidBallot(
                "rankings must place at least one character".to_string(),
            ));
        }
        if self.guard.has_voted(client_id)? {
            return Err(SurveyError::DuplicateVote);
        }

        let id = self.db.insert_ballot(client_id, rankings, feedback)?;
        tracing::info!("recorded ballot {id} for client {client_id}");
        Ok(id)
    }

    /// Whether a ballot is already stored for this client identity.
    pub fn check_voted(&self, client_id: &str) -> Result<bool, SurveyError> {
        Ok(self.guard.has_voted(client_id)?)
    }

    pub fn stats(&self) -> Result<SurveyStats, SurveyError> {
        let total_participants = self.db.count_ballots()?;
        let today_participants = self.db.count_ballots_today()?;
        let ballots = self.db.load_ballots()?;

        let mut position_participation: BTreeMap<Role, i64> =
            Role::ALL.iter().map(|role| (*role, 0)).collect();
        for ballot in &ballots {
            for (role, entries) in &ballot.rankings {
                if !entries.is_empty() {
                    *position_participation.entry(*role).or_insert(0) += 1;
                }
            }
        }

        Ok(SurveyStats {
            total_participants,
            today_participants,
            position_participation,
        })
    }

    pub fn results(&self) -> Result<SurveyResults, SurveyError> {
        let total_participants = self.db.count_ballots()?;
        let surveys = self.db.load_ballots()?;
        let directory = self.db.character_directory()?;
        let position_stats = aggregate(&surveys, &directory);

        Ok(SurveyResults {
            total_participants,
            surveys,
            position_stats,
        })
    }
}
