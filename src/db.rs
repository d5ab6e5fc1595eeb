// SQLite persistence layer for ballots, catalog records, and media metadata.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};

use crate::content::{
    Character, CharacterBrief, CharacterPatch, Event, EventPatch, Team, Tip, TipPatch,
};
use crate::media::{GenerationImage, ImageRecord};
use crate::survey::ballot::{Ballot, Rankings};

/// SQLite-backed persistence for survey ballots, the character/team/tip/event
/// catalog, uploaded-image metadata, and tier-board snapshots.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS surveys (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id     TEXT NOT NULL,
                rankings_json TEXT NOT NULL,
                feedback      TEXT,
                created_at    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS characters (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                position    TEXT NOT NULL DEFAULT 'C',
                gen         REAL NOT NULL,
                avatar_url  TEXT,
                description TEXT,
                stats_json  TEXT,
                created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS teams (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                gen         REAL NOT NULL,
                name        TEXT NOT NULL,
                description TEXT,
                logo_url    TEXT,
                created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS tips (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                title      TEXT NOT NULL,
                category   TEXT NOT NULL,
                cover_url  TEXT,
                summary    TEXT,
                content_md TEXT,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS events (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                title      TEXT NOT NULL,
                cover_url  TEXT,
                time_range TEXT,
                body_md    TEXT,
                link       TEXT,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS images (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                filename      TEXT NOT NULL,
                original_name TEXT,
                file_size     INTEGER NOT NULL DEFAULT 0,
                file_type     TEXT,
                upload_time   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS generation_images (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                gen        REAL NOT NULL,
                filename   TEXT NOT NULL,
                url        TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS rankings (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                category   TEXT NOT NULL,
                items_json TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            ",
        )
        .context("failed to create database schema")?;

        // Index for the duplicate-vote count; submissions filter on client_id
        // every time.
        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_surveys_client_id ON surveys(client_id);",
        )
        .context("failed to create client_id index")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Surveys
    // ------------------------------------------------------------------

    /// Append one ballot. Rankings are stored as a JSON-encoded TEXT column;
    /// the timestamp is assigned by SQLite. Returns the new row id.
    ///
    /// Duplicate-vote enforcement lives in the service layer: this method
    /// never refuses a row.
    pub fn insert_ballot(
        &self,
        client_id: &str,
        rankings: &Rankings,
        feedback: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn();
        let rankings_json =
            serde_json::to_string(rankings).context("failed to serialize rankings")?;
        let id: i64 = conn
            .query_row(
                "INSERT INTO surveys (client_id, rankings_json, feedback)
                 VALUES (?1, ?2, ?3)
                 RETURNING id",
                params![client_id, rankings_json, feedback],
                |row| row.get(0),
            )
            .context("failed to insert ballot")?;
        Ok(id)
    }

    /// Number of stored ballots for one client identity.
    pub fn count_ballots_for_client(&self, client_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM surveys WHERE client_id = ?1",
                params![client_id],
                |row| row.get(0),
            )
            .context("failed to count ballots for client")?;
        Ok(count)
    }

    /// Total number of stored ballots, malformed rows included.
    pub fn count_ballots(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM surveys", [], |row| row.get(0))
            .context("failed to count ballots")?;
        Ok(count)
    }

    /// Number of ballots created on the store's current calendar date. Both
    /// sides of the comparison are evaluated by SQLite, so the store's clock
    /// is the single time authority.
    pub fn count_ballots_today(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM surveys WHERE DATE(created_at) = DATE('now')",
                [],
                |row| row.get(0),
            )
            .context("failed to count today's ballots")?;
        Ok(count)
    }

    /// Load all ballots, newest first. Rows whose stored rankings no longer
    /// parse are skipped with a warning rather than failing the read.
    pub fn load_ballots(&self) -> Result<Vec<Ballot>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, client_id, rankings_json, feedback, created_at
                 FROM surveys ORDER BY created_at DESC, id DESC",
            )
            .context("failed to prepare load_ballots query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .context("failed to query ballots")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map ballot rows")?;

        let mut ballots = Vec::with_capacity(rows.len());
        for (id, client_id, rankings_json, feedback, created_at) in rows {
            match serde_json::from_str::<Rankings>(&rankings_json) {
                Ok(rankings) => ballots.push(Ballot {
                    id,
                    client_id,
                    rankings,
                    feedback,
                    created_at,
                }),
                Err(err) => {
                    tracing::warn!("skipping ballot {id}: malformed rankings JSON: {err}");
                }
            }
        }
        Ok(ballots)
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    fn row_to_character(row: &rusqlite::Row<'_>) -> rusqlite::Result<Character> {
        Ok(Character {
            id: row.get(0)?,
            name: row.get(1)?,
            position: row.get(2)?,
            gen: row.get(3)?,
            avatar_url: row.get(4)?,
            description: row.get(5)?,
            stats_json: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    /// List characters, optionally filtered by generation and/or position,
    /// ordered by generation then newest first.
    pub fn list_characters(
        &self,
        gen: Option<f64>,
        position: Option<&str>,
    ) -> Result<Vec<Character>> {
        let conn = self.conn();
        let mut sql = String::from(
            "SELECT id, name, position, gen, avatar_url, description, stats_json, created_at
             FROM characters",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(g) = &gen {
            clauses.push("gen = ?");
            args.push(g);
        }
        if let Some(p) = &position {
            clauses.push("position = ?");
            args.push(p);
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY gen ASC, id DESC");

        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare list_characters query")?;
        let characters = stmt
            .query_map(&args[..], Self::row_to_character)
            .context("failed to query characters")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map character rows")?;
        Ok(characters)
    }

    /// Insert a character and return its row id.
    pub fn insert_character(
        &self,
        name: &str,
        position: &str,
        gen: f64,
        avatar_url: Option<&str>,
        description: Option<&str>,
        stats_json: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO characters (name, position, gen, avatar_url, description, stats_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id",
                params![name, position, gen, avatar_url, description, stats_json],
                |row| row.get(0),
            )
            .context("failed to insert character")?;
        Ok(id)
    }

    /// Fetch one character by id.
    pub fn get_character(&self, id: i64) -> Result<Option<Character>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, position, gen, avatar_url, description, stats_json, created_at
                 FROM characters WHERE id = ?1",
            )
            .context("failed to prepare get_character query")?;
        let mut rows = stmt
            .query_map(params![id], Self::row_to_character)
            .context("failed to query character")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read character row")?)),
            None => Ok(None),
        }
    }

    /// Apply a partial update. Only the patch's present fields are written;
    /// a present-but-null nullable field writes NULL, and an empty patch
    /// touches nothing and reports zero rows.
    pub fn update_character(&self, id: i64, patch: &CharacterPatch) -> Result<usize> {
        if patch.is_empty() {
            return Ok(0);
        }
        let conn = self.conn();
        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(name) = &patch.name {
            sets.push("name = ?");
            args.push(name);
        }
        if let Some(gen) = &patch.gen {
            sets.push("gen = ?");
            args.push(gen);
        }
        if let Some(avatar_url) = &patch.avatar_url {
            sets.push("avatar_url = ?");
            args.push(avatar_url);
        }
        if let Some(description) = &patch.description {
            sets.push("description = ?");
            args.push(description);
        }
        if let Some(stats_json) = &patch.stats_json {
            sets.push("stats_json = ?");
            args.push(stats_json);
        }
        args.push(&id);

        let sql = format!("UPDATE characters SET {} WHERE id = ?", sets.join(", "));
        let changed = conn
            .execute(&sql, &args[..])
            .context("failed to update character")?;
        Ok(changed)
    }

    /// Point a character's avatar at a display URL.
    pub fn update_character_avatar(&self, id: i64, url: &str) -> Result<usize> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE characters SET avatar_url = ?1 WHERE id = ?2",
                params![url, id],
            )
            .context("failed to update character avatar")?;
        Ok(changed)
    }

    /// Delete a character. Returns the number of rows removed (0 or 1).
    pub fn delete_character(&self, id: i64) -> Result<usize> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM characters WHERE id = ?1", params![id])
            .context("failed to delete character")?;
        Ok(changed)
    }

    /// Authoritative id -> (name, gen) lookup used during aggregation.
    pub fn character_directory(&self) -> Result<HashMap<i64, CharacterBrief>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, name, gen FROM characters")
            .context("failed to prepare character_directory query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    CharacterBrief {
                        name: row.get(1)?,
                        gen: row.get(2)?,
                    },
                ))
            })
            .context("failed to query character directory")?
            .collect::<std::result::Result<HashMap<_, _>, _>>()
            .context("failed to map character directory rows")?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    fn row_to_team(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
        Ok(Team {
            id: row.get(0)?,
            gen: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            logo_url: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    /// List teams ordered by generation, optionally filtered to one.
    pub fn list_teams(&self, gen: Option<f64>) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut sql = String::from(
            "SELECT id, gen, name, description, logo_url, created_at FROM teams",
        );
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(g) = &gen {
            sql.push_str(" WHERE gen = ?");
            args.push(g);
        }
        sql.push_str(" ORDER BY gen ASC, id ASC");

        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare list_teams query")?;
        let teams = stmt
            .query_map(&args[..], Self::row_to_team)
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team rows")?;
        Ok(teams)
    }

    pub fn insert_team(
        &self,
        gen: f64,
        name: &str,
        description: Option<&str>,
        logo_url: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO teams (gen, name, description, logo_url)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                params![gen, name, description, logo_url],
                |row| row.get(0),
            )
            .context("failed to insert team")?;
        Ok(id)
    }

    pub fn get_team(&self, id: i64) -> Result<Option<Team>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, gen, name, description, logo_url, created_at
                 FROM teams WHERE id = ?1",
            )
            .context("failed to prepare get_team query")?;
        let mut rows = stmt
            .query_map(params![id], Self::row_to_team)
            .context("failed to query team")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read team row")?)),
            None => Ok(None),
        }
    }

    /// Full update: every column is rewritten.
    pub fn update_team(
        &self,
        id: i64,
        gen: f64,
        name: &str,
        description: Option<&str>,
        logo_url: Option<&str>,
    ) -> Result<usize> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE teams SET gen = ?1, name = ?2, description = ?3, logo_url = ?4
                 WHERE id = ?5",
                params![gen, name, description, logo_url, id],
            )
            .context("failed to update team")?;
        Ok(changed)
    }

    pub fn delete_team(&self, id: i64) -> Result<usize> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM teams WHERE id = ?1", params![id])
            .context("failed to delete team")?;
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Tips
    // ------------------------------------------------------------------

    fn row_to_tip(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tip> {
        Ok(Tip {
            id: row.get(0)?,
            title: row.get(1)?,
            category: row.get(2)?,
            cover_url: row.get(3)?,
            summary: row.get(4)?,
            content_md: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    /// List tips, most recently updated first, optionally by category.
    pub fn list_tips(&self, category: Option<&str>) -> Result<Vec<Tip>> {
        let conn = self.conn();
        let mut sql = String::from(
            "SELECT id, title, category, cover_url, summary, content_md, updated_at FROM tips",
        );
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(c) = &category {
            sql.push_str(" WHERE category = ?");
            args.push(c);
        }
        sql.push_str(" ORDER BY updated_at DESC, id DESC");

        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare list_tips query")?;
        let tips = stmt
            .query_map(&args[..], Self::row_to_tip)
            .context("failed to query tips")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map tip rows")?;
        Ok(tips)
    }

    pub fn insert_tip(
        &self,
        title: &str,
        category: &str,
        cover_url: Option<&str>,
        summary: Option<&str>,
        content_md: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO tips (title, category, cover_url, summary, content_md)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                params![title, category, cover_url, summary, content_md],
                |row| row.get(0),
            )
            .context("failed to insert tip")?;
        Ok(id)
    }

    /// Apply a partial update and refresh `updated_at`. A present-but-null
    /// nullable field writes NULL; an empty patch touches nothing.
    pub fn update_tip(&self, id: i64, patch: &TipPatch) -> Result<usize> {
        if patch.is_empty() {
            return Ok(0);
        }
        let conn = self.conn();
        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(title) = &patch.title {
            sets.push("title = ?");
            args.push(title);
        }
        if let Some(category) = &patch.category {
            sets.push("category = ?");
            args.push(category);
        }
        if let Some(cover_url) = &patch.cover_url {
            sets.push("cover_url = ?");
            args.push(cover_url);
        }
        if let Some(summary) = &patch.summary {
            sets.push("summary = ?");
            args.push(summary);
        }
        if let Some(content_md) = &patch.content_md {
            sets.push("content_md = ?");
            args.push(content_md);
        }
        args.push(&id);

        let sql = format!(
            "UPDATE tips SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            sets.join(", ")
        );
        let changed = conn
            .execute(&sql, &args[..])
            .context("failed to update tip")?;
        Ok(changed)
    }

    pub fn delete_tip(&self, id: i64) -> Result<usize> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM tips WHERE id = ?1", params![id])
            .context("failed to delete tip")?;
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
        Ok(Event {
            id: row.get(0)?,
            title: row.get(1)?,
            cover_url: row.get(2)?,
            time_range: row.get(3)?,
            body_md: row.get(4)?,
            link: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    /// List events, most recently updated first.
    pub fn list_events(&self) -> Result<Vec<Event>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, cover_url, time_range, body_md, link, updated_at
                 FROM events ORDER BY updated_at DESC, id DESC",
            )
            .context("failed to prepare list_events query")?;
        let events = stmt
            .query_map([], Self::row_to_event)
            .context("failed to query events")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map event rows")?;
        Ok(events)
    }

    pub fn insert_event(
        &self,
        title: &str,
        cover_url: Option<&str>,
        time_range: Option<&str>,
        body_md: Option<&str>,
        link: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO events (title, cover_url, time_range, body_md, link)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                params![title, cover_url, time_range, body_md, link],
                |row| row.get(0),
            )
            .context("failed to insert event")?;
        Ok(id)
    }

    /// Apply a partial update and refresh `updated_at`. A present-but-null
    /// nullable field writes NULL; an empty patch touches nothing.
    pub fn update_event(&self, id: i64, patch: &EventPatch) -> Result<usize> {
        if patch.is_empty() {
            return Ok(0);
        }
        let conn = self.conn();
        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(title) = &patch.title {
            sets.push("title = ?");
            args.push(title);
        }
        if let Some(cover_url) = &patch.cover_url {
            sets.push("cover_url = ?");
            args.push(cover_url);
        }
        if let Some(time_range) = &patch.time_range {
            sets.push("time_range = ?");
            args.push(time_range);
        }
        if let Some(body_md) = &patch.body_md {
            sets.push("body_md = ?");
            args.push(body_md);
        }
        if let Some(link) = &patch.link {
            sets.push("link = ?");
            args.push(link);
        }
        args.push(&id);

        let sql = format!(
            "UPDATE events SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            sets.join(", ")
        );
        let changed = conn
            .execute(&sql, &args[..])
            .context("failed to update event")?;
        Ok(changed)
    }

    pub fn delete_event(&self, id: i64) -> Result<usize> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM events WHERE id = ?1", params![id])
            .context("failed to delete event")?;
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Uploaded images
    // ------------------------------------------------------------------

    fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageRecord> {
        Ok(ImageRecord {
            id: row.get(0)?,
            filename: row.get(1)?,
            original_name: row.get(2)?,
            file_size: row.get(3)?,
            file_type: row.get(4)?,
            upload_time: row.get(5)?,
        })
    }

    pub fn insert_image(
        &self,
        filename: &str,
        original_name: Option<&str>,
        file_size: i64,
        file_type: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO images (filename, original_name, file_size, file_type)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                params![filename, original_name, file_size, file_type],
                |row| row.get(0),
            )
            .context("failed to insert image record")?;
        Ok(id)
    }

    pub fn count_images(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .context("failed to count images")?;
        Ok(count)
    }

    /// One page of image records, newest upload first.
    pub fn list_images(&self, limit: i64, offset: i64) -> Result<Vec<ImageRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, filename, original_name, file_size, file_type, upload_time
                 FROM images ORDER BY upload_time DESC, id DESC LIMIT ?1 OFFSET ?2",
            )
            .context("failed to prepare list_images query")?;
        let images = stmt
            .query_map(params![limit, offset], Self::row_to_image)
            .context("failed to query images")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map image rows")?;
        Ok(images)
    }

    pub fn get_image(&self, id: i64) -> Result<Option<ImageRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, filename, original_name, file_size, file_type, upload_time
                 FROM images WHERE id = ?1",
            )
            .context("failed to prepare get_image query")?;
        let mut rows = stmt
            .query_map(params![id], Self::row_to_image)
            .context("failed to query image")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read image row")?)),
            None => Ok(None),
        }
    }

    pub fn delete_image(&self, id: i64) -> Result<usize> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM images WHERE id = ?1", params![id])
            .context("failed to delete image record")?;
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Generation images
    // ------------------------------------------------------------------

    fn row_to_generation_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<GenerationImage> {
        Ok(GenerationImage {
            id: row.get(0)?,
            gen: row.get(1)?,
            filename: row.get(2)?,
            url: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    /// List generation images, newest upload first, optionally one
    /// generation only.
    pub fn list_generation_images(&self, gen: Option<f64>) -> Result<Vec<GenerationImage>> {
        let conn = self.conn();
        let mut sql = String::from(
            "SELECT id, gen, filename, url, created_at FROM generation_images",
        );
        let mut args: Vec<&dyn ToSql> = Vec::new();
        if let Some(g) = &gen {
            sql.push_str(" WHERE gen = ?");
            args.push(g);
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare list_generation_images query")?;
        let images = stmt
            .query_map(&args[..], Self::row_to_generation_image)
            .context("failed to query generation images")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map generation image rows")?;
        Ok(images)
    }

    pub fn insert_generation_image(&self, gen: f64, filename: &str, url: &str) -> Result<i64> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO generation_images (gen, filename, url)
                 VALUES (?1, ?2, ?3)
                 RETURNING id",
                params![gen, filename, url],
                |row| row.get(0),
            )
            .context("failed to insert generation image")?;
        Ok(id)
    }

    pub fn get_generation_image(&self, id: i64) -> Result<Option<GenerationImage>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, gen, filename, url, created_at
                 FROM generation_images WHERE id = ?1",
            )
            .context("failed to prepare get_generation_image query")?;
        let mut rows = stmt
            .query_map(params![id], Self::row_to_generation_image)
            .context("failed to query generation image")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read generation image row")?)),
            None => Ok(None),
        }
    }

    pub fn delete_generation_image(&self, id: i64) -> Result<usize> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM generation_images WHERE id = ?1", params![id])
            .context("failed to delete generation image")?;
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Tier-board snapshots
    // ------------------------------------------------------------------

    /// Most recent stored snapshot for a category as (items_json, updated_at).
    pub fn latest_snapshot(&self, category: &str) -> Result<Option<(String, String)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT items_json, updated_at FROM rankings
                 WHERE category = ?1 ORDER BY updated_at DESC, id DESC LIMIT 1",
            )
            .context("failed to prepare latest_snapshot query")?;
        let mut rows = stmt
            .query_map(params![category], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("failed to query snapshot")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read snapshot row")?)),
            None => Ok(None),
        }
    }

    /// Append a new snapshot row for a category. History is retained; reads
    /// always take the newest row.
    pub fn insert_snapshot(&self, category: &str, items_json: &str) -> Result<i64> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO rankings (category, items_json)
                 VALUES (?1, ?2)
                 RETURNING id",
                params![category, items_json],
                |row| row.get(0),
            )
            .context("failed to insert snapshot")?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Sample data
    // ------------------------------------------------------------------

    /// Populate empty catalog tables with sample rows in one transaction.
    /// Tables that already hold data are left untouched, so running this on
    /// every startup is safe.
    pub fn seed_sample_data(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin seed transaction")?;

        let character_count: i64 = tx
            .query_row("SELECT COUNT(*) FROM characters", [], |row| row.get(0))
            .context("failed to count characters for seeding")?;
        if character_count == 0 {
            let positions = ["PG", "SG", "SF", "PF", "C"];
            for g in 1..=9u32 {
                for i in 1..=3u32 {
                    let position = positions[((g + i) as usize) % positions.len()];
                    tx.execute(
                        "INSERT INTO characters (name, position, gen, description, stats_json)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            format!("Sample {g}-{i}"),
                            position,
                            f64::from(g),
                            format!("Sample generation {g} character"),
                            r#"{"shoot":80,"pass":75,"defense":70,"speed":78}"#,
                        ],
                    )
                    .context("failed to seed character")?;
                }
            }
        }

        let snapshot_count: i64 = tx
            .query_row("SELECT COUNT(*) FROM rankings", [], |row| row.get(0))
            .context("failed to count snapshots for seeding")?;
        if snapshot_count == 0 {
            for category in ["C", "PF", "PG"] {
                let items: Vec<serde_json::Value> = (0..5)
                    .map(|i| {
                        serde_json::json!({
                            "name": format!("{category} Top {}", i + 1),
                            "score": 95 - i,
                        })
                    })
                    .collect();
                tx.execute(
                    "INSERT INTO rankings (category, items_json) VALUES (?1, ?2)",
                    params![category, serde_json::Value::Array(items).to_string()],
                )
                .context("failed to seed snapshot")?;
            }
        }

        let tip_count: i64 = tx
            .query_row("SELECT COUNT(*) FROM tips", [], |row| row.get(0))
            .context("failed to count tips for seeding")?;
        if tip_count == 0 {
            tx.execute(
                "INSERT INTO tips (title, category, summary, content_md)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    "Shooting Basics",
                    "PG",
                    "Release timing and arc fundamentals",
                    "## Shooting Basics\n\nHold the release until the peak of the jump.",
                ],
            )
            .context("failed to seed tip")?;
            tx.execute(
                "INSERT INTO tips (title, category, summary, content_md)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    "Post Footwork",
                    "C",
                    "Sealing and pivoting under the rim",
                    "## Post Footwork\n\nEstablish position before the entry pass.",
                ],
            )
            .context("failed to seed tip")?;
        }

        let event_count: i64 = tx
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .context("failed to count events for seeding")?;
        if event_count == 0 {
            tx.execute(
                "INSERT INTO events (title, time_range, body_md)
                 VALUES (?1, ?2, ?3)",
                params![
                    "Season Opening Tournament",
                    "2026-09-01 ~ 2026-09-07",
                    "Ranked doubles bracket with generation-capped divisions.",
                ],
            )
            .context("failed to seed event")?;
        }

        let team_count: i64 = tx
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))
            .context("failed to count teams for seeding")?;
        if team_count == 0 {
            let team_names = [
                "Thunder", "Storm", "Blaze", "Frost", "Stellar", "Dragonsoul", "Phantom",
                "Daybreak", "Eternal",
            ];
            for (idx, name) in team_names.iter().enumerate() {
                tx.execute(
                    "INSERT INTO teams (gen, name, description) VALUES (?1, ?2, ?3)",
                    params![
                        (idx + 1) as f64,
                        name,
                        format!("Generation {} flagship team", idx + 1),
                    ],
                )
                .context("failed to seed team")?;
            }
        }

        tx.commit().context("failed to commit seed data")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::ballot::{CharacterRef, Role};

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    /// Helper: rankings placing two characters in the PG list.
    fn sample_rankings() -> Rankings {
        let mut rankings = Rankings::new();
        rankings.insert(
            Role::PointGuard,
            vec![
                CharacterRef {
                    id: 1,
                    name: "Kirin".to_string(),
                    gen: 3.0,
                },
                CharacterRef {
                    id: 2,
                    name: "Nova".to_string(),
                    gen: 4.0,
                },
            ],
        );
        rankings
    }

    /// Helper: backdate a row's timestamp column so ordering and date
    /// comparisons have something to bite on.
    fn backdate(db: &Database, table: &str, column: &str, id: i64) {
        let conn = db.conn();
        conn.execute(
            &format!("UPDATE {table} SET {column} = '2020-01-01 00:00:00' WHERE id = ?1"),
            params![id],
        )
        .unwrap();
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "surveys",
            "characters",
            "teams",
            "tips",
            "events",
            "images",
            "generation_images",
            "rankings",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn open_creates_client_id_index() {
        let db = test_db();
        let conn = db.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_surveys_client_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    // ------------------------------------------------------------------
    // Surveys
    // ------------------------------------------------------------------

    #[test]
    fn insert_and_load_ballots_round_trip() {
        let db = test_db();
        let id = db
            .insert_ballot("client-1", &sample_rankings(), Some("great roster"))
            .unwrap();
        assert!(id > 0);

        let ballots = db.load_ballots().unwrap();
        assert_eq!(ballots.len(), 1);
        assert_eq!(ballots[0].id, id);
        assert_eq!(ballots[0].client_id, "client-1");
        assert_eq!(ballots[0].feedback.as_deref(), Some("great roster"));
        assert!(!ballots[0].created_at.is_empty());

        let pg = ballots[0].rankings.get(&Role::PointGuard).unwrap();
        assert_eq!(pg.len(), 2);
        assert_eq!(pg[0].name, "Kirin");
        assert_eq!(pg[1].id, 2);
    }

    #[test]
    fn insert_ballot_without_feedback_stores_null() {
        let db = test_db();
        db.insert_ballot("client-1", &sample_rankings(), None)
            .unwrap();

        let ballots = db.load_ballots().unwrap();
        assert!(ballots[0].feedback.is_none());
    }

    #[test]
    fn load_ballots_newest_first() {
        let db = test_db();
        let first = db.insert_ballot("a", &sample_rankings(), None).unwrap();
        let second = db.insert_ballot("b", &sample_rankings(), None).unwrap();
        backdate(&db, "surveys", "created_at", first);

        let ballots = db.load_ballots().unwrap();
        assert_eq!(ballots.len(), 2);
        assert_eq!(ballots[0].id, second);
        assert_eq!(ballots[1].id, first);
    }

    #[test]
    fn load_ballots_skips_malformed_rankings() {
        let db = test_db();
        db.insert_ballot("good", &sample_rankings(), None).unwrap();
        {
            let conn = db.conn();
            conn.execute(
                "INSERT INTO surveys (client_id, rankings_json) VALUES ('bad', 'not json')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO surveys (client_id, rankings_json) VALUES ('bad2', '{\"ZZ\": []}')",
                [],
            )
            .unwrap();
        }

        let ballots = db.load_ballots().unwrap();
        assert_eq!(ballots.len(), 1);
        assert_eq!(ballots[0].client_id, "good");
        // Total count still reflects every stored row.
        assert_eq!(db.count_ballots().unwrap(), 3);
    }

    #[test]
    fn count_ballots_for_client_scoped() {
        let db = test_db();
        assert_eq!(db.count_ballots_for_client("c1").unwrap(), 0);

        db.insert_ballot("c1", &sample_rankings(), None).unwrap();
        db.insert_ballot("c2", &sample_rankings(), None).unwrap();

        assert_eq!(db.count_ballots_for_client("c1").unwrap(), 1);
        assert_eq!(db.count_ballots_for_client("c2").unwrap(), 1);
        assert_eq!(db.count_ballots_for_client("c3").unwrap(), 0);
        assert_eq!(db.count_ballots().unwrap(), 2);
    }

    #[test]
    fn count_ballots_today_excludes_backdated() {
        let db = test_db();
        let old = db.insert_ballot("old", &sample_rankings(), None).unwrap();
        db.insert_ballot("new", &sample_rankings(), None).unwrap();
        backdate(&db, "surveys", "created_at", old);

        assert_eq!(db.count_ballots().unwrap(), 2);
        assert_eq!(db.count_ballots_today().unwrap(), 1);
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    #[test]
    fn insert_and_get_character() {
        let db = test_db();
        let id = db
            .insert_character(
                "Kirin",
                "PG",
                3.0,
                None,
                Some("Fast first step"),
                Some(r#"{"speed":90}"#),
            )
            .unwrap();

        let character = db.get_character(id).unwrap().expect("should exist");
        assert_eq!(character.name, "Kirin");
        assert_eq!(character.position, "PG");
        assert!((character.gen - 3.0).abs() < f64::EPSILON);
        assert_eq!(character.description.as_deref(), Some("Fast first step"));
        assert!(character.avatar_url.is_none());

        assert!(db.get_character(id + 100).unwrap().is_none());
    }

    #[test]
    fn list_characters_orders_by_gen_then_newest() {
        let db = test_db();
        let a = db.insert_character("A", "C", 2.0, None, None, None).unwrap();
        let b = db.insert_character("B", "PG", 1.0, None, None, None).unwrap();
        let c = db.insert_character("C", "SG", 2.0, None, None, None).unwrap();

        let all = db.list_characters(None, None).unwrap();
        let ids: Vec<i64> = all.iter().map(|ch| ch.id).collect();
        // gen 1 first; within gen 2 the newer row (higher id) leads.
        assert_eq!(ids, vec![b, c, a]);
    }

    #[test]
    fn list_characters_filters() {
        let db = test_db();
        db.insert_character("A", "C", 3.5, None, None, None).unwrap();
        db.insert_character("B", "PG", 3.5, None, None, None).unwrap();
        db.insert_character("C", "PG", 5.0, None, None, None).unwrap();

        let gen_only = db.list_characters(Some(3.5), None).unwrap();
        assert_eq!(gen_only.len(), 2);

        let pos_only = db.list_characters(None, Some("PG")).unwrap();
        assert_eq!(pos_only.len(), 2);

        let both = db.list_characters(Some(3.5), Some("PG")).unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].name, "B");

        let none = db.list_characters(Some(9.0), Some("SW")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn update_character_touches_only_named_fields() {
        let db = test_db();
        let id = db
            .insert_character("Kirin", "PG", 3.0, None, Some("original"), None)
            .unwrap();

        let patch = CharacterPatch {
            gen: Some(3.5),
            description: Some(Some("updated".to_string())),
            ..Default::default()
        };
        let changed = db.update_character(id, &patch).unwrap();
        assert_eq!(changed, 1);

        let character = db.get_character(id).unwrap().unwrap();
        assert_eq!(character.name, "Kirin");
        assert!((character.gen - 3.5).abs() < f64::EPSILON);
        assert_eq!(character.description.as_deref(), Some("updated"));
    }

    #[test]
    fn update_character_null_clears_nullable_columns() {
        let db = test_db();
        let id = db
            .insert_character(
                "Kirin",
                "PG",
                3.0,
                Some("/uploads/old_512.jpg"),
                Some("original"),
                None,
            )
            .unwrap();

        // The wire shape for a clear is an explicit null.
        let patch: CharacterPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(db.update_character(id, &patch).unwrap(), 1);

        let character = db.get_character(id).unwrap().unwrap();
        assert!(character.description.is_none());
        // Fields absent from the patch keep their values.
        assert_eq!(character.avatar_url.as_deref(), Some("/uploads/old_512.jpg"));
        assert_eq!(character.name, "Kirin");
    }

    #[test]
    fn update_character_empty_patch_is_noop() {
        let db = test_db();
        let id = db.insert_character("Kirin", "PG", 3.0, None, None, None).unwrap();
        let changed = db.update_character(id, &CharacterPatch::default()).unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn update_character_avatar_sets_url() {
        let db = test_db();
        let id = db.insert_character("Kirin", "PG", 3.0, None, None, None).unwrap();
        let changed = db
            .update_character_avatar(id, "/uploads/abc_512.jpg")
            .unwrap();
        assert_eq!(changed, 1);
        let character = db.get_character(id).unwrap().unwrap();
        assert_eq!(character.avatar_url.as_deref(), Some("/uploads/abc_512.jpg"));
    }

    #[test]
    fn delete_character_removes_row() {
        let db = test_db();
        let id = db.insert_character("Kirin", "PG", 3.0, None, None, None).unwrap();
        assert_eq!(db.delete_character(id).unwrap(), 1);
        assert!(db.get_character(id).unwrap().is_none());
        assert_eq!(db.delete_character(id).unwrap(), 0);
    }

    #[test]
    fn character_directory_maps_id_to_name_and_gen() {
        let db = test_db();
        let id1 = db.insert_character("Kirin", "PG", 3.0, None, None, None).unwrap();
        let id2 = db.insert_character("Nova", "C", 4.5, None, None, None).unwrap();

        let directory = db.character_directory().unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.get(&id1).unwrap().name, "Kirin");
        assert!((directory.get(&id2).unwrap().gen - 4.5).abs() < f64::EPSILON);
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    #[test]
    fn team_crud_round_trip() {
        let db = test_db();
        let id = db
            .insert_team(1.0, "Thunder", Some("Generation 1 flagship team"), None)
            .unwrap();

        let team = db.get_team(id).unwrap().expect("should exist");
        assert_eq!(team.name, "Thunder");
        assert!(team.logo_url.is_none());

        let changed = db
            .update_team(id, 1.0, "Thunder Reborn", None, Some("/uploads/logo.png"))
            .unwrap();
        assert_eq!(changed, 1);

        let team = db.get_team(id).unwrap().unwrap();
        assert_eq!(team.name, "Thunder Reborn");
        // Full update rewrote description to NULL.
        assert!(team.description.is_none());
        assert_eq!(team.logo_url.as_deref(), Some("/uploads/logo.png"));

        assert_eq!(db.delete_team(id).unwrap(), 1);
        assert!(db.get_team(id).unwrap().is_none());
    }

    #[test]
    fn list_teams_ordered_and_filtered() {
        let db = test_db();
        db.insert_team(2.0, "Storm", None, None).unwrap();
        db.insert_team(1.0, "Thunder", None, None).unwrap();
        db.insert_team(2.0, "Blaze", None, None).unwrap();

        let all = db.list_teams(None).unwrap();
        let names: Vec<&str> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Thunder", "Storm", "Blaze"]);

        let gen2 = db.list_teams(Some(2.0)).unwrap();
        assert_eq!(gen2.len(), 2);
    }

    // ------------------------------------------------------------------
    // Tips
    // ------------------------------------------------------------------

    #[test]
    fn tip_crud_round_trip() {
        let db = test_db();
        let id = db
            .insert_tip("Shooting Basics", "PG", None, Some("Release timing"), None)
            .unwrap();

        let tips = db.list_tips(None).unwrap();
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].title, "Shooting Basics");

        let pg_tips = db.list_tips(Some("PG")).unwrap();
        assert_eq!(pg_tips.len(), 1);
        let c_tips = db.list_tips(Some("C")).unwrap();
        assert!(c_tips.is_empty());

        assert_eq!(db.delete_tip(id).unwrap(), 1);
        assert!(db.list_tips(None).unwrap().is_empty());
    }

    #[test]
    fn update_tip_refreshes_updated_at() {
        let db = test_db();
        let id = db
            .insert_tip("Shooting Basics", "PG", None, None, None)
            .unwrap();
        backdate(&db, "tips", "updated_at", id);

        let patch = TipPatch {
            summary: Some(Some("Arc over power".to_string())),
            ..Default::default()
        };
        assert_eq!(db.update_tip(id, &patch).unwrap(), 1);

        let tips = db.list_tips(None).unwrap();
        assert_eq!(tips[0].summary.as_deref(), Some("Arc over power"));
        // Title untouched, timestamp refreshed past the backdated value.
        assert_eq!(tips[0].title, "Shooting Basics");
        assert_ne!(tips[0].updated_at, "2020-01-01 00:00:00");
    }

    #[test]
    fn update_tip_empty_patch_is_noop() {
        let db = test_db();
        let id = db.insert_tip("T", "C", None, None, None).unwrap();
        assert_eq!(db.update_tip(id, &TipPatch::default()).unwrap(), 0);
    }

    #[test]
    fn list_tips_newest_update_first() {
        let db = test_db();
        let first = db.insert_tip("First", "C", None, None, None).unwrap();
        db.insert_tip("Second", "C", None, None, None).unwrap();
        backdate(&db, "tips", "updated_at", first);

        let tips = db.list_tips(None).unwrap();
        assert_eq!(tips[0].title, "Second");
        assert_eq!(tips[1].title, "First");
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    #[test]
    fn event_crud_round_trip() {
        let db = test_db();
        let id = db
            .insert_event(
                "Season Opening Tournament",
                None,
                Some("2026-09-01 ~ 2026-09-07"),
                None,
                None,
            )
            .unwrap();

        let events = db.list_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time_range.as_deref(), Some("2026-09-01 ~ 2026-09-07"));

        let patch = EventPatch {
            link: Some(Some("https://example.com/signup".to_string())),
            ..Default::default()
        };
        assert_eq!(db.update_event(id, &patch).unwrap(), 1);

        let events = db.list_events().unwrap();
        assert_eq!(events[0].link.as_deref(), Some("https://example.com/signup"));
        assert_eq!(events[0].title, "Season Opening Tournament");

        // A null in the wire patch clears the column it names.
        let patch: EventPatch = serde_json::from_str(r#"{"time_range": null}"#).unwrap();
        assert_eq!(db.update_event(id, &patch).unwrap(), 1);
        let events = db.list_events().unwrap();
        assert!(events[0].time_range.is_none());
        assert_eq!(events[0].link.as_deref(), Some("https://example.com/signup"));

        assert_eq!(db.delete_event(id).unwrap(), 1);
        assert!(db.list_events().unwrap().is_empty());
    }

    #[test]
    fn update_event_missing_row_reports_zero() {
        let db = test_db();
        let patch = EventPatch {
            title: Some("Nope".to_string()),
            ..Default::default()
        };
        assert_eq!(db.update_event(999, &patch).unwrap(), 0);
    }

    // ------------------------------------------------------------------
    // Uploaded images
    // ------------------------------------------------------------------

    #[test]
    fn image_records_paginated_newest_first() {
        let db = test_db();
        let mut ids = Vec::new();
        for i in 0..5 {
            let id = db
                .insert_image(
                    &format!("img{i}_orig.png"),
                    Some(&format!("photo{i}.png")),
                    1000 + i,
                    Some("image/png"),
                )
                .unwrap();
            ids.push(id);
        }
        // Same-second timestamps: id DESC breaks the tie, newest insert first.
        assert_eq!(db.count_images().unwrap(), 5);

        let page1 = db.list_images(2, 0).unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].id, ids[4]);
        assert_eq!(page1[1].id, ids[3]);

        let page3 = db.list_images(2, 4).unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].id, ids[0]);
    }

    #[test]
    fn image_get_and_delete() {
        let db = test_db();
        let id = db
            .insert_image("abc_orig.png", Some("cat.png"), 2048, Some("image/png"))
            .unwrap();

        let record = db.get_image(id).unwrap().expect("should exist");
        assert_eq!(record.filename, "abc_orig.png");
        assert_eq!(record.original_name.as_deref(), Some("cat.png"));
        assert_eq!(record.file_size, 2048);

        assert_eq!(db.delete_image(id).unwrap(), 1);
        assert!(db.get_image(id).unwrap().is_none());
        assert_eq!(db.delete_image(id).unwrap(), 0);
    }

    // ------------------------------------------------------------------
    // Generation images
    // ------------------------------------------------------------------

    #[test]
    fn generation_images_newest_first_and_filtered_by_gen() {
        let db = test_db();
        db.insert_generation_image(3.5, "a_orig.png", "/uploads/a_512.jpg")
            .unwrap();
        db.insert_generation_image(5.0, "b_orig.png", "/uploads/b_512.jpg")
            .unwrap();

        // Same-second timestamps: id DESC breaks the tie, newest upload first.
        let all = db.list_generation_images(None).unwrap();
        assert_eq!(all.len(), 2);
        assert!((all[0].gen - 5.0).abs() < f64::EPSILON);
        assert!((all[1].gen - 3.5).abs() < f64::EPSILON);

        let gen5 = db.list_generation_images(Some(5.0)).unwrap();
        assert_eq!(gen5.len(), 1);
        assert_eq!(gen5[0].url, "/uploads/b_512.jpg");

        let gen9 = db.list_generation_images(Some(9.0)).unwrap();
        assert!(gen9.is_empty());
    }

    #[test]
    fn generation_image_get_and_delete() {
        let db = test_db();
        let id = db
            .insert_generation_image(4.5, "c_orig.webp", "/uploads/c_512.jpg")
            .unwrap();

        let record = db.get_generation_image(id).unwrap().expect("should exist");
        assert_eq!(record.filename, "c_orig.webp");

        assert_eq!(db.delete_generation_image(id).unwrap(), 1);
        assert!(db.get_generation_image(id).unwrap().is_none());
    }

    // ------------------------------------------------------------------
    // Tier-board snapshots
    // ------------------------------------------------------------------

    #[test]
    fn latest_snapshot_none_initially() {
        let db = test_db();
        assert!(db.latest_snapshot("PF").unwrap().is_none());
    }

    #[test]
    fn latest_snapshot_takes_newest_row() {
        let db = test_db();
        let first = db.insert_snapshot("PF", r#"[{"name":"Old"}]"#).unwrap();
        db.insert_snapshot("PF", r#"[{"name":"New"}]"#).unwrap();
        db.insert_snapshot("PG", r#"[{"name":"Other"}]"#).unwrap();
        backdate(&db, "rankings", "updated_at", first);

        let (items_json, updated_at) = db.latest_snapshot("PF").unwrap().unwrap();
        assert!(items_json.contains("New"));
        assert_ne!(updated_at, "2020-01-01 00:00:00");
    }

    // ------------------------------------------------------------------
    // Sample data
    // ------------------------------------------------------------------

    #[test]
    fn seed_populates_empty_tables() {
        let db = test_db();
        db.seed_sample_data().unwrap();

        assert_eq!(db.list_characters(None, None).unwrap().len(), 27);
        assert_eq!(db.list_teams(None).unwrap().len(), 9);
        assert_eq!(db.list_tips(None).unwrap().len(), 2);
        assert_eq!(db.list_events().unwrap().len(), 1);
        for category in ["C", "PF", "PG"] {
            assert!(db.latest_snapshot(category).unwrap().is_some());
        }

        // Three characters per generation.
        let gen1 = db.list_characters(Some(1.0), None).unwrap();
        assert_eq!(gen1.len(), 3);
    }

    #[test]
    fn seed_twice_adds_nothing() {
        let db = test_db();
        db.seed_sample_data().unwrap();
        db.seed_sample_data().unwrap();

        assert_eq!(db.list_characters(None, None).unwrap().len(), 27);
        assert_eq!(db.list_teams(None).unwrap().len(), 9);
        assert_eq!(db.list_tips(None).unwrap().len(), 2);
    }

    #[test]
    fn seed_skips_tables_with_data() {
        let db = test_db();
        db.insert_character("Existing", "C", 1.0, None, None, None)
            .unwrap();

        db.seed_sample_data().unwrap();

        // Characters untouched, other tables seeded.
        let characters = db.list_characters(None, None).unwrap();
        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].name, "Existing");
        assert_eq!(db.list_teams(None).unwrap().len(), 9);
    }
}
