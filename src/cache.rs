// 💾 Identity Link Cache - resolved roster ↔ NHL identities
// SQLite-backed write-through cache. Every link is loaded into memory at
// open, reads never touch the database afterwards, and each insert is
// persisted before the resolver hands the link back to its caller.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One settled identity: a roster export id tied to an authoritative player.
/// `nhl_id` is absent for known-gap players carried on an override birth date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityLink {
    pub external_id: String,
    pub nhl_id: Option<i64>,
    pub name: String,
    pub birth_date: NaiveDate,
}

pub struct LinkCache {
    conn: Option<Connection>,
    links: HashMap<String, IdentityLink>,
}

impl LinkCache {
    /// Open the cache at `path`, creating the schema on first use. A broken
    /// database degrades to an in-memory cache so a run can still complete;
    /// the links just will not survive it.
    pub fn open(path: &Path) -> Self {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("ERROR: Could not create cache dir {}: {e}", parent.display());
            }
        }

        let conn = match Self::connect(path) {
            Ok(conn) => Some(conn),
            Err(e) => {
                eprintln!("ERROR: Link cache unavailable, continuing without persistence: {e}");
                None
            }
        };

        let links = match conn.as_ref() {
            Some(conn) => Self::load_all(conn).unwrap_or_else(|e| {
                eprintln!("ERROR: Could not load cached links: {e}");
                HashMap::new()
            }),
            None => HashMap::new(),
        };

        LinkCache { conn, links }
    }

    /// Cache backed by a private in-memory database; links last for the run
    /// only.
    pub fn open_in_memory() -> Self {
        let conn = match Self::connect_in_memory() {
            Ok(conn) => Some(conn),
            Err(e) => {
                eprintln!("ERROR: In-memory link cache unavailable: {e}");
                None
            }
        };

        LinkCache {
            conn,
            links: HashMap::new(),
        }
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open link cache at {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;
        Self::create_schema(&conn)?;

        Ok(conn)
    }

    fn connect_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory cache")?;
        Self::create_schema(&conn)?;
        Ok(conn)
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS player_links (
                external_id TEXT PRIMARY KEY,
                nhl_id      INTEGER,
                name        TEXT NOT NULL,
                birth_date  TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create player_links table")?;

        Ok(())
    }

    fn load_all(conn: &Connection) -> Result<HashMap<String, IdentityLink>> {
        let mut stmt = conn
            .prepare("SELECT external_id, nhl_id, name, birth_date FROM player_links")
            .context("Failed to prepare link query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .context("Failed to query cached links")?;

        let mut links = HashMap::new();
        for row in rows {
            let (external_id, nhl_id, name, birth_date) = row.context("Bad link row")?;
            let birth_date = NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d")
                .with_context(|| format!("Bad cached birth date for {external_id}"))?;
            links.insert(
                external_id.clone(),
                IdentityLink {
                    external_id,
                    nhl_id,
                    name,
                    birth_date,
                },
            );
        }

        Ok(links)
    }

    pub fn get(&self, external_id: &str) -> Option<&IdentityLink> {
        self.links.get(external_id)
    }

    /// Persist a link and make it visible to later lookups. The database
    /// write happens first; if it fails the link is still kept in memory and
    /// the failure is reported to the caller.
    pub fn insert(&mut self, link: IdentityLink) -> Result<()> {
        let result = match self.conn.as_ref() {
            Some(conn) => conn
                .execute(
                    "INSERT OR REPLACE INTO player_links
                        (external_id, nhl_id, name, birth_date)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        link.external_id,
                        link.nhl_id,
                        link.name,
                        link.birth_date.format("%Y-%m-%d").to_string()
                    ],
                )
                .map(|_| ())
                .with_context(|| format!("Failed to persist link for {}", link.external_id)),
            None => Ok(()),
        };

        self.links.insert(link.external_id.clone(), link);
        result
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn link(external_id: &str, nhl_id: Option<i64>, name: &str, dob: &str) -> IdentityLink {
        IdentityLink {
            external_id: external_id.to_string(),
            nhl_id,
            name: name.to_string(),
            birth_date: NaiveDate::parse_from_str(dob, "%Y-%m-%d").unwrap(),
        }
    }

    #[test]
    fn test_insert_then_get() {
        let mut cache = LinkCache::open_in_memory();
        assert!(cache.is_empty());

        cache
            .insert(link("p1234", Some(8477934), "Leon Draisaitl", "1995-10-27"))
            .unwrap();

        let found = cache.get("p1234").unwrap();
        assert_eq!(found.nhl_id, Some(8477934));
        assert_eq!(found.name, "Leon Draisaitl");
        assert_eq!(cache.len(), 1);
        assert!(cache.get("p9999").is_none());
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut cache = LinkCache::open_in_memory();
        cache
            .insert(link("p1234", Some(1), "Old Name", "1990-01-01"))
            .unwrap();
        cache
            .insert(link("p1234", Some(2), "New Name", "1991-02-02"))
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("p1234").unwrap().nhl_id, Some(2));
    }

    #[test]
    fn test_known_gap_link_without_nhl_id() {
        let mut cache = LinkCache::open_in_memory();
        cache
            .insert(link("p5555", None, "Obscure Prospect", "2004-06-01"))
            .unwrap();

        assert!(cache.get("p5555").unwrap().nhl_id.is_none());
    }

    #[test]
    fn test_corrupt_database_treated_as_empty() {
        let dir = std::env::temp_dir().join(format!("capkeeper_bad_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("player_links.db");
        std::fs::write(&path, b"not a database at all").unwrap();

        let mut cache = LinkCache::open(&path);
        assert!(cache.is_empty());

        // The run carries on against the in-memory map alone.
        cache
            .insert(link("p1234", Some(8477934), "Leon Draisaitl", "1995-10-27"))
            .unwrap();
        assert_eq!(cache.get("p1234").unwrap().name, "Leon Draisaitl");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("capkeeper_lc_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("player_links.db");

        {
            let mut cache = LinkCache::open(&path);
            cache
                .insert(link("p1234", Some(8477934), "Leon Draisaitl", "1995-10-27"))
                .unwrap();
        }

        let reopened = LinkCache::open(&path);
        let found = reopened.get("p1234").unwrap();
        assert_eq!(found.nhl_id, Some(8477934));
        assert_eq!(
            found.birth_date,
            NaiveDate::from_ymd_opt(1995, 10, 27).unwrap()
        );

        let _ = std::fs::remove_dir_all(dir);
    }
}
