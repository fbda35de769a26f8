// 🏒 NHL API - authoritative player records
// Two endpoints matter: the search service (name substring → candidate list)
// and the player landing page (numeric id → birth date). Both sit behind the
// PlayerSource trait so the resolver can also run against a pre-fetched
// keyed mapping (tests, offline runs).

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const NHL_API_BASE_URL: &str = "https://api-web.nhle.com/v1/";
pub const NHL_SEARCH_URL: &str = "https://search.d3.nhle.com/api/v1/search/player";

const HTTP_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("capkeeper/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// CANDIDATE RECORD
// ============================================================================

/// One authoritative player record, as much of it as the source provides.
/// Search hits carry id/name/team; birth dates usually arrive later from the
/// landing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCandidate {
    pub id: i64,
    pub name: String,
    pub last_name: Option<String>,
    pub team_abbrev: Option<String>,
    pub age: Option<i32>,
    pub birth_date: Option<NaiveDate>,
}

// ============================================================================
// PLAYER SOURCE TRAIT
// ============================================================================

/// Candidate lookup used by the identity resolver.
pub trait PlayerSource {
    /// Candidates for the queried name. Recall errs broad; scoring decides.
    fn search(&self, name: &str) -> Result<Vec<PlayerCandidate>>;

    /// Birth date for a player id, for candidates that did not carry one.
    fn birth_date(&self, id: i64) -> Result<NaiveDate>;
}

// ============================================================================
// LIVE CLIENT
// ============================================================================

/// Blocking client for the live NHL endpoints. Landing responses are cached
/// on disk (birth dates never change); searches always go out.
pub struct NhlClient {
    client: reqwest::blocking::Client,
    cache: ResponseCache,
}

impl NhlClient {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(NhlClient {
            client,
            cache: ResponseCache::new(cache_dir.join("players")),
        })
    }

    fn fetch_landing(&self, id: i64) -> Result<String> {
        let url = format!("{NHL_API_BASE_URL}player/{id}/landing");

        if let Some(body) = self.cache.get(&url) {
            return Ok(body);
        }

        let body = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Landing request failed for player {id}"))?
            .error_for_status()
            .with_context(|| format!("Landing request rejected for player {id}"))?
            .text()
            .with_context(|| format!("Failed to read landing body for player {id}"))?;

        if let Err(e) = self.cache.put(&url, &body) {
            eprintln!("ERROR: Could not cache landing response for {id}: {e}");
        }

        Ok(body)
    }
}

impl PlayerSource for NhlClient {
    fn search(&self, name: &str) -> Result<Vec<PlayerCandidate>> {
        let body = self
            .client
            .get(NHL_SEARCH_URL)
            .query(&[("culture", "en-us"), ("limit", "500"), ("q", name)])
            .send()
            .with_context(|| format!("Search request failed for {name}"))?
            .error_for_status()
            .with_context(|| format!("Search request rejected for {name}"))?
            .text()
            .context("Failed to read search body")?;

        let hits: Vec<SearchHit> =
            serde_json::from_str(&body).context("Failed to parse search response")?;

        Ok(hits.into_iter().filter_map(SearchHit::into_candidate).collect())
    }

    fn birth_date(&self, id: i64) -> Result<NaiveDate> {
        let body = self.fetch_landing(id)?;
        let landing: PlayerLanding =
            serde_json::from_str(&body).context("Failed to parse landing response")?;
        Ok(landing.birth_date)
    }
}

// ============================================================================
// WIRE FORMATS (private)
// ============================================================================

/// Search hit as the wire sends it. `playerId` arrives as a string for
/// historical players and a number for some others, so it is decoded loosely.
#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "playerId", default)]
    player_id: Option<serde_json::Value>,

    name: String,

    #[serde(rename = "lastName", default)]
    last_name: Option<String>,

    #[serde(rename = "teamAbbrev", default)]
    team_abbrev: Option<String>,
}

impl SearchHit {
    /// Hits without a usable numeric id cannot be resolved and are dropped.
    fn into_candidate(self) -> Option<PlayerCandidate> {
        let id = match self.player_id? {
            serde_json::Value::Number(n) => n.as_i64()?,
            serde_json::Value::String(s) => s.parse().ok()?,
            _ => return None,
        };

        Some(PlayerCandidate {
            id,
            name: self.name,
            last_name: self.last_name,
            team_abbrev: self.team_abbrev,
            age: None,
            birth_date: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PlayerLanding {
    #[serde(rename = "birthDate")]
    birth_date: NaiveDate,
}

// ============================================================================
// KEYED SOURCE
// ============================================================================

/// Pre-fetched mapping of players keyed by id. A candidate matches when its
/// normalized name contains the query or shares a name token with it, so a
/// full-name query still surfaces namesakes the way the live search does.
pub struct KeyedPlayerSource {
    players: HashMap<i64, PlayerCandidate>,
}

impl KeyedPlayerSource {
    pub fn new(players: impl IntoIterator<Item = PlayerCandidate>) -> Self {
        KeyedPlayerSource {
            players: players.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

impl PlayerSource for KeyedPlayerSource {
    fn search(&self, name: &str) -> Result<Vec<PlayerCandidate>> {
        let query = crate::normalize::normalize_name(name).to_lowercase();
        let query_tokens: Vec<&str> = query.split_whitespace().collect();

        let mut found: Vec<PlayerCandidate> = self
            .players
            .values()
            .filter(|p| {
                let candidate = crate::normalize::normalize_name(&p.name).to_lowercase();
                candidate.contains(&query)
                    || candidate
                        .split_whitespace()
                        .any(|token| query_tokens.contains(&token))
            })
            .cloned()
            .collect();

        // Stable output for a HashMap-backed source.
        found.sort_by_key(|p| p.id);
        Ok(found)
    }

    fn birth_date(&self, id: i64) -> Result<NaiveDate> {
        self.players
            .get(&id)
            .and_then(|p| p.birth_date)
            .ok_or_else(|| anyhow!("No birth date on record for player {id}"))
    }
}

// ============================================================================
// RESPONSE CACHE
// ============================================================================

/// Disk cache for GET responses, file name = SHA-256 of the URL.
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: PathBuf) -> Self {
        ResponseCache { dir }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    pub fn get(&self, url: &str) -> Option<String> {
        fs::read_to_string(self.path_for(url)).ok()
    }

    pub fn put(&self, url: &str, body: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir {}", self.dir.display()))?;
        let path = self.path_for(url);
        fs::write(&path, body)
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, name: &str, team: &str, dob: &str) -> PlayerCandidate {
        PlayerCandidate {
            id,
            name: name.to_string(),
            last_name: None,
            team_abbrev: Some(team.to_string()),
            age: None,
            birth_date: NaiveDate::parse_from_str(dob, "%Y-%m-%d").ok(),
        }
    }

    #[test]
    fn test_keyed_source_substring_search() {
        let source = KeyedPlayerSource::new(vec![
            candidate(8477934, "Leon Draisaitl", "EDM", "1995-10-27"),
            candidate(8478402, "Connor McDavid", "EDM", "1997-01-13"),
        ]);

        let found = source.search("Draisaitl").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 8477934);

        assert!(source.search("Crosby").unwrap().is_empty());
    }

    #[test]
    fn test_keyed_source_search_folds_diacritics() {
        let source = KeyedPlayerSource::new(vec![candidate(
            8482116,
            "Tim Stützle",
            "OTT",
            "2002-01-15",
        )]);

        let found = source.search("Tim Stutzle").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_keyed_source_search_returns_namesakes() {
        let source = KeyedPlayerSource::new(vec![
            candidate(100, "Anders Karlsson", "SJS", "1989-11-27"),
            candidate(101, "Henrik Karlsson", "SJS", "1983-11-07"),
            candidate(8478402, "Connor McDavid", "EDM", "1997-01-13"),
        ]);

        // A full-name query surfaces everyone sharing a name token, so the
        // resolver still gets to score near-misses.
        let found = source.search("Erik Karlsson").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.name.contains("Karlsson")));
    }

    #[test]
    fn test_keyed_source_birth_date() {
        let source = KeyedPlayerSource::new(vec![candidate(
            8477934,
            "Leon Draisaitl",
            "EDM",
            "1995-10-27",
        )]);

        let dob = source.birth_date(8477934).unwrap();
        assert_eq!(dob, NaiveDate::from_ymd_opt(1995, 10, 27).unwrap());
        assert!(source.birth_date(1).is_err());
    }

    #[test]
    fn test_search_hit_decodes_string_and_numeric_ids() {
        let raw = r#"[
            {"playerId": "8477934", "name": "Leon Draisaitl", "teamAbbrev": "EDM"},
            {"playerId": 8478402, "name": "Connor McDavid", "teamAbbrev": "EDM", "lastName": "McDavid"},
            {"playerId": null, "name": "Retired Guy"}
        ]"#;

        let hits: Vec<SearchHit> = serde_json::from_str(raw).unwrap();
        let candidates: Vec<PlayerCandidate> =
            hits.into_iter().filter_map(SearchHit::into_candidate).collect();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, 8477934);
        assert_eq!(candidates[1].id, 8478402);
        assert_eq!(candidates[1].last_name.as_deref(), Some("McDavid"));
    }

    #[test]
    fn test_response_cache_round_trip() {
        let dir = std::env::temp_dir().join(format!("capkeeper_rc_{}", std::process::id()));
        let cache = ResponseCache::new(dir.clone());

        let url = "https://api-web.nhle.com/v1/player/8477934/landing";
        assert!(cache.get(url).is_none());

        cache.put(url, r#"{"birthDate":"1995-10-27"}"#).unwrap();
        assert_eq!(cache.get(url).unwrap(), r#"{"birthDate":"1995-10-27"}"#);

        // Different URL hashes to a different file.
        assert!(cache.get("https://api-web.nhle.com/v1/player/1/landing").is_none());

        let _ = fs::remove_dir_all(dir);
    }
}
