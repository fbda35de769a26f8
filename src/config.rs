// ⚙️ Run Configuration - one explicit object, no process-wide state
// Everything the pipeline can be tuned by lives here and is loaded from a
// single JSON file: league ids, the season rollover rule, RFA age thresholds,
// the extension-exemption and known-gap lists, and the off-season policy.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolver::MatchWeights;

/// Number of future season columns in the output table.
pub const SEASON_COLUMNS: usize = 8;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fantrax league id. Changes every season.
    pub league_id: String,

    /// Fantrax login cookie, sent verbatim as the `Cookie:` header.
    #[serde(default)]
    pub fantrax_cookie: String,

    /// Microsoft Graph workbook root (`.../items/{id}/workbook`).
    /// Empty → remote publishing is unavailable.
    #[serde(default)]
    pub graph_workbook_url: String,

    /// Bearer token for Graph calls. Empty → taken from the GRAPH_TOKEN
    /// environment variable at run time.
    #[serde(default)]
    pub graph_token: String,

    /// Directory for inputs/, outputs/ and response_cache/.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Season rollover date rule (default September 15).
    #[serde(default)]
    pub rollover: RolloverRule,

    /// RFA age cutoffs (default skaters < 26, goalies < 28).
    #[serde(default)]
    pub rfa_age: RfaAgeThresholds,

    /// When the IR flag is suppressed.
    #[serde(default)]
    pub offseason: OffseasonPolicy,

    /// Cap-penalty note classification.
    #[serde(default)]
    pub caphit: CapHitPolicy,

    /// Identity-match point scheme.
    #[serde(default)]
    pub weights: MatchWeights,

    /// Players who signed extensions and therefore never project as RFA.
    #[serde(default)]
    pub extension_exempt: Vec<String>,

    /// Players known to be absent from the NHL source (undrafted, no NHL
    /// games played, but rostered in the fantasy league).
    #[serde(default)]
    pub known_gaps: Vec<KnownGap>,

    /// Fantrax page team id → franchise abbreviation, for penalty rows.
    #[serde(default)]
    pub team_map: HashMap<String, String>,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Config> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn inputs_dir(&self) -> PathBuf {
        self.project_root.join("inputs")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.project_root.join("outputs")
    }

    /// GET responses and the identity-link database live here.
    pub fn cache_dir(&self) -> PathBuf {
        self.project_root.join("response_cache")
    }

    pub fn roster_csv_path(&self) -> PathBuf {
        self.inputs_dir().join("fantrax_export_latest.csv")
    }

    pub fn link_cache_path(&self) -> PathBuf {
        self.cache_dir().join("player_links.db")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            league_id: String::new(),
            fantrax_cookie: String::new(),
            graph_workbook_url: String::new(),
            graph_token: String::new(),
            project_root: default_project_root(),
            rollover: RolloverRule::default(),
            rfa_age: RfaAgeThresholds::default(),
            offseason: OffseasonPolicy::default(),
            caphit: CapHitPolicy::default(),
            weights: MatchWeights::default(),
            extension_exempt: Vec::new(),
            known_gaps: Vec::new(),
            team_map: HashMap::new(),
        }
    }
}

// ============================================================================
// POLICIES
// ============================================================================

/// The fixed mid-September date a season's age is measured against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RolloverRule {
    pub month: u32,
    pub day: u32,
}

impl RolloverRule {
    /// Rollover date within the given year. Falls back to September 15 if the
    /// configured month/day is not a real date.
    pub fn date_in(&self, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| NaiveDate::from_ymd_opt(year, 9, 15))
            .unwrap_or_default()
    }
}

impl Default for RolloverRule {
    fn default() -> Self {
        RolloverRule { month: 9, day: 15 }
    }
}

/// Age below which an expiring player is still restricted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RfaAgeThresholds {
    pub skater: i32,
    pub goalie: i32,
}

impl Default for RfaAgeThresholds {
    fn default() -> Self {
        RfaAgeThresholds {
            skater: 26,
            goalie: 28,
        }
    }
}

/// IR suppression window. The source history had several variants of this
/// rule, so it is one explicit policy instead of a guessed month check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OffseasonPolicy {
    /// Off-season while the calendar year still equals the league start year
    /// and the month is before `before_month`.
    ByMonth { before_month: u32 },

    /// League admin flips the flag by hand.
    Forced { offseason: bool },
}

impl OffseasonPolicy {
    pub fn is_offseason(&self, league_start_year: i32, today: NaiveDate) -> bool {
        match self {
            OffseasonPolicy::ByMonth { before_month } => {
                today.year() == league_start_year && today.month() < *before_month
            }
            OffseasonPolicy::Forced { offseason } => *offseason,
        }
    }
}

impl Default for OffseasonPolicy {
    fn default() -> Self {
        OffseasonPolicy::ByMonth { before_month: 9 }
    }
}

/// Keyword policy for classifying cap-penalty notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapHitPolicy {
    /// Note contains any of these (lowercased) → Retention, else Buyout.
    pub retention_keywords: Vec<String>,

    /// Expired penalties whose note contains this marker are streamer drops
    /// and are skipped entirely.
    pub zero_penalty_marker: String,
}

impl Default for CapHitPolicy {
    fn default() -> Self {
        CapHitPolicy {
            retention_keywords: vec![
                "retain".to_string(),
                "retention".to_string(),
                "trade".to_string(),
            ],
            zero_penalty_marker: "penalty is 0%".to_string(),
        }
    }
}

/// A player absent from the NHL source. With a birth date recorded, the
/// resolver hands back a minimal identity; without one, the player is
/// skipped as expected (not an error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownGap {
    pub name: String,

    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

// ============================================================================
// SEASON HEADERS
// ============================================================================

/// Ordered `"YYYY-YYYY"` labels for the output columns, starting at the
/// league's current season.
pub fn season_headers(start_year: i32) -> Vec<String> {
    (0..SEASON_COLUMNS as i32)
        .map(|i| format!("{}-{}", start_year + i, start_year + i + 1))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_headers_shape() {
        let headers = season_headers(2024);
        assert_eq!(headers.len(), SEASON_COLUMNS);
        assert_eq!(headers[0], "2024-2025");
        assert_eq!(headers[7], "2031-2032");
    }

    #[test]
    fn test_offseason_by_month() {
        let policy = OffseasonPolicy::default();
        let july = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let october = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();

        assert!(policy.is_offseason(2024, july));
        assert!(!policy.is_offseason(2024, october));
        // League year already rolled forward: calendar July is mid-season
        // from the league's point of view.
        assert!(!policy.is_offseason(2025, july));
    }

    #[test]
    fn test_offseason_forced() {
        let policy = OffseasonPolicy::Forced { offseason: true };
        let october = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        assert!(policy.is_offseason(2024, october));
    }

    #[test]
    fn test_rollover_fallback_on_bad_rule() {
        let bad = RolloverRule { month: 2, day: 31 };
        assert_eq!(
            bad.date_in(2025),
            NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
        );
    }

    #[test]
    fn test_config_parses_with_partial_fields() {
        let raw = r#"{
            "league_id": "7ues8jxvm9n3hdb3",
            "extension_exempt": ["Sample Player"],
            "known_gaps": [
                { "name": "Brandon Bussi", "birth_date": "1998-06-25" },
                { "name": "Ryan McAllister" }
            ]
        }"#;

        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.league_id, "7ues8jxvm9n3hdb3");
        assert_eq!(config.rollover.month, 9);
        assert_eq!(config.rfa_age.goalie, 28);
        assert_eq!(config.known_gaps.len(), 2);
        assert!(config.known_gaps[0].birth_date.is_some());
        assert!(config.known_gaps[1].birth_date.is_none());
    }
}
