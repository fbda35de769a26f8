// 🔗 Merge Orchestrator - one pass from roster rows to the contract table
// Resolves each roster record to an identity, projects its contract across
// the season headers, and collects the survivors in input order. Individual
// records may drop out with a log line; an empty result fails the run so an
// empty table is never published.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::cache::{IdentityLink, LinkCache};
use crate::config::Config;
use crate::nhl::PlayerSource;
use crate::projector::{Projector, SeasonCell};
use crate::resolver::{Resolution, Resolver};
use crate::roster::{RosterRecord, RosterSlot};

/// Fixed columns ahead of the per-season columns, in output order.
pub const FIXED_COLUMNS: [&str; 7] = ["Player", "IR?", "Team", "DOB", "Age", "Pos", "Contract"];

/// One fully merged roster row: roster fields plus the resolved birth date
/// and the projected season cells.
#[derive(Debug, Clone)]
pub struct MergedRecord {
    pub player: String,
    pub ir: bool,
    /// Fantasy team, from the roster export's Status column.
    pub team: String,
    pub birth_date: NaiveDate,
    pub age: String,
    pub position: String,
    pub contract: String,
    pub seasons: Vec<SeasonCell>,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct Orchestrator<'a, S: PlayerSource> {
    resolver: Resolver<'a, S>,
    projector: Projector,
    offseason: bool,
}

impl<'a, S: PlayerSource> Orchestrator<'a, S> {
    pub fn new(
        source: S,
        cache: &'a mut LinkCache,
        config: &Config,
        headers: Vec<String>,
        offseason: bool,
        today: NaiveDate,
    ) -> Self {
        let resolver = Resolver::new(
            source,
            cache,
            config.weights.clone(),
            &config.known_gaps,
            today,
        );
        let projector = Projector::new(
            headers,
            config.rollover,
            config.rfa_age,
            &config.extension_exempt,
        );

        Orchestrator {
            resolver,
            projector,
            offseason,
        }
    }

    /// Merge the whole roster. Unresolvable records are skipped with a log
    /// line, known gaps silently; zero survivors is a run-level failure.
    pub fn run(&mut self, roster: &[RosterRecord]) -> Result<Vec<MergedRecord>> {
        let mut merged = Vec::with_capacity(roster.len());
        let mut skipped = 0;

        for record in roster {
            match self.resolver.resolve(record) {
                Resolution::Resolved(link) => merged.push(self.merge_one(record, &link)),
                Resolution::KnownGap => {}
                Resolution::Unresolved(reason) => {
                    skipped += 1;
                    eprintln!("  Skipping {} ({}).", record.player, reason.as_str());
                }
            }
        }

        if merged.is_empty() {
            bail!("No roster records merged; refusing to publish an empty table");
        }
        if skipped > 0 {
            eprintln!("⚠️  Skipped {skipped} roster records");
        }

        Ok(merged)
    }

    fn merge_one(&self, record: &RosterRecord, link: &IdentityLink) -> MergedRecord {
        // Injured-reserve slots in the export linger all summer; the flag
        // only means something during the season.
        let ir = record.roster_slot() == RosterSlot::InjuredReserve && !self.offseason;

        let seasons = self.projector.project(
            &record.player,
            &record.contract,
            link.birth_date,
            record.is_goalie(),
            record.salary_dollars(),
        );

        MergedRecord {
            player: record.player.clone(),
            ir,
            team: record.status.clone(),
            birth_date: link.birth_date,
            age: record.age.clone(),
            position: record.canonical_position(),
            contract: record.contract.clone(),
            seasons,
        }
    }
}

// ============================================================================
// CONTRACT TABLE
// ============================================================================

/// Column headers plus rows of JSON cells, the shape every publisher takes.
#[derive(Debug, Clone)]
pub struct ContractTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

pub fn contract_table(merged: &[MergedRecord], season_headers: &[String]) -> ContractTable {
    let mut headers: Vec<String> = FIXED_COLUMNS.iter().map(|s| s.to_string()).collect();
    headers.extend(season_headers.iter().cloned());

    let rows = merged
        .iter()
        .map(|rec| {
            let mut row = vec![
                json!(rec.player),
                json!(if rec.ir { "Y" } else { "" }),
                json!(rec.team),
                json!(rec.birth_date.format("%Y-%m-%d").to_string()),
                json!(rec.age),
                json!(rec.position),
                json!(rec.contract),
            ];
            for cell in &rec.seasons {
                row.push(match cell {
                    SeasonCell::Salary(amount) => json!(amount),
                    SeasonCell::Status(label) => json!(label),
                    SeasonCell::Blank => json!(""),
                });
            }
            row
        })
        .collect();

    ContractTable { headers, rows }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::season_headers;
    use crate::nhl::{KeyedPlayerSource, PlayerCandidate};

    fn record(
        external_id: &str,
        player: &str,
        team: &str,
        age: &str,
        roster_status: &str,
        contract: &str,
    ) -> RosterRecord {
        RosterRecord {
            external_id: external_id.to_string(),
            player: player.to_string(),
            team: team.to_string(),
            age: age.to_string(),
            position: "C,LW".to_string(),
            status: "Ice Holes".to_string(),
            roster_status: roster_status.to_string(),
            salary: "$8,500,000".to_string(),
            contract: contract.to_string(),
        }
    }

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

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn run_merge(
        source: KeyedPlayerSource,
        cache: &mut LinkCache,
        roster: &[RosterRecord],
        offseason: bool,
    ) -> Result<Vec<MergedRecord>> {
        let config = Config::default();
        let mut orchestrator = Orchestrator::new(
            source,
            cache,
            &config,
            season_headers(2025),
            offseason,
            today(),
        );
        orchestrator.run(roster)
    }

    #[test]
    fn test_merges_resolved_records_in_input_order() {
        let source = KeyedPlayerSource::new(vec![
            candidate(8477934, "Leon Draisaitl", "EDM", "1995-10-27"),
            candidate(8478402, "Connor McDavid", "EDM", "1997-01-13"),
        ]);
        let mut cache = LinkCache::open_in_memory();
        let roster = vec![
            record("p2", "Connor McDavid", "EDM", "28", "Active", "07/2026"),
            record("p1", "Leon Draisaitl", "EDM", "29", "Active", "07/2033"),
        ];

        let merged = run_merge(source, &mut cache, &roster, false).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].player, "Connor McDavid");
        assert_eq!(merged[1].player, "Leon Draisaitl");
        assert_eq!(merged[0].team, "Ice Holes");
        assert_eq!(merged[0].position, "C/LW");
        assert_eq!(
            merged[0].birth_date,
            NaiveDate::from_ymd_opt(1997, 1, 13).unwrap()
        );
        // Both resolutions were persisted.
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_seeded_record_merges_without_source() {
        let mut cache = LinkCache::open_in_memory();
        cache
            .insert(IdentityLink {
                external_id: "p1".to_string(),
                nhl_id: Some(8477934),
                name: "Leon Draisaitl".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1995, 10, 27).unwrap(),
            })
            .unwrap();

        // Empty source: only the cache can supply the identity.
        let source = KeyedPlayerSource::new(vec![]);
        let roster = vec![record("p1", "Leon Draisaitl", "EDM", "29", "Active", "07/2027")];

        let merged = run_merge(source, &mut cache, &roster, false).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].birth_date,
            NaiveDate::from_ymd_opt(1995, 10, 27).unwrap()
        );
    }

    #[test]
    fn test_unresolved_records_are_skipped_not_fatal() {
        let source = KeyedPlayerSource::new(vec![candidate(
            8477934,
            "Leon Draisaitl",
            "EDM",
            "1995-10-27",
        )]);
        let mut cache = LinkCache::open_in_memory();
        let roster = vec![
            record("p1", "Leon Draisaitl", "EDM", "29", "Active", "07/2027"),
            record("p9", "Nobody Home", "EDM", "20", "Active", "ELC"),
        ];

        let merged = run_merge(source, &mut cache, &roster, false).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].player, "Leon Draisaitl");
    }

    #[test]
    fn test_all_unresolved_fails_the_run() {
        let source = KeyedPlayerSource::new(vec![]);
        let mut cache = LinkCache::open_in_memory();
        let roster = vec![record("p9", "Nobody Home", "EDM", "20", "Active", "ELC")];

        assert!(run_merge(source, &mut cache, &roster, false).is_err());
    }

    #[test]
    fn test_ir_flag_suppressed_in_offseason() {
        let source = KeyedPlayerSource::new(vec![candidate(
            8477934,
            "Leon Draisaitl",
            "EDM",
            "1995-10-27",
        )]);
        let roster = vec![record("p1", "Leon Draisaitl", "EDM", "29", "Inj Res", "07/2027")];

        let mut cache = LinkCache::open_in_memory();
        let in_season = run_merge(
            KeyedPlayerSource::new(vec![candidate(
                8477934,
                "Leon Draisaitl",
                "EDM",
                "1995-10-27",
            )]),
            &mut cache,
            &roster,
            false,
        )
        .unwrap();
        assert!(in_season[0].ir);

        let mut cache = LinkCache::open_in_memory();
        let off_season = run_merge(source, &mut cache, &roster, true).unwrap();
        assert!(!off_season[0].ir);
    }

    #[test]
    fn test_expiry_contract_projects_through_end_year() {
        // 07/2027 against headers starting 2024-2025: salary through
        // 2026-2027, UFA status in 2027-2028, blanks after.
        let source = KeyedPlayerSource::new(vec![candidate(
            8477934,
            "Leon Draisaitl",
            "EDM",
            "1995-10-27",
        )]);
        let mut cache = LinkCache::open_in_memory();
        let roster = vec![record("p1", "Leon Draisaitl", "EDM", "28", "Active", "07/2027")];

        let config = Config::default();
        let mut orchestrator = Orchestrator::new(
            source,
            &mut cache,
            &config,
            season_headers(2024),
            false,
            NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
        );
        let merged = orchestrator.run(&roster).unwrap();

        let seasons = &merged[0].seasons;
        assert_eq!(seasons[0], SeasonCell::Salary(8_500_000));
        assert_eq!(seasons[1], SeasonCell::Salary(8_500_000));
        assert_eq!(seasons[2], SeasonCell::Salary(8_500_000));
        assert_eq!(seasons[3], SeasonCell::Status("UFA (31)".to_string()));
        assert!(seasons[4..].iter().all(|c| *c == SeasonCell::Blank));
    }

    #[test]
    fn test_known_gap_override_still_projects() {
        use crate::config::KnownGap;

        let source = KeyedPlayerSource::new(vec![]);
        let mut cache = LinkCache::open_in_memory();
        let roster = vec![record("p7", "Obscure Prospect", "ANA", "21", "Active", "ELC")];

        let config = Config {
            known_gaps: vec![KnownGap {
                name: "Obscure Prospect".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2004, 6, 1),
            }],
            ..Config::default()
        };
        let mut orchestrator = Orchestrator::new(
            source,
            &mut cache,
            &config,
            season_headers(2025),
            false,
            today(),
        );
        let merged = orchestrator.run(&roster).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].birth_date,
            NaiveDate::from_ymd_opt(2004, 6, 1).unwrap()
        );
        // The minimal identity flows into projection like any other.
        assert_eq!(merged[0].seasons[0], SeasonCell::Salary(8_500_000));
        assert!(matches!(&merged[0].seasons[3], SeasonCell::Status(s) if s.ends_with("*)")));
    }

    #[test]
    fn test_contract_table_shape_and_cell_types() {
        let merged = vec![MergedRecord {
            player: "Leon Draisaitl".to_string(),
            ir: true,
            team: "Ice Holes".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1995, 10, 27).unwrap(),
            age: "29".to_string(),
            position: "C".to_string(),
            contract: "07/2027".to_string(),
            seasons: vec![
                SeasonCell::Salary(8_500_000),
                SeasonCell::Salary(8_500_000),
                SeasonCell::Status("UFA (31)".to_string()),
                SeasonCell::Blank,
            ],
        }];

        let headers = vec![
            "2025-2026".to_string(),
            "2026-2027".to_string(),
            "2027-2028".to_string(),
            "2028-2029".to_string(),
        ];
        let table = contract_table(&merged, &headers);

        assert_eq!(table.headers.len(), FIXED_COLUMNS.len() + 4);
        assert_eq!(table.headers[0], "Player");
        assert_eq!(table.headers[7], "2025-2026");

        let row = &table.rows[0];
        assert_eq!(row.len(), table.headers.len());
        assert_eq!(row[0], json!("Leon Draisaitl"));
        assert_eq!(row[1], json!("Y"));
        assert_eq!(row[3], json!("1995-10-27"));
        assert_eq!(row[7], json!(8_500_000));
        assert_eq!(row[9], json!("UFA (31)"));
        assert_eq!(row[10], json!(""));
    }
}
