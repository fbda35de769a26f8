// 💸 Cap Hit Penalties - buyout/retention charges against the cap
// Penalty rows scraped from the league admin page become table rows shaped
// like the contract table: the charge repeated for each remaining season,
// blanks after. No status cell, a penalty just runs out.

use serde_json::{json, Value};

use crate::config::CapHitPolicy;
use crate::fantrax::PenaltyRow;
use crate::merge::{ContractTable, FIXED_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapHitKind {
    Retention,
    Buyout,
}

impl CapHitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapHitKind::Retention => "Retention",
            CapHitKind::Buyout => "Buyout",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapHit {
    pub player: String,
    pub team: String,
    pub kind: CapHitKind,
    pub amount: i64,
    pub years: usize,
}

/// Retention keywords win, anything else is a buyout.
pub fn classify_note(note: &str, policy: &CapHitPolicy) -> CapHitKind {
    let note = note.to_lowercase();
    if policy.retention_keywords.iter().any(|k| note.contains(k)) {
        CapHitKind::Retention
    } else {
        CapHitKind::Buyout
    }
}

/// Build cap hits from scraped penalty rows. Zero-year rows marked as
/// zero-percent streamer drops are dropped outright; a zero-year zero-amount
/// row is kept but flags the admin table as stale.
pub fn from_penalty_rows(
    rows: &[PenaltyRow],
    curr_year: i32,
    policy: &CapHitPolicy,
) -> Vec<CapHit> {
    let mut hits = Vec::with_capacity(rows.len());

    for row in rows {
        let years = row
            .expiry_year
            .map(|y| (y - curr_year + 1).max(0) as usize)
            .unwrap_or(0);
        let note = row.note.to_lowercase();

        if years == 0 && note.contains(&policy.zero_penalty_marker) {
            continue;
        }
        if years == 0 && row.amount == 0 {
            eprintln!("ERROR: Hits need updating");
        }

        hits.push(CapHit {
            player: row.player.clone(),
            team: row.team.clone(),
            kind: classify_note(&row.note, policy),
            amount: row.amount,
            years,
        });
    }

    hits
}

/// Same column layout as the contract table; the kind rides in the Contract
/// column and the identity columns stay blank.
pub fn penalty_table(hits: &[CapHit], season_headers: &[String]) -> ContractTable {
    let mut headers: Vec<String> = FIXED_COLUMNS.iter().map(|s| s.to_string()).collect();
    headers.extend(season_headers.iter().cloned());

    let rows = hits
        .iter()
        .map(|hit| {
            let mut row: Vec<Value> = vec![
                json!(hit.player),
                json!(""),
                json!(hit.team),
                json!(""),
                json!(""),
                json!(""),
                json!(hit.kind.as_str()),
            ];
            for n in 0..season_headers.len() {
                row.push(if n < hit.years {
                    json!(hit.amount)
                } else {
                    json!("")
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
