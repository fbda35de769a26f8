// 📋 Roster Source - Fantrax CSV export rows
// One RosterRecord per player-team assignment, keyed by the export's own ID
// column. Rows are immutable once loaded; all derived views (salary dollars,
// roster slot, canonical position) are computed on demand.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

// ============================================================================
// ROSTER RECORD
// ============================================================================

/// One row of the Fantrax players export, column names as shipped.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterRecord {
    /// Fantrax's unique id for this player-team assignment. Cache key for
    /// identity resolution.
    #[serde(rename = "ID")]
    pub external_id: String,

    #[serde(rename = "Player")]
    pub player: String,

    /// NHL team abbreviation as Fantrax reports it.
    #[serde(rename = "Team")]
    pub team: String,

    /// May be blank for prospects.
    #[serde(rename = "Age", default)]
    pub age: String,

    /// Comma- or slash-delimited, e.g. "C,LW".
    #[serde(rename = "Position", default)]
    pub position: String,

    /// Franchise column: the fantasy team that owns the player.
    #[serde(rename = "Status", default)]
    pub status: String,

    /// "Active", "Inj Res", "Min" etc.
    #[serde(rename = "Roster Status", default)]
    pub roster_status: String,

    /// Dollar string with commas and a currency sign, e.g. "$8,500,000".
    #[serde(rename = "Salary", default)]
    pub salary: String,

    /// Contract label: ELC-tagged, "Stream", "Expire", or "MM/YYYY".
    #[serde(rename = "Contract", default)]
    pub contract: String,
}

/// Roster/injury slot derived from the "Roster Status" column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterSlot {
    Active,
    InjuredReserve,
    Other,
}

impl RosterRecord {
    /// Salary with every non-digit stripped. Blank or garbage → 0.
    pub fn salary_dollars(&self) -> i64 {
        let digits: String = self.salary.chars().filter(|c| c.is_ascii_digit()).collect();
        digits.parse().unwrap_or(0)
    }

    pub fn age_years(&self) -> Option<i32> {
        self.age.trim().parse().ok()
    }

    pub fn roster_slot(&self) -> RosterSlot {
        match self.roster_status.trim() {
            "Inj Res" => RosterSlot::InjuredReserve,
            "Active" => RosterSlot::Active,
            _ => RosterSlot::Other,
        }
    }

    /// Multi-position string in canonical slash form: "C,LW" → "C/LW".
    pub fn canonical_position(&self) -> String {
        self.position.replace(',', "/")
    }

    /// RFA age thresholds differ for goalies.
    pub fn is_goalie(&self) -> bool {
        self.canonical_position() == "G"
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Load the export CSV, preserving row order.
pub fn load_roster(csv_path: &Path) -> Result<Vec<RosterRecord>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open roster export {}", csv_path.display()))?;

    read_roster(&mut rdr)
}

/// Parse roster rows from any reader (file, download body, test fixture).
pub fn read_roster<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<RosterRecord>> {
    let mut records = Vec::new();

    for result in rdr.deserialize() {
        let record: RosterRecord = result.context("Failed to deserialize roster row")?;
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
