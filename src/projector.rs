// 📅 Contract Projector - contract labels → year-by-year season cells
// Turns a roster contract label into one cell per season header: the salary
// repeated across every remaining paid season, a free-agency status in the
// first unpaid season, blanks after. Cells only ever move salary → status →
// blank, never back.

use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

use crate::config::{RfaAgeThresholds, RolloverRule};
use crate::normalize::normalize_name;

// ============================================================================
// CONTRACT TERMS
// ============================================================================

/// Parsed contract label from the roster export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractTerm {
    /// Entry-level contract, three paid seasons from now.
    EntryLevel,
    /// Streaming contract, paid this season only.
    Stream,
    /// Expires at the end of the current season.
    Expire,
    /// Signed through the season ending in this year.
    ExpiresIn(i32),
    /// Label did not parse; treated as already expiring.
    Unknown,
}

impl ContractTerm {
    pub fn parse(label: &str) -> ContractTerm {
        let label = label.trim();
        if label.contains("ELC") {
            ContractTerm::EntryLevel
        } else if label == "Stream" {
            ContractTerm::Stream
        } else if label == "Expire" {
            ContractTerm::Expire
        } else {
            // Expiry labels look like "07/2027"; the month is noise.
            match label.split('/').next_back().and_then(|y| y.trim().parse().ok()) {
                Some(year) => ContractTerm::ExpiresIn(year),
                None => ContractTerm::Unknown,
            }
        }
    }

    pub fn is_entry_level(&self) -> bool {
        matches!(self, ContractTerm::EntryLevel)
    }
}

/// How many of the given season headers the contract still pays.
/// An expiry year that is not one of the headers' end years counts as
/// already expired.
pub fn projected_seasons(term: &ContractTerm, headers: &[String]) -> usize {
    match term {
        ContractTerm::EntryLevel => 3,
        ContractTerm::Stream => 1,
        ContractTerm::Expire => 0,
        ContractTerm::ExpiresIn(end_year) => headers
            .iter()
            .position(|h| season_end_year(h) == Some(*end_year))
            .map(|i| i + 1)
            .unwrap_or(0),
        ContractTerm::Unknown => 0,
    }
}

pub fn season_start_year(header: &str) -> Option<i32> {
    header.split('-').next()?.trim().parse().ok()
}

pub fn season_end_year(header: &str) -> Option<i32> {
    header.split('-').nth(1)?.trim().parse().ok()
}

/// Complete years between `birth_date` and `at`.
pub fn age_on(birth_date: NaiveDate, at: NaiveDate) -> i32 {
    let mut age = at.year() - birth_date.year();
    if (at.month(), at.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

// ============================================================================
// SEASON CELLS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonCell {
    /// Contract pays this season, dollar amount.
    Salary(i64),
    /// First unpaid season, free-agency status label.
    Status(String),
    /// Past the contract and its expiry.
    Blank,
}

// ============================================================================
// PROJECTOR
// ============================================================================

pub struct Projector {
    headers: Vec<String>,
    rollover: RolloverRule,
    thresholds: RfaAgeThresholds,
    exempt: HashSet<String>,
}

impl Projector {
    pub fn new(
        headers: Vec<String>,
        rollover: RolloverRule,
        thresholds: RfaAgeThresholds,
        exempt_names: &[String],
    ) -> Self {
        let exempt = exempt_names
            .iter()
            .map(|name| normalize_name(name).to_lowercase())
            .collect();

        Projector {
            headers,
            rollover,
            thresholds,
            exempt,
        }
    }

    /// One cell per season header for this contract.
    pub fn project(
        &self,
        player: &str,
        contract: &str,
        birth_date: NaiveDate,
        is_goalie: bool,
        salary: i64,
    ) -> Vec<SeasonCell> {
        let term = ContractTerm::parse(contract);
        let paid = projected_seasons(&term, &self.headers);

        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                if i < paid {
                    SeasonCell::Salary(salary)
                } else if i == paid {
                    match self.expiry_status(&term, player, header, birth_date, is_goalie) {
                        Some(status) => SeasonCell::Status(status),
                        None => SeasonCell::Blank,
                    }
                } else {
                    SeasonCell::Blank
                }
            })
            .collect()
    }

    /// Free-agency label for the season the contract runs out in. Age is
    /// taken at the rollover date of that season's start year.
    fn expiry_status(
        &self,
        term: &ContractTerm,
        player: &str,
        header: &str,
        birth_date: NaiveDate,
        is_goalie: bool,
    ) -> Option<String> {
        let start_year = season_start_year(header)?;
        let age = age_on(birth_date, self.rollover.date_in(start_year));

        if term.is_entry_level() {
            return Some(format!("RFA ({age}*)"));
        }

        let threshold = if is_goalie {
            self.thresholds.goalie
        } else {
            self.thresholds.skater
        };
        let exempt = self.exempt.contains(&normalize_name(player).to_lowercase());

        if !exempt && age < threshold {
            Some(format!("RFA ({age})"))
        } else {
            Some(format!("UFA ({age})"))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
