// 🔍 Identity Resolver - ties roster exports to authoritative players
// Additive scoring over independent signals. A full-name match outweighs
// every partial signal combined, so a weaker name can never out-vote an
// exact one on team and age alone. Ties are never guessed: two candidates
// at the same top score leave the record unresolved with both surfaced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cache::{IdentityLink, LinkCache};
use crate::config::KnownGap;
use crate::nhl::{PlayerCandidate, PlayerSource};
use crate::normalize::{last_name, normalize_name};
use crate::projector::age_on;
use crate::roster::RosterRecord;

// ============================================================================
// SCORING WEIGHTS
// ============================================================================

/// Signal weights for candidate scoring. Defaults keep the full-name signal
/// strictly above last name + team + age combined, with the acceptance floor
/// at the exact-name mark's half.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchWeights {
    #[serde(default = "default_full_name")]
    pub full_name: u32,
    #[serde(default = "default_last_name")]
    pub last_name: u32,
    #[serde(default = "default_team")]
    pub team: u32,
    #[serde(default = "default_age")]
    pub age: u32,
    #[serde(default = "default_floor")]
    pub floor: u32,
}

fn default_full_name() -> u32 {
    100
}

fn default_last_name() -> u32 {
    30
}

fn default_team() -> u32 {
    25
}

fn default_age() -> u32 {
    20
}

fn default_floor() -> u32 {
    50
}

impl Default for MatchWeights {
    fn default() -> Self {
        MatchWeights {
            full_name: default_full_name(),
            last_name: default_last_name(),
            team: default_team(),
            age: default_age(),
            floor: default_floor(),
        }
    }
}

// ============================================================================
// SCORE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSignal {
    FullName,
    LastName,
    Team,
    Age,
}

impl MatchSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSignal::FullName => "full name",
            MatchSignal::LastName => "last name",
            MatchSignal::Team => "team",
            MatchSignal::Age => "age",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchScore {
    pub total: u32,
    pub signals: Vec<MatchSignal>,
}

/// Score one candidate against one roster record. Pure: everything it needs
/// arrives as arguments, `today` anchors age derivation from birth dates.
pub fn score_candidate(
    record: &RosterRecord,
    candidate: &PlayerCandidate,
    weights: &MatchWeights,
    today: NaiveDate,
) -> MatchScore {
    let mut total = 0;
    let mut signals = Vec::new();

    let record_name = normalize_name(&record.player);
    let candidate_name = normalize_name(&candidate.name);

    let full_name_hit = record_name.eq_ignore_ascii_case(&candidate_name);
    if full_name_hit {
        total += weights.full_name;
        signals.push(MatchSignal::FullName);
    } else {
        // Last name is the fallback signal, it only counts when the full
        // name disagrees.
        let record_last = last_name(&record_name);
        let candidate_last = match &candidate.last_name {
            Some(last) => normalize_name(last),
            None => last_name(&candidate_name),
        };
        if !record_last.is_empty() && record_last.eq_ignore_ascii_case(&candidate_last) {
            total += weights.last_name;
            signals.push(MatchSignal::LastName);
        }
    }

    if let Some(team) = &candidate.team_abbrev {
        if !record.team.is_empty() && record.team.eq_ignore_ascii_case(team) {
            total += weights.team;
            signals.push(MatchSignal::Team);
        }
    }

    let candidate_age = candidate
        .age
        .or_else(|| candidate.birth_date.map(|dob| age_on(dob, today)));
    if let (Some(roster_age), Some(candidate_age)) = (record.age_years(), candidate_age) {
        if roster_age == candidate_age {
            total += weights.age;
            signals.push(MatchSignal::Age);
        }
    }

    MatchScore { total, signals }
}

// ============================================================================
// RESOLUTION RESULTS
// ============================================================================

#[derive(Debug, Clone)]
pub enum Resolution {
    /// Identity settled, link already persisted.
    Resolved(IdentityLink),
    /// Listed as a known gap with no override birth date, skip the record.
    KnownGap,
    /// Could not settle on one candidate.
    Unresolved(Unresolved),
}

#[derive(Debug, Clone)]
pub enum Unresolved {
    /// The search returned nothing at all.
    NoCandidates,
    /// Candidates existed but none reached the acceptance floor.
    BelowFloor { best: u32 },
    /// Two or more candidates tied at the top score.
    Ambiguous { tied: Vec<String> },
    /// The source itself failed.
    SearchFailed(String),
}

impl Unresolved {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unresolved::NoCandidates => "no candidates",
            Unresolved::BelowFloor { .. } => "below floor",
            Unresolved::Ambiguous { .. } => "ambiguous",
            Unresolved::SearchFailed(_) => "search failed",
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct Resolver<'a, S: PlayerSource> {
    source: S,
    cache: &'a mut LinkCache,
    weights: MatchWeights,
    known_gaps: HashMap<String, Option<NaiveDate>>,
    today: NaiveDate,
}

impl<'a, S: PlayerSource> Resolver<'a, S> {
    pub fn new(
        source: S,
        cache: &'a mut LinkCache,
        weights: MatchWeights,
        known_gaps: &[KnownGap],
        today: NaiveDate,
    ) -> Self {
        let known_gaps = known_gaps
            .iter()
            .map(|gap| (normalize_name(&gap.name).to_lowercase(), gap.birth_date))
            .collect();

        Resolver {
            source,
            cache,
            weights,
            known_gaps,
            today,
        }
    }

    /// Resolve one roster record to an identity. The cache is consulted
    /// first, so each external id hits the search source at most once across
    /// all runs; a fresh resolution is persisted before it is returned.
    pub fn resolve(&mut self, record: &RosterRecord) -> Resolution {
        if let Some(link) = self.cache.get(&record.external_id) {
            return Resolution::Resolved(link.clone());
        }

        // Known-gap players never resolve against the source. An override
        // birth date yields a minimal identity; the config stays the source
        // of truth for these, so nothing is cached.
        let gap_key = normalize_name(&record.player).to_lowercase();
        if let Some(override_dob) = self.known_gaps.get(&gap_key) {
            return match override_dob {
                Some(dob) => Resolution::Resolved(IdentityLink {
                    external_id: record.external_id.clone(),
                    nhl_id: None,
                    name: record.player.clone(),
                    birth_date: *dob,
                }),
                None => Resolution::KnownGap,
            };
        }

        let candidates = match self.source.search(&record.player) {
            Ok(candidates) => candidates,
            Err(e) => {
                eprintln!("ERROR: Search for {} failed: {e}", record.player);
                return Resolution::Unresolved(Unresolved::SearchFailed(e.to_string()));
            }
        };

        if candidates.is_empty() {
            eprintln!("ERROR: Search for {} returned empty list.", record.player);
            return Resolution::Unresolved(Unresolved::NoCandidates);
        }

        let mut scored: Vec<(MatchScore, &PlayerCandidate)> = candidates
            .iter()
            .map(|c| (score_candidate(record, c, &self.weights, self.today), c))
            .collect();
        scored.sort_by(|a, b| b.0.total.cmp(&a.0.total));

        let best = scored[0].0.total;
        if best < self.weights.floor {
            eprintln!("ERROR: Trouble finding matches for {}.", record.player);
            return Resolution::Unresolved(Unresolved::BelowFloor { best });
        }

        // Strict max or nothing. A shared top score is a guess we refuse
        // to make.
        let tied: Vec<String> = scored
            .iter()
            .take_while(|(score, _)| score.total == best)
            .map(|(_, c)| c.name.clone())
            .collect();
        if tied.len() > 1 {
            eprintln!("ERROR: Trouble finding matches for {}.", record.player);
            eprintln!("  Tied at {best}: {}", tied.join(", "));
            return Resolution::Unresolved(Unresolved::Ambiguous { tied });
        }

        let winner = scored[0].1;
        let birth_date = match winner.birth_date {
            Some(dob) => dob,
            None => match self.source.birth_date(winner.id) {
                Ok(dob) => dob,
                Err(e) => {
                    eprintln!("ERROR: No birth date for {}: {e}", winner.name);
                    return Resolution::Unresolved(Unresolved::SearchFailed(e.to_string()));
                }
            },
        };

        let link = IdentityLink {
            external_id: record.external_id.clone(),
            nhl_id: Some(winner.id),
            name: record.player.clone(),
            birth_date,
        };

        if let Err(e) = self.cache.insert(link.clone()) {
            eprintln!("ERROR: {e}");
        }

        println!("FOUND: {} {} {}", record.player, winner.name, birth_date);
        Resolution::Resolved(link)
    }
}

// ============================================================================
// TESTS
// ============================================================================
