// CapKeeper - Core Library
// Exposes all modules for use in the CLI and tests

pub mod cache;      // Identity link cache - SQLite write-through
pub mod caphits;    // Cap-hit penalty classification and table
pub mod config;     // Run configuration and policies
pub mod fantrax;    // Fantrax league/export/penalty client
pub mod merge;      // Merge orchestrator - roster rows → contract table
pub mod nhl;        // NHL API client + PlayerSource trait
pub mod normalize;  // Name normalization for matching
pub mod projector;  // Contract labels → season cells
pub mod publish;    // CSV and Graph workbook publishers
pub mod resolver;   // Identity resolver - scored candidate matching
pub mod roster;     // Fantrax roster CSV records

// Re-export commonly used types
pub use cache::{IdentityLink, LinkCache};
pub use caphits::{from_penalty_rows, penalty_table, CapHit, CapHitKind};
pub use config::{season_headers, Config, OffseasonPolicy, RolloverRule, SEASON_COLUMNS};
pub use fantrax::{FantraxClient, PenaltyRow};
pub use merge::{contract_table, ContractTable, MergedRecord, Orchestrator};
pub use nhl::{KeyedPlayerSource, NhlClient, PlayerCandidate, PlayerSource};
pub use normalize::normalize_name;
pub use projector::{ContractTerm, Projector, SeasonCell};
pub use publish::{CsvPublisher, GraphPublisher, TablePublisher};
pub use resolver::{MatchWeights, Resolution, Resolver, Unresolved};
pub use roster::{load_roster, RosterRecord, RosterSlot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
