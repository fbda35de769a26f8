use anyhow::{Context, Result};
use chrono::Local;
use std::env;
use std::path::Path;

use capkeeper::{
    contract_table, from_penalty_rows, load_roster, penalty_table, season_headers, Config,
    CsvPublisher, FantraxClient, GraphPublisher, LinkCache, NhlClient, Orchestrator,
    TablePublisher,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let config_path = args.get(2).map(String::as_str).unwrap_or("capkeeper.json");

    match command {
        "sync" => run(config_path, true),
        "preview" => run(config_path, false),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("CapKeeper v{} - fantasy roster contract sync", capkeeper::VERSION);
    println!();
    println!("Usage: capkeeper <command> [config]");
    println!();
    println!("Commands:");
    println!("  sync      Fetch, merge, and publish to the shared workbook");
    println!("  preview   Fetch and merge, write CSV outputs only");
    println!();
    println!("Config defaults to capkeeper.json");
}

fn run(config_path: &str, publish_remote: bool) -> Result<()> {
    println!("🏒 CapKeeper - roster contract sync");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Configuration (and the token, before any network work)
    let config = Config::load(Path::new(config_path))?;
    let token = if publish_remote {
        Some(graph_token(&config)?)
    } else {
        None
    };

    // 2. League info → season headers and off-season flag
    println!("\n📅 Fetching league info...");
    let fantrax = FantraxClient::new(&config.league_id, &config.fantrax_cookie)?;
    let start_year = fantrax.league_start_year()?;
    let headers = season_headers(start_year);
    let today = Local::now().date_naive();
    let offseason = config.offseason.is_offseason(start_year, today);
    println!(
        "✓ Season {} ({})",
        headers[0],
        if offseason { "off-season" } else { "in season" }
    );

    // 3. Roster export
    println!("\n📥 Downloading roster export...");
    let roster_path = config.roster_csv_path();
    fantrax.download_roster_csv(&roster_path)?;
    let records = load_roster(&roster_path)?;
    println!("✓ Loaded {} roster rows", records.len());

    // 4. Resolve identities and merge
    println!("\n🔍 Resolving player identities...");
    let mut cache = LinkCache::open(&config.link_cache_path());
    println!("✓ Link cache holds {} players", cache.len());
    let nhl = NhlClient::new(&config.cache_dir())?;
    let mut orchestrator =
        Orchestrator::new(nhl, &mut cache, &config, headers.clone(), offseason, today);
    let merged = orchestrator.run(&records)?;
    println!("✓ Merged {} of {} records", merged.len(), records.len());

    let contracts = contract_table(&merged, &headers);

    // 5. Cap-hit penalties. A scrape failure skips the table, the contracts
    // still go out.
    println!("\n💸 Fetching cap-hit penalties...");
    let penalties = match fantrax.fetch_penalty_rows(&config.team_map) {
        Ok(rows) => {
            let hits = from_penalty_rows(&rows, start_year, &config.caphit);
            println!("✓ {} penalty rows", hits.len());
            Some(penalty_table(&hits, &headers))
        }
        Err(e) => {
            eprintln!("ERROR: Skipping cap hits: {e}");
            None
        }
    };

    // 6. Publish
    println!("\n📊 Publishing...");
    let csv_out = CsvPublisher::new(&config.outputs_dir());
    csv_out.publish("contracts", &contracts)?;
    if let Some(penalty) = &penalties {
        csv_out.publish("penalties", penalty)?;
    }

    if let Some(token) = token {
        let graph = GraphPublisher::new(&config.graph_workbook_url, &token)?;
        graph.publish("contracts", &contracts)?;
        if let Some(penalty) = &penalties {
            graph.publish("penalties", penalty)?;
        }
        graph.update_timestamp()?;
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Sync complete: {} contracts published", contracts.rows.len());

    Ok(())
}

fn graph_token(config: &Config) -> Result<String> {
    if !config.graph_token.is_empty() {
        return Ok(config.graph_token.clone());
    }
    env::var("GRAPH_TOKEN")
        .context("No Graph token: set graph_token in the config or the GRAPH_TOKEN variable")
}
