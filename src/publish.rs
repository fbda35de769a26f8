// 📊 Publishers - contract tables out to CSV and the shared workbook
// Every publisher consumes the same ContractTable. The CSV publisher is the
// local fallback and the fixture of record; the Graph publisher upserts the
// workbook tables in the order the sheet tolerates: read the old range,
// append the new rows, then delete the old rows.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::merge::ContractTable;

const HTTP_TIMEOUT_SECS: u64 = 30;

pub trait TablePublisher {
    /// Publish a table under a logical name ("contracts", "penalties").
    fn publish(&self, name: &str, table: &ContractTable) -> Result<()>;
}

// ============================================================================
// CSV PUBLISHER
// ============================================================================

pub struct CsvPublisher {
    out_dir: PathBuf,
}

impl CsvPublisher {
    pub fn new(out_dir: &Path) -> Self {
        CsvPublisher {
            out_dir: out_dir.to_path_buf(),
        }
    }
}

impl TablePublisher for CsvPublisher {
    fn publish(&self, name: &str, table: &ContractTable) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("Failed to create {}", self.out_dir.display()))?;

        let path = self.out_dir.join(format!("{name}.csv"));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        writer
            .write_record(&table.headers)
            .context("Failed to write CSV header")?;
        for row in &table.rows {
            let record: Vec<String> = row.iter().map(cell_text).collect();
            writer
                .write_record(&record)
                .context("Failed to write CSV row")?;
        }
        writer.flush().context("Failed to flush CSV")?;

        println!("✓ Wrote {}", path.display());
        Ok(())
    }
}

/// Plain text for a JSON cell; numbers render bare, null as empty.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// GRAPH PUBLISHER
// ============================================================================

/// Worksheet and table behind a logical table name.
pub fn workbook_target(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "contracts" => Some(("All Contracts", "Players")),
        "penalties" => Some(("All Penalties", "Hits")),
        _ => None,
    }
}

/// Data rows of a table range address: drop the sheet prefix and start at
/// row 2 so the header row survives the delete.
pub fn data_range(address: &str) -> Option<String> {
    let address = address.replacen("A1", "A2", 1);
    address.split('!').nth(1).map(str::to_string)
}

pub fn timestamp_label(now: DateTime<Utc>) -> String {
    format!("{} UTC", now.format("%Y/%m/%d %H:%M"))
}

/// Microsoft Graph workbook publisher. `workbook_url` points at the
/// workbook root (`.../items/{id}/workbook`); the bearer token arrives
/// ready-made from config or environment.
pub struct GraphPublisher {
    client: reqwest::blocking::Client,
    workbook_url: String,
    token: String,
}

impl GraphPublisher {
    pub fn new(workbook_url: &str, token: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(GraphPublisher {
            client,
            workbook_url: workbook_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn table_url(&self, sheet: &str, table: &str) -> String {
        format!("{}/worksheets/{sheet}/tables/{table}", self.workbook_url)
    }

    fn existing_range(&self, table_url: &str) -> Result<String> {
        println!("Getting existing range...");
        let body: Value = self
            .client
            .get(format!("{table_url}/range"))
            .bearer_auth(&self.token)
            .send()
            .context("Range request failed")?
            .error_for_status()
            .context("Range request rejected")?
            .json()
            .context("Failed to parse range response")?;

        let address = body
            .get("address")
            .and_then(Value::as_str)
            .context("Range response has no address")?;
        data_range(address).with_context(|| format!("Unusable range address {address:?}"))
    }

    fn append_rows(&self, table_url: &str, rows: &[Vec<Value>]) -> Result<()> {
        println!("Adding rows from merged table...");
        self.client
            .post(format!("{table_url}/rows"))
            .bearer_auth(&self.token)
            .json(&json!({ "values": rows, "index": null }))
            .send()
            .context("Row append failed")?
            .error_for_status()
            .context("Row append rejected")?;
        Ok(())
    }

    fn delete_range(&self, sheet: &str, range: &str) -> Result<()> {
        println!("Deleting existing {sheet} rows...");
        self.client
            .post(format!(
                "{}/worksheets/{sheet}/range(address='{range}')/delete",
                self.workbook_url
            ))
            .bearer_auth(&self.token)
            .json(&json!({ "shift": "Up" }))
            .send()
            .context("Range delete failed")?
            .error_for_status()
            .context("Range delete rejected")?;
        Ok(())
    }

    /// Stamp the Summary sheet with the time of this run.
    pub fn update_timestamp(&self) -> Result<()> {
        println!("Updating last updated timestamp...");
        self.client
            .patch(format!(
                "{}/worksheets/Summary/range(address='A25')",
                self.workbook_url
            ))
            .bearer_auth(&self.token)
            .json(&json!({ "values": [[timestamp_label(Utc::now())]] }))
            .send()
            .context("Timestamp update failed")?
            .error_for_status()
            .context("Timestamp update rejected")?;
        Ok(())
    }
}

impl TablePublisher for GraphPublisher {
    fn publish(&self, name: &str, table: &ContractTable) -> Result<()> {
        let Some((sheet, table_name)) = workbook_target(name) else {
            bail!("No workbook table mapped for {name}");
        };

        let table_url = self.table_url(sheet, table_name);
        let old_range = self.existing_range(&table_url)?;
        self.append_rows(&table_url, &table.rows)?;
        self.delete_range(sheet, &old_range)?;

        println!("✓ Published {} rows to {sheet}", table.rows.len());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_data_range_skips_header_row() {
        assert_eq!(
            data_range("All Contracts!A1:O200").as_deref(),
            Some("A2:O200")
        );
        assert_eq!(data_range("Hits!A1:K14").as_deref(), Some("A2:K14"));
        assert!(data_range("A1:O200").is_none());
    }

    #[test]
    fn test_workbook_target_mapping() {
        assert_eq!(workbook_target("contracts"), Some(("All Contracts", "Players")));
        assert_eq!(workbook_target("penalties"), Some(("All Penalties", "Hits")));
        assert_eq!(workbook_target("bids"), None);
    }

    #[test]
    fn test_timestamp_label_format() {
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 14, 30, 59).unwrap();
        assert_eq!(timestamp_label(at), "2025/07/01 14:30 UTC");
    }

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(cell_text(&json!("Leon Draisaitl")), "Leon Draisaitl");
        assert_eq!(cell_text(&json!(8_500_000)), "8500000");
        assert_eq!(cell_text(&json!("")), "");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_csv_publisher_writes_table() {
        let dir = std::env::temp_dir().join(format!("capkeeper_pub_{}", std::process::id()));
        let publisher = CsvPublisher::new(&dir);

        let table = ContractTable {
            headers: vec![
                "Player".to_string(),
                "Team".to_string(),
                "2025-2026".to_string(),
            ],
            rows: vec![vec![json!("Leon Draisaitl"), json!("Ice Holes"), json!(8_500_000)]],
        };

        publisher.publish("contracts", &table).unwrap();

        let written = fs::read_to_string(dir.join("contracts.csv")).unwrap();
        assert!(written.starts_with("Player,Team,2025-2026"));
        assert!(written.contains("Leon Draisaitl,Ice Holes,8500000"));

        let _ = fs::remove_dir_all(dir);
    }
}
