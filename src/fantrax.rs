// 🥅 Fantrax Client - league info, roster export, penalty admin page
// Three surfaces, three formats: a JSON request envelope for league info,
// a CSV download for the roster (behind the login cookie), and a plain HTML
// admin page for cap-hit penalties. The HTML helpers are deliberately naive
// string scanners tailored to that one table.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const FANTRAX_BASE_URL: &str = "https://www.fantrax.com";

const HTTP_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("capkeeper/", env!("CARGO_PKG_VERSION"));

/// One row of the cap-hit penalty admin table, still unclassified.
#[derive(Debug, Clone)]
pub struct PenaltyRow {
    pub team: String,
    pub expiry_year: Option<i32>,
    pub amount: i64,
    pub player: String,
    pub note: String,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct FantraxClient {
    client: reqwest::blocking::Client,
    league_id: String,
    cookie: String,
}

impl FantraxClient {
    pub fn new(league_id: &str, cookie: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(FantraxClient {
            client,
            league_id: league_id.to_string(),
            cookie: cookie.to_string(),
        })
    }

    fn league_url(&self) -> String {
        format!("{FANTRAX_BASE_URL}/fxpa/req?leagueId={}", self.league_id)
    }

    fn export_url(&self) -> String {
        format!(
            "{FANTRAX_BASE_URL}/fxpa/downloadPlayerStats?leagueId={}\
             &pageNumber=1&view=STATS&positionOrGroup=ALL&sortType=SALARY\
             &statusOrTeamFilter=ALL_TAKEN",
            self.league_id
        )
    }

    fn penalties_url(&self) -> String {
        format!(
            "{FANTRAX_BASE_URL}/newui/fantasy/capHitPenaltyAdmin.go?leagueId={}",
            self.league_id
        )
    }

    /// Start year of the league's current season, e.g. 2025 for "2025-26".
    pub fn league_start_year(&self) -> Result<i32> {
        let payload = json!({"msgs": [{"method": "getFantasyLeagueInfo", "data": {}}]});

        let body: Value = self
            .client
            .post(self.league_url())
            .json(&payload)
            .send()
            .context("League info request failed")?
            .error_for_status()
            .context("League info request rejected")?
            .json()
            .context("Failed to parse league info response")?;

        parse_league_start_year(&body)
    }

    /// Download the roster CSV export to `dest`. An authentication failure
    /// comes back as a JSON error payload, which must never be written out
    /// as if it were the roster.
    pub fn download_roster_csv(&self, dest: &Path) -> Result<()> {
        let body = self
            .client
            .get(self.export_url())
            .header("Cookie", &self.cookie)
            .send()
            .context("Roster export request failed")?
            .error_for_status()
            .context("Roster export request rejected")?
            .text()
            .context("Failed to read roster export body")?;

        if let Some(text) = error_payload_text(&body) {
            bail!("Fantrax refused the roster export: {text}");
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(dest, body)
            .with_context(|| format!("Failed to write roster export to {}", dest.display()))?;

        Ok(())
    }

    /// Scrape the cap-hit penalty rows off the admin page. Team ids are
    /// mapped to display names where the map knows them.
    pub fn fetch_penalty_rows(
        &self,
        team_map: &HashMap<String, String>,
    ) -> Result<Vec<PenaltyRow>> {
        let html = self
            .client
            .get(self.penalties_url())
            .header("Cookie", &self.cookie)
            .send()
            .context("Penalty page request failed")?
            .error_for_status()
            .context("Penalty page request rejected")?
            .text()
            .context("Failed to read penalty page body")?;

        parse_penalty_rows(&html, team_map)
    }
}

// ============================================================================
// RESPONSE PARSING
// ============================================================================

pub fn parse_league_start_year(body: &Value) -> Result<i32> {
    let display = body
        .pointer("/responses/0/data/fantasySettings/season/displayYear")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("League info response is missing the season displayYear"))?;

    display
        .split('-')
        .next()
        .unwrap_or(display)
        .trim()
        .parse()
        .with_context(|| format!("Unparseable displayYear {display:?}"))
}

/// Fantrax serves `{"pageError": {"text": "..."}}` instead of the CSV when
/// the cookie is missing or stale. Anything that is not JSON is the export.
fn error_payload_text(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    Some(value.pointer("/pageError/text")?.as_str()?.to_string())
}

/// Pull penalty rows out of the admin page's `tblPenalties` table.
/// Column order: team logo, date, expiry year, amount, player, note. The
/// first row is the header. Team id rides on the `<tr>` as an attribute.
pub fn parse_penalty_rows(
    html: &str,
    team_map: &HashMap<String, String>,
) -> Result<Vec<PenaltyRow>> {
    let table = table_inner(html, "tblPenalties")
        .ok_or_else(|| anyhow!("Penalty table not found in admin page"))?;

    let mut rows = Vec::new();
    let mut pos = 0;
    let mut header_seen = false;

    while let Some((start, end)) = next_tag_block(table, "<tr", "</tr>", pos) {
        pos = end;
        let block = &table[start..end];

        if !header_seen {
            header_seen = true;
            continue;
        }

        let mut cells = Vec::new();
        let mut cell_pos = 0;
        while let Some((cs, ce)) = next_tag_block(block, "<td", "</td>", cell_pos) {
            cells.push(inner_html(&block[cs..ce]));
            cell_pos = ce;
        }
        if cells.len() < 6 {
            continue;
        }

        let team_id = open_tag_attr(block, "teamid").unwrap_or_default();
        let team = team_map.get(&team_id).cloned().unwrap_or(team_id);

        let expiry_year = strip_tags(&cells[2]).parse().ok();
        let amount = parse_dollars(&strip_tags(&cells[3]));

        // The player cell links to the player page; dropped players lose
        // the link and leave bare text.
        let player = match next_tag_block(&cells[4], "<a", "</a>", 0) {
            Some((s, e)) => strip_tags(&cells[4][s..e]),
            None => strip_tags(&cells[4]),
        };
        let note = strip_tags(&cells[5]);

        rows.push(PenaltyRow {
            team,
            expiry_year,
            amount,
            player,
            note,
        });
    }

    Ok(rows)
}

fn parse_dollars(text: &str) -> i64 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

// ============================================================================
// HTML HELPERS
// ============================================================================

/// Inner HTML of the table whose opening tag mentions `table_id`.
fn table_inner<'a>(html: &'a str, table_id: &str) -> Option<&'a str> {
    let lc = ascii_lowercase(html);
    let id_idx = lc.find(&ascii_lowercase(table_id))?;
    let after_open = html[id_idx..].find('>')? + id_idx + 1;
    let close_rel = lc[after_open..].find("</table>")?;
    Some(&html[after_open..after_open + close_rel])
}

/// Next complete `<open ...>...</close>` block from `from` onwards,
/// case-insensitive on tag names. Returns byte offsets spanning the block.
fn next_tag_block(s: &str, open_tag: &str, close_tag: &str, from: usize) -> Option<(usize, usize)> {
    let lc = ascii_lowercase(s);
    let open_lc = ascii_lowercase(open_tag);
    let close_lc = ascii_lowercase(close_tag);

    let start = lc.get(from..)?.find(&open_lc)? + from;
    let open_end = s[start..].find('>')? + start + 1;
    let end_rel = lc[open_end..].find(&close_lc)?;
    Some((start, open_end + end_rel + close_tag.len()))
}

/// Contents of a block between its opening and closing tags; nested tags
/// stay in place.
fn inner_html(block: &str) -> String {
    if let Some(open_end) = block.find('>') {
        if let Some(close_start) = block.rfind('<') {
            if close_start > open_end {
                return block[open_end + 1..close_start].to_string();
            }
        }
    }
    String::new()
}

/// Value of `attr` in the block's opening tag, quoted or bare.
fn open_tag_attr(block: &str, attr: &str) -> Option<String> {
    let open_end = block.find('>')?;
    let open_tag = &block[..open_end];
    let lc = ascii_lowercase(open_tag);

    let idx = lc.find(&format!("{attr}=")).map(|i| i + attr.len() + 1)?;
    let rest = &open_tag[idx..];
    match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let rest = &rest[1..];
            let end = rest.find(quote)?;
            Some(rest[..end].to_string())
        }
        _ => {
            let end = rest
                .find(|c: char| c.is_whitespace())
                .unwrap_or(rest.len());
            Some(rest[..end].to_string())
        }
    }
}

/// Drop every `<...>` tag, decode the common entities, collapse whitespace.
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&out.replace("&nbsp;", " ").replace("&amp;", "&"))
}

fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

fn ascii_lowercase(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
