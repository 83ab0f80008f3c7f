//! Field extraction from rollup documentation pages
//!
//! Pages are MDX: YAML front matter followed by markdown that embeds a handful of custom
//! components (`<Parameter>`, `<MultiRowParameters>`, `<Section>`). This is not a general
//! MDX parser. Each field has its own small extractor over the raw text that returns `None`
//! when its tag is absent, so one malformed block never hides the others.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SourceError;

/// Latency and cost of messages in one direction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessagingDirection {
    pub latency: Option<String>,
    pub cost: Option<String>,
}

/// Cross-layer messaging figures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Messaging {
    pub l1_to_l2: MessagingDirection,
    pub l2_to_l1: MessagingDirection,
}

/// One row of the RPC-API compatibility table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCall {
    pub method: String,
    pub params: String,
    pub rollup_behaviour: String,
    pub ethereum_l1_behaviour: String,
}

/// Display metadata scraped from a rollup's documentation page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownFields {
    pub block_time: Option<String>,
    pub finality: Option<String>,
    pub sequencing_frequency: Option<String>,
    pub supported_transaction_types: Option<String>,
    pub gas_limit: Option<String>,
    pub messaging: Messaging,
    pub supported_rpc_calls: Vec<RpcCall>,
}

/// `title` and `subtitle` from the page's front matter
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

/// A parsed documentation page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocPage {
    pub front_matter: FrontMatter,
    pub fields: MarkdownFields,
}

impl DocPage {
    pub fn parse(content: &str) -> Self {
        Self {
            front_matter: parse_front_matter(content),
            fields: parse_markdown_fields(content),
        }
    }
}

/// Build the pattern for a single-line `<Parameter name="..." value="..."` tag.
///
/// Words of the label may be separated by any whitespace, including line breaks.
fn parameter_pattern(label: &str, case_insensitive: bool) -> Regex {
    let label = label
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let flags = if case_insensitive { "(?i)" } else { "" };
    Regex::new(&format!(
        r#"{flags}<Parameter\s+name="{label}"\s+value="([^"]+)""#
    ))
    .expect("parameter pattern is valid")
}

static BLOCK_TIME: Lazy<Regex> = Lazy::new(|| parameter_pattern("Block Time", true));
static GAS_LIMIT: Lazy<Regex> = Lazy::new(|| parameter_pattern("Gas Limit", false));
static FINALITY: Lazy<Regex> = Lazy::new(|| parameter_pattern("Objective Finality", false));
static SEQUENCING_FREQUENCY: Lazy<Regex> =
    Lazy::new(|| parameter_pattern("Sequencing Frequency", false));

static TRANSACTION_TYPES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<Parameter\s+name="Transaction\s+Types"[^>]*>\s*((?s:.*?))(?:<|\z)"#)
        .expect("transaction types pattern is valid")
});

static MESSAGING_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<MultiRowParameters[^>]*title=["']Messaging["'][^>]*data=\{\[((?s:.*?))\]\}\s*/>"#,
    )
    .expect("messaging pattern is valid")
});

static L1_TO_L2_ROWS: Lazy<Regex> = Lazy::new(|| direction_pattern("L1", "L2"));
static L2_TO_L1_ROWS: Lazy<Regex> = Lazy::new(|| direction_pattern("L2", "L1"));
static LATENCY_ROW: Lazy<Regex> = Lazy::new(|| row_pattern("Latency"));
static COST_ROW: Lazy<Regex> = Lazy::new(|| row_pattern("Cost"));

static RPC_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<Section\s+title=["']RPC-API["']\s*>"#).expect("section pattern is valid")
});

static STATUS_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(?:Unsupported|Modified|Added)\s*/>").expect("marker pattern is valid")
});

fn direction_pattern(from: &str, to: &str) -> Regex {
    Regex::new(&format!(
        r#"title:\s*['"]{from}\s*→\s*{to}['"],\s*rows:\s*\[((?s:.*?))\]"#
    ))
    .expect("direction pattern is valid")
}

fn row_pattern(label: &str) -> Regex {
    Regex::new(&format!(
        r#"label:\s*['"]{label}['"],[^}}]*value:\s*(?:'([^'\n]*)'|"([^"\n]*)")"#
    ))
    .expect("row pattern is valid")
}

fn capture_first(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn extract_block_time(content: &str) -> Option<String> {
    capture_first(&BLOCK_TIME, content)
}

pub fn extract_gas_limit(content: &str) -> Option<String> {
    capture_first(&GAS_LIMIT, content)
}

/// Value of the "Objective Finality" parameter
pub fn extract_finality(content: &str) -> Option<String> {
    capture_first(&FINALITY, content)
}

pub fn extract_sequencing_frequency(content: &str) -> Option<String> {
    capture_first(&SEQUENCING_FREQUENCY, content)
}

/// Content following the `Transaction Types` parameter up to the next tag.
///
/// Bullet lines (`- ...`) are trimmed and joined with newlines; a block without bullets is
/// returned trimmed as-is.
pub fn extract_transaction_types(content: &str) -> Option<String> {
    let block = TRANSACTION_TYPES.captures(content)?.get(1)?.as_str();

    let bullets: Vec<&str> = block
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("- "))
        .collect();

    if bullets.is_empty() {
        Some(block.trim().to_string())
    } else {
        Some(bullets.join("\n"))
    }
}

fn extract_direction(data: &str, rows: &Regex) -> MessagingDirection {
    let Some(block) = rows.captures(data).and_then(|caps| caps.get(1)) else {
        return MessagingDirection::default();
    };

    let value = |row: &Regex| {
        row.captures(block.as_str())
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().to_string())
    };

    MessagingDirection {
        latency: value(&*LATENCY_ROW),
        cost: value(&*COST_ROW),
    }
}

/// Latency and cost for both directions from the `Messaging` multi-row parameter.
///
/// Returns `None` when the page has no such block. Directions or rows missing inside the
/// block come back as `None` individually.
pub fn extract_messaging(content: &str) -> Option<Messaging> {
    let data = MESSAGING_BLOCK.captures(content)?.get(1)?.as_str();

    Some(Messaging {
        l1_to_l2: extract_direction(data, &L1_TO_L2_ROWS),
        l2_to_l1: extract_direction(data, &L2_TO_L1_ROWS),
    })
}

fn rpc_section(content: &str) -> Option<&str> {
    let start = RPC_SECTION.find(content)?.end();
    let rest = &content[start..];
    Some(match rest.find("</Section>") {
        Some(end) => &rest[..end],
        None => rest,
    })
}

fn is_separator_row(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn parse_rpc_row(line: &str) -> Option<RpcCall> {
    let cells: Vec<&str> = line.split('|').map(str::trim).collect();
    if cells.len() < 5 {
        return None;
    }

    Some(RpcCall {
        method: cells[1].replace('`', ""),
        params: cells[2].to_string(),
        rollup_behaviour: cells[3].to_string(),
        ethereum_l1_behaviour: STATUS_MARKER.replace_all(cells[4], "").trim().to_string(),
    })
}

/// Rows of the `| Method |` table inside the `RPC-API` section, in table order.
pub fn extract_rpc_calls(content: &str) -> Vec<RpcCall> {
    let Some(section) = rpc_section(content) else {
        return Vec::new();
    };

    let mut lines = section
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.starts_with("| Method |"));

    // header
    if lines.next().is_none() {
        return Vec::new();
    }

    let mut rows = lines.take_while(|line| line.starts_with('|')).peekable();
    if rows.next_if(|line| is_separator_row(line)).is_none() {
        debug!("RPC table has no separator row");
    }

    rows.filter_map(parse_rpc_row).collect()
}

/// Run every field extractor over a page.
pub fn parse_markdown_fields(content: &str) -> MarkdownFields {
    MarkdownFields {
        block_time: extract_block_time(content),
        finality: extract_finality(content),
        sequencing_frequency: extract_sequencing_frequency(content),
        supported_transaction_types: extract_transaction_types(content),
        gas_limit: extract_gas_limit(content),
        messaging: extract_messaging(content).unwrap_or_default(),
        supported_rpc_calls: extract_rpc_calls(content),
    }
}

/// The YAML between the opening and closing `---` lines, if the page starts with one.
fn front_matter_block(content: &str) -> Option<&str> {
    let content = content.trim_start_matches('\u{feff}');
    let mut lines = content.split_inclusive('\n');
    if lines.next()?.trim() != "---" {
        return None;
    }

    let start = content.find('\n')? + 1;
    let mut end = start;
    for line in lines {
        if line.trim() == "---" {
            return Some(&content[start..end]);
        }
        end += line.len();
    }

    // Unterminated block
    None
}

/// Read `title` and `subtitle` from the page's YAML front matter.
///
/// A page without front matter, or whose front matter is not valid YAML, has neither.
pub fn parse_front_matter(content: &str) -> FrontMatter {
    let Some(block) = front_matter_block(content) else {
        return FrontMatter::default();
    };

    serde_yaml::from_str(block).unwrap_or_else(|e| {
        debug!(error = %e, "ignoring unparseable front matter");
        FrontMatter::default()
    })
}

/// Path of the documentation page for a rollup
pub fn doc_path(docs_dir: &Path, rollup: &str) -> PathBuf {
    docs_dir.join(format!("{}.mdx", rollup.to_lowercase()))
}

/// Read and parse the documentation page of `rollup`.
///
/// # Errors
///
/// Returns [`SourceError`] when the page is absent or unreadable. A readable page that lacks
/// some tags is not an error; those fields are simply `None`.
pub fn load_doc_page(docs_dir: &Path, rollup: &str) -> Result<DocPage, SourceError> {
    let path = doc_path(docs_dir, rollup);
    let content = std::fs::read_to_string(&path).map_err(|e| SourceError::from_io(path, e))?;
    Ok(DocPage::parse(&content))
}
