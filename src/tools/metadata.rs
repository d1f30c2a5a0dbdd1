//! Structured policy-metadata lookup over a tabular source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Tool, ToolError};

/// Registry name of the metadata lookup tool.
pub const METADATA_TOOL_NAME: &str = "lookup_policy_metadata";

/// User-facing text returned when the metadata source cannot be read.
pub const METADATA_UNAVAILABLE: &str = "Unable to retrieve policy metadata at this time.";

/// Placeholder shown when a record has no managers listed.
const NO_MANAGER: &str = "—";

/// One row of the policy metadata table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyRecord {
    pub policy_title: String,
    pub published_status: String,
    pub managers: String,
    pub business_owner: String,
    pub review_cycle: String,
}

/// Looks up policy metadata by substring match over title, then owner or
/// manager fields. Always returns actionable text: every matching row, or a
/// listing of known titles when nothing matches.
///
/// The table is re-read wholesale on each lookup; a missing or malformed file
/// degrades to a "metadata unavailable" message rather than an error.
pub struct MetadataLookupTool {
    csv_path: PathBuf,
}

impl MetadataLookupTool {
    #[must_use]
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
        }
    }

    async fn load_records(&self) -> Result<Vec<PolicyRecord>, String> {
        let raw = tokio::fs::read_to_string(&self.csv_path)
            .await
            .map_err(|err| format!("cannot read {}: {err}", self.csv_path.display()))?;
        parse_table(&raw)
    }
}

#[async_trait]
impl Tool for MetadataLookupTool {
    fn name(&self) -> &str {
        METADATA_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Retrieve policy metadata (status, managers, owner, review cycle) for a policy title."
    }

    async fn call(&self, arguments: &str) -> Result<String, ToolError> {
        match self.load_records().await {
            Ok(records) => Ok(lookup(&records, arguments)),
            Err(err) => {
                tracing::warn!(path = %self.csv_path.display(), error = %err, "metadata lookup failed");
                Ok(METADATA_UNAVAILABLE.to_string())
            }
        }
    }
}

/// Matches `query` against the records and formats the result text.
///
/// Case-insensitive substring match on the title first; if no title matches,
/// owner and manager fields are tried; if nothing matches, the known titles
/// are listed as guidance. All matching rows are returned so the caller can
/// disambiguate.
#[must_use]
pub fn lookup(records: &[PolicyRecord], query: &str) -> String {
    let q = query.trim().to_lowercase();

    let mut matches: Vec<&PolicyRecord> = records
        .iter()
        .filter(|r| r.policy_title.to_lowercase().contains(&q))
        .collect();
    if matches.is_empty() {
        matches = records
            .iter()
            .filter(|r| {
                r.business_owner.to_lowercase().contains(&q)
                    || r.managers.to_lowercase().contains(&q)
            })
            .collect();
    }

    if matches.is_empty() {
        let titles: Vec<&str> = records.iter().map(|r| r.policy_title.as_str()).collect();
        return format!(
            "No direct metadata match. Available policies: {}",
            titles.join(", ")
        );
    }

    matches
        .iter()
        .map(|r| {
            let managers = if r.managers.trim().is_empty() {
                NO_MANAGER
            } else {
                r.managers.as_str()
            };
            format!(
                "- {} | status: {} | manager(s): {} | owner: {} | review: {}",
                r.policy_title, r.published_status, managers, r.business_owner, r.review_cycle
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses the metadata table (header + rows) into records.
fn parse_table(raw: &str) -> Result<Vec<PolicyRecord>, String> {
    let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| "empty metadata table".to_string())?;
    let columns = parse_csv_line(header);

    let index_of = |name: &str| -> Result<usize, String> {
        columns
            .iter()
            .position(|c| c.trim() == name)
            .ok_or_else(|| format!("metadata table is missing column '{name}'"))
    };
    let title_idx = index_of("policy_title")?;
    let status_idx = index_of("published_status")?;
    let managers_idx = index_of("managers")?;
    let owner_idx = index_of("business_owner")?;
    let review_idx = index_of("review_cycle")?;

    let field = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();

    Ok(lines
        .map(|line| {
            let row = parse_csv_line(line);
            PolicyRecord {
                policy_title: field(&row, title_idx),
                published_status: field(&row, status_idx),
                managers: field(&row, managers_idx),
                business_owner: field(&row, owner_idx),
                review_cycle: field(&row, review_idx),
            }
        })
        .collect())
}

/// Splits one CSV line, honoring double-quoted fields with `""` escapes.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
