//! Parser for `::`-delimited data files.
//!
//! Two formats are supported:
//! - interaction logs: `userId::itemId::relevance::timestamp`
//! - side features:    `id::f1|f2|...|fn`
//!
//! Empty lines are skipped. Every error carries the file name, the 1-based
//! line number and the reason.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Read a file into lines, mapping a missing file to `FileNotFound`
fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(DataLoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(|s| s.to_string()).collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Take the next `::` field or report which one is missing
fn next_field<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    file: &str,
    line: usize,
    field: &str,
) -> Result<&'a str> {
    parts.next().ok_or_else(|| DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: format!("Missing {}", field),
    })
}

/// Parse a field into `T`, reporting the field name on failure
fn parse_field<T>(value: &str, file: &str, line: usize, field: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: format!("Invalid {}: {}", field, e),
    })
}

/// Parse one interaction line
pub fn parse_interaction_line(line: &str, file: &str, line_no: usize) -> Result<Interaction> {
    let mut parts = line.split("::");

    let user_id = next_field(&mut parts, file, line_no, "userId")?;
    let item_id = next_field(&mut parts, file, line_no, "itemId")?;
    let relevance = next_field(&mut parts, file, line_no, "relevance")?;
    let timestamp = next_field(&mut parts, file, line_no, "timestamp")?;

    let interaction = Interaction {
        user_id: parse_field(user_id, file, line_no, "userId")?,
        item_id: parse_field(item_id, file, line_no, "itemId")?,
        relevance: parse_field(relevance, file, line_no, "relevance")?,
        timestamp: parse_field(timestamp, file, line_no, "timestamp")?,
    };

    if !interaction.relevance.is_finite() {
        return Err(DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason: format!("Non-finite relevance: {}", interaction.relevance),
        });
    }
    Ok(interaction)
}

/// Parse an interaction log file
///
/// Format: userId::itemId::relevance::timestamp
pub fn parse_log(path: &Path) -> Result<InteractionLog> {
    let file = file_name(path);
    let lines = read_lines(path)?;
    let mut log = InteractionLog::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }
        log.push(parse_interaction_line(line_trimmed, &file, idx + 1)?);
    }
    Ok(log)
}

/// Parse a side-feature file
///
/// Format: id::f1|f2|...|fn
///
/// All rows must have the same number of features.
pub fn parse_features(path: &Path) -> Result<FeatureTable> {
    let file = file_name(path);
    let lines = read_lines(path)?;
    let mut table = FeatureTable::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }
        let mut parts = line_trimmed.split("::");

        let id = next_field(&mut parts, &file, line_no, "id")?;
        let values = next_field(&mut parts, &file, line_no, "features")?;

        let id: u32 = parse_field(id, &file, line_no, "id")?;
        let features = values
            .split('|')
            .map(|v| parse_field::<f64>(v, &file, line_no, "feature"))
            .collect::<Result<Vec<f64>>>()?;

        table.insert(id, features)?;
    }
    Ok(table)
}
