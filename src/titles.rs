use std::fs;

use camino::Utf8Path;

use crate::error::HarvestError;

/// Titles from a list file: one per line, blank lines and `#` comments skipped.
pub fn parse_titles(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_titles(path: &Utf8Path) -> Result<Vec<String>, HarvestError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|_| HarvestError::TitlesRead(path.as_std_path().to_path_buf()))?;
    Ok(parse_titles(&content))
}
