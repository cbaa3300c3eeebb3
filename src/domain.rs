use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

pub const NO_YEAR_MARKER: &str = "no_year";

/// Opaque Semantic Scholar paper identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaperId {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && !normalized.chars().any(|ch| ch.is_whitespace() || ch == '/');
        if !is_valid {
            return Err(HarvestError::InvalidPaperId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// arXiv identifier, new style (`1706.03762`, `2101.00001v2`) or old style (`cs/0112017`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArxivId(String);

impl ArxivId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for the PDF; old-style ids carry a `/` that cannot live in a file name.
    pub fn pdf_file_name(&self) -> String {
        format!("{}.pdf", self.0.replace('/', "_"))
    }
}

impl fmt::Display for ArxivId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArxivId {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if !arxiv_pattern().is_match(normalized) {
            return Err(HarvestError::InvalidArxivId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

fn arxiv_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.\-]*(?:/\d+)?(?:v\d+)?$")
            .expect("valid arXiv regex")
    })
}

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}$").expect("valid year regex"))
}

/// Leading year component of an ISO-like date (`2017-06-12` -> `2017`).
pub fn year_from_date(date: &str) -> Option<String> {
    let leading = date.trim().split('-').next()?;
    year_pattern()
        .is_match(leading)
        .then(|| leading.to_string())
}

/// Directory a paper's PDF is stored in: `<prefix>_<year>` or `<prefix>_no_year`.
pub fn pdf_directory_name(prefix: &str, year: Option<&str>) -> String {
    format!("{prefix}_{}", year.unwrap_or(NO_YEAR_MARKER))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_paper_id_trims() {
        let id: PaperId = " 204e3073870fae3d05bcbc2f6a8e263d9b72e776 ".parse().unwrap();
        assert_eq!(id.as_str(), "204e3073870fae3d05bcbc2f6a8e263d9b72e776");
    }

    #[test]
    fn parse_paper_id_rejects_blank() {
        let err = "   ".parse::<PaperId>().unwrap_err();
        assert_matches!(err, HarvestError::InvalidPaperId(_));
    }

    #[test]
    fn parse_arxiv_ids() {
        assert!("1706.03762".parse::<ArxivId>().is_ok());
        assert!("2101.00001v2".parse::<ArxivId>().is_ok());
        assert!("cs/0112017".parse::<ArxivId>().is_ok());
        assert!("math.GT/0309136".parse::<ArxivId>().is_ok());
        assert_matches!(
            "not an id".parse::<ArxivId>(),
            Err(HarvestError::InvalidArxivId(_))
        );
    }

    #[test]
    fn old_style_pdf_file_name() {
        let id: ArxivId = "cs/0112017".parse().unwrap();
        assert_eq!(id.pdf_file_name(), "cs_0112017.pdf");
    }

    #[test]
    fn year_extraction() {
        assert_eq!(year_from_date("2017-06-12").as_deref(), Some("2017"));
        assert_eq!(year_from_date("2020").as_deref(), Some("2020"));
        assert_eq!(year_from_date(""), None);
        assert_eq!(year_from_date("June 2017"), None);
    }
}
