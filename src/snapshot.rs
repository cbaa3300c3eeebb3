use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HarvestError;
use crate::registry::{PaperRegistry, ReferenceGraph};

pub const SNAPSHOT_EXTENSION: &str = "json";

#[derive(Serialize)]
struct SnapshotRef<'a> {
    papers: &'a PaperRegistry,
    references: &'a ReferenceGraph,
}

#[derive(Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    papers: PaperRegistry,
    #[serde(default)]
    references: ReferenceGraph,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded {
        registry: PaperRegistry,
        graph: ReferenceGraph,
    },
    NotFound,
}

impl LoadOutcome {
    /// Collections from the snapshot, or empty ones when there was nothing to load.
    pub fn into_collections(self) -> (PaperRegistry, ReferenceGraph) {
        match self {
            LoadOutcome::Loaded { registry, graph } => (registry, graph),
            LoadOutcome::NotFound => (PaperRegistry::new(), ReferenceGraph::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub path: String,
    pub found: bool,
    pub papers: usize,
    pub papers_with_arxiv_id: usize,
    pub reference_entries: usize,
    pub reference_links: usize,
}

impl SnapshotSummary {
    pub fn from_outcome(path: &Utf8Path, outcome: &LoadOutcome) -> Self {
        match outcome {
            LoadOutcome::Loaded { registry, graph } => Self {
                path: path.to_string(),
                found: true,
                papers: registry.len(),
                papers_with_arxiv_id: registry
                    .all()
                    .filter(|record| record.arxiv_id.is_some())
                    .count(),
                reference_entries: graph.len(),
                reference_links: graph.all().map(|entry| entry.references.len()).sum(),
            },
            LoadOutcome::NotFound => Self {
                path: path.to_string(),
                found: false,
                papers: 0,
                papers_with_arxiv_id: 0,
                reference_entries: 0,
                reference_links: 0,
            },
        }
    }
}

/// `semantic_data_<%Y-%m-%d_%H-%M-%S>_<count>_files.json`
pub fn snapshot_file_name<Tz: TimeZone>(timestamp: &DateTime<Tz>, count: usize) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "semantic_data_{}_{count}_files.{SNAPSHOT_EXTENSION}",
        timestamp.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Writes both collections to `path`, replacing any existing file.
pub fn save(
    registry: &PaperRegistry,
    graph: &ReferenceGraph,
    path: &Utf8Path,
) -> Result<(), HarvestError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;

    let content = serde_json::to_vec_pretty(&SnapshotRef {
        papers: registry,
        references: graph,
    })
    .map_err(|err| HarvestError::Filesystem(err.to_string()))?;

    let mut temp = tempfile::Builder::new()
        .prefix("scholar-harvest-snapshot")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    temp.write_all(&content)
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    debug!(%path, papers = registry.len(), entries = graph.len(), "Data saved");
    Ok(())
}

pub fn load(path: &Utf8Path) -> Result<LoadOutcome, HarvestError> {
    let content = match fs::read(path.as_std_path()) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(%path, "snapshot not found");
            return Ok(LoadOutcome::NotFound);
        }
        Err(err) => return Err(HarvestError::Filesystem(err.to_string())),
    };
    let snapshot: SnapshotFile =
        serde_json::from_slice(&content).map_err(|err| HarvestError::SnapshotParse {
            path: path.as_std_path().to_path_buf(),
            message: err.to_string(),
        })?;
    Ok(LoadOutcome::Loaded {
        registry: snapshot.papers,
        graph: snapshot.references,
    })
}
