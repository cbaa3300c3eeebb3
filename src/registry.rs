use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ArxivId, PaperId};

/// Bibliographic metadata for one distinct paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: Option<String>,
    #[serde(rename = "paperID")]
    pub paper_id: PaperId,
    #[serde(rename = "arxivId")]
    pub arxiv_id: Option<ArxivId>,
    pub publication_year: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

/// Reference list of one paper, with the abstract and BibTeX captured when it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "paperID")]
    pub paper_id: PaperId,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub bibtex: Option<String>,
    pub references: Vec<PaperId>,
}

/// Deduplicated paper records keyed by paper id, in order of first insertion.
///
/// Inserting an id that is already present leaves the original record untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PaperRecord>", into = "Vec<PaperRecord>")]
pub struct PaperRegistry {
    papers: IndexMap<PaperId, PaperRecord>,
}

impl PaperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_paper(
        &mut self,
        title: Option<String>,
        paper_id: PaperId,
        arxiv_id: Option<ArxivId>,
        publication_year: Option<String>,
        abstract_text: Option<String>,
    ) -> bool {
        self.insert(PaperRecord {
            title,
            paper_id,
            arxiv_id,
            publication_year,
            abstract_text,
        })
    }

    pub fn insert(&mut self, record: PaperRecord) -> bool {
        match self.papers.entry(record.paper_id.clone()) {
            Entry::Occupied(_) => {
                debug!(paper_id = %record.paper_id, "paper already in registry");
                false
            }
            Entry::Vacant(slot) => {
                debug!(paper_id = %record.paper_id, "paper added to registry");
                slot.insert(record);
                true
            }
        }
    }

    pub fn get(&self, paper_id: &PaperId) -> Option<&PaperRecord> {
        self.papers.get(paper_id)
    }

    pub fn contains(&self, paper_id: &PaperId) -> bool {
        self.papers.contains_key(paper_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &PaperRecord> {
        self.papers.values()
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

impl From<Vec<PaperRecord>> for PaperRegistry {
    fn from(records: Vec<PaperRecord>) -> Self {
        let mut registry = Self::new();
        for record in records {
            registry.insert(record);
        }
        registry
    }
}

impl From<PaperRegistry> for Vec<PaperRecord> {
    fn from(registry: PaperRegistry) -> Self {
        registry.papers.into_values().collect()
    }
}

/// Deduplicated reference lists keyed by the citing paper's id, in order of first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ReferenceEntry>", into = "Vec<ReferenceEntry>")]
pub struct ReferenceGraph {
    entries: IndexMap<PaperId, ReferenceEntry>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reference_entry(
        &mut self,
        paper_id: PaperId,
        abstract_text: Option<String>,
        bibtex: Option<String>,
        references: Vec<PaperId>,
    ) -> bool {
        self.insert(ReferenceEntry {
            paper_id,
            abstract_text,
            bibtex,
            references,
        })
    }

    pub fn insert(&mut self, entry: ReferenceEntry) -> bool {
        match self.entries.entry(entry.paper_id.clone()) {
            Entry::Occupied(_) => {
                debug!(paper_id = %entry.paper_id, "paper already in reference graph");
                false
            }
            Entry::Vacant(slot) => {
                debug!(
                    paper_id = %entry.paper_id,
                    references = entry.references.len(),
                    "paper added to reference graph"
                );
                slot.insert(entry);
                true
            }
        }
    }

    pub fn get(&self, paper_id: &PaperId) -> Option<&ReferenceEntry> {
        self.entries.get(paper_id)
    }

    pub fn contains(&self, paper_id: &PaperId) -> bool {
        self.entries.contains_key(paper_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ReferenceEntry>> for ReferenceGraph {
    fn from(entries: Vec<ReferenceEntry>) -> Self {
        let mut graph = Self::new();
        for entry in entries {
            graph.insert(entry);
        }
        graph
    }
}

impl From<ReferenceGraph> for Vec<ReferenceEntry> {
    fn from(graph: ReferenceGraph) -> Self {
        graph.entries.into_values().collect()
    }
}
