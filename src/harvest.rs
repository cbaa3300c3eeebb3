use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{ArxivId, pdf_directory_name};
use crate::error::HarvestError;
use crate::registry::{PaperRegistry, ReferenceGraph};
use crate::scholar::ScholarClient;

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Leading part of every PDF directory name, usually the conference (`icml`).
    pub prefix: String,
    pub pdf_root: Utf8PathBuf,
    pub download_pdfs: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PdfOutcome {
    Disabled,
    NoArxivId,
    Downloaded { path: String, bytes: u64 },
    Failed { arxiv_id: String, reason: String },
}

/// What a fully recorded title contributed to the collections.
#[derive(Debug, Clone, Serialize)]
pub struct TitleRecord {
    pub paper_id: String,
    pub publication_year: Option<String>,
    pub references: usize,
    pub skipped_references: usize,
    pub new_papers: usize,
    pub pdf: PdfOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleStatus {
    Recorded,
    NotFound,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleResult {
    pub title: String,
    pub status: TitleStatus,
    pub record: Option<TitleRecord>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub processed: usize,
    pub recorded: usize,
    pub papers: usize,
    pub reference_entries: usize,
    pub titles: Vec<TitleResult>,
}

/// Drives titles through resolve, details, references, record and PDF download, owning
/// both collections for the duration of a run.
pub struct Harvester<C: ScholarClient> {
    client: C,
    options: HarvestOptions,
    registry: PaperRegistry,
    graph: ReferenceGraph,
}

impl<C: ScholarClient> Harvester<C> {
    pub fn new(client: C, options: HarvestOptions) -> Self {
        Self::with_collections(client, options, PaperRegistry::new(), ReferenceGraph::new())
    }

    /// Continues accumulating into collections from an earlier run.
    pub fn with_collections(
        client: C,
        options: HarvestOptions,
        registry: PaperRegistry,
        graph: ReferenceGraph,
    ) -> Self {
        Self {
            client,
            options,
            registry,
            graph,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn registry(&self) -> &PaperRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &ReferenceGraph {
        &self.graph
    }

    pub fn into_collections(self) -> (PaperRegistry, ReferenceGraph) {
        (self.registry, self.graph)
    }

    pub fn pdf_directory(&self, year: Option<&str>) -> Utf8PathBuf {
        self.options
            .pdf_root
            .join(pdf_directory_name(&self.options.prefix, year))
    }

    /// Processes every title; a failing title is reported and never stops the batch.
    pub fn run<I, S>(&mut self, titles: I, sink: &dyn ProgressSink) -> HarvestReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = Vec::new();
        for (index, title) in titles.into_iter().enumerate() {
            let title = title.as_ref().trim();
            let start = Instant::now();
            let result = match self.process_title(title, sink) {
                Ok(record) => TitleResult {
                    title: title.to_string(),
                    status: TitleStatus::Recorded,
                    record: Some(record),
                    error: None,
                },
                Err(HarvestError::PaperNotFound(_)) => {
                    warn!(title, "Failed to find paperID for title");
                    TitleResult {
                        title: title.to_string(),
                        status: TitleStatus::NotFound,
                        record: None,
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(title, error = %err, "skipping title");
                    TitleResult {
                        title: title.to_string(),
                        status: TitleStatus::Failed,
                        record: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            info!(
                index = index + 1,
                title,
                status = ?result.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "processed title"
            );
            results.push(result);
            sink.event(ProgressEvent {
                message: format!(
                    "***** [{}] Processing paper {} *****",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
                    index + 1
                ),
                elapsed: Some(start.elapsed()),
            });
        }

        HarvestReport {
            processed: results.len(),
            recorded: results
                .iter()
                .filter(|result| result.status == TitleStatus::Recorded)
                .count(),
            papers: self.registry.len(),
            reference_entries: self.graph.len(),
            titles: results,
        }
    }

    /// Records one title. Every remote lookup that can abort the title happens before
    /// the first insert, so an error leaves both collections untouched.
    pub fn process_title(
        &mut self,
        title: &str,
        sink: &dyn ProgressSink,
    ) -> Result<TitleRecord, HarvestError> {
        self.phase(sink, format!("phase=Resolve; {title}"));
        let paper_id = self.client.resolve_paper_id(title)?;

        self.phase(sink, format!("phase=Details; {paper_id}"));
        let details = self.client.fetch_details(&paper_id)?;

        self.phase(sink, format!("phase=References; {paper_id}"));
        let references = self.client.fetch_references(&paper_id)?;

        self.phase(sink, "phase=Store; recording paper".to_string());
        let mut new_papers = 0usize;
        let mut skipped_references = 0usize;
        let mut reference_ids = Vec::with_capacity(references.len());
        for reference in references {
            let Some(reference_id) = reference.paper_id else {
                debug!(title = ?reference.title, "skipping reference without paper id");
                skipped_references += 1;
                continue;
            };
            if self.registry.add_paper(
                reference.title,
                reference_id.clone(),
                reference.arxiv_id,
                reference.year,
                reference.abstract_text,
            ) {
                new_papers += 1;
            }
            reference_ids.push(reference_id);
        }
        let reference_count = reference_ids.len();

        self.graph.add_reference_entry(
            paper_id.clone(),
            details.abstract_text.clone(),
            details.bibtex.clone(),
            reference_ids,
        );
        if self.registry.add_paper(
            Some(title.to_string()),
            paper_id.clone(),
            details.arxiv_id.clone(),
            details.publication_year.clone(),
            details.abstract_text,
        ) {
            new_papers += 1;
        }

        let pdf = self.fetch_pdf(
            details.arxiv_id.as_ref(),
            details.publication_year.as_deref(),
            sink,
        );

        Ok(TitleRecord {
            paper_id: paper_id.to_string(),
            publication_year: details.publication_year,
            references: reference_count,
            skipped_references,
            new_papers,
            pdf,
        })
    }

    fn fetch_pdf(
        &self,
        arxiv_id: Option<&ArxivId>,
        year: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> PdfOutcome {
        if !self.options.download_pdfs {
            return PdfOutcome::Disabled;
        }
        let Some(arxiv_id) = arxiv_id else {
            return PdfOutcome::NoArxivId;
        };

        let directory = self.pdf_directory(year);
        self.phase(sink, format!("phase=Download; arxiv {arxiv_id}"));
        match self.client.download_pdf(arxiv_id, directory.as_std_path()) {
            Ok(bytes) => {
                let path = directory.join(arxiv_id.pdf_file_name());
                debug!(%path, bytes, "Downloaded PDF");
                PdfOutcome::Downloaded {
                    path: path.to_string(),
                    bytes,
                }
            }
            Err(err) => {
                warn!(arxiv_id = %arxiv_id, error = %err, "Failed to download the PDF");
                PdfOutcome::Failed {
                    arxiv_id: arxiv_id.to_string(),
                    reason: err.to_string(),
                }
            }
        }
    }

    fn phase(&self, sink: &dyn ProgressSink, message: String) {
        if self.options.verbose {
            sink.event(ProgressEvent {
                message,
                elapsed: None,
            });
        }
    }
}
