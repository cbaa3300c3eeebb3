use std::cell::Cell;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::domain::{ArxivId, PaperId, year_from_date};
use crate::error::HarvestError;

pub const GRAPH_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";
pub const ARXIV_PDF_BASE: &str = "https://arxiv.org/pdf";

pub const DETAIL_FIELDS: &str =
    "referenceCount,citationCount,title,citationStyles,externalIds,publicationDate,abstract";
pub const REFERENCE_FIELDS: &str = "paperId,title,abstract,year,externalIds";
const REFERENCE_PAGE_SIZE: u64 = 1000;

/// Details of a single paper; every field is optional because the source omits freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperDetails {
    pub bibtex: Option<String>,
    pub arxiv_id: Option<ArxivId>,
    pub publication_year: Option<String>,
    pub abstract_text: Option<String>,
}

/// One cited paper as returned by the references endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceItem {
    pub paper_id: Option<PaperId>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub year: Option<String>,
    pub arxiv_id: Option<ArxivId>,
}

/// Remote lookups the harvester depends on.
///
/// Callers must respect the Semantic Scholar rate limits: 1 request/second for search,
/// batch and recommendation endpoints, 10 requests/second for everything else.
pub trait ScholarClient {
    fn resolve_paper_id(&self, title: &str) -> Result<PaperId, HarvestError>;
    fn fetch_details(&self, paper_id: &PaperId) -> Result<PaperDetails, HarvestError>;
    fn fetch_references(&self, paper_id: &PaperId) -> Result<Vec<ReferenceItem>, HarvestError>;
    /// Downloads `<arxiv_id>.pdf` into `destination_dir`, returning the bytes written.
    fn download_pdf(&self, arxiv_id: &ArxivId, destination_dir: &Path)
    -> Result<u64, HarvestError>;
}

#[derive(Debug, Clone)]
pub struct ScholarClientOptions {
    pub api_key: Option<String>,
    pub search_interval: Duration,
    pub request_interval: Duration,
    pub timeout: Duration,
    pub graph_api_url: String,
    pub arxiv_pdf_url: String,
}

impl Default for ScholarClientOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            search_interval: Duration::from_millis(1000),
            request_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
            graph_api_url: GRAPH_API_BASE.to_string(),
            arxiv_pdf_url: ARXIV_PDF_BASE.to_string(),
        }
    }
}

/// Sleeps until at least `interval` has passed since the previous call.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last: Cell<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Cell::new(None),
        }
    }

    pub fn wait(&self) {
        if let Some(previous) = self.last.get() {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        self.last.set(Some(Instant::now()));
    }
}

pub struct ScholarHttpClient {
    client: Client,
    graph_api_url: String,
    arxiv_pdf_url: String,
    search_pacer: Pacer,
    request_pacer: Pacer,
}

impl ScholarHttpClient {
    pub fn new(options: ScholarClientOptions) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("scholar-harvest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::ScholarHttp(err.to_string()))?,
        );
        if let Some(api_key) = options.api_key.as_deref() {
            if !api_key.trim().is_empty() {
                headers.insert(
                    "x-api-key",
                    HeaderValue::from_str(api_key.trim())
                        .map_err(|err| HarvestError::ScholarHttp(err.to_string()))?,
                );
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|err| HarvestError::ScholarHttp(err.to_string()))?;

        Ok(Self {
            client,
            graph_api_url: options.graph_api_url.trim_end_matches('/').to_string(),
            arxiv_pdf_url: options.arxiv_pdf_url.trim_end_matches('/').to_string(),
            search_pacer: Pacer::new(options.search_interval),
            request_pacer: Pacer::new(options.request_interval),
        })
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, HarvestError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|err| HarvestError::ScholarHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| HarvestError::ScholarHttp(err.to_string()))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, HarvestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Semantic Scholar request failed".to_string());
        Err(HarvestError::ScholarStatus { status, message })
    }
}

impl ScholarClient for ScholarHttpClient {
    fn resolve_paper_id(&self, title: &str) -> Result<PaperId, HarvestError> {
        let url = format!("{}/paper/search", self.graph_api_url);
        self.search_pacer.wait();
        let body = self.get_json(
            &url,
            &[
                ("query", title.to_string()),
                ("fields", "title".to_string()),
                ("limit", "1".to_string()),
            ],
        )?;
        first_paper_id(&body).ok_or_else(|| HarvestError::PaperNotFound(title.to_string()))
    }

    fn fetch_details(&self, paper_id: &PaperId) -> Result<PaperDetails, HarvestError> {
        let url = format!("{}/paper/{}", self.graph_api_url, paper_id.as_str());
        self.request_pacer.wait();
        let body = self.get_json(&url, &[("fields", DETAIL_FIELDS.to_string())])?;
        Ok(details_from_json(&body))
    }

    fn fetch_references(&self, paper_id: &PaperId) -> Result<Vec<ReferenceItem>, HarvestError> {
        let url = format!(
            "{}/paper/{}/references",
            self.graph_api_url,
            paper_id.as_str()
        );
        let mut items = Vec::new();
        let mut offset = 0u64;
        loop {
            self.request_pacer.wait();
            let body = self.get_json(
                &url,
                &[
                    ("fields", REFERENCE_FIELDS.to_string()),
                    ("offset", offset.to_string()),
                    ("limit", REFERENCE_PAGE_SIZE.to_string()),
                ],
            )?;
            let (page, next) = references_page_from_json(&body);
            items.extend(page);
            match next {
                Some(next) if next > offset => offset = next,
                _ => break,
            }
        }
        debug!(paper_id = %paper_id, count = items.len(), "fetched references");
        Ok(items)
    }

    fn download_pdf(
        &self,
        arxiv_id: &ArxivId,
        destination_dir: &Path,
    ) -> Result<u64, HarvestError> {
        let url = format!("{}/{}.pdf", self.arxiv_pdf_url, arxiv_id.as_str());
        self.request_pacer.wait();
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| HarvestError::ArxivHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(HarvestError::ArxivStatus {
                status: response.status().as_u16(),
                arxiv_id: arxiv_id.to_string(),
            });
        }
        let body = response
            .bytes()
            .map_err(|err| HarvestError::ArxivHttp(err.to_string()))?;

        fs::create_dir_all(destination_dir)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("scholar-harvest-pdf")
            .tempfile_in(destination_dir)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        temp.write_all(&body)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let destination = destination_dir.join(arxiv_id.pdf_file_name());
        temp.persist(&destination)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let written = body.len() as u64;
        debug!(path = %destination.display(), bytes = written, "saved PDF");
        Ok(written)
    }
}

/// Paper id of the first search hit, if any.
pub fn first_paper_id(body: &Value) -> Option<PaperId> {
    body.get("data")
        .and_then(|value| value.as_array())
        .and_then(|array| array.first())
        .and_then(|value| value.get("paperId"))
        .and_then(|value| value.as_str())
        .and_then(|value| value.parse().ok())
}

pub fn details_from_json(body: &Value) -> PaperDetails {
    let bibtex = body
        .get("citationStyles")
        .and_then(|value| value.get("bibtex"))
        .and_then(|value| value.as_str())
        .map(|value| value.to_string());
    let publication_year = body
        .get("publicationDate")
        .and_then(|value| value.as_str())
        .and_then(year_from_date);
    let abstract_text = body
        .get("abstract")
        .and_then(|value| value.as_str())
        .map(|value| value.to_string());

    PaperDetails {
        bibtex,
        arxiv_id: arxiv_from_external_ids(body),
        publication_year,
        abstract_text,
    }
}

/// Items of one references page and the offset of the following page, if there is one.
pub fn references_page_from_json(body: &Value) -> (Vec<ReferenceItem>, Option<u64>) {
    let items: Vec<ReferenceItem> = body
        .get("data")
        .and_then(|value| value.as_array())
        .map(|array| {
            array
                .iter()
                .filter_map(|value| value.get("citedPaper"))
                .map(reference_from_json)
                .collect()
        })
        .unwrap_or_default();
    let next = body.get("next").and_then(|value| value.as_u64());
    (items, next)
}

fn reference_from_json(paper: &Value) -> ReferenceItem {
    let paper_id = paper
        .get("paperId")
        .and_then(|value| value.as_str())
        .and_then(|value| value.parse().ok());
    let title = paper
        .get("title")
        .and_then(|value| value.as_str())
        .map(|value| value.to_string());
    let abstract_text = paper
        .get("abstract")
        .and_then(|value| value.as_str())
        .map(|value| value.to_string());
    let year = match paper.get("year") {
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|year| year_from_date(&year.to_string())),
        Some(Value::String(text)) => year_from_date(text),
        _ => None,
    };

    ReferenceItem {
        paper_id,
        title,
        abstract_text,
        year,
        arxiv_id: arxiv_from_external_ids(paper),
    }
}

fn arxiv_from_external_ids(paper: &Value) -> Option<ArxivId> {
    let raw = paper
        .get("externalIds")
        .and_then(|value| value.get("ArXiv"))
        .and_then(|value| value.as_str())?;
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            debug!(value = raw, "ignoring malformed arXiv id");
            None
        }
    }
}
