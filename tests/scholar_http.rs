use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scholar_harvest::domain::{ArxivId, PaperId};
use scholar_harvest::error::HarvestError;
use scholar_harvest::scholar::{ScholarClient, ScholarClientOptions, ScholarHttpClient};

const ATTENTION: &str = "Attention Is All You Need";
const ATTENTION_ID: &str = "204e3073870fae3d05bcbc2f6a8e263d9b72e776";
const PDF_BODY: &[u8] = b"%PDF-1.4";

fn options_for(server: &MockServer) -> ScholarClientOptions {
    ScholarClientOptions {
        api_key: Some("test-key".to_string()),
        search_interval: Duration::ZERO,
        request_interval: Duration::ZERO,
        timeout: Duration::from_secs(5),
        graph_api_url: format!("{}/graph/v1", server.uri()),
        arxiv_pdf_url: format!("{}/pdf", server.uri()),
    }
}

/// The blocking client must not run on an async worker thread.
async fn with_client<T, F>(server: &MockServer, call: F) -> T
where
    T: Send + 'static,
    F: FnOnce(&ScholarHttpClient) -> T + Send + 'static,
{
    let options = options_for(server);
    tokio::task::spawn_blocking(move || {
        let client = ScholarHttpClient::new(options).unwrap();
        call(&client)
    })
    .await
    .unwrap()
}

fn paper_id(value: &str) -> PaperId {
    value.parse().unwrap()
}

fn arxiv(value: &str) -> ArxivId {
    value.parse().unwrap()
}

#[tokio::test]
async fn search_sends_title_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .and(query_param("query", ATTENTION))
        .and(query_param("limit", "1"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "data": [{"paperId": ATTENTION_ID, "title": ATTENTION}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = with_client(&server, |client| client.resolve_paper_id(ATTENTION)).await;

    assert_eq!(result.unwrap(), paper_id(ATTENTION_ID));
}

#[tokio::test]
async fn empty_search_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
        .mount(&server)
        .await;

    let result = with_client(&server, |client| client.resolve_paper_id("No such paper")).await;

    assert_matches!(result, Err(HarvestError::PaperNotFound(title)) if title == "No such paper");
}

#[tokio::test]
async fn details_server_error_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/graph/v1/paper/{ATTENTION_ID}")))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let result = with_client(&server, |client| {
        client.fetch_details(&paper_id(ATTENTION_ID))
    })
    .await;

    assert_matches!(
        result,
        Err(HarvestError::ScholarStatus { status: 500, .. })
    );
}

#[tokio::test]
async fn details_are_parsed_from_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/graph/v1/paper/{ATTENTION_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paperId": ATTENTION_ID,
            "citationStyles": {"bibtex": "@inproceedings{Vaswani2017}"},
            "externalIds": {"ArXiv": "1706.03762"},
            "publicationDate": "2017-06-12",
            "abstract": null
        })))
        .mount(&server)
        .await;

    let details = with_client(&server, |client| {
        client.fetch_details(&paper_id(ATTENTION_ID))
    })
    .await
    .unwrap();

    assert_eq!(details.publication_year.as_deref(), Some("2017"));
    assert_eq!(details.arxiv_id, Some(arxiv("1706.03762")));
    assert_eq!(details.abstract_text, None);
}

#[tokio::test]
async fn references_follow_next_page() {
    let server = MockServer::start().await;
    let references_path = format!("/graph/v1/paper/{ATTENTION_ID}/references");
    Mock::given(method("GET"))
        .and(path(references_path.as_str()))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offset": 0,
            "next": 1000,
            "data": [{"citedPaper": {"paperId": "a", "title": "First"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(references_path.as_str()))
        .and(query_param("offset", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offset": 1000,
            "data": [{"citedPaper": {"paperId": "b", "title": "Second"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = with_client(&server, |client| {
        client.fetch_references(&paper_id(ATTENTION_ID))
    })
    .await
    .unwrap();

    let ids: Vec<&str> = items
        .iter()
        .filter_map(|item| item.paper_id.as_ref())
        .map(|id| id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn pdf_error_status_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pdf/1706.03762.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("icml_2017");

    let target = destination.clone();
    let result = with_client(&server, move |client| {
        client.download_pdf(&arxiv("1706.03762"), &target)
    })
    .await;

    assert_matches!(
        result,
        Err(HarvestError::ArxivStatus { status: 404, .. })
    );
    assert!(!destination.exists());
}

#[tokio::test]
async fn pdf_saved_under_arxiv_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pdf/1706.03762.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF_BODY.to_vec()))
        .mount(&server)
        .await;
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("icml_2017");

    let target = destination.clone();
    let written = with_client(&server, move |client| {
        client.download_pdf(&arxiv("1706.03762"), &target)
    })
    .await
    .unwrap();

    assert_eq!(written, PDF_BODY.len() as u64);
    let saved = destination.join("1706.03762.pdf");
    assert_eq!(std::fs::read(&saved).unwrap(), PDF_BODY);
    assert_eq!(std::fs::read_dir(&destination).unwrap().count(), 1);
}

#[tokio::test]
async fn pdf_local_write_failure_is_filesystem_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pdf/1706.03762.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF_BODY.to_vec()))
        .mount(&server)
        .await;
    let temp = tempfile::tempdir().unwrap();
    let blocker = temp.path().join("not-a-directory");
    std::fs::write(&blocker, b"file").unwrap();

    let target = blocker.join("icml_2017");
    let result = with_client(&server, move |client| {
        client.download_pdf(&arxiv("1706.03762"), &target)
    })
    .await;

    assert_matches!(result, Err(HarvestError::Filesystem(_)));
}
