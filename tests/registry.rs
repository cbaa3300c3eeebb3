use scholar_harvest::domain::PaperId;
use scholar_harvest::registry::{PaperRecord, PaperRegistry, ReferenceGraph};

fn id(value: &str) -> PaperId {
    value.parse().unwrap()
}

#[test]
fn duplicate_paper_is_ignored() {
    let mut registry = PaperRegistry::new();
    let first = registry.add_paper(
        Some("Attention Is All You Need".to_string()),
        id("p1"),
        Some("1706.03762".parse().unwrap()),
        Some("2017".to_string()),
        None,
    );
    let second = registry.add_paper(
        Some("Attention Is All You Need (v2)".to_string()),
        id("p1"),
        None,
        Some("2018".to_string()),
        Some("abstract".to_string()),
    );

    assert!(first);
    assert!(!second);
    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.get(&id("p1")).unwrap(),
        &PaperRecord {
            title: Some("Attention Is All You Need".to_string()),
            paper_id: id("p1"),
            arxiv_id: Some("1706.03762".parse().unwrap()),
            publication_year: Some("2017".to_string()),
            abstract_text: None,
        }
    );
}

#[test]
fn duplicate_reference_entry_is_ignored() {
    let mut graph = ReferenceGraph::new();
    assert!(graph.add_reference_entry(id("p1"), None, None, vec![id("a"), id("b")]));
    assert!(!graph.add_reference_entry(
        id("p1"),
        Some("abstract".to_string()),
        Some("@misc{}".to_string()),
        vec![]
    ));

    let entry = graph.get(&id("p1")).unwrap();
    assert_eq!(graph.len(), 1);
    assert_eq!(entry.references, vec![id("a"), id("b")]);
    assert_eq!(entry.bibtex, None);
}

#[test]
fn missing_arxiv_id_stays_unset() {
    let mut registry = PaperRegistry::new();
    registry.add_paper(Some("No preprint".to_string()), id("r1"), None, None, None);

    let record = registry.get(&id("r1")).unwrap();
    assert!(record.arxiv_id.is_none());
    let json = serde_json::to_value(record).unwrap();
    assert!(json["arxivId"].is_null());
}

#[test]
fn all_follows_first_insertion() {
    let mut registry = PaperRegistry::new();
    for value in ["c", "a", "b", "a", "c"] {
        registry.add_paper(None, id(value), None, None, None);
    }

    let order: Vec<&str> = registry.all().map(|record| record.paper_id.as_str()).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
}

#[test]
fn deserializing_duplicates_keeps_first() {
    let raw = serde_json::json!([
        {"title": "First", "paperID": "p1", "arxivId": null, "publication_year": null, "abstract": null},
        {"title": "Second", "paperID": "p1", "arxivId": null, "publication_year": "2020", "abstract": null}
    ]);

    let registry: PaperRegistry = serde_json::from_value(raw).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.get(&id("p1")).unwrap().title.as_deref(),
        Some("First")
    );
}
