use std::io::{self, Write};

use serde::Serialize;

use crate::harvest::{HarvestReport, PdfOutcome, ProgressEvent, ProgressSink, TitleStatus};
use crate::snapshot::SnapshotSummary;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &HarvestReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_summary(summary: &SnapshotSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Progress lines on stdout, the way the batch is watched from a terminal.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_report(report: &HarvestReport) {
        println!(
            "Processed {} titles: {} recorded, {} papers, {} reference entries",
            report.processed, report.recorded, report.papers, report.reference_entries
        );
        for result in &report.titles {
            match result.status {
                TitleStatus::Recorded => {
                    if let Some(record) = &result.record {
                        println!(
                            "  ok        {} ({} references, pdf: {})",
                            result.title,
                            record.references,
                            pdf_label(&record.pdf)
                        );
                    }
                }
                TitleStatus::NotFound => println!("  not found {}", result.title),
                TitleStatus::Failed => println!(
                    "  failed    {}: {}",
                    result.title,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }
        }
    }

    pub fn print_summary(summary: &SnapshotSummary) {
        if !summary.found {
            println!("File {} not found!", summary.path);
            return;
        }
        println!("{}", summary.path);
        println!(
            "  papers: {} ({} with arXiv id)",
            summary.papers, summary.papers_with_arxiv_id
        );
        println!(
            "  reference entries: {} ({} links)",
            summary.reference_entries, summary.reference_links
        );
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => println!("{}", event.message),
        }
    }
}

fn pdf_label(outcome: &PdfOutcome) -> String {
    match outcome {
        PdfOutcome::Disabled => "disabled".to_string(),
        PdfOutcome::NoArxivId => "no arXiv id".to_string(),
        PdfOutcome::Downloaded { path, .. } => path.clone(),
        PdfOutcome::Failed { reason, .. } => format!("failed ({reason})"),
    }
}
