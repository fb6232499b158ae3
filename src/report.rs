//! Per-run ingestion report: created URIs, warnings, counters.

use crate::error::IngestError;
use std::io::{self, Write};
use tracing::{error, warn};

/// Outcome of one collection ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// URIs of every resource created, in creation order (binaries included).
    pub created: Vec<String>,
    /// Human-readable diagnostics for recovered failures.
    pub warnings: Vec<String>,
    pub records_processed: u64,
    pub records_skipped: u64,
    pub fields_rejected: u64,
    pub proxies_created: u64,
    pub chains_linked: u64,
    pub files_attached: u64,
}

impl IngestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a recovered failure and logs it. Failures that abort a
    /// dependent subtree log louder than record-local ones.
    pub fn warn(&mut self, err: &IngestError) {
        if err.is_local() {
            warn!(error = %err, "Record diagnostic");
        } else {
            error!(error = %err, "Subtree aborted");
        }
        self.warnings.push(err.to_string());
    }

    pub fn record_created(&mut self, uri: &str) {
        self.created.push(uri.to_string());
    }

    /// Folds another report into this one (used by batch runs).
    pub fn merge(&mut self, other: IngestReport) {
        self.created.extend(other.created);
        self.warnings.extend(other.warnings);
        self.records_processed += other.records_processed;
        self.records_skipped += other.records_skipped;
        self.fields_rejected += other.fields_rejected;
        self.proxies_created += other.proxies_created;
        self.chains_linked += other.chains_linked;
        self.files_attached += other.files_attached;
    }

    /// End-of-run summary for one collection.
    pub fn print_summary(&self, slug: &str, collection_uri: &str) {
        let stdout = std::io::stdout();
        let _ = self.write_summary(&mut stdout.lock(), slug, collection_uri);
    }

    /// The summary lists every created URI: under a dry run this is the only
    /// place they surface.
    pub fn write_summary(
        &self,
        out: &mut impl Write,
        slug: &str,
        collection_uri: &str,
    ) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "=== {slug} ===")?;
        writeln!(out, "Container:          {collection_uri}")?;
        writeln!(out, "Records processed:  {}", self.records_processed)?;
        writeln!(out, "Records skipped:    {}", self.records_skipped)?;
        writeln!(out, "Fields rejected:    {}", self.fields_rejected)?;
        writeln!(out, "Resources created:  {}", self.created.len())?;
        for uri in &self.created {
            writeln!(out, "  + {uri}")?;
        }
        writeln!(out, "Proxies created:    {}", self.proxies_created)?;
        writeln!(out, "Chains linked:      {}", self.chains_linked)?;
        writeln!(out, "Files attached:     {}", self.files_attached)?;
        if !self.warnings.is_empty() {
            writeln!(out, "Warnings:           {}", self.warnings.len())?;
            for warning in &self.warnings {
                writeln!(out, "  - {warning}")?;
            }
        }
        Ok(())
    }
}
