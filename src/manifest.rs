//! Batch manifest: a JSON description of several collection jobs run in
//! sequence. Collections are independent, so each job gets its own container
//! and assembly state.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub jobs: Vec<Job>,
}

/// One collection ingestion job.
#[derive(Debug, Deserialize)]
pub struct Job {
    /// Collection slug; also keys identifier-extraction rules.
    pub slug: String,
    /// Ingest into this existing container instead of creating one.
    #[serde(default)]
    pub uri: Option<String>,
    /// Ingest directly under the repository base URL.
    #[serde(default)]
    pub root: bool,
    /// Directory searched for binary attachments.
    #[serde(default)]
    pub binary_path: Option<String>,
    /// CSV files, ingested in order.
    #[serde(default)]
    pub csv: Vec<String>,
    /// FGDC XML files, ingested in order.
    #[serde(default)]
    pub xml: Vec<String>,
}

pub fn load(path: &Path) -> Result<Manifest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
    for (i, job) in manifest.jobs.iter().enumerate() {
        if job.uri.is_some() && job.root {
            anyhow::bail!("Job {} ('{}') sets both uri and root", i, job.slug);
        }
        if job.csv.is_empty() && job.xml.is_empty() {
            anyhow::bail!("Job {} ('{}') lists no csv or xml files", i, job.slug);
        }
    }
    Ok(manifest)
}
