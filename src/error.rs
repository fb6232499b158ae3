//! Ingestion error taxonomy.
//!
//! Validation-level failures (`FieldRejected`, `MalformedRecord`,
//! `FileUnreadable`) are recovered locally: the diagnostic lands in the run
//! report and processing continues. `RemoteCallFailed` and
//! `UnresolvedReference` abort the dependent subtree (the affected item or
//! page and its descendants) but never the whole collection run.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Tabular field outside the accepted namespace; dropped from the record.
    #[error("invalid field {field} in {collection}")]
    FieldRejected { field: String, collection: String },

    /// The record is missing something the hierarchy logic needs.
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    /// A binary attachment source could not be read.
    #[error("cannot read {}: {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The repository answered outside the 2xx range, or the call never
    /// completed. No partial-success handling; the affected node stays
    /// unresolved.
    #[error("{op} against {target} failed: {detail}")]
    RemoteCallFailed {
        op: &'static str,
        target: String,
        detail: String,
    },

    /// An operation needed the URI of a node whose creation previously
    /// failed. Failing fast here keeps malformed requests off the wire.
    #[error("refusing to reference unresolved {what}")]
    UnresolvedReference { what: String },
}

impl IngestError {
    /// True for errors that only invalidate the record or file at hand.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            IngestError::FieldRejected { .. }
                | IngestError::MalformedRecord { .. }
                | IngestError::FileUnreadable { .. }
        )
    }
}
