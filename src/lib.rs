//! Clew: ordered hierarchy ingestion for Fedora/LDP repositories
//!
//! This crate reads flat streams of metadata records -- CSV rows or FGDC XML
//! documents -- describing items, pages, and sub-pages, and materializes that
//! hierarchy in a remote LDP resource store, wiring an explicit reading-order
//! chain between sibling pages:
//!
//! 1. **Classification** -- each record's `Order` field decides whether it
//!    opens a new item (`"0"`), adds a page (dotless value), adds a sub-page
//!    (dotted value), or stands alone (absent)
//! 2. **Assembly** -- records are grouped under the item that most recently
//!    preceded them in stream order; every resource is created remotely
//!    before anything references it
//! 3. **Linking** -- once an item's page sequence closes, its pages' proxies
//!    are chained first/last and prev/next in arrival order
//!
//! # Architecture
//!
//! Processing is strictly sequential per collection: every store call is a
//! blocking request/response step, because later records depend on the URIs
//! the store assigned to earlier ones. Failed creations leave *unresolved*
//! nodes and everything downstream of them fails closed instead of sending
//! malformed requests. Independent collections may be ingested concurrently
//! by the caller; nothing is shared between them.
//!
//! # Key Modules
//!
//! - [`record`] -- Metadata records, `Order` classification, field validation
//! - [`source`] -- CSV and FGDC XML record sources
//! - [`query`] -- Turtle/SPARQL statement builders with numeric-literal encoding
//! - [`enrich`] -- Collection-keyed identifier extraction and slug derivation
//! - [`collection`] -- The hierarchy assembler and its state machine
//! - [`proxy`] -- Reading-order proxy chain linking
//! - [`resource`] -- Resource tree nodes with unresolved-reference guards
//! - [`store`] -- The `ResourceStore` trait, HTTP and in-memory backends
//! - [`binary`] -- Binary file discovery for attachment
//! - [`report`] -- Per-run counters, created URIs, and warnings
//! - [`manifest`] -- Batch job descriptions
//! - [`config`] -- Constants for ingestion and transport

pub mod binary;
pub mod collection;
pub mod config;
pub mod enrich;
pub mod error;
pub mod manifest;
pub mod proxy;
pub mod query;
pub mod record;
pub mod report;
pub mod resource;
pub mod source;
pub mod store;
