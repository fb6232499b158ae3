//! Ordered hierarchy assembly.
//!
//! A [`Collection`] consumes a record stream one record at a time and builds
//! the item/page/sub-page tree in the remote store. Classification is driven
//! by the `Order` field; grouping follows stream arrival order, never a
//! numeric sort. Assembly state is an explicit value, not hidden mutation:
//!
//! - `Empty` -- no item open; only item-start or unordered records are legal.
//! - `ItemOpen` -- `current` collects pages; `previous` holds the superseded
//!   item whose chain is still pending.
//!
//! Chain flushing is deliberately lagged: an item-start flushes the item from
//! two boundaries back, and finalize flushes the remaining two. This mirrors
//! the observed production behavior; see DESIGN.md before changing it.

use crate::binary;
use crate::enrich;
use crate::error::{IngestError, Result};
use crate::proxy;
use crate::query;
use crate::record::{self, Level, MetadataRecord};
use crate::report::IngestReport;
use crate::resource::{ResourceKind, ResourceNode};
use crate::source::{self, CsvSource};
use crate::store::ResourceStore;
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::info;

enum Assembly {
    Empty,
    ItemOpen {
        current: ResourceNode,
        previous: Option<ResourceNode>,
    },
}

/// One collection being ingested: its container URI, binary root, and the
/// assembly state threaded through the record stream.
pub struct Collection {
    slug: String,
    uri: String,
    binary_root: Option<PathBuf>,
    children: Vec<String>,
    state: Assembly,
    report: IngestReport,
}

impl Collection {
    /// Creates a new container under the repository base and wires direct
    /// containment so children become `pcdm:hasMember` automatically.
    pub async fn create(store: &dyn ResourceStore, slug: &str) -> anyhow::Result<Self> {
        let hint = if slug.is_empty() { None } else { Some(slug) };
        let uri = store
            .create(store.base_url(), query::collection_statement(), hint)
            .await
            .with_context(|| format!("Failed to create collection container '{slug}'"))?;
        store
            .update(&uri, query::direct_container_insert())
            .await
            .with_context(|| format!("Failed to configure membership on {uri}"))?;
        info!(slug, uri, "Created collection container");
        Ok(Self::with_uri(slug, uri))
    }

    /// Ingests into an already-existing container.
    pub fn existing(slug: &str, uri: &str) -> Self {
        Self::with_uri(slug, uri.trim_end_matches('/').to_string())
    }

    /// Ingests directly under the repository base URL, with no container of
    /// its own.
    pub fn at_root(store: &dyn ResourceStore, slug: &str) -> Self {
        Self::with_uri(slug, store.base_url().to_string())
    }

    fn with_uri(slug: &str, uri: String) -> Self {
        Self {
            slug: slug.to_string(),
            uri,
            binary_root: None,
            children: Vec::new(),
            state: Assembly::Empty,
            report: IngestReport::new(),
        }
    }

    /// Directory searched for binary attachments. May change between files
    /// of the same collection.
    pub fn set_binary_root(&mut self, path: impl Into<PathBuf>) {
        self.binary_root = Some(path.into());
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// URIs of the direct children created so far.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn report(&self) -> &IngestReport {
        &self.report
    }

    pub fn into_report(self) -> IngestReport {
        self.report
    }

    /// Ingests one CSV file. The first row names the metadata fields; field
    /// validation applies because tabular input is free-form.
    pub async fn ingest_csv(&mut self, store: &dyn ResourceStore, path: &Path) -> anyhow::Result<()> {
        info!(collection = %self.slug, file = %path.display(), "Ingesting CSV");
        let rows = CsvSource::open(path)?;
        self.state = Assembly::Empty;

        let pb = make_spinner(&format!("Ingesting {}", path.display()));
        for row in rows {
            match row {
                Ok(mut record) => {
                    self.validate_fields(&mut record);
                    self.handle_record(store, record).await;
                }
                Err(e) => {
                    self.report.records_skipped += 1;
                    self.report.warn(&IngestError::MalformedRecord {
                        reason: e.to_string(),
                    });
                }
            }
            pb.inc(1);
        }
        self.finalize(store).await;
        pb.finish_with_message(format!("{} done", path.display()));
        Ok(())
    }

    /// Ingests FGDC XML documents, one record per file. File names may carry
    /// `*` wildcards, expanded per directory. The field set comes from a
    /// fixed mapping table, so no field validation applies.
    pub async fn ingest_xml(
        &mut self,
        store: &dyn ResourceStore,
        paths: &[PathBuf],
    ) -> anyhow::Result<()> {
        let paths = source::expand_patterns(paths)?;
        info!(collection = %self.slug, files = paths.len(), "Ingesting XML");
        self.state = Assembly::Empty;

        let pb = make_spinner("Ingesting XML documents");
        for path in &paths {
            match source::read_fgdc(path) {
                Ok(record) if !record.is_empty() => self.handle_record(store, record).await,
                Ok(_) => {
                    self.report.records_skipped += 1;
                    self.report.warn(&IngestError::MalformedRecord {
                        reason: format!("no mapped fields in {}", path.display()),
                    });
                }
                Err(e) => {
                    self.report.records_skipped += 1;
                    self.report.warn(&IngestError::MalformedRecord {
                        reason: e.to_string(),
                    });
                }
            }
            pb.inc(1);
        }
        self.finalize(store).await;
        pb.finish_with_message("XML ingest done");
        Ok(())
    }

    /// Drops fields rejected by the namespace allow-list, reporting each.
    fn validate_fields(&mut self, record: &mut MetadataRecord) {
        let mut rejected = Vec::new();
        record.retain_fields(|field| {
            let ok = record::is_valid_field(field);
            if !ok {
                rejected.push(field.to_string());
            }
            ok
        });
        for field in rejected {
            self.report.fields_rejected += 1;
            self.report.warn(&IngestError::FieldRejected {
                field,
                collection: self.slug.clone(),
            });
        }
    }

    async fn handle_record(&mut self, store: &dyn ResourceStore, record: MetadataRecord) {
        self.report.records_processed += 1;
        if let Err(e) = self.process_record(store, record).await {
            self.report.records_skipped += 1;
            self.report.warn(&e);
        }
    }

    async fn process_record(
        &mut self,
        store: &dyn ResourceStore,
        mut record: MetadataRecord,
    ) -> Result<()> {
        let order_count = record.order_values().len();
        if order_count > 1 {
            return Err(IngestError::MalformedRecord {
                reason: format!("{order_count} Order values in one record"),
            });
        }

        enrich::enrich_identifiers(&self.slug, &mut record);
        let ids = record.identifiers().to_vec();
        if ids.is_empty() {
            return Err(IngestError::MalformedRecord {
                reason: "missing dcterms:identifier".into(),
            });
        }
        let slug = enrich::make_slug(&ids);
        let statement = query::creation_statement(&record);

        match record.level() {
            Some(Level::Item) => self.open_item(store, statement, slug, &ids).await,
            Some(Level::Page) => self.add_page(store, statement, slug, &ids).await,
            Some(Level::Subpage) => self.add_subpage(store, statement, slug, &ids).await,
            None => self.add_standalone(store, statement, slug, &ids).await,
        }
    }

    /// `Order == "0"`: flush the lagged chain, supersede the open item, and
    /// open a new one. A failed creation leaves an unresolved placeholder so
    /// dependent pages fail closed instead of attaching to the collection.
    async fn open_item(
        &mut self,
        store: &dyn ResourceStore,
        statement: String,
        slug: Option<String>,
        ids: &[String],
    ) -> Result<()> {
        self.flush_previous(store).await;

        let superseded = match std::mem::replace(&mut self.state, Assembly::Empty) {
            Assembly::ItemOpen { current, .. } => Some(current),
            Assembly::Empty => None,
        };

        match ResourceNode::create(store, ResourceKind::Item, &self.uri, statement, slug.as_deref())
            .await
        {
            Ok(item) => {
                let item_uri = item.uri()?.to_string();
                self.children.push(item_uri.clone());
                self.report.record_created(&item_uri);
                self.state = Assembly::ItemOpen {
                    current: item,
                    previous: superseded,
                };
                self.attach_current_item_files(store, ids).await;
                Ok(())
            }
            Err(e) => {
                self.state = Assembly::ItemOpen {
                    current: ResourceNode::unresolved(ResourceKind::Item, &self.uri),
                    previous: superseded,
                };
                Err(e)
            }
        }
    }

    /// Dotless non-zero `Order`: a page of the current item.
    async fn add_page(
        &mut self,
        store: &dyn ResourceStore,
        statement: String,
        slug: Option<String>,
        ids: &[String],
    ) -> Result<()> {
        let Assembly::ItemOpen { current, .. } = &mut self.state else {
            return Err(IngestError::MalformedRecord {
                reason: "page record arrived before any item (Order 0) record".into(),
            });
        };
        let parent_uri = current.uri()?.to_string();

        let mut page =
            ResourceNode::create(store, ResourceKind::Page, &parent_uri, statement, slug.as_deref())
                .await?;
        let page_uri = page.uri()?.to_string();
        match page.add_proxy(store).await {
            Ok(()) => self.report.proxies_created += 1,
            Err(e) => self.report.warn(&e),
        }
        current.add_page(store, page).await?;
        self.report.record_created(&page_uri);

        if let Some(page_node) = current.last_page_mut() {
            attach_files(store, self.binary_root.as_deref(), ids, page_node, &mut self.report)
                .await;
        }
        Ok(())
    }

    /// Dotted `Order`: a sub-page of the page most recently appended. Sub-
    /// pages use the same ordering mechanism as pages, one level deeper.
    async fn add_subpage(
        &mut self,
        store: &dyn ResourceStore,
        statement: String,
        slug: Option<String>,
        ids: &[String],
    ) -> Result<()> {
        let Assembly::ItemOpen { current, .. } = &mut self.state else {
            return Err(IngestError::MalformedRecord {
                reason: "sub-page record arrived before any item (Order 0) record".into(),
            });
        };
        let Some(page) = current.last_page_mut() else {
            return Err(IngestError::MalformedRecord {
                reason: "sub-page record arrived before any page record".into(),
            });
        };
        let parent_uri = page.uri()?.to_string();

        let mut subpage = ResourceNode::create(
            store,
            ResourceKind::Subpage,
            &parent_uri,
            statement,
            slug.as_deref(),
        )
        .await?;
        let subpage_uri = subpage.uri()?.to_string();
        match subpage.add_proxy(store).await {
            Ok(()) => self.report.proxies_created += 1,
            Err(e) => self.report.warn(&e),
        }
        page.add_page(store, subpage).await?;
        self.report.record_created(&subpage_uri);

        if let Some(subpage_node) = page.last_page_mut() {
            attach_files(
                store,
                self.binary_root.as_deref(),
                ids,
                subpage_node,
                &mut self.report,
            )
            .await;
        }
        Ok(())
    }

    /// No `Order` field: an independent top-level child; no hierarchy or
    /// proxy linking applies and the assembly state is left untouched.
    async fn add_standalone(
        &mut self,
        store: &dyn ResourceStore,
        statement: String,
        slug: Option<String>,
        ids: &[String],
    ) -> Result<()> {
        let mut node =
            ResourceNode::create(store, ResourceKind::Item, &self.uri, statement, slug.as_deref())
                .await?;
        let uri = node.uri()?.to_string();
        self.children.push(uri.clone());
        self.report.record_created(&uri);
        attach_files(store, self.binary_root.as_deref(), ids, &mut node, &mut self.report).await;
        Ok(())
    }

    async fn attach_current_item_files(&mut self, store: &dyn ResourceStore, ids: &[String]) {
        let Assembly::ItemOpen { current, .. } = &mut self.state else {
            return;
        };
        attach_files(store, self.binary_root.as_deref(), ids, current, &mut self.report).await;
    }

    /// Flushes the chain pending from two item-boundaries back.
    async fn flush_previous(&mut self, store: &dyn ResourceStore) {
        let pending = match &mut self.state {
            Assembly::ItemOpen { previous, .. } => previous.take(),
            Assembly::Empty => None,
        };
        if let Some(item) = pending {
            self.flush_item(store, &item).await;
        }
    }

    /// Links the item's chain and any of its pages' sub-page chains. A chain
    /// is only ever linked once; failures land in the report and the rest of
    /// the run continues.
    async fn flush_item(&mut self, store: &dyn ResourceStore, item: &ResourceNode) {
        for page in item.pages() {
            if page.page_count() >= 2 {
                match proxy::link_chain(store, page).await {
                    Ok(()) => self.report.chains_linked += 1,
                    Err(e) => self.report.warn(&e),
                }
            }
        }
        if item.page_count() >= 2 {
            match proxy::link_chain(store, item).await {
                Ok(()) => self.report.chains_linked += 1,
                Err(e) => self.report.warn(&e),
            }
        }
    }

    /// End of stream: flush the superseded item, then the open one.
    async fn finalize(&mut self, store: &dyn ResourceStore) {
        match std::mem::replace(&mut self.state, Assembly::Empty) {
            Assembly::ItemOpen { current, previous } => {
                if let Some(item) = previous {
                    self.flush_item(store, &item).await;
                }
                self.flush_item(store, &current).await;
            }
            Assembly::Empty => {}
        }
    }
}

/// Discovers and attaches binaries matching the resource's identifiers.
/// File-level failures are reported and the remaining files still attach.
async fn attach_files(
    store: &dyn ResourceStore,
    root: Option<&Path>,
    ids: &[String],
    node: &mut ResourceNode,
    report: &mut IngestReport,
) {
    let Some(root) = root else { return };
    for id in ids {
        for name in binary::candidate_names(id) {
            for path in binary::search_files(root, &name) {
                match node.attach_file(store, &path).await {
                    Ok(uri) => {
                        report.files_attached += 1;
                        report.record_created(&uri);
                    }
                    Err(e) => report.warn(&e),
                }
            }
        }
    }
}

fn make_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} ({pos} records)")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb
}
