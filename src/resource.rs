//! Nodes of the resource tree being assembled.
//!
//! A node's URI is assigned only after the store confirms its creation;
//! until then the node is *unresolved* and every operation needing its URI
//! fails with [`IngestError::UnresolvedReference`] instead of sending a
//! malformed request.

use crate::binary;
use crate::error::{IngestError, Result};
use crate::query;
use crate::store::ResourceStore;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Collection,
    Item,
    Page,
    Subpage,
}

impl ResourceKind {
    fn describe(&self) -> &'static str {
        match self {
            ResourceKind::Collection => "collection",
            ResourceKind::Item => "item",
            ResourceKind::Page => "page",
            ResourceKind::Subpage => "sub-page",
        }
    }
}

/// One created (or attempted) remote resource.
#[derive(Debug)]
pub struct ResourceNode {
    kind: ResourceKind,
    uri: Option<String>,
    parent: Option<String>,
    proxy: Option<String>,
    children: Vec<String>,
    pages: Vec<ResourceNode>,
}

impl ResourceNode {
    /// Creates the resource in the store and returns the resolved node.
    pub async fn create(
        store: &dyn ResourceStore,
        kind: ResourceKind,
        parent: &str,
        turtle: String,
        slug: Option<&str>,
    ) -> Result<Self> {
        let uri = store.create(parent, turtle, slug).await?;
        Ok(Self {
            kind,
            uri: Some(uri),
            parent: Some(parent.to_string()),
            proxy: None,
            children: Vec::new(),
            pages: Vec::new(),
        })
    }

    /// A placeholder for a resource whose creation failed. It keeps its
    /// place in the assembly state so dependants fail closed.
    pub fn unresolved(kind: ResourceKind, parent: &str) -> Self {
        Self {
            kind,
            uri: None,
            parent: Some(parent.to_string()),
            proxy: None,
            children: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The assigned URI, or `UnresolvedReference` if creation never
    /// succeeded.
    pub fn uri(&self) -> Result<&str> {
        self.uri.as_deref().ok_or_else(|| IngestError::UnresolvedReference {
            what: format!("{} node", self.kind.describe()),
        })
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Ordered page sequence, in stream arrival order.
    pub fn pages(&self) -> &[ResourceNode] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The most recently appended page; sub-pages attach here.
    pub fn last_page_mut(&mut self) -> Option<&mut ResourceNode> {
        self.pages.last_mut()
    }

    /// Creates this node's `ore:Proxy` inside its parent.
    pub async fn add_proxy(&mut self, store: &dyn ResourceStore) -> Result<()> {
        let uri = self.uri()?.to_string();
        let parent = self.parent.clone().ok_or_else(|| IngestError::UnresolvedReference {
            what: format!("parent of {} node", self.kind.describe()),
        })?;
        let body = query::proxy_statement(&uri, &parent);
        let proxy = store.create(&parent, body, None).await?;
        self.proxy = Some(proxy);
        Ok(())
    }

    /// Registers `page` as a `pcdm:hasMember` of this node and appends it to
    /// the page sequence.
    pub async fn add_page(&mut self, store: &dyn ResourceStore, page: ResourceNode) -> Result<()> {
        let page_uri = page.uri()?.to_string();
        let uri = self.uri()?.to_string();
        store.update(&uri, query::membership_insert(&page_uri)).await?;
        self.children.push(page_uri);
        self.pages.push(page);
        Ok(())
    }

    /// Attaches one binary file: creates the binary child, registers
    /// `pcdm:hasFile`, and types the binary's metadata node.
    pub async fn attach_file(&mut self, store: &dyn ResourceStore, path: &Path) -> Result<String> {
        let uri = self.uri()?.to_string();
        let data = fs::read(path).map_err(|source| IngestError::FileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let content_type = binary::content_type(path);
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| IngestError::FileUnreadable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
            })?;

        let file_uri = store.create_binary(&uri, data, content_type, &filename).await?;
        store.update(&uri, query::has_file_insert(&file_uri)).await?;
        store
            .update(&format!("{file_uri}/fcr:metadata"), query::file_type_insert())
            .await?;
        self.children.push(file_uri.clone());
        Ok(file_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn unresolved_node_refuses_its_uri() {
        let node = ResourceNode::unresolved(ResourceKind::Page, "mem://repo/item");
        let err = node.uri().unwrap_err();
        assert!(matches!(err, IngestError::UnresolvedReference { .. }));
        assert!(err.to_string().contains("page"));
    }

    #[tokio::test]
    async fn create_resolves_and_add_proxy_targets_parent() {
        let store = MemoryStore::new();
        let mut node = ResourceNode::create(
            &store,
            ResourceKind::Page,
            "mem://repo/item",
            "<> rdf:type pcdm:Object .".into(),
            Some("p1"),
        )
        .await
        .unwrap();
        assert_eq!(node.uri().unwrap(), "mem://repo/item/p1");

        node.add_proxy(&store).await.unwrap();
        let proxy = node.proxy().unwrap().to_string();
        assert!(proxy.starts_with("mem://repo/item/"));

        let ops = store.ops();
        let proxy_create = &ops[1];
        assert_eq!(proxy_create.op, "create");
        assert!(proxy_create.body.contains("ore:proxyFor <mem://repo/item/p1>"));
        assert!(proxy_create.body.contains("ore:proxyIn <mem://repo/item>"));
    }

    #[tokio::test]
    async fn add_page_registers_membership_in_order() {
        let store = MemoryStore::new();
        let mut item = ResourceNode::create(
            &store,
            ResourceKind::Item,
            "mem://repo/col",
            String::new(),
            Some("item"),
        )
        .await
        .unwrap();

        for slug in ["p1", "p2"] {
            let page = ResourceNode::create(
                &store,
                ResourceKind::Page,
                item.uri().unwrap(),
                String::new(),
                Some(slug),
            )
            .await
            .unwrap();
            item.add_page(&store, page).await.unwrap();
        }

        assert_eq!(item.page_count(), 2);
        assert_eq!(
            item.children(),
            &["mem://repo/col/item/p1", "mem://repo/col/item/p2"]
        );
        let memberships: Vec<_> = store
            .ops()
            .into_iter()
            .filter(|op| op.body.contains("pcdm:hasMember"))
            .collect();
        assert_eq!(memberships.len(), 2);
        assert!(memberships[0].body.contains("<mem://repo/col/item/p1>"));
        assert!(memberships[1].body.contains("<mem://repo/col/item/p2>"));
    }

    #[tokio::test]
    async fn attach_file_wires_binary_and_metadata() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ABC123.tif");
        std::fs::write(&path, b"tiff bytes").unwrap();

        let store = MemoryStore::new();
        let mut item = ResourceNode::create(
            &store,
            ResourceKind::Item,
            "mem://repo/col",
            String::new(),
            Some("item"),
        )
        .await
        .unwrap();
        let file_uri = item.attach_file(&store, &path).await.unwrap();

        let ops = store.ops();
        let bin = ops.iter().find(|op| op.op == "create-binary").unwrap();
        assert!(bin.body.starts_with("image/tiff"));
        assert_eq!(bin.slug.as_deref(), Some("ABC123.tif"));

        assert!(ops
            .iter()
            .any(|op| op.body.contains(&format!("pcdm:hasFile <{file_uri}>"))));
        assert!(ops
            .iter()
            .any(|op| op.target == format!("{file_uri}/fcr:metadata")
                && op.body.contains("pcdm:File")));
        assert_eq!(item.children(), &[file_uri.as_str()]);
    }

    #[tokio::test]
    async fn attach_file_reports_unreadable_source() {
        let store = MemoryStore::new();
        let mut item = ResourceNode::create(
            &store,
            ResourceKind::Item,
            "mem://repo/col",
            String::new(),
            Some("item"),
        )
        .await
        .unwrap();
        let err = item
            .attach_file(&store, Path::new("/nonexistent/file.tif"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::FileUnreadable { .. }));
        // Nothing was sent for the failed file.
        assert_eq!(store.ops().len(), 1);
    }
}
