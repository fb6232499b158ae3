//! Proxy chain linking.
//!
//! Given a parent whose ordered page sequence is complete, wire the parent
//! to the first and last page proxies and give every proxy its prev/next
//! neighbours. The chain follows stream arrival order; nothing here re-sorts.

use crate::error::{IngestError, Result};
use crate::store::ResourceStore;
use crate::{query, resource::ResourceNode};
use tracing::debug;

/// Links the reading-order chain for `parent`'s pages. Chains shorter than
/// two are a no-op. Every page must be resolved and carry a proxy; if any is
/// missing the whole chain is skipped so no malformed link goes out.
pub async fn link_chain(store: &dyn ResourceStore, parent: &ResourceNode) -> Result<()> {
    let pages = parent.pages();
    if pages.len() < 2 {
        return Ok(());
    }
    let parent_uri = parent.uri()?.to_string();

    // Collect every proxy up front; an unresolved page fails the chain
    // before anything is sent.
    let mut proxies = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        let page_uri = page.uri()?;
        let proxy = page.proxy().ok_or_else(|| IngestError::UnresolvedReference {
            what: format!("proxy of page {i} ({page_uri})"),
        })?;
        proxies.push(proxy.to_string());
    }

    let first = &proxies[0];
    let last = &proxies[proxies.len() - 1];
    store
        .update(&parent_uri, query::first_last_insert(first, last))
        .await?;

    for (i, proxy) in proxies.iter().enumerate() {
        let prev = if i == 0 { None } else { Some(proxies[i - 1].as_str()) };
        let next = proxies.get(i + 1).map(String::as_str);
        store
            .update(proxy, query::prev_next_insert(prev, next))
            .await?;
    }

    debug!(parent = %parent_uri, length = proxies.len(), "Linked proxy chain");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use crate::store::MemoryStore;

    async fn item_with_pages(store: &MemoryStore, count: usize, with_proxies: bool) -> ResourceNode {
        let mut item = ResourceNode::create(
            store,
            ResourceKind::Item,
            "mem://repo/col",
            String::new(),
            Some("item"),
        )
        .await
        .unwrap();
        for i in 0..count {
            let mut page = ResourceNode::create(
                store,
                ResourceKind::Page,
                item.uri().unwrap(),
                String::new(),
                Some(&format!("p{i}")),
            )
            .await
            .unwrap();
            if with_proxies {
                page.add_proxy(store).await.unwrap();
            }
            item.add_page(store, page).await.unwrap();
        }
        item
    }

    // Every update body carries the prefix preamble, so `iana:` alone would
    // match membership updates too; match the link triples themselves.
    fn chain_ops(store: &MemoryStore) -> Vec<crate::store::StoreOp> {
        store
            .ops()
            .into_iter()
            .filter(|op| {
                op.body.contains("iana:first <")
                    || op.body.contains("iana:prev <")
                    || op.body.contains("iana:next <")
            })
            .collect()
    }

    #[tokio::test]
    async fn short_chains_are_a_no_op() {
        let store = MemoryStore::new();
        let item = item_with_pages(&store, 1, true).await;
        link_chain(&store, &item).await.unwrap();
        assert!(chain_ops(&store).is_empty());
    }

    #[tokio::test]
    async fn three_page_chain_links_ends_and_neighbours() {
        let store = MemoryStore::new();
        let item = item_with_pages(&store, 3, true).await;
        let proxies: Vec<String> = item
            .pages()
            .iter()
            .map(|page| page.proxy().unwrap().to_string())
            .collect();

        link_chain(&store, &item).await.unwrap();
        let ops = chain_ops(&store);
        assert_eq!(ops.len(), 4);

        assert_eq!(ops[0].target, "mem://repo/col/item");
        assert!(ops[0].body.contains(&format!("iana:first <{}>", proxies[0])));
        assert!(ops[0].body.contains(&format!("iana:last <{}>", proxies[2])));

        assert_eq!(ops[1].target, proxies[0]);
        assert!(!ops[1].body.contains("iana:prev"));
        assert!(ops[1].body.contains(&format!("iana:next <{}>", proxies[1])));

        assert_eq!(ops[2].target, proxies[1]);
        assert!(ops[2].body.contains(&format!("iana:prev <{}>", proxies[0])));
        assert!(ops[2].body.contains(&format!("iana:next <{}>", proxies[2])));

        assert_eq!(ops[3].target, proxies[2]);
        assert!(ops[3].body.contains(&format!("iana:prev <{}>", proxies[1])));
        assert!(!ops[3].body.contains("iana:next"));
    }

    #[tokio::test]
    async fn missing_proxy_fails_before_any_link_is_sent() {
        let store = MemoryStore::new();
        let item = item_with_pages(&store, 2, false).await;
        let err = link_chain(&store, &item).await.unwrap_err();
        assert!(matches!(err, IngestError::UnresolvedReference { .. }));
        assert!(chain_ops(&store).is_empty());
    }
}
