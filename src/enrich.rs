//! Collection-specific identifier enrichment and slug derivation.
//!
//! Some collections carry identifiers that embed a more useful catalog key
//! (e.g. a dataset URL wrapping the sheet number). Extraction rules are a
//! registry keyed by collection slug; collections without a rule pass
//! through untouched. The server-facing slug hint is computed from the last
//! identifier of the (possibly enriched) list, URL-encoded. The store may
//! still reject or rewrite the hint.

use crate::record::MetadataRecord;
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::collections::HashMap;

/// Everything but `[A-Za-z0-9._-]` gets percent-encoded in a slug.
const SLUG_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Identifier-extraction rules by collection slug. Each rule is a regex with
/// one capture group holding the supplementary identifier.
static ID_RULES: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    HashMap::from([
        // usgs identifiers look like
        // <URL:http://www.granit.unh.edu/data/search?dset=hdrg/hdrg02c_15_1931>
        (
            "usgs",
            Regex::new(r"\?dset=hdrg/([^>]+)").expect("usgs identifier rule"),
        ),
    ])
});

/// Derives a supplementary identifier for one existing identifier, or `None`
/// when the collection has no rule or the rule does not match.
pub fn derive_identifier(collection: &str, id: &str) -> Option<String> {
    let rule = ID_RULES.get(collection)?;
    rule.captures(id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|derived| !derived.is_empty())
}

/// Appends derived identifiers to the record's identifier list. Only the
/// identifiers present on entry are examined; derived values are not fed
/// back through the rules.
pub fn enrich_identifiers(collection: &str, record: &mut MetadataRecord) {
    let derived: Vec<String> = record
        .identifiers()
        .iter()
        .filter_map(|id| derive_identifier(collection, id))
        .collect();
    for id in derived {
        record.push_identifier(id);
    }
}

/// URL-encoded slug from the last identifier, or `None` for an empty list.
pub fn make_slug(ids: &[String]) -> Option<String> {
    ids.last()
        .map(|id| utf8_percent_encode(id, SLUG_SET).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usgs_rule_extracts_sheet_identifier() {
        let id = "<URL:http://www.granit.unh.edu/data/search?dset=hdrg/hdrg02c_15_1931>";
        assert_eq!(
            derive_identifier("usgs", id),
            Some("hdrg02c_15_1931".to_string())
        );
    }

    #[test]
    fn wrapped_url_identifier_extracts_key() {
        let id = "<URL:http://x/search?dset=hdrg/ABC123>";
        assert_eq!(derive_identifier("usgs", id), Some("ABC123".to_string()));
    }

    #[test]
    fn unknown_collection_derives_nothing() {
        let id = "<URL:http://x/search?dset=hdrg/ABC123>";
        assert_eq!(derive_identifier("brown", id), None);
        assert_eq!(derive_identifier("", id), None);
    }

    #[test]
    fn non_matching_identifier_derives_nothing() {
        assert_eq!(derive_identifier("usgs", "plain-id-123"), None);
    }

    #[test]
    fn enrichment_appends_after_existing_identifiers() {
        let mut rec = MetadataRecord::new();
        rec.push_identifier("<URL:http://x/search?dset=hdrg/ABC123>".into());
        rec.push_identifier("other".into());
        enrich_identifiers("usgs", &mut rec);

        assert_eq!(
            rec.identifiers(),
            &[
                "<URL:http://x/search?dset=hdrg/ABC123>".to_string(),
                "other".to_string(),
                "ABC123".to_string(),
            ]
        );
    }

    #[test]
    fn slug_uses_last_identifier_url_encoded() {
        let ids = vec!["first".to_string(), "map 12/b".to_string()];
        assert_eq!(make_slug(&ids), Some("map%2012%2Fb".to_string()));
        assert_eq!(make_slug(&[]), None);
    }

    #[test]
    fn slug_keeps_safe_characters() {
        let ids = vec!["hdrg02c_15.1931-a".to_string()];
        assert_eq!(make_slug(&ids), Some("hdrg02c_15.1931-a".to_string()));
    }
}
