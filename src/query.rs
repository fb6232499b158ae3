//! Turtle and SPARQL-update statement builders.
//!
//! Every creation body is Turtle with `<>` as the subject (the resource being
//! created); every update is a SPARQL `INSERT DATA` against an existing
//! resource. Both carry the full prefix preamble so the repository can parse
//! them standalone.
//!
//! Value encoding: a value whose textual form is a plain numeric literal
//! (optional sign, integer or decimal, no surrounding whitespace) is emitted
//! unquoted; anything else is escaped and wrapped in `"""..."""`, which
//! tolerates embedded newlines. Numeric-looking identifiers deliberately come
//! out as numbers, not strings.

use crate::config;
use crate::record::MetadataRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// Turtle prefix preamble prepended to every creation body.
pub const TURTLE_PREFIXES: &str = r#"@prefix schema: <http://schema.org/> .
@prefix premis: <http://www.loc.gov/premis/rdf/v1#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix pcdm: <http://pcdm.org/models#> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix geo: <http://www.w3.org/2003/01/geo/wgs84_pos#> .
@prefix rel: <http://id.loc.gov/vocabulary/relators/> .
@prefix dcterms: <http://purl.org/dc/terms/> .
@prefix prov: <http://www.w3.org/ns/prov#> .
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
@prefix cc: <http://creativecommons.org/ns#> .
@prefix ore: <http://www.openarchives.org/ore/terms/> .
@prefix gn: <http://www.geonames.org/ontology#> .
@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
@prefix fedora: <http://fedora.info/definitions/v4/repository#> .
@prefix ebucore: <http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#> .
@prefix ldp: <http://www.w3.org/ns/ldp#> .
@prefix iana: <http://www.iana.org/assignments/relation/> .
@prefix exif: <http://www.w3.org/2003/12/exif/ns#> .
@prefix dc: <http://purl.org/dc/elements/1.1/> .
"#;

/// SPARQL prefix preamble prepended to every update body.
pub const SPARQL_PREFIXES: &str = r#"PREFIX schema: <http://schema.org/>
PREFIX premis: <http://www.loc.gov/premis/rdf/v1#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
PREFIX pcdm: <http://pcdm.org/models#>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX geo: <http://www.w3.org/2003/01/geo/wgs84_pos#>
PREFIX rel: <http://id.loc.gov/vocabulary/relators/>
PREFIX dcterms: <http://purl.org/dc/terms/>
PREFIX prov: <http://www.w3.org/ns/prov#>
PREFIX foaf: <http://xmlns.com/foaf/0.1/>
PREFIX cc: <http://creativecommons.org/ns#>
PREFIX ore: <http://www.openarchives.org/ore/terms/>
PREFIX gn: <http://www.geonames.org/ontology#>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX fedora: <http://fedora.info/definitions/v4/repository#>
PREFIX ebucore: <http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#>
PREFIX ldp: <http://www.w3.org/ns/ldp#>
PREFIX iana: <http://www.iana.org/assignments/relation/>
PREFIX exif: <http://www.w3.org/2003/12/exif/ns#>
PREFIX dc: <http://purl.org/dc/elements/1.1/>
"#;

static NUMERIC_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("numeric literal regex"));

/// True if the value can be emitted as an unquoted numeric literal.
pub fn is_numeric_literal(value: &str) -> bool {
    NUMERIC_LITERAL.is_match(value)
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\'' | '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn triple(field: &str, value: &str) -> String {
    if is_numeric_literal(value) {
        format!("<> {field} {value} .\n")
    } else {
        format!("<> {field} \"\"\"{}\"\"\" .\n", escape_literal(value))
    }
}

/// Turtle body creating a `pcdm:Object` carrying every (field, value) pair
/// of the record except the ordinal marker.
pub fn creation_statement(record: &MetadataRecord) -> String {
    let mut query = String::from(TURTLE_PREFIXES);
    query.push_str("<> rdf:type pcdm:Object .\n");
    for (field, values) in record.iter() {
        if field == config::ORDER_FIELD {
            continue;
        }
        for value in values {
            query.push_str(&triple(field, value));
        }
    }
    query
}

/// Turtle body creating a collection container.
pub fn collection_statement() -> String {
    format!("{TURTLE_PREFIXES}<> rdf:type pcdm:Collection .\n<> rdf:type ldp:DirectContainer .\n")
}

/// Update wiring a container so every child it contains becomes a
/// `pcdm:hasMember` of the container itself.
pub fn direct_container_insert() -> String {
    format!(
        "{SPARQL_PREFIXES}INSERT DATA {{ <>\n\
         ldp:membershipResource <> ;\n\
         ldp:hasMemberRelation pcdm:hasMember . }}"
    )
}

/// Turtle body creating an `ore:Proxy` standing for `target` inside `parent`.
pub fn proxy_statement(target: &str, parent: &str) -> String {
    format!(
        "{TURTLE_PREFIXES}<> rdf:type ore:Proxy .\n\
         <> ore:proxyFor <{target}> .\n\
         <> ore:proxyIn <{parent}> .\n"
    )
}

/// Update registering `child` as a member of the target resource.
pub fn membership_insert(child: &str) -> String {
    format!("{SPARQL_PREFIXES}INSERT DATA {{ <> pcdm:hasMember <{child}> . }}")
}

/// Update linking the target resource to the first and last proxy of its
/// reading order.
pub fn first_last_insert(first: &str, last: &str) -> String {
    format!(
        "{SPARQL_PREFIXES}INSERT DATA {{ <>\n\
         iana:first <{first}> ;\n\
         iana:last <{last}> . }}"
    )
}

/// Update setting a proxy's previous/next links, omitting absent ends.
/// Callers only invoke this inside a chain, so at least one end is present.
pub fn prev_next_insert(prev: Option<&str>, next: Option<&str>) -> String {
    let mut links = Vec::new();
    if let Some(prev) = prev {
        links.push(format!("iana:prev <{prev}>"));
    }
    if let Some(next) = next {
        links.push(format!("iana:next <{next}>"));
    }
    format!(
        "{SPARQL_PREFIXES}INSERT DATA {{ <>\n{} . }}",
        links.join(" ;\n")
    )
}

/// Update registering an attached binary on its parent.
pub fn has_file_insert(file: &str) -> String {
    format!("{SPARQL_PREFIXES}INSERT DATA {{ <> pcdm:hasFile <{file}> . }}")
}

/// Update typing a binary's metadata node as `pcdm:File`.
pub fn file_type_insert() -> String {
    format!("{SPARQL_PREFIXES}INSERT DATA {{ <> rdf:type pcdm:File . }}")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parses the triples back out of a creation statement, undoing literal
    /// escaping, so encode/decode round-trips can be asserted.
    fn parse_statement(statement: &str) -> Vec<(String, String)> {
        let body = statement
            .find("<> rdf:type pcdm:Object .\n")
            .map(|pos| &statement[pos + "<> rdf:type pcdm:Object .\n".len()..])
            .expect("statement has a type triple");

        let mut triples = Vec::new();
        let mut rest = body;
        while let Some(start) = rest.find("<> ") {
            rest = &rest[start + 3..];
            let field_end = rest.find(' ').expect("field delimiter");
            let field = rest[..field_end].to_string();
            rest = &rest[field_end + 1..];

            let value = if let Some(stripped) = rest.strip_prefix("\"\"\"") {
                let mut value = String::new();
                let mut chars = stripped.char_indices();
                let mut end = 0;
                while let Some((i, c)) = chars.next() {
                    if c == '\\' {
                        let (_, escaped) = chars.next().expect("escaped char");
                        value.push(escaped);
                    } else if stripped[i..].starts_with("\"\"\"") {
                        end = i;
                        break;
                    } else {
                        value.push(c);
                    }
                }
                rest = &stripped[end + 3..];
                value
            } else {
                let end = rest.find(" .").expect("triple terminator");
                let value = rest[..end].to_string();
                rest = &rest[end..];
                value
            };
            triples.push((field, value));
        }
        triples
    }

    fn record(pairs: &[(&str, &str)]) -> MetadataRecord {
        let mut rec = MetadataRecord::new();
        for (field, value) in pairs {
            rec.push(field, value.to_string());
        }
        rec
    }

    #[test]
    fn numeric_literal_detection() {
        assert!(is_numeric_literal("0"));
        assert!(is_numeric_literal("42"));
        assert!(is_numeric_literal("-7"));
        assert!(is_numeric_literal("+3.25"));
        assert!(is_numeric_literal(".5"));
        assert!(is_numeric_literal("71.03"));

        assert!(!is_numeric_literal("1e5"));
        assert!(!is_numeric_literal(" 1"));
        assert!(!is_numeric_literal("1 "));
        assert!(!is_numeric_literal("1.2.3"));
        assert!(!is_numeric_literal("abc"));
        assert!(!is_numeric_literal(""));
    }

    #[test]
    fn numeric_values_emitted_unquoted() {
        let statement = creation_statement(&record(&[("dcterms:identifier", "19310415")]));
        assert!(statement.contains("<> dcterms:identifier 19310415 .\n"));
        assert!(!statement.contains("\"\"\"19310415\"\"\""));
    }

    #[test]
    fn string_values_escaped_and_quoted() {
        let statement = creation_statement(&record(&[("dcterms:title", r#"A "quoted" \ title"#)]));
        assert!(statement.contains(r#"<> dcterms:title """A \"quoted\" \\ title""" ."#));
    }

    #[test]
    fn order_field_excluded() {
        let statement = creation_statement(&record(&[("Order", "2"), ("dcterms:title", "t")]));
        assert!(!statement.contains("<> Order"));
        assert!(statement.contains("<> dcterms:title"));
    }

    #[test]
    fn statement_roundtrip_preserves_pairs() {
        let rec = record(&[
            ("dcterms:identifier", "hdrg02c_15_1931"),
            ("dcterms:identifier", "1931"),
            ("dcterms:title", "Mount Washington,\nsheet 2"),
            ("dcterms:coverage.x.min", "-71.50"),
            ("dcterms:description", r#"says "15 minute" quad"#),
        ]);
        let parsed = parse_statement(&creation_statement(&rec));

        let expected: Vec<(String, String)> = rec
            .iter()
            .flat_map(|(field, values)| {
                values
                    .iter()
                    .map(move |value| (field.to_string(), value.clone()))
            })
            .collect();
        assert_eq!(parsed, expected);

        // Numeric-looking values stay numbers, everything else is quoted.
        let statement = creation_statement(&rec);
        assert!(statement.contains("<> dcterms:identifier 1931 .\n"));
        assert!(statement.contains("<> dcterms:coverage.x.min -71.50 .\n"));
        assert!(statement.contains("\"\"\"hdrg02c_15_1931\"\"\""));
    }

    #[test]
    fn prev_next_omits_absent_ends() {
        let first = prev_next_insert(None, Some("http://x/p2"));
        assert!(!first.contains("iana:prev"));
        assert!(first.contains("iana:next <http://x/p2> . }"));

        let last = prev_next_insert(Some("http://x/p1"), None);
        assert!(last.contains("iana:prev <http://x/p1> . }"));
        assert!(!last.contains("iana:next"));

        let middle = prev_next_insert(Some("http://x/p1"), Some("http://x/p3"));
        assert!(middle.contains("iana:prev <http://x/p1> ;\niana:next <http://x/p3> . }"));
    }

    #[test]
    fn proxy_statement_references_both_ends() {
        let body = proxy_statement("http://x/page1", "http://x/item");
        assert!(body.contains("<> rdf:type ore:Proxy ."));
        assert!(body.contains("<> ore:proxyFor <http://x/page1> ."));
        assert!(body.contains("<> ore:proxyIn <http://x/item> ."));
    }

    #[test]
    fn non_chain_bodies_mention_iana_only_in_the_preamble() {
        // The preambles declare the iana: prefix, so op-log filters must
        // match the link triples, never the bare prefix.
        for body in [
            membership_insert("http://x/a"),
            direct_container_insert(),
            has_file_insert("http://x/f"),
            creation_statement(&record(&[("dcterms:title", "t")])),
        ] {
            assert!(body.contains("iana: <http://www.iana.org/assignments/relation/>"));
            assert!(!body.contains("iana:first <"));
            assert!(!body.contains("iana:prev <"));
            assert!(!body.contains("iana:next <"));
        }
    }

    #[test]
    fn update_bodies_carry_prefixes() {
        for body in [
            membership_insert("http://x/a"),
            first_last_insert("http://x/p1", "http://x/p2"),
            has_file_insert("http://x/f"),
            file_type_insert(),
            direct_container_insert(),
        ] {
            assert!(body.starts_with("PREFIX schema:"));
            assert!(body.contains("INSERT DATA"));
        }
    }
}
