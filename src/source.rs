//! Record sources: CSV rows and FGDC XML documents.
//!
//! CSV files carry metadata field names in the first row; duplicate columns
//! merge into one multi-valued field. FGDC XML is mapped through the fixed
//! [`DC_TO_FGDC`] field-to-element-path table, so its field set cannot
//! contain invalid names and skips tabular field validation.

use crate::record::MetadataRecord;
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Dublin Core field to FGDC element path. Paths are matched as a suffix of
/// the open-element stack, one record per document.
pub static DC_TO_FGDC: &[(&str, &[&str])] = &[
    (
        "dcterms:title",
        &["metadata", "idinfo", "citation", "citeinfo", "title"],
    ),
    (
        "dcterms:creator",
        &["metadata", "idinfo", "citation", "citeinfo", "origin"],
    ),
    (
        "dcterms:subject",
        &["metadata", "idinfo", "keywords", "theme", "themekey"],
    ),
    (
        "dcterms:description",
        &["metadata", "idinfo", "descript", "abstract"],
    ),
    (
        "dcterms:publisher",
        &["metadata", "metainfo", "metc", "cntinfo", "cntorgp", "cntorg"],
    ),
    ("dcterms:contributor", &["metadata", "idinfo", "datacred"]),
    (
        "dcterms:date",
        &["metadata", "idinfo", "citation", "citeinfo", "pubdate"],
    ),
    (
        "dcterms:type",
        &["metadata", "idinfo", "citation", "citeinfo", "geoform"],
    ),
    (
        "dcterms:format",
        &[
            "metadata", "distinfo", "stdorder", "digform", "digtinfo", "formname",
        ],
    ),
    (
        "dcterms:identifier",
        &["metadata", "idinfo", "citation", "citeinfo", "onlink"],
    ),
    ("dcterms:source", &["metadata", "distinfo", "resdesc"]),
    (
        "dcterms:relation",
        &[
            "metadata", "idinfo", "citation", "citeinfo", "lworkcit", "citeinfo", "title",
        ],
    ),
    (
        "dcterms:coverage.x.min",
        &["metadata", "idinfo", "spdom", "bounding", "westbc"],
    ),
    (
        "dcterms:coverage.x.max",
        &["metadata", "idinfo", "spdom", "bounding", "eastbc"],
    ),
    (
        "dcterms:coverage.y.min",
        &["metadata", "idinfo", "spdom", "bounding", "southbc"],
    ),
    (
        "dcterms:coverage.y.max",
        &["metadata", "idinfo", "spdom", "bounding", "northbc"],
    ),
    (
        "dcterms:coverage.placeName",
        &["metadata", "idinfo", "keywords", "place", "placekey"],
    ),
    ("dcterms:rights", &["metadata", "idinfo", "accconst"]),
];

/// Lazy CSV record source; the first row supplies field names.
pub struct CsvSource {
    headers: csv::StringRecord,
    rows: csv::StringRecordsIntoIter<File>,
}

impl CsvSource {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header row: {}", path.display()))?
            .clone();
        Ok(Self {
            headers,
            rows: reader.into_records(),
        })
    }
}

impl Iterator for CsvSource {
    type Item = Result<MetadataRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(
            row.context("Failed to parse CSV row")
                .map(|row| row_to_record(&self.headers, &row)),
        )
    }
}

fn row_to_record(headers: &csv::StringRecord, row: &csv::StringRecord) -> MetadataRecord {
    let mut record = MetadataRecord::new();
    for (j, field) in headers.iter().enumerate() {
        if field.is_empty() {
            continue;
        }
        if let Some(value) = row.get(j) {
            if !value.is_empty() {
                record.push(field, value.to_string());
            }
        }
    }
    record
}

/// Expands `*` wildcards in the file-name component of each path; matches
/// within one directory, sorted, ignoring ASCII case. Paths without a
/// wildcard pass through untouched. A pattern matching nothing is an error,
/// so a bad wildcard cannot silently ingest nothing.
pub fn expand_patterns(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for path in paths {
        let pattern = path.file_name().and_then(|name| name.to_str());
        let Some(pattern) = pattern.filter(|name| name.contains('*')) else {
            expanded.push(path.clone());
            continue;
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
        let mut matches: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name_matches(name, pattern))
            })
            .map(|entry| entry.path())
            .collect();
        if matches.is_empty() {
            anyhow::bail!("No files match {}", path.display());
        }
        matches.sort();
        expanded.append(&mut matches);
    }
    Ok(expanded)
}

/// `*` matches any run of characters; comparison ignores ASCII case.
fn name_matches(name: &str, pattern: &str) -> bool {
    let name = name.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    let mut segments: Vec<&str> = pattern.split('*').collect();
    let first = segments.remove(0);
    if !name.starts_with(first) {
        return false;
    }
    let Some(last) = segments.pop() else {
        // No wildcard at all: the prefix must be the whole name.
        return name.len() == first.len();
    };
    let mut rest = &name[first.len()..];
    for segment in segments {
        match rest.find(segment) {
            Some(i) => rest = &rest[i + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

fn stack_matches(stack: &[String], path: &[&str]) -> bool {
    stack.len() >= path.len()
        && stack[stack.len() - path.len()..]
            .iter()
            .zip(path)
            .all(|(open, wanted)| open == wanted)
}

/// Reads one FGDC document into a record via the fixed mapping table.
/// Field order follows the table; value order follows the document.
pub fn read_fgdc(path: &Path) -> Result<MetadataRecord> {
    let mut reader = Reader::from_file(path)
        .with_context(|| format!("Failed to open XML file: {}", path.display()))?;
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut collected: Vec<Vec<String>> = vec![Vec::new(); DC_TO_FGDC.len()];

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("Malformed XML in {}", path.display()))?;
        match event {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .with_context(|| format!("Bad text content in {}", path.display()))?;
                let text = text.trim();
                if !text.is_empty() {
                    for (i, (_, fgdc_path)) in DC_TO_FGDC.iter().enumerate() {
                        if stack_matches(&stack, fgdc_path) {
                            collected[i].push(text.to_string());
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let mut record = MetadataRecord::new();
    for ((field, _), values) in DC_TO_FGDC.iter().zip(collected) {
        for value in values {
            record.push(field, value);
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        tmp.flush().unwrap();
        tmp
    }

    #[test]
    fn csv_rows_become_records() {
        let tmp = temp_file(
            "dcterms:identifier,dcterms:title,Order\n\
             A,Atlas,0\n\
             A.1,Sheet one,1\n",
        );
        let records: Vec<_> = CsvSource::open(tmp.path())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifiers(), &["A".to_string()]);
        assert_eq!(records[0].order(), Some("0"));
        assert_eq!(records[1].get("dcterms:title").unwrap(), &["Sheet one"]);
    }

    #[test]
    fn duplicate_csv_columns_merge_into_multivalue() {
        let tmp = temp_file(
            "dcterms:identifier,dcterms:identifier,dcterms:title\n\
             A,B,Two ids\n",
        );
        let records: Vec<_> = CsvSource::open(tmp.path())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            records[0].identifiers(),
            &["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn empty_cells_and_headers_are_skipped() {
        let tmp = temp_file(
            "dcterms:identifier,,dcterms:title\n\
             A,ghost,\n",
        );
        let records: Vec<_> = CsvSource::open(tmp.path())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records[0].identifiers(), &["A".to_string()]);
        assert!(records[0].get("dcterms:title").is_none());
        assert_eq!(records[0].iter().count(), 1);
    }

    #[test]
    fn ragged_rows_are_tolerated() {
        let tmp = temp_file(
            "dcterms:identifier,dcterms:title\n\
             A\n",
        );
        let records: Vec<_> = CsvSource::open(tmp.path())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records[0].identifiers(), &["A".to_string()]);
    }

    #[test]
    fn fgdc_document_maps_through_table() {
        let tmp = temp_file(
            r#"<?xml version="1.0"?>
<metadata>
  <idinfo>
    <citation>
      <citeinfo>
        <title>Mount Washington</title>
        <pubdate>1931</pubdate>
        <onlink>&lt;URL:http://x/search?dset=hdrg/ABC123&gt;</onlink>
      </citeinfo>
    </citation>
    <keywords>
      <theme><themekey>topographic</themekey><themekey>quadrangle</themekey></theme>
      <place><placekey>New Hampshire</placekey></place>
    </keywords>
    <spdom>
      <bounding>
        <westbc>-71.50</westbc>
        <eastbc>-71.25</eastbc>
        <southbc>44.25</southbc>
        <northbc>44.50</northbc>
      </bounding>
    </spdom>
  </idinfo>
</metadata>"#,
        );
        let record = read_fgdc(tmp.path()).unwrap();
        assert_eq!(
            record.get("dcterms:title").unwrap(),
            &["Mount Washington"]
        );
        assert_eq!(
            record.get("dcterms:subject").unwrap(),
            &["topographic", "quadrangle"]
        );
        assert_eq!(record.get("dcterms:coverage.x.min").unwrap(), &["-71.50"]);
        assert_eq!(
            record.identifiers(),
            &["<URL:http://x/search?dset=hdrg/ABC123>".to_string()]
        );
        // No Order field comes from the table, so FGDC records are unordered.
        assert!(record.order().is_none());
    }

    #[test]
    fn wildcard_patterns_match_names() {
        assert!(name_matches("a.xml", "*.xml"));
        assert!(name_matches("A.XML", "*.xml"));
        assert!(name_matches("hdrg02c_15_1931.xml", "hdrg*.xml"));
        assert!(name_matches("anything", "*"));
        assert!(name_matches("exact.xml", "exact.xml"));

        assert!(!name_matches("a.xmlx", "*.xml"));
        assert!(!name_matches("a.csv", "*.xml"));
        assert!(!name_matches("exact.xml.bak", "exact.xml"));
    }

    #[test]
    fn expand_patterns_lists_matches_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.xml"), b"<metadata/>").unwrap();
        std::fs::write(dir.path().join("a.xml"), b"<metadata/>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let expanded = expand_patterns(&[dir.path().join("*.xml")]).unwrap();
        assert_eq!(
            expanded,
            vec![dir.path().join("a.xml"), dir.path().join("b.xml")]
        );

        // Literal paths pass through even when the file does not exist yet.
        let literal = dir.path().join("c.xml");
        assert_eq!(
            expand_patterns(&[literal.clone()]).unwrap(),
            vec![literal]
        );
    }

    #[test]
    fn expand_patterns_rejects_empty_matches() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = expand_patterns(&[dir.path().join("*.xml")]).unwrap_err();
        assert!(err.to_string().contains("No files match"));
    }

    #[test]
    fn fgdc_unmapped_elements_are_ignored() {
        let tmp = temp_file(
            r#"<metadata>
  <idinfo>
    <descript><abstract>Scanned map.</abstract><purpose>ignored</purpose></descript>
  </idinfo>
</metadata>"#,
        );
        let record = read_fgdc(tmp.path()).unwrap();
        assert_eq!(
            record.get("dcterms:description").unwrap(),
            &["Scanned map."]
        );
        assert_eq!(record.iter().count(), 1);
    }
}
