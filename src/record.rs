//! Metadata records and field-level validation.
//!
//! A [`MetadataRecord`] is an ordered mapping from a namespaced field name
//! (e.g. `dcterms:identifier`) to an ordered list of string values. Duplicate
//! CSV columns merge into one multi-valued field, preserving column order.
//! The reserved `Order` field classifies a record's hierarchy level.

use crate::config;

/// Hierarchy level signalled by a record's `Order` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// `Order == "0"` -- opens a new item.
    Item,
    /// Any other value without a `.` -- a page of the current item.
    Page,
    /// A value containing `.` -- a sub-page of the current page.
    Subpage,
}

/// Classifies an `Order` value into a hierarchy level.
pub fn classify_order(order: &str) -> Level {
    if order == "0" {
        Level::Item
    } else if order.contains('.') {
        Level::Subpage
    } else {
        Level::Page
    }
}

/// Accepts the literal `Order` marker, or any field whose namespace prefix
/// (the part before the first `:`) is the reserved metadata namespace.
/// Applied to tabular input only; the XML field set is a fixed mapping table.
pub fn is_valid_field(field: &str) -> bool {
    field == config::ORDER_FIELD
        || field
            .split_once(':')
            .is_some_and(|(ns, _)| ns == config::METADATA_NAMESPACE)
}

/// One metadata record: ordered field names, each with ordered values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    fields: Vec<(String, Vec<String>)>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, merging into an existing field of the same name.
    pub fn push(&mut self, field: &str, value: String) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, values)) => values.push(value),
            None => self.fields.push((field.to_string(), vec![value])),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Drops fields for which the predicate returns false.
    pub fn retain_fields<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.fields.retain(|(name, _)| keep(name));
    }

    /// The `Order` values carried by this record. At most one is legal;
    /// the assembler rejects records carrying more.
    pub fn order_values(&self) -> &[String] {
        self.get(config::ORDER_FIELD).unwrap_or(&[])
    }

    /// The single `Order` value, if present.
    pub fn order(&self) -> Option<&str> {
        self.order_values().first().map(String::as_str)
    }

    /// Hierarchy level of this record, or `None` for unordered records.
    pub fn level(&self) -> Option<Level> {
        self.order().map(classify_order)
    }

    /// Identifier values, in declaration order.
    pub fn identifiers(&self) -> &[String] {
        self.get(config::IDENTIFIER_FIELD).unwrap_or(&[])
    }

    /// Appends a supplementary identifier.
    pub fn push_identifier(&mut self, id: String) {
        self.push(config::IDENTIFIER_FIELD, id);
    }
}
