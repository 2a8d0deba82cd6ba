// src/models/reading.rs

//! Reading records extracted from a lectionary page.

use serde::{Deserialize, Serialize};

/// One scripture passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingEntry {
    /// Heading of the reading (e.g. "Reading 1", "Gospel")
    pub reading_title: String,

    /// Scripture citation (e.g. "Lk 11:29-32")
    pub reading_address: String,

    /// Passage text, line breaks preserved as `\n`
    pub reading_body: String,

    /// Link to the cited passage
    pub reading_source: String,
}

impl ReadingEntry {
    /// An entry is only worth keeping when every field carries text.
    pub fn is_complete(&self) -> bool {
        !self.reading_title.is_empty()
            && !self.reading_address.is_empty()
            && !self.reading_body.is_empty()
            && !self.reading_source.is_empty()
    }
}

/// Liturgical day label that heads every page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MassHeader {
    pub mass_id: String,
}

/// A single element of a [`ReadingsPage`].
///
/// Serialized untagged so clients see the bare header or entry object.
/// `Entry` is listed first: a header object lacks the entry fields and falls
/// through to `Header` on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ReadingRecord {
    Entry(ReadingEntry),
    Header(MassHeader),
}

impl ReadingRecord {
    pub fn header(mass_id: impl Into<String>) -> Self {
        Self::Header(MassHeader {
            mass_id: mass_id.into(),
        })
    }

    pub fn as_entry(&self) -> Option<&ReadingEntry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Header(_) => None,
        }
    }
}

impl From<ReadingEntry> for ReadingRecord {
    fn from(entry: ReadingEntry) -> Self {
        Self::Entry(entry)
    }
}

/// Records extracted from one document: header first, then entries.
pub type ReadingsPage = Vec<ReadingRecord>;

/// One page per fetched document, start page first.
pub type ReadingsCollection = Vec<ReadingsPage>;
