// src/types.rs
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One monitored competitor changelog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub name: String,      // unique within the active set
    pub changelog: String, // fetch URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, changelog: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            changelog: changelog.into(),
            description: None,
        }
    }
}

/// New lines per source for a single pass, in the order sources were processed.
/// Serializes as a JSON object `{ name: [lines] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<(String, Vec<String>)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records new lines for `source`. Empty diffs are not recorded; a repeated
    /// name replaces the earlier entry in place.
    pub fn insert(&mut self, source: impl Into<String>, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        let source = source.into();
        match self.entries.iter_mut().find(|(name, _)| *name == source) {
            Some(entry) => entry.1 = lines,
            None => self.entries.push((source, lines)),
        }
    }

    pub fn get(&self, source: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, lines)| lines.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of sources with changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_lines(&self) -> usize {
        self.entries.iter().map(|(_, lines)| lines.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, lines)| (name.as_str(), lines.as_slice()))
    }
}

impl FromIterator<(String, Vec<String>)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut set = ChangeSet::new();
        for (name, lines) in iter {
            set.insert(name, lines);
        }
        set
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, lines) in &self.entries {
            map.serialize_entry(name, lines)?;
        }
        map.end()
    }
}
