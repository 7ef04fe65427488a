//! Level-of-detail groupings: which meshes of a model form each exported object.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::{FormatError, Result};

/// Ordered mesh indices composing one exported object.
pub type LodGroup = Vec<usize>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGroups {
    Notation(String),
    Lists(Vec<LodGroup>),
}

/// Explicit groupings keyed by model file stem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LodTable {
    entries: HashMap<String, Vec<LodGroup>>,
}

impl LodTable {
    /// Parses a JSON object whose values are either `"0,1;2,3"` strings or
    /// arrays of index arrays. Empty values are dropped so those files keep
    /// the default grouping.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: HashMap<String, RawGroups> = serde_json::from_str(text)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (name, groups) in raw {
            let groups = match groups {
                RawGroups::Notation(notation) if notation.trim().is_empty() => continue,
                RawGroups::Notation(notation) => parse_groups(&notation)?,
                RawGroups::Lists(lists) if lists.is_empty() => continue,
                RawGroups::Lists(lists) => lists,
            };
            entries.insert(name, groups);
        }
        Ok(LodTable { entries })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading LOD table {}", path.display()))?;
        LodTable::from_json_str(&text)
            .with_context(|| format!("parsing LOD table {}", path.display()))
    }

    pub fn insert(&mut self, file_name: impl Into<String>, groups: Vec<LodGroup>) {
        self.entries.insert(file_name.into(), groups);
    }

    pub fn lookup(&self, file_name: &str) -> Option<&[LodGroup]> {
        self.entries.get(file_name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses the compact notation: groups separated by `;`, indices by `,`.
pub fn parse_groups(notation: &str) -> Result<Vec<LodGroup>> {
    notation
        .split(';')
        .map(|group| {
            group
                .split(',')
                .map(|index| {
                    index
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| FormatError::InvalidLodSpec(notation.to_string()))
                })
                .collect::<Result<LodGroup>>()
        })
        .collect()
}

/// A single group holding every mesh in order.
pub fn default_groups(mesh_count: usize) -> Vec<LodGroup> {
    vec![(0..mesh_count).collect()]
}

/// Picks the explicit grouping for `file_name` or falls back to the default.
pub fn resolve_groups(
    table: Option<&LodTable>,
    file_name: &str,
    mesh_count: usize,
) -> Vec<LodGroup> {
    table
        .and_then(|table| table.lookup(file_name))
        .map(<[LodGroup]>::to_vec)
        .unwrap_or_else(|| default_groups(mesh_count))
}
