//! Grouped record of rule violations
//!
//! One entry per (category, description) pair. Repeated triggers of the same
//! rule merge their phase and harmonic identifiers into sets instead of adding
//! rows, so order 5 failing on phases A1 and A3 is a single entry.
//!
//! Serialized as a nested map in first-recorded order:
//!
//! ```json
//! { "Voltage THD": { "95th Percentile (10min) > limit": { "phases": ["U1"], "harmonics": [] } } }
//! ```

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

/// One grouped violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailingPoint {
    pub category: String,
    pub description: String,
    pub phases: BTreeSet<String>,
    pub harmonics: BTreeSet<u8>,
}

impl FailingPoint {
    fn new(category: &str, description: &str) -> Self {
        Self {
            category: category.to_string(),
            description: description.to_string(),
            phases: BTreeSet::new(),
            harmonics: BTreeSet::new(),
        }
    }
}

/// Ordered accumulator of [`FailingPoint`]s keyed by (category, description)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailingPoints {
    entries: Vec<FailingPoint>,
}

impl FailingPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a violation. Recording the same trigger twice is a no-op.
    pub fn record(
        &mut self,
        category: &str,
        description: &str,
        phase: Option<&str>,
        harmonic: Option<u8>,
    ) {
        let idx = match self
            .entries
            .iter()
            .position(|e| e.category == category && e.description == description)
        {
            Some(idx) => idx,
            None => {
                self.entries.push(FailingPoint::new(category, description));
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[idx];
        if let Some(phase) = phase {
            entry.phases.insert(phase.to_string());
        }
        if let Some(harmonic) = harmonic {
            entry.harmonics.insert(harmonic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (category, description) groups
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailingPoint> {
        self.entries.iter()
    }

    pub fn get(&self, category: &str, description: &str) -> Option<&FailingPoint> {
        self.entries
            .iter()
            .find(|e| e.category == category && e.description == description)
    }

    /// Distinct categories in first-recorded order
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !out.contains(&entry.category.as_str()) {
                out.push(&entry.category);
            }
        }
        out
    }
}

// ============================================================================
// Serialization
// ============================================================================

struct PointBody<'a>(&'a FailingPoint);

impl Serialize for PointBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FailingPoint", 2)?;
        s.serialize_field("phases", &self.0.phases)?;
        s.serialize_field("harmonics", &self.0.harmonics)?;
        s.end()
    }
}

struct CategoryBody<'a> {
    points: &'a FailingPoints,
    category: &'a str,
}

impl Serialize for CategoryBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for entry in self.points.iter().filter(|e| e.category == self.category) {
            map.serialize_entry(&entry.description, &PointBody(entry))?;
        }
        map.end()
    }
}

impl Serialize for FailingPoints {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let categories = self.categories();
        let mut map = serializer.serialize_map(Some(categories.len()))?;
        for category in categories {
            map.serialize_entry(
                category,
                &CategoryBody {
                    points: self,
                    category,
                },
            )?;
        }
        map.end()
    }
}
