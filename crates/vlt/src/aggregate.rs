//! Folding secret/label join rows into one record per secret

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// One row of the secrets/labels join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLabelRow {
    pub id: i64,
    pub name: String,
    pub label: String,
}

impl SecretLabelRow {
    pub fn new(id: i64, name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            label: label.into(),
        }
    }
}

/// A secret with (some of) its labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSecret {
    pub name: String,
    pub labels: Vec<String>,
}

/// Search result keyed by secret id
pub type LabeledSecrets = BTreeMap<i64, LabeledSecret>;

/// Groups rows by secret id.
///
/// Labels keep arrival order and are not deduplicated. The name comes from
/// the first row seen for an id.
pub fn reduce<I>(rows: I) -> LabeledSecrets
where
    I: IntoIterator<Item = SecretLabelRow>,
{
    let mut secrets = LabeledSecrets::new();

    for row in rows {
        match secrets.entry(row.id) {
            Entry::Occupied(mut entry) => entry.get_mut().labels.push(row.label),
            Entry::Vacant(entry) => {
                entry.insert(LabeledSecret {
                    name: row.name,
                    labels: vec![row.label],
                });
            }
        }
    }

    secrets
}
