//! Lookup of schema definitions by short type name
//!
//! Users ask for `Deployment`, not `io.k8s.api.apps.v1.Deployment`. When a
//! short name exists in several groups or versions the most stable version
//! wins; the core group breaks remaining ties, then the group name.

use kube_typegen_common::{compare_versions, GeneratorError, QualifiedName, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Debug, Clone)]
struct Candidate {
    key: String,
    name: QualifiedName,
}

/// Short name to definition key index
#[derive(Debug, Clone, Default)]
pub struct ShortNameIndex {
    chosen: BTreeMap<String, Candidate>,
    /// Every indexed key, including versions that lost the short name
    keys: BTreeSet<String>,
}

impl ShortNameIndex {
    /// Build the index over definition keys
    pub fn build<'k, I>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'k String>,
    {
        let mut candidates: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
        let mut all_keys = BTreeSet::new();
        for key in keys {
            let name = QualifiedName::parse(key)?;
            all_keys.insert(key.clone());
            candidates
                .entry(name.name.to_ascii_lowercase())
                .or_default()
                .push(Candidate {
                    key: key.clone(),
                    name,
                });
        }

        let mut chosen = BTreeMap::new();
        for (short, mut group) in candidates {
            group.sort_by(preference);
            let mut group = group.into_iter();
            let Some(best) = group.next() else {
                continue;
            };
            let others: Vec<String> = group.map(|c| c.name.to_string()).collect();
            if !others.is_empty() {
                info!(
                    "Type '{}' resolves to {}; also available: {}",
                    best.name.name,
                    best.name,
                    others.join(", ")
                );
            }
            chosen.insert(short, best);
        }

        Ok(Self {
            chosen,
            keys: all_keys,
        })
    }

    /// Definition key for a requested type, given as a short name or a full key
    pub fn resolve<'s>(&'s self, requested: &'s str) -> Result<&'s str> {
        if let Some(candidate) = self.chosen.get(&requested.to_ascii_lowercase()) {
            return Ok(&candidate.key);
        }
        if let Some(key) = self.keys.get(requested) {
            return Ok(key.as_str());
        }
        Err(GeneratorError::UnknownTypeRequested(requested.to_string()))
    }

    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }
}

/// Most preferred candidate sorts first
fn preference(a: &Candidate, b: &Candidate) -> Ordering {
    let version_a = a.name.version.as_deref().unwrap_or("");
    let version_b = b.name.version.as_deref().unwrap_or("");

    compare_versions(version_b, version_a)
        .then_with(|| (b.name.group == "core").cmp(&(a.name.group == "core")))
        .then_with(|| a.name.group.cmp(&b.name.group))
}
