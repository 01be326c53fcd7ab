//! Qualified names of schema definitions
//!
//! Kubernetes publishes its definitions under dotted identifiers such as
//! `io.k8s.api.apps.v1.Deployment`. These are split into a
//! `(name, group, version)` triple using a static prefix table.

use crate::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifier prefix to API group mapping
pub const GROUP_PREFIXES: &[(&str, &str)] = &[
    ("io.k8s.api.admissionregistration", "admissionregistration"),
    ("io.k8s.api.apiserverinternal", "apiserverinternal"),
    ("io.k8s.api.apps", "apps"),
    ("io.k8s.api.authentication", "authentication"),
    ("io.k8s.api.authorization", "authorization"),
    ("io.k8s.api.autoscaling", "autoscaling"),
    ("io.k8s.api.batch", "batch"),
    ("io.k8s.api.certificates", "certificates"),
    ("io.k8s.api.coordination", "coordination"),
    ("io.k8s.api.core", "core"),
    ("io.k8s.api.discovery", "discovery"),
    ("io.k8s.api.events", "events"),
    ("io.k8s.api.extensions", "extensions"),
    ("io.k8s.api.flowcontrol", "flowcontrol"),
    ("io.k8s.api.networking", "networking"),
    ("io.k8s.api.node", "node"),
    ("io.k8s.api.policy", "policy"),
    ("io.k8s.api.rbac", "rbac"),
    ("io.k8s.api.resource", "resource"),
    ("io.k8s.api.scheduling", "scheduling"),
    ("io.k8s.api.storage", "storage"),
    ("io.k8s.api.storagemigration", "storagemigration"),
    ("io.k8s.apimachinery.pkg.apis.meta", "meta"),
    (
        "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions",
        "apiextensions",
    ),
    (
        "io.k8s.kube-aggregator.pkg.apis.apiregistration",
        "apiregistration",
    ),
    ("io.k8s.metrics.pkg.apis.metrics", "metrics"),
];

/// Well-known identifiers that don't follow the `prefix.version.Name` layout
const SPECIAL_CASES: &[(&str, &str, &str)] = &[
    (
        "io.k8s.apimachinery.pkg.api.resource.Quantity",
        "Quantity",
        "core",
    ),
    (
        "io.k8s.apimachinery.pkg.runtime.RawExtension",
        "RawExtension",
        "runtime",
    ),
    (
        "io.k8s.apimachinery.pkg.util.intstr.IntOrString",
        "IntOrString",
        "util",
    ),
    ("io.k8s.apimachinery.pkg.version.Info", "Info", "version"),
];

const REF_PREFIXES: &[&str] = &["#/definitions/", "#/components/schemas/"];

/// A `(name, group, version)` triple identifying a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Type name (e.g., "Deployment")
    pub name: String,

    /// API group (e.g., "apps")
    pub group: String,

    /// API version (e.g., "v1"); absent for unversioned well-known types
    pub version: Option<String>,
}

impl QualifiedName {
    pub fn new(name: &str, group: &str, version: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            version: version.map(String::from),
        }
    }

    /// Parse a dotted schema identifier or a `$ref` path
    ///
    /// # Example
    /// ```
    /// use kube_typegen_common::QualifiedName;
    ///
    /// let qn = QualifiedName::parse("io.k8s.api.apps.v1.Deployment").unwrap();
    /// assert_eq!(qn, QualifiedName::new("Deployment", "apps", Some("v1")));
    /// ```
    pub fn parse(id: &str) -> Result<Self> {
        let id = strip_ref_prefix(id);

        if let Some((_, name, group)) = SPECIAL_CASES.iter().find(|(key, _, _)| *key == id) {
            return Ok(Self::new(name, group, None));
        }

        for (prefix, group) in GROUP_PREFIXES {
            let Some(rest) = id
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
            else {
                continue;
            };

            return match rest.split_once('.') {
                Some((version, name)) if !version.is_empty() && !name.is_empty() => {
                    Ok(Self::new(name, group, Some(version)))
                }
                _ => Err(GeneratorError::UnknownGroup(id.to_string())),
            };
        }

        Err(GeneratorError::UnknownGroup(id.to_string()))
    }

    /// Whether this name is one of the special-cased well-known identifiers
    pub fn is_special(&self) -> bool {
        self.version.is_none()
            && SPECIAL_CASES
                .iter()
                .any(|(_, name, group)| *name == self.name && *group == self.group)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}.{}.{}", self.group, version, self.name),
            None => write!(f, "{}.{}", self.group, self.name),
        }
    }
}

/// Strip a `#/definitions/` or `#/components/schemas/` prefix from a `$ref`
pub fn strip_ref_prefix(reference: &str) -> &str {
    REF_PREFIXES
        .iter()
        .find_map(|prefix| reference.strip_prefix(prefix))
        .unwrap_or(reference)
}

/// Compare two API versions by stability; `Greater` means `a` is more stable
///
/// Leading version numbers are compared first, then a version without an
/// alpha/beta/rc qualifier outranks one that has a qualifier, and otherwise
/// the raw strings are compared.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (major_a, qualified_a) = split_version(a);
    let (major_b, qualified_b) = split_version(b);

    major_a
        .cmp(&major_b)
        .then_with(|| qualified_b.cmp(&qualified_a))
        .then_with(|| a.cmp(b))
}

fn split_version(version: &str) -> (u64, bool) {
    let rest = version.strip_prefix('v').unwrap_or(version);
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let major = digits.parse().unwrap_or(0);
    let qualifier = &rest[digits.len()..];
    let qualified = ["alpha", "beta", "rc"]
        .iter()
        .any(|q| qualifier.contains(q));
    (major, qualified)
}
