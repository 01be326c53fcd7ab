//! Structural inference of canonical Kubernetes types inside CRD schemas
//!
//! CRD schemas inline well-known objects (tolerations, resource requirements,
//! containers...) instead of referencing them. A nested object whose property
//! names fit a known signature is replaced by a reference to the canonical
//! type so the emitted code reuses it.

use crate::schema::RawSchema;
use kube_typegen_common::{InferenceConfig, QualifiedName};
use tracing::debug;

/// Property-name fingerprint of a canonical type
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    /// Canonical type name, also used in `inference.disabled`
    pub name: &'static str,
    pub group: &'static str,
    pub version: &'static str,
    /// Properties that must all be present
    pub keys: &'static [&'static str],
    /// Every property the canonical type declares
    pub fields: &'static [&'static str],
    /// The declaring property name must contain one of these (lowercased)
    pub hints: &'static [&'static str],
}

impl Signature {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.name, self.group, Some(self.version))
    }

    fn matches(&self, property: &str, schema: &RawSchema, max_unknown_fields: usize) -> bool {
        if !self.hints.is_empty() {
            let lowered = property.to_ascii_lowercase();
            if !self.hints.iter().any(|hint| lowered.contains(hint)) {
                return false;
            }
        }

        if !self
            .keys
            .iter()
            .all(|key| schema.properties.contains_key(*key))
        {
            return false;
        }

        let unknown = schema
            .properties
            .keys()
            .filter(|name| !self.fields.contains(&name.as_str()))
            .count();
        unknown <= max_unknown_fields
    }
}

const fn core(
    name: &'static str,
    keys: &'static [&'static str],
    fields: &'static [&'static str],
    hints: &'static [&'static str],
) -> Signature {
    Signature {
        name,
        group: "core",
        version: "v1",
        keys,
        fields,
        hints,
    }
}

const KEY_SELECTOR_FIELDS: &[&str] = &["key", "name", "optional"];

/// Known signatures; hinted ones come first since their keys are weak
pub const SIGNATURES: &[Signature] = &[
    core(
        "ConfigMapKeySelector",
        &["key", "name"],
        KEY_SELECTOR_FIELDS,
        &["configmapkeyref"],
    ),
    core(
        "SecretKeySelector",
        &["key", "name"],
        KEY_SELECTOR_FIELDS,
        &["secretkeyref"],
    ),
    core(
        "SecretReference",
        &["name"],
        &["name", "namespace"],
        &["secretref"],
    ),
    core(
        "LocalObjectReference",
        &["name"],
        &["name"],
        &["imagepullsecrets"],
    ),
    // StatefulSet `volumeClaimTemplates` hold full claims, ephemeral volumes
    // a single `volumeClaimTemplate`; the plural hint has to be tried first.
    core(
        "PersistentVolumeClaim",
        &["spec"],
        &["apiVersion", "kind", "metadata", "spec", "status"],
        &["volumeclaimtemplates"],
    ),
    core(
        "PersistentVolumeClaimTemplate",
        &["spec"],
        &["metadata", "spec"],
        &["volumeclaimtemplate"],
    ),
    core(
        "ObjectReference",
        &["apiVersion", "kind", "name"],
        &[
            "apiVersion",
            "fieldPath",
            "kind",
            "name",
            "namespace",
            "resourceVersion",
            "uid",
        ],
        &[],
    ),
    core(
        "TypedLocalObjectReference",
        &["apiGroup", "kind", "name"],
        &["apiGroup", "kind", "name"],
        &[],
    ),
    core(
        "PersistentVolumeClaimSpec",
        &["accessModes", "resources"],
        &[
            "accessModes",
            "dataSource",
            "dataSourceRef",
            "resources",
            "selector",
            "storageClassName",
            "volumeAttributesClassName",
            "volumeMode",
            "volumeName",
        ],
        &[],
    ),
    core(
        "Toleration",
        &["key", "operator", "effect"],
        &["effect", "key", "operator", "tolerationSeconds", "value"],
        &[],
    ),
    core(
        "Affinity",
        &["nodeAffinity", "podAntiAffinity"],
        &["nodeAffinity", "podAffinity", "podAntiAffinity"],
        &[],
    ),
    core(
        "ResourceRequirements",
        &["limits", "requests"],
        &["claims", "limits", "requests"],
        &[],
    ),
    Signature {
        name: "LabelSelector",
        group: "meta",
        version: "v1",
        keys: &["matchExpressions", "matchLabels"],
        fields: &["matchExpressions", "matchLabels"],
        hints: &[],
    },
    core(
        "TopologySpreadConstraint",
        &["maxSkew", "topologyKey", "whenUnsatisfiable"],
        &[
            "labelSelector",
            "matchLabelKeys",
            "maxSkew",
            "minDomains",
            "nodeAffinityPolicy",
            "nodeTaintsPolicy",
            "topologyKey",
            "whenUnsatisfiable",
        ],
        &[],
    ),
    core(
        "Container",
        &["name", "image", "imagePullPolicy"],
        &[
            "args",
            "command",
            "env",
            "envFrom",
            "image",
            "imagePullPolicy",
            "lifecycle",
            "livenessProbe",
            "name",
            "ports",
            "readinessProbe",
            "resizePolicy",
            "resources",
            "restartPolicy",
            "securityContext",
            "startupProbe",
            "stdin",
            "stdinOnce",
            "terminationMessagePath",
            "terminationMessagePolicy",
            "tty",
            "volumeDevices",
            "volumeMounts",
            "workingDir",
        ],
        &[],
    ),
    core(
        "Probe",
        &["failureThreshold", "initialDelaySeconds", "periodSeconds"],
        &[
            "exec",
            "failureThreshold",
            "grpc",
            "httpGet",
            "initialDelaySeconds",
            "periodSeconds",
            "successThreshold",
            "tcpSocket",
            "terminationGracePeriodSeconds",
            "timeoutSeconds",
        ],
        &[],
    ),
    core(
        "Volume",
        &["name", "configMap", "secret", "emptyDir"],
        &[
            "awsElasticBlockStore",
            "azureDisk",
            "azureFile",
            "cephfs",
            "cinder",
            "configMap",
            "csi",
            "downwardAPI",
            "emptyDir",
            "ephemeral",
            "fc",
            "flexVolume",
            "flocker",
            "gcePersistentDisk",
            "gitRepo",
            "glusterfs",
            "hostPath",
            "image",
            "iscsi",
            "name",
            "nfs",
            "persistentVolumeClaim",
            "photonPersistentDisk",
            "portworxVolume",
            "projected",
            "quobyte",
            "rbd",
            "scaleIO",
            "secret",
            "storageos",
            "vsphereVolume",
        ],
        &[],
    ),
    core(
        "VolumeMount",
        &["mountPath", "name"],
        &[
            "mountPath",
            "mountPropagation",
            "name",
            "readOnly",
            "recursiveReadOnly",
            "subPath",
            "subPathExpr",
        ],
        &[],
    ),
    core(
        "EnvVar",
        &["name", "value", "valueFrom"],
        &["name", "value", "valueFrom"],
        &[],
    ),
    core(
        "SecurityContext",
        &["allowPrivilegeEscalation", "capabilities", "privileged"],
        &[
            "allowPrivilegeEscalation",
            "appArmorProfile",
            "capabilities",
            "privileged",
            "procMount",
            "readOnlyRootFilesystem",
            "runAsGroup",
            "runAsNonRoot",
            "runAsUser",
            "seLinuxOptions",
            "seccompProfile",
            "windowsOptions",
        ],
        &[],
    ),
    core(
        "PodSecurityContext",
        &["fsGroup", "supplementalGroups"],
        &[
            "appArmorProfile",
            "fsGroup",
            "fsGroupChangePolicy",
            "runAsGroup",
            "runAsNonRoot",
            "runAsUser",
            "seLinuxChangePolicy",
            "seLinuxOptions",
            "seccompProfile",
            "supplementalGroups",
            "supplementalGroupsPolicy",
            "sysctls",
            "windowsOptions",
        ],
        &[],
    ),
];

/// Matches nested CRD objects against [`SIGNATURES`]
#[derive(Debug, Clone)]
pub struct SignatureMatcher {
    config: InferenceConfig,
}

impl SignatureMatcher {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    /// Canonical type for an object declared under `property`, if one fits
    pub fn infer(&self, property: &str, schema: &RawSchema) -> Option<QualifiedName> {
        if !self.config.enabled || schema.properties.is_empty() {
            return None;
        }

        let signature = SIGNATURES.iter().find(|signature| {
            self.config.allows(signature.name)
                && signature.matches(property, schema, self.config.max_unknown_fields)
        })?;

        debug!(
            property = property,
            signature = signature.name,
            "Inferred canonical type"
        );
        Some(signature.qualified_name())
    }
}
