//! Work-list importer from raw schemas into the [`TypeModel`]
//!
//! Named definitions and nested objects are registered as placeholders the
//! moment they are first referenced and queued; their bodies are parsed when
//! the queue is drained. A reference to a type still in the queue is just its
//! [`TypeId`], so self references and cycles need no special casing.

use crate::annotations::{Annotations, PropertyOverride, TypeOverrides};
use crate::inference::SignatureMatcher;
use crate::schema::{RawSchema, SchemaNode, StringFormat};
use kube_typegen_common::{
    strip_ref_prefix, ApiResourceInfo, GroupKey, Primitive, Property, QualifiedName, Result,
    TypeExpr, TypeId, TypeKind, TypeModel, WellKnown,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

/// Kinds served at cluster scope when a definition carries no `x-scoped` flag
pub const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "CertificateSigningRequest",
    "ClusterRole",
    "ClusterRoleBinding",
    "ClusterTrustBundle",
    "ComponentStatus",
    "CSIDriver",
    "CSINode",
    "CustomResourceDefinition",
    "DeviceClass",
    "FlowSchema",
    "IngressClass",
    "IPAddress",
    "MutatingAdmissionPolicy",
    "MutatingAdmissionPolicyBinding",
    "MutatingWebhookConfiguration",
    "Namespace",
    "Node",
    "PersistentVolume",
    "PriorityClass",
    "PriorityLevelConfiguration",
    "ResourceSlice",
    "RuntimeClass",
    "SelfSubjectAccessReview",
    "SelfSubjectReview",
    "SelfSubjectRulesReview",
    "ServiceCIDR",
    "StorageClass",
    "StorageVersion",
    "StorageVersionMigration",
    "SubjectAccessReview",
    "TokenReview",
    "ValidatingAdmissionPolicy",
    "ValidatingAdmissionPolicyBinding",
    "ValidatingWebhookConfiguration",
    "VolumeAttachment",
    "VolumeAttributesClass",
];

/// Properties implied by an API resource's identity
const IMPLIED_PROPERTIES: &[&str] = &["apiVersion", "kind"];

/// Whether a kind (or its list kind) is served at namespace scope
pub fn is_namespaced_kind(kind: &str) -> bool {
    let base = kind.strip_suffix("List").unwrap_or(kind);
    !CLUSTER_SCOPED_KINDS.contains(&kind) && !CLUSTER_SCOPED_KINDS.contains(&base)
}

/// Drives a [`TypeModel`] from raw schemas
pub struct Importer<'a> {
    model: TypeModel,
    definitions: Option<&'a BTreeMap<String, RawSchema>>,
    annotations: &'a Annotations,
    matcher: Option<SignatureMatcher>,
    canonical_metadata: bool,
    pending: VecDeque<(TypeId, &'a RawSchema)>,
    resolved: HashMap<String, TypeExpr>,
}

impl<'a> Importer<'a> {
    pub fn new(annotations: &'a Annotations) -> Self {
        Self {
            model: TypeModel::new(),
            definitions: None,
            annotations,
            matcher: None,
            canonical_metadata: false,
            pending: VecDeque::new(),
            resolved: HashMap::new(),
        }
    }

    /// Resolve `$ref`s against these definitions
    pub fn with_definitions(mut self, definitions: &'a BTreeMap<String, RawSchema>) -> Self {
        self.definitions = Some(definitions);
        self
    }

    /// Replace nested objects matching a known signature by canonical references
    pub fn with_inference(mut self, matcher: SignatureMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Type the `metadata` of API resources as the canonical `ObjectMeta`
    pub fn with_canonical_metadata(mut self) -> Self {
        self.canonical_metadata = true;
        self
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    /// Register a root type whose body is `schema`
    pub fn register_root(
        &mut self,
        group: GroupKey,
        name: &str,
        kind: TypeKind,
        schema: &'a RawSchema,
    ) -> TypeId {
        let fqn = format!("{}.{}", group, name);
        if let Some(existing) = self.model.find(&group, &fqn) {
            return existing;
        }
        let id = self
            .model
            .register_named(group, name, kind, schema.description.clone());
        self.pending.push_back((id, schema));
        id
    }

    /// Resolve a `$ref` path or definition key to a type expression
    ///
    /// Defined targets are registered and queued; undefined ones become
    /// by-name references.
    pub fn import_ref(&mut self, reference: &str) -> Result<TypeExpr> {
        let key = strip_ref_prefix(reference);
        if let Some(expr) = self.resolved.get(key) {
            return Ok(expr.clone());
        }

        let name = QualifiedName::parse(key)?;
        if let Some(known) = well_known(&name) {
            let expr = TypeExpr::WellKnown(known);
            self.resolved.insert(key.to_string(), expr.clone());
            return Ok(expr);
        }

        match self.definitions.and_then(|defs| defs.get(key)) {
            Some(definition) => self.import_definition(key, &name, definition),
            None => {
                debug!("No definition for {}, referencing by name", key);
                let expr = TypeExpr::Ref(name);
                self.resolved.insert(key.to_string(), expr.clone());
                Ok(expr)
            }
        }
    }

    fn import_definition(
        &mut self,
        key: &str,
        name: &QualifiedName,
        definition: &'a RawSchema,
    ) -> Result<TypeExpr> {
        let group = GroupKey::of(name);

        if definition.is_record() {
            let kind = resource_kind(name, definition);
            let id = self.register_root(group, &name.name, kind, definition);
            let expr = TypeExpr::Type(id);
            self.resolved.insert(key.to_string(), expr.clone());
            return Ok(expr);
        }

        // Register first so an alias that mentions itself resolves to its own id
        let id = self.model.register_named(
            group,
            &name.name,
            TypeKind::Alias(TypeExpr::Primitive(Primitive::Any)),
            definition.description.clone(),
        );
        let expr = TypeExpr::Type(id);
        self.resolved.insert(key.to_string(), expr.clone());
        if definition.is_unconstrained() {
            return Ok(expr);
        }

        let target = self.import_property(id, "item", definition, None)?;
        trace!("Alias {} = {:?}", key, target);
        self.model.get_mut(id).kind = TypeKind::Alias(target);
        Ok(expr)
    }

    /// Parse queued bodies until no placeholders remain
    pub fn drain(&mut self) -> Result<()> {
        while let Some((id, schema)) = self.pending.pop_front() {
            self.import_resource(id, schema)?;
        }
        Ok(())
    }

    /// Drain the queue and finalize every group
    pub fn finish(mut self) -> Result<TypeModel> {
        self.drain()?;
        self.model.finalize();
        Ok(self.model)
    }

    fn override_keys(&self, id: TypeId) -> Vec<String> {
        let ty = self.model.get(id);
        let mut keys = vec![format!("{}.{}", ty.group, ty.fullname), ty.fullname.clone()];
        if ty.name != ty.fullname {
            keys.push(ty.name.clone());
        }
        keys
    }

    fn import_resource(&mut self, id: TypeId, schema: &'a RawSchema) -> Result<()> {
        let annotations = self.annotations;
        let overrides: Option<&'a TypeOverrides> = annotations.for_type(&self.override_keys(id));
        let is_api_resource = self.model.get(id).api_resource().is_some();
        let required: HashSet<&str> = schema.required.iter().map(String::as_str).collect();

        let mut properties = Vec::with_capacity(schema.properties.len());
        for (name, declared) in &schema.properties {
            if is_api_resource && IMPLIED_PROPERTIES.contains(&name.as_str()) {
                continue;
            }

            let (effective, snake_name, type_name) =
                match overrides.and_then(|o| o.get(name.as_str())) {
                    Some(PropertyOverride::Delete) => {
                        debug!("Dropping {}.{}", self.model.get(id).fullname, name);
                        continue;
                    }
                    Some(PropertyOverride::Patch(patch)) => (
                        patch.schema.as_ref().unwrap_or(declared),
                        patch.snake_name.clone(),
                        patch.type_name.as_deref(),
                    ),
                    None => (declared, None, None),
                };

            let type_expr = if self.canonical_metadata && is_api_resource && name == "metadata" {
                TypeExpr::Ref(QualifiedName::new("ObjectMeta", "meta", Some("v1")))
            } else {
                self.import_property(id, name, effective, type_name)?
            };

            let description = declared
                .description
                .clone()
                .or_else(|| effective.description.clone());
            properties.push(
                Property::new(name, type_expr, required.contains(name.as_str()))
                    .with_description(description)
                    .with_snake_name(snake_name),
            );
        }

        self.model.set_properties(id, properties);
        Ok(())
    }

    /// Type of a property declared on `parent`
    fn import_property(
        &mut self,
        parent: TypeId,
        property: &str,
        schema: &'a RawSchema,
        type_name: Option<&str>,
    ) -> Result<TypeExpr> {
        let context = format!("{}.{}", self.model.get(parent).fullname, property);

        let expr = match SchemaNode::classify(schema, &context)? {
            SchemaNode::Object(_) => {
                if let Some(canonical) = self
                    .matcher
                    .as_ref()
                    .and_then(|m| m.infer(property, schema))
                {
                    return Ok(TypeExpr::Ref(canonical));
                }
                let id = self.model.register_anonymous(
                    parent,
                    property,
                    type_name,
                    schema.description.clone(),
                );
                self.pending.push_back((id, schema));
                TypeExpr::Type(id)
            }
            SchemaNode::Map(Some(value)) => {
                TypeExpr::map_of(self.import_property(parent, property, value, type_name)?)
            }
            SchemaNode::Map(None) => TypeExpr::Map(None),
            SchemaNode::Array(Some(items)) => {
                TypeExpr::list_of(self.import_property(parent, property, items, type_name)?)
            }
            SchemaNode::Array(None) => TypeExpr::List(None),
            SchemaNode::Integer => TypeExpr::Primitive(Primitive::Integer),
            SchemaNode::Boolean => TypeExpr::Primitive(Primitive::Boolean),
            SchemaNode::Number { float: true } => TypeExpr::Primitive(Primitive::Float),
            SchemaNode::Number { float: false } => TypeExpr::Primitive(Primitive::Integer),
            SchemaNode::String(format) => string_type(format),
            SchemaNode::Ref(reference) => self.import_ref(reference)?,
            SchemaNode::PreserveUnknown => TypeExpr::Primitive(Primitive::Any),
            SchemaNode::IntOrString => TypeExpr::WellKnown(WellKnown::IntOrString),
        };
        Ok(expr)
    }
}

fn string_type(format: StringFormat) -> TypeExpr {
    match format {
        StringFormat::Plain => TypeExpr::Primitive(Primitive::String),
        StringFormat::Byte => TypeExpr::WellKnown(WellKnown::Base64),
        StringFormat::DateTime => TypeExpr::WellKnown(WellKnown::Time),
        StringFormat::IdnHostname => TypeExpr::WellKnown(WellKnown::IdnHostname),
        StringFormat::IntOrString => TypeExpr::Union(vec![
            TypeExpr::Primitive(Primitive::Integer),
            TypeExpr::Primitive(Primitive::String),
        ]),
    }
}

/// Definitions replaced by a process-wide alias instead of being imported
fn well_known(name: &QualifiedName) -> Option<WellKnown> {
    if !name.is_special() {
        return None;
    }
    match name.name.as_str() {
        "Quantity" => Some(WellKnown::Quantity),
        "IntOrString" => Some(WellKnown::IntOrString),
        _ => None,
    }
}

/// `ApiResource` for a definition declaring exactly its own kind, else `Resource`
fn resource_kind(name: &QualifiedName, definition: &RawSchema) -> TypeKind {
    let [gvk] = definition.group_version_kind.as_slice() else {
        return TypeKind::Resource;
    };
    if gvk.kind != name.name {
        return TypeKind::Resource;
    }

    let api_version = if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    };
    let scoped = definition
        .scoped
        .unwrap_or_else(|| is_namespaced_kind(&gvk.kind));

    TypeKind::ApiResource(ApiResourceInfo {
        api_version,
        kind: gvk.kind.clone(),
        scoped,
        plural: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definitions(value: serde_json::Value) -> BTreeMap<String, RawSchema> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_self_reference_is_a_type_id() {
        let defs = definitions(json!({
            "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaProps": {
                "type": "object",
                "properties": {
                    "not": {"$ref": "#/definitions/io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaProps"},
                    "allOf": {
                        "type": "array",
                        "items": {"$ref": "#/definitions/io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaProps"}
                    },
                    "properties": {
                        "type": "object",
                        "additionalProperties": {"$ref": "#/definitions/io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaProps"}
                    }
                }
            }
        }));
        let annotations = Annotations::new();
        let mut importer = Importer::new(&annotations).with_definitions(&defs);
        let root = importer
            .import_ref("io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaProps")
            .unwrap();
        importer.drain().unwrap();

        let TypeExpr::Type(id) = root else {
            panic!("expected a registered type");
        };
        let model = importer.model();
        let props = &model.get(id).properties;
        assert_eq!(
            props.iter().find(|p| p.name == "not").unwrap().type_expr,
            TypeExpr::Type(id)
        );
        assert_eq!(
            props.iter().find(|p| p.name == "allOf").unwrap().type_expr,
            TypeExpr::list_of(TypeExpr::Type(id))
        );
        assert_eq!(
            props.iter().find(|p| p.name == "properties").unwrap().type_expr,
            TypeExpr::map_of(TypeExpr::Type(id))
        );
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_well_known_and_undefined_refs() {
        let defs = BTreeMap::new();
        let annotations = Annotations::new();
        let mut importer = Importer::new(&annotations).with_definitions(&defs);

        assert_eq!(
            importer
                .import_ref("#/definitions/io.k8s.apimachinery.pkg.api.resource.Quantity")
                .unwrap(),
            TypeExpr::WellKnown(WellKnown::Quantity)
        );
        assert_eq!(
            importer
                .import_ref("#/definitions/io.k8s.apimachinery.pkg.util.intstr.IntOrString")
                .unwrap(),
            TypeExpr::WellKnown(WellKnown::IntOrString)
        );
        assert_eq!(
            importer
                .import_ref("#/definitions/io.k8s.api.core.v1.PodSpec")
                .unwrap(),
            TypeExpr::Ref(QualifiedName::new("PodSpec", "core", Some("v1")))
        );
        assert!(importer.import_ref("com.example.v1.Widget").is_err());
    }

    #[test]
    fn test_alias_definition() {
        let defs = definitions(json!({
            "io.k8s.apimachinery.pkg.apis.meta.v1.Time": {"type": "string", "format": "date-time"},
            "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSON": {
                "description": "Arbitrary JSON value"
            },
            "io.k8s.api.core.v1.Names": {
                "type": "array",
                "items": {"type": "string"}
            }
        }));
        let annotations = Annotations::new();
        let mut importer = Importer::new(&annotations).with_definitions(&defs);
        let TypeExpr::Type(time) = importer
            .import_ref("io.k8s.apimachinery.pkg.apis.meta.v1.Time")
            .unwrap()
        else {
            panic!("expected a registered type");
        };
        let TypeExpr::Type(names) = importer.import_ref("io.k8s.api.core.v1.Names").unwrap() else {
            panic!("expected a registered type");
        };

        let TypeExpr::Type(json) = importer
            .import_ref("io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSON")
            .unwrap()
        else {
            panic!("expected a registered type");
        };

        let model = importer.model();
        assert_eq!(
            model.get(json).kind,
            TypeKind::Alias(TypeExpr::Primitive(Primitive::Any))
        );
        assert_eq!(
            model.get(time).kind,
            TypeKind::Alias(TypeExpr::WellKnown(WellKnown::Time))
        );
        assert_eq!(
            model.get(names).kind,
            TypeKind::Alias(TypeExpr::list_of(TypeExpr::Primitive(Primitive::String)))
        );
    }

    #[test]
    fn test_resource_kind_detection() {
        let deployment: RawSchema = serde_json::from_value(json!({
            "type": "object",
            "x-kubernetes-group-version-kind": [{"group": "apps", "version": "v1", "kind": "Deployment"}]
        }))
        .unwrap();
        let name = QualifiedName::new("Deployment", "apps", Some("v1"));
        match resource_kind(&name, &deployment) {
            TypeKind::ApiResource(info) => {
                assert_eq!(info.api_version, "apps/v1");
                assert!(info.scoped);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let node: RawSchema = serde_json::from_value(json!({
            "type": "object",
            "x-kubernetes-group-version-kind": [{"group": "", "version": "v1", "kind": "Node"}]
        }))
        .unwrap();
        let name = QualifiedName::new("Node", "core", Some("v1"));
        match resource_kind(&name, &node) {
            TypeKind::ApiResource(info) => {
                assert_eq!(info.api_version, "v1");
                assert!(!info.scoped);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let delete_options: RawSchema = serde_json::from_value(json!({
            "type": "object",
            "x-kubernetes-group-version-kind": [
                {"group": "", "version": "v1", "kind": "DeleteOptions"},
                {"group": "apps", "version": "v1", "kind": "DeleteOptions"}
            ]
        }))
        .unwrap();
        let name = QualifiedName::new("DeleteOptions", "meta", Some("v1"));
        assert_eq!(resource_kind(&name, &delete_options), TypeKind::Resource);
    }

    #[test]
    fn test_explicit_scope_flag_wins() {
        let schema: RawSchema = serde_json::from_value(json!({
            "type": "object",
            "x-scoped": false,
            "x-kubernetes-group-version-kind": [{"group": "example.com", "version": "v1", "kind": "Widget"}]
        }))
        .unwrap();
        let name = QualifiedName::new("Widget", "core", Some("v1"));
        match resource_kind(&name, &schema) {
            TypeKind::ApiResource(info) => assert!(!info.scoped),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_namespaced_kinds() {
        assert!(is_namespaced_kind("Pod"));
        assert!(!is_namespaced_kind("Namespace"));
        assert!(!is_namespaced_kind("NamespaceList"));
        assert!(is_namespaced_kind("PodList"));
    }

    #[test]
    fn test_int_or_string_format_is_union() {
        assert_eq!(
            string_type(StringFormat::IntOrString),
            TypeExpr::Union(vec![
                TypeExpr::Primitive(Primitive::Integer),
                TypeExpr::Primitive(Primitive::String),
            ])
        );
    }
}
