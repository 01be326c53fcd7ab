//! Rust source emitter producing serde structs

use crate::emitter::Emitter;
use crate::templates;
use kube_typegen_common::{
    naming, ordering_index, ApiType, GeneratorConfig, GeneratorError, GroupKey, Primitive,
    QualifiedName, QualifiedRef, Result, TypeExpr, TypeId, TypeKind, TypeModel,
};
use serde::Serialize;
use std::collections::HashMap;
use tera::Tera;
use tracing::debug;

/// Module names the emitter reserves for itself
const RESERVED_MODULES: &[&str] = &["base", "mod"];

const RESOURCE_TRAITS: &[&str] = &["ClusterResource", "NamespacedResource"];

#[derive(Debug, Serialize)]
struct GroupContext {
    group: String,
    refs: Vec<String>,
    imports: Vec<String>,
    items: Vec<ItemContext>,
}

#[derive(Debug, Serialize)]
struct ItemContext {
    name: String,
    description: Option<String>,
    /// Target of a type alias; `None` for structs
    alias: Option<String>,
    fields: Vec<FieldContext>,
    resource: Option<ResourceContext>,
}

#[derive(Debug, Serialize)]
struct FieldContext {
    name: String,
    ty: String,
    description: Option<String>,
    attributes: Vec<String>,
}

/// String fields hold Rust literals
#[derive(Debug, Serialize)]
struct ResourceContext {
    api_version: String,
    kind: String,
    plural: String,
    scope: &'static str,
}

/// Emits each group as a module of serde structs
pub struct RustEmitter {
    tera: Tera,

    /// Path through which canonical Kubernetes types are reached
    api_module: String,
}

impl RustEmitter {
    pub fn new(api_module: &str) -> Result<Self> {
        Ok(Self {
            tera: templates::load_templates()?,
            api_module: api_module.to_string(),
        })
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        Self::new(&config.api_module)
    }

    fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .map_err(|e| GeneratorError::Generation(format!("Template error: {:?}", e)))
    }
}

impl Emitter for RustEmitter {
    fn module_name(&self, group: &GroupKey) -> String {
        group.module_name()
    }

    fn emit_group(&self, model: &TypeModel, group: &GroupKey) -> Result<String> {
        let finalized = model.finalized(group).ok_or_else(|| {
            GeneratorError::Generation(format!("Group {} has not been finalized", group))
        })?;

        let module = self.module_name(group);
        if RESERVED_MODULES.contains(&module.as_str()) {
            return Err(GeneratorError::Generation(format!(
                "Group {} maps to reserved module name '{}'",
                group, module
            )));
        }

        let renderer = TypeRenderer {
            model,
            api_module: &self.api_module,
            order: ordering_index(finalized),
        };

        let mut imports = Vec::new();
        if finalized.generics.contains("Dict") {
            imports.push("use std::collections::BTreeMap;".to_string());
        }
        // Well-known aliases are path-qualified since model types may share their names
        let mut traits: Vec<&str> = finalized
            .base_types
            .iter()
            .map(String::as_str)
            .filter(|name| RESOURCE_TRAITS.contains(name))
            .collect();
        if !traits.is_empty() {
            traits.push("Resource");
            traits.sort_unstable();
            imports.push(format!("use super::base::{{{}}};", traits.join(", ")));
        }

        let context = GroupContext {
            group: group.to_string(),
            refs: finalized.refs.iter().map(|r| format!("`{}`", r)).collect(),
            imports,
            items: finalized
                .types
                .iter()
                .map(|id| renderer.item(*id))
                .collect(),
        };
        debug!(
            "Rendering module {} with {} items",
            module,
            context.items.len()
        );

        let context = tera::Context::from_serialize(&context)
            .map_err(|e| GeneratorError::Generation(format!("Template context error: {}", e)))?;
        self.render("group.rs", &context)
    }

    fn emit_base(&self) -> Result<String> {
        self.render("base.rs", &tera::Context::new())
    }

    fn emit_index(&self, modules: &[String]) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("modules", modules);
        self.render("mod.rs", &context)
    }

    fn extension(&self) -> String {
        "rs".to_string()
    }
}

/// Spells type expressions as Rust types from inside one group
struct TypeRenderer<'m> {
    model: &'m TypeModel,
    api_module: &'m str,
    order: HashMap<TypeId, usize>,
}

impl TypeRenderer<'_> {
    fn item(&self, id: TypeId) -> ItemContext {
        let ty = self.model.get(id);
        let alias = match &ty.kind {
            TypeKind::Alias(target) => Some(self.rust_type(target, id, true)),
            _ => None,
        };

        ItemContext {
            name: ty.name.clone(),
            description: ty.description.clone(),
            alias,
            fields: self.fields(ty, id),
            resource: ty.api_resource().map(|info| ResourceContext {
                api_version: format!("{:?}", info.api_version),
                kind: format!("{:?}", info.kind),
                plural: match &info.plural {
                    Some(plural) => format!("Some({:?})", plural),
                    None => "None".to_string(),
                },
                scope: if info.scoped {
                    "NamespacedResource"
                } else {
                    "ClusterResource"
                },
            }),
        }
    }

    fn fields(&self, ty: &ApiType, id: TypeId) -> Vec<FieldContext> {
        if matches!(ty.kind, TypeKind::Alias(_)) {
            return Vec::new();
        }

        ty.properties
            .iter()
            .map(|property| {
                let name = property.field_name();
                let inner = self.rust_type(&property.type_expr, id, true);

                let mut attributes = Vec::new();
                if name != property.name {
                    attributes.push(format!("#[serde(rename = {:?})]", property.name));
                }
                let ty = if property.required {
                    inner
                } else {
                    attributes.push(
                        "#[serde(default, skip_serializing_if = \"Option::is_none\")]".to_string(),
                    );
                    format!("Option<{}>", inner)
                };

                FieldContext {
                    name,
                    ty,
                    description: property.description.clone(),
                    attributes,
                }
            })
            .collect()
    }

    /// `direct` is false below a `Vec`/`BTreeMap`, which already add indirection
    fn rust_type(&self, expr: &TypeExpr, current: TypeId, direct: bool) -> String {
        match expr {
            TypeExpr::Primitive(primitive) => primitive_type(*primitive).to_string(),
            TypeExpr::WellKnown(known) => format!("super::base::{}", known.name()),
            TypeExpr::Type(target) => self.named_type(*target, current, direct),
            TypeExpr::Ref(name) => match self.lookup(name) {
                Some(target) => self.named_type(target, current, direct),
                None => self.canonical_path(name),
            },
            TypeExpr::List(item) => format!("Vec<{}>", self.parameter(item.as_deref(), current)),
            TypeExpr::Map(value) => format!(
                "BTreeMap<String, {}>",
                self.parameter(value.as_deref(), current)
            ),
            TypeExpr::Union(members) if is_int_or_string(members) => {
                "super::base::IntOrString".to_string()
            }
            TypeExpr::Union(_) => "serde_json::Value".to_string(),
        }
    }

    fn parameter(&self, expr: Option<&TypeExpr>, current: TypeId) -> String {
        match expr {
            Some(expr) => self.rust_type(expr, current, false),
            None => "serde_json::Value".to_string(),
        }
    }

    fn lookup(&self, name: &QualifiedName) -> Option<TypeId> {
        let group = GroupKey::of(name);
        let fqn = format!("{}.{}", group, name.name);
        self.model.find(&group, &fqn)
    }

    fn named_type(&self, target: TypeId, current: TypeId, direct: bool) -> String {
        let target = self.model.resolve(target);
        match self.model.qualified_name(target, current) {
            QualifiedRef::SelfRef(name) if direct => format!("Box<{}>", name),
            QualifiedRef::SelfRef(name) => name,
            QualifiedRef::Local(name) if direct && self.is_back_edge(target, current) => {
                format!("Box<{}>", name)
            }
            QualifiedRef::Local(name) => name,
            QualifiedRef::External { module, name } => format!("super::{}::{}", module, name),
            QualifiedRef::Canonical(name) => self.canonical_path(&name),
        }
    }

    /// A same-group reference that does not point strictly backwards is part of a cycle
    fn is_back_edge(&self, target: TypeId, current: TypeId) -> bool {
        match (self.order.get(&target), self.order.get(&current)) {
            (Some(t), Some(c)) => t >= c,
            _ => false,
        }
    }

    fn canonical_path(&self, name: &QualifiedName) -> String {
        format!(
            "{}::{}::{}",
            self.api_module,
            naming::module_name(&name.group, name.version.as_deref()),
            name.name
        )
    }
}

fn primitive_type(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::String => "String",
        Primitive::Integer => "i64",
        Primitive::Float => "f64",
        Primitive::Boolean => "bool",
        Primitive::Any => "serde_json::Value",
    }
}

fn is_int_or_string(members: &[TypeExpr]) -> bool {
    matches!(
        members,
        [
            TypeExpr::Primitive(Primitive::Integer),
            TypeExpr::Primitive(Primitive::String)
        ]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube_typegen_common::{ApiResourceInfo, Property, WellKnown};

    fn apps() -> GroupKey {
        GroupKey::new("apps", Some("v1"))
    }

    fn deployment_model() -> TypeModel {
        let mut model = TypeModel::new();
        let deployment = model.register_named(
            apps(),
            "Deployment",
            TypeKind::ApiResource(ApiResourceInfo {
                api_version: "apps/v1".to_string(),
                kind: "Deployment".to_string(),
                scoped: true,
                plural: None,
            }),
            Some("Deployment enables declarative updates.".to_string()),
        );
        let spec = model.register_anonymous(deployment, "spec", None, None);
        model.set_properties(
            deployment,
            vec![
                Property::new("spec", TypeExpr::Type(spec), false),
                Property::new(
                    "metadata",
                    TypeExpr::Ref(QualifiedName::new("ObjectMeta", "meta", Some("v1"))),
                    false,
                ),
            ],
        );
        model.set_properties(
            spec,
            vec![
                Property::new("replicas", TypeExpr::Primitive(Primitive::Integer), true)
                    .with_description(Some("Number of desired pods.".to_string())),
                Property::new(
                    "labels",
                    TypeExpr::map_of(TypeExpr::Primitive(Primitive::String)),
                    false,
                ),
                Property::new(
                    "minReadySeconds",
                    TypeExpr::WellKnown(WellKnown::IntOrString),
                    false,
                ),
                Property::new("type", TypeExpr::Primitive(Primitive::String), false),
            ],
        );
        model.finalize();
        model
    }

    #[test]
    fn test_emit_group() {
        let model = deployment_model();
        let emitter = RustEmitter::new("k8s_models").unwrap();
        let source = emitter.emit_group(&model, &apps()).unwrap();

        assert!(source.contains("use std::collections::BTreeMap;"));
        assert!(source.contains("use super::base::{NamespacedResource, Resource};"));
        assert!(source.contains("pub struct DeploymentSpec {"));
        assert!(source.contains("    /// Number of desired pods.\n"));
        assert!(source.contains("    pub replicas: i64,"));
        assert!(source.contains("    #[serde(rename = \"minReadySeconds\")]"));
        assert!(source.contains("    pub min_ready_seconds: Option<super::base::IntOrString>,"));
        assert!(source.contains("    pub labels: Option<BTreeMap<String, String>>,"));
        assert!(source.contains("    pub type_: Option<String>,"));
        assert!(source.contains("pub metadata: Option<k8s_models::meta_v1::ObjectMeta>,"));
        assert!(source.contains("const API_VERSION: &'static str = \"apps/v1\";"));
        assert!(source.contains("impl NamespacedResource for Deployment {}"));
        assert!(source.contains("/// Deployment enables declarative updates.\n"));

        let spec_at = source.find("pub struct DeploymentSpec").unwrap();
        let deployment_at = source.find("pub struct Deployment {").unwrap();
        assert!(spec_at < deployment_at);
    }

    #[test]
    fn test_self_reference_is_boxed() {
        let group = GroupKey::new("apiextensions", Some("v1"));
        let mut model = TypeModel::new();
        let props = model.register_named(group.clone(), "JSONSchemaProps", TypeKind::Resource, None);
        model.set_properties(
            props,
            vec![
                Property::new("not", TypeExpr::Type(props), false),
                Property::new("allOf", TypeExpr::list_of(TypeExpr::Type(props)), false),
            ],
        );
        model.finalize();

        let source = RustEmitter::new("k8s_models")
            .unwrap()
            .emit_group(&model, &group)
            .unwrap();
        assert!(source.contains("pub not: Option<Box<JSONSchemaProps>>,"));
        assert!(source.contains("pub all_of: Option<Vec<JSONSchemaProps>>,"));
    }

    #[test]
    fn test_external_reference_is_module_qualified() {
        let mut model = TypeModel::new();
        let template = model.register_named(
            GroupKey::new("core", Some("v1")),
            "PodTemplateSpec",
            TypeKind::Resource,
            None,
        );
        let spec = model.register_named(apps(), "DeploymentSpec", TypeKind::Resource, None);
        model.set_properties(
            spec,
            vec![Property::new("template", TypeExpr::Type(template), true)],
        );
        model.finalize();

        let source = RustEmitter::new("k8s_models")
            .unwrap()
            .emit_group(&model, &apps())
            .unwrap();
        assert!(source.contains("pub template: super::core_v1::PodTemplateSpec,"));
        assert!(source.contains("Referenced groups: `core.v1`"));
    }

    #[test]
    fn test_alias() {
        let meta = GroupKey::new("meta", Some("v1"));
        let mut model = TypeModel::new();
        model.register_named(
            meta.clone(),
            "Time",
            TypeKind::Alias(TypeExpr::WellKnown(WellKnown::Time)),
            None,
        );
        model.finalize();

        let source = RustEmitter::new("k8s_models")
            .unwrap()
            .emit_group(&model, &meta)
            .unwrap();
        assert!(source.contains("pub type Time = super::base::Time;"));
        assert!(!source.contains("use super::base"));
    }

    #[test]
    fn test_unfinalized_group_fails() {
        let mut model = TypeModel::new();
        model.register_named(apps(), "Deployment", TypeKind::Resource, None);
        let result = RustEmitter::new("k8s_models")
            .unwrap()
            .emit_group(&model, &apps());
        assert!(matches!(result, Err(GeneratorError::Generation(_))));
    }

    #[test]
    fn test_base_and_index() {
        let emitter = RustEmitter::new("k8s_models").unwrap();
        let base = emitter.emit_base().unwrap();
        assert!(base.contains("pub enum IntOrString"));
        assert!(base.contains("pub trait NamespacedResource: Resource {}"));

        let index = emitter
            .emit_index(&["apps_v1".to_string(), "core_v1".to_string()])
            .unwrap();
        assert!(index.contains("pub mod base;\npub mod apps_v1;\npub mod core_v1;\n"));
    }
}
