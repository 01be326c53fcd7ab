//! Type model shared by every stage of the compiler
//!
//! All types live in a single arena owned by [`TypeModel`] and are addressed
//! by [`TypeId`]. Groups only hold ids, so forward references and cycles are
//! plain ids that get filled in place once the importer drains its queue.

use crate::finalize::FinalizedGroup;
use crate::naming::{self, type_name_from_property_name};
use crate::qualified_name::QualifiedName;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Stable index of a type inside a [`TypeModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Namespace key: API group plus version (API mode) or group alone (CRD mode)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub group: String,
    pub version: Option<String>,
}

impl GroupKey {
    pub fn new(group: &str, version: Option<&str>) -> Self {
        Self {
            group: group.to_string(),
            version: version.map(String::from),
        }
    }

    /// Group key of a qualified name
    pub fn of(name: &QualifiedName) -> Self {
        Self::new(&name.group, name.version.as_deref())
    }

    /// Identifier of the module this group is emitted into
    pub fn module_name(&self) -> String {
        naming::module_name(&self.group, self.version.as_deref())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}.{}", self.group, version),
            None => write!(f, "{}", self.group),
        }
    }
}

/// Primitive value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Primitive {
    String,
    Integer,
    Float,
    Boolean,
    Any,
}

/// Process-wide aliases every emitter provides from its base module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum WellKnown {
    Time,
    Quantity,
    IntOrString,
    Base64,
    IdnHostname,
}

impl WellKnown {
    pub fn name(self) -> &'static str {
        match self {
            WellKnown::Time => "Time",
            WellKnown::Quantity => "Quantity",
            WellKnown::IntOrString => "IntOrString",
            WellKnown::Base64 => "Base64",
            WellKnown::IdnHostname => "IDNHostname",
        }
    }

    pub fn all() -> [WellKnown; 5] {
        [
            WellKnown::Time,
            WellKnown::Quantity,
            WellKnown::IntOrString,
            WellKnown::Base64,
            WellKnown::IdnHostname,
        ]
    }
}

/// A resolved type expression used by properties and aliases
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TypeExpr {
    Primitive(Primitive),
    WellKnown(WellKnown),
    /// Reference to a type registered in the arena
    Type(TypeId),
    /// Unresolved reference to a type by qualified name
    Ref(QualifiedName),
    /// `List<T>`; bare `List` when the item schema is absent
    List(Option<Box<TypeExpr>>),
    /// `Dict<string, V>`; generic map when the value schema is absent
    Map(Option<Box<TypeExpr>>),
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    pub fn list_of(item: TypeExpr) -> Self {
        TypeExpr::List(Some(Box::new(item)))
    }

    pub fn map_of(value: TypeExpr) -> Self {
        TypeExpr::Map(Some(Box::new(value)))
    }

    /// Name of the generic wrapper, if any
    pub fn generic_name(&self) -> Option<&'static str> {
        match self {
            TypeExpr::List(_) => Some("List"),
            TypeExpr::Map(_) => Some("Dict"),
            TypeExpr::Union(_) => Some("Union"),
            _ => None,
        }
    }

    /// Direct generic parameters of this expression
    pub fn parameters(&self) -> Vec<&TypeExpr> {
        match self {
            TypeExpr::List(Some(inner)) | TypeExpr::Map(Some(inner)) => vec![inner.as_ref()],
            TypeExpr::Union(members) => members.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Rewrite every arena reference through `f`
    pub fn map_ids(&self, f: &impl Fn(TypeId) -> TypeId) -> TypeExpr {
        match self {
            TypeExpr::Type(id) => TypeExpr::Type(f(*id)),
            TypeExpr::List(inner) => TypeExpr::List(inner.as_ref().map(|i| Box::new(i.map_ids(f)))),
            TypeExpr::Map(inner) => TypeExpr::Map(inner.as_ref().map(|i| Box::new(i.map_ids(f)))),
            TypeExpr::Union(members) => {
                TypeExpr::Union(members.iter().map(|m| m.map_ids(f)).collect())
            }
            other => other.clone(),
        }
    }
}

/// A field of an object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    /// Name as it appears in the schema
    pub name: String,

    pub type_expr: TypeExpr,

    pub required: bool,

    pub description: Option<String>,

    /// Explicit emitted field name, overriding the derived snake_case name
    pub snake_name: Option<String>,
}

impl Property {
    pub fn new(name: &str, type_expr: TypeExpr, required: bool) -> Self {
        Self {
            name: name.to_string(),
            type_expr,
            required,
            description: None,
            snake_name: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_snake_name(mut self, snake_name: Option<String>) -> Self {
        self.snake_name = snake_name;
        self
    }

    /// Emitted field name
    pub fn field_name(&self) -> String {
        self.snake_name
            .clone()
            .unwrap_or_else(|| naming::camel_to_snake(&self.name))
    }
}

/// Sort properties required-first, then by name
pub fn sort_properties(properties: &mut [Property]) {
    properties.sort_by(|a, b| {
        b.required
            .cmp(&a.required)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Extra data carried by top-level Kubernetes kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResourceInfo {
    /// `apiVersion` value (e.g., "apps/v1", or "v1" for the core group)
    pub api_version: String,

    pub kind: String,

    /// Namespaced (true) or cluster-wide (false)
    pub scoped: bool,

    /// Plural resource name, when known
    pub plural: Option<String>,
}

/// Variant-specific payload of an [`ApiType`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeKind {
    /// A name bound to a type expression
    Alias(TypeExpr),
    /// A top-level named schema definition
    Resource,
    /// A top-level Kubernetes kind
    ApiResource(ApiResourceInfo),
    /// A nested object schema without a name of its own
    Anonymous { parent: TypeId, property: String },
}

impl TypeKind {
    pub fn discriminant(&self) -> &'static str {
        match self {
            TypeKind::Alias(_) => "alias",
            TypeKind::Resource => "resource",
            TypeKind::ApiResource(_) => "api_resource",
            TypeKind::Anonymous { .. } => "anonymous",
        }
    }
}

/// A type in the model
#[derive(Debug, Clone, Serialize)]
pub struct ApiType {
    /// Emitted name; anonymous types are renamed during finalize
    pub name: String,

    /// Parent-chain name (equal to `name` for named types)
    pub fullname: String,

    /// Identity key; merged anonymous types take their representative's
    pub fqn: String,

    pub group: GroupKey,

    pub description: Option<String>,

    pub properties: Vec<Property>,

    pub kind: TypeKind,

    /// Set when finalize merged this type into a structurally equal sibling
    pub merged_into: Option<TypeId>,
}

impl ApiType {
    pub fn is_anonymous(&self) -> bool {
        matches!(self.kind, TypeKind::Anonymous { .. })
    }

    pub fn api_resource(&self) -> Option<&ApiResourceInfo> {
        match &self.kind {
            TypeKind::ApiResource(info) => Some(info),
            _ => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// How a referenced type should be spelled from inside another type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QualifiedRef {
    /// The type refers to itself and needs indirection/quoting
    SelfRef(String),
    /// Same group, plain name
    Local(String),
    /// Another group of the same model
    External { module: String, name: String },
    /// A type not present in the model, by qualified name
    Canonical(QualifiedName),
}

#[derive(Debug, Default)]
pub(crate) struct Group {
    pub(crate) named: BTreeMap<String, TypeId>,
    /// Anonymous types bucketed by derived short name
    pub(crate) anonymous: BTreeMap<String, Vec<TypeId>>,
    pub(crate) finalized: Option<FinalizedGroup>,
}

/// Arena of all imported types plus the groups that namespace them
#[derive(Debug, Default)]
pub struct TypeModel {
    pub(crate) types: Vec<ApiType>,
    pub(crate) groups: BTreeMap<GroupKey, Group>,
    index: HashMap<(GroupKey, String), TypeId>,
}

impl TypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a named type by its fully-qualified name
    pub fn find(&self, group: &GroupKey, fqn: &str) -> Option<TypeId> {
        self.index.get(&(group.clone(), fqn.to_string())).copied()
    }

    /// Register a named type, returning the existing id if `(group, fqn)`
    /// is already registered
    pub fn register_named(
        &mut self,
        group: GroupKey,
        name: &str,
        kind: TypeKind,
        description: Option<String>,
    ) -> TypeId {
        let fqn = format!("{}.{}", group, name);
        if let Some(existing) = self.find(&group, &fqn) {
            return existing;
        }

        let id = TypeId(self.types.len());
        self.types.push(ApiType {
            name: name.to_string(),
            fullname: name.to_string(),
            fqn: fqn.clone(),
            group: group.clone(),
            description,
            properties: Vec::new(),
            kind,
            merged_into: None,
        });
        self.index.insert((group.clone(), fqn), id);

        let entry = self.groups.entry(group).or_default();
        entry.named.insert(name.to_string(), id);
        entry.finalized = None;
        id
    }

    /// Register an anonymous object declared under `property` of `parent`
    ///
    /// `type_name` replaces the name derived from the property name.
    pub fn register_anonymous(
        &mut self,
        parent: TypeId,
        property: &str,
        type_name: Option<&str>,
        description: Option<String>,
    ) -> TypeId {
        let parent_type = &self.types[parent.0];
        let derived = type_name
            .map(String::from)
            .unwrap_or_else(|| type_name_from_property_name(property));

        let short_name = if parent_type.is_anonymous() || type_name.is_some() {
            derived.clone()
        } else {
            format!("{}{}", parent_type.name, derived)
        };
        let fullname = format!("{}{}", parent_type.fullname, derived);
        let group = parent_type.group.clone();

        let id = TypeId(self.types.len());
        self.types.push(ApiType {
            name: short_name.clone(),
            fullname: fullname.clone(),
            fqn: format!("{}.{}", group, fullname),
            group: group.clone(),
            description,
            properties: Vec::new(),
            kind: TypeKind::Anonymous {
                parent,
                property: property.to_string(),
            },
            merged_into: None,
        });

        let entry = self.groups.entry(group).or_default();
        entry.anonymous.entry(short_name).or_default().push(id);
        entry.finalized = None;
        id
    }

    /// Fill in the properties of a registered placeholder
    pub fn set_properties(&mut self, id: TypeId, mut properties: Vec<Property>) {
        sort_properties(&mut properties);
        self.types[id.0].properties = properties;
    }

    pub fn get(&self, id: TypeId) -> &ApiType {
        &self.types[id.0]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut ApiType {
        &mut self.types[id.0]
    }

    /// Follow merge redirects to the retained type
    pub fn resolve(&self, mut id: TypeId) -> TypeId {
        while let Some(next) = self.types[id.0].merged_into {
            id = next;
        }
        id
    }

    /// Total number of types ever registered, merged ones included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn group_keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    /// Ids of all live (unmerged) types in a group, in no particular order
    pub fn group_type_ids(&self, key: &GroupKey) -> Vec<TypeId> {
        let Some(group) = self.groups.get(key) else {
            return Vec::new();
        };
        group
            .named
            .values()
            .copied()
            .chain(group.anonymous.values().flatten().copied())
            .filter(|id| self.types[id.0].merged_into.is_none())
            .collect()
    }

    /// Finalized view of a group; `None` until [`TypeModel::finalize`] runs
    pub fn finalized(&self, key: &GroupKey) -> Option<&FinalizedGroup> {
        self.groups.get(key).and_then(|g| g.finalized.as_ref())
    }

    /// All finalized groups in key order
    pub fn finalized_groups(&self) -> impl Iterator<Item = (&GroupKey, &FinalizedGroup)> {
        self.groups
            .iter()
            .filter_map(|(key, group)| group.finalized.as_ref().map(|f| (key, f)))
    }

    /// Find a live type of a group by its emitted name
    pub fn type_named(&self, key: &GroupKey, name: &str) -> Option<&ApiType> {
        self.group_type_ids(key)
            .into_iter()
            .map(|id| &self.types[id.0])
            .find(|t| t.name == name)
    }

    /// Spell a reference to `target` from inside `current`
    pub fn qualified_name(&self, target: TypeId, current: TypeId) -> QualifiedRef {
        let target = self.resolve(target);
        let current = self.resolve(current);
        let target_type = &self.types[target.0];

        if target == current {
            QualifiedRef::SelfRef(target_type.name.clone())
        } else if target_type.group == self.types[current.0].group {
            QualifiedRef::Local(target_type.name.clone())
        } else {
            QualifiedRef::External {
                module: target_type.group.module_name(),
                name: target_type.name.clone(),
            }
        }
    }

    /// Spell a by-name reference from inside `current`
    pub fn qualified_ref(&self, name: &QualifiedName, current: TypeId) -> QualifiedRef {
        let key = GroupKey::of(name);
        if let Some(&id) = self
            .groups
            .get(&key)
            .and_then(|group| group.named.get(&name.name))
        {
            return self.qualified_name(id, current);
        }
        QualifiedRef::Canonical(name.clone())
    }
}
