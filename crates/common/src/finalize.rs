//! Group finalization: anonymous-type reconciliation and dependency ordering

use crate::model::{GroupKey, TypeExpr, TypeId, TypeKind, TypeModel};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Read-only view of a finalized group, as consumed by an emitter
#[derive(Debug, Clone, Default, Serialize)]
pub struct FinalizedGroup {
    /// Live types, leaves first
    pub types: Vec<TypeId>,

    /// Other groups referenced by this group's types
    pub refs: BTreeSet<GroupKey>,

    /// Generic wrappers in use ("List", "Dict", "Union")
    pub generics: BTreeSet<String>,

    /// Names needed from the emitter's base module
    pub base_types: BTreeSet<String>,
}

type StructuralKey = Vec<(String, TypeExpr, bool)>;

/// One equivalence class of anonymous types after merging
struct AnonymousClass {
    representative: TypeId,
    size: usize,
    uniform_fullname: bool,
    fullname: String,
    key: StructuralKey,
}

impl TypeModel {
    /// Finalize every group
    pub fn finalize(&mut self) {
        let keys: Vec<GroupKey> = self.groups.keys().cloned().collect();
        for key in keys {
            self.finalize_group(&key);
        }
    }

    /// Deduplicate and name the anonymous types of a group, then compute its
    /// leaves-first ordering. Only types of `key` are mutated.
    pub fn finalize_group(&mut self, key: &GroupKey) {
        let Some(group) = self.groups.get(key) else {
            return;
        };
        let buckets = group.anonymous.clone();

        self.merge_equivalent(&buckets);
        self.assign_anonymous_names(key, &buckets);
        let finalized = self.dependency_order(key);

        debug!(
            "Finalized group {} with {} types ({} external refs)",
            key,
            finalized.types.len(),
            finalized.refs.len()
        );
        if let Some(group) = self.groups.get_mut(key) {
            group.finalized = Some(finalized);
        }
    }

    fn structural_key(&self, id: TypeId) -> StructuralKey {
        self.types[id.0]
            .properties
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    p.type_expr.map_ids(&|t| self.resolve(t)),
                    p.required,
                )
            })
            .collect()
    }

    /// Merge structurally identical siblings of each bucket until nothing
    /// changes; merging nested types can make their parents equal.
    fn merge_equivalent(&mut self, buckets: &BTreeMap<String, Vec<TypeId>>) {
        loop {
            let mut merged_any = false;

            for members in buckets.values() {
                let mut classes: BTreeMap<StructuralKey, Vec<TypeId>> = BTreeMap::new();
                for &id in members {
                    if self.types[id.0].merged_into.is_none() {
                        classes.entry(self.structural_key(id)).or_default().push(id);
                    }
                }

                for class in classes.values().filter(|c| c.len() > 1) {
                    let representative = class
                        .iter()
                        .copied()
                        .min_by(|a, b| {
                            self.types[a.0]
                                .fullname
                                .cmp(&self.types[b.0].fullname)
                                .then_with(|| a.cmp(b))
                        })
                        .unwrap_or(class[0]);

                    for &other in class.iter().filter(|&&id| id != representative) {
                        self.types[other.0].merged_into = Some(representative);
                        merged_any = true;
                    }
                }
            }

            if !merged_any {
                break;
            }
        }

        for members in buckets.values() {
            for &id in members {
                if self.types[id.0].merged_into.is_some() {
                    let retained = self.resolve(id);
                    self.types[id.0].fqn = self.types[retained.0].fqn.clone();
                }
            }
        }
    }

    fn assign_anonymous_names(&mut self, key: &GroupKey, buckets: &BTreeMap<String, Vec<TypeId>>) {
        let mut taken: HashSet<String> = self
            .groups
            .get(key)
            .map(|g| g.named.keys().cloned().collect())
            .unwrap_or_default();

        for (short_name, members) in buckets {
            let mut classes = self.classes_of(members);
            if classes.is_empty() {
                continue;
            }

            classes.sort_by(|a, b| {
                b.size
                    .cmp(&a.size)
                    .then_with(|| b.uniform_fullname.cmp(&a.uniform_fullname))
                    .then_with(|| a.fullname.cmp(&b.fullname))
                    .then_with(|| a.key.cmp(&b.key))
                    .then_with(|| a.representative.cmp(&b.representative))
            });

            let single = classes.len() == 1;
            for (i, class) in classes.iter().enumerate() {
                let name = if i == 0 && !taken.contains(short_name) {
                    short_name.clone()
                } else if (single || class.uniform_fullname) && !taken.contains(&class.fullname) {
                    class.fullname.clone()
                } else {
                    next_suffixed(short_name, &taken)
                };

                if name != *short_name {
                    debug!(
                        "Renamed anonymous type {} -> {} ({} members)",
                        class.fullname, name, class.size
                    );
                }
                taken.insert(name.clone());
                self.types[class.representative.0].name = name;
            }
        }
    }

    fn classes_of(&self, members: &[TypeId]) -> Vec<AnonymousClass> {
        let mut grouped: BTreeMap<TypeId, Vec<TypeId>> = BTreeMap::new();
        for &id in members {
            grouped.entry(self.resolve(id)).or_default().push(id);
        }

        grouped
            .into_iter()
            .map(|(representative, ids)| {
                let fullname = self.types[representative.0].fullname.clone();
                AnonymousClass {
                    representative,
                    size: ids.len(),
                    uniform_fullname: ids.iter().all(|id| self.types[id.0].fullname == fullname),
                    fullname,
                    key: self.structural_key(representative),
                }
            })
            .collect()
    }

    fn dependency_order(&self, key: &GroupKey) -> FinalizedGroup {
        let mut candidates = self.group_type_ids(key);
        candidates.sort_by(|a, b| {
            let (ta, tb) = (&self.types[a.0], &self.types[b.0]);
            ta.name.cmp(&tb.name).then_with(|| ta.fqn.cmp(&tb.fqn))
        });

        let mut walk = OrderWalk {
            model: self,
            key,
            visited: HashSet::new(),
            result: FinalizedGroup::default(),
            by_name: self
                .groups
                .get(key)
                .map(|g| g.named.clone())
                .unwrap_or_default(),
        };
        for id in candidates {
            walk.visit(id);
        }
        walk.result
    }
}

/// Depth-first walk that emits each type after its same-group dependencies
struct OrderWalk<'a> {
    model: &'a TypeModel,
    key: &'a GroupKey,
    visited: HashSet<TypeId>,
    result: FinalizedGroup,
    by_name: BTreeMap<String, TypeId>,
}

impl OrderWalk<'_> {
    fn visit(&mut self, id: TypeId) {
        let model = self.model;
        let id = model.resolve(id);
        if !self.visited.insert(id) {
            return;
        }

        let ty = model.get(id);
        if let Some(info) = ty.api_resource() {
            let base = if info.scoped {
                "NamespacedResource"
            } else {
                "ClusterResource"
            };
            self.result.base_types.insert(base.to_string());
        }

        let mut deps = Vec::new();
        if let TypeKind::Alias(target) = &ty.kind {
            self.collect(target, &mut deps);
        }
        for property in &ty.properties {
            self.collect(&property.type_expr, &mut deps);
        }
        for dep in deps {
            self.visit(dep);
        }

        self.result.types.push(id);
    }

    fn collect(&mut self, expr: &TypeExpr, deps: &mut Vec<TypeId>) {
        let model = self.model;
        match expr {
            TypeExpr::Type(target) => {
                let target = model.resolve(*target);
                let group = &model.get(target).group;
                if group == self.key {
                    deps.push(target);
                } else {
                    self.result.refs.insert(group.clone());
                }
            }
            TypeExpr::Ref(name) => {
                let group = GroupKey::of(name);
                match self.by_name.get(&name.name) {
                    Some(&target) if group == *self.key => deps.push(target),
                    _ if group == *self.key => {}
                    _ => {
                        self.result.refs.insert(group);
                    }
                }
            }
            TypeExpr::WellKnown(known) => {
                self.result.base_types.insert(known.name().to_string());
            }
            TypeExpr::Primitive(_) => {}
            TypeExpr::List(_) | TypeExpr::Map(_) | TypeExpr::Union(_) => {
                if let Some(generic) = expr.generic_name() {
                    self.result.generics.insert(generic.to_string());
                }
                for parameter in expr.parameters() {
                    self.collect(parameter, deps);
                }
            }
        }
    }
}

fn next_suffixed(base: &str, taken: &HashSet<String>) -> String {
    (2..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Index of every live type in its group's finalized ordering
pub fn ordering_index(group: &FinalizedGroup) -> HashMap<TypeId, usize> {
    group
        .types
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Primitive, Property, WellKnown};
    use crate::QualifiedName;

    fn key() -> GroupKey {
        GroupKey::new("example.com", None)
    }

    fn string() -> TypeExpr {
        TypeExpr::Primitive(Primitive::String)
    }

    /// Register `parent` with an anonymous child under `property`
    fn with_child(
        model: &mut TypeModel,
        parent: &str,
        property: &str,
        props: Vec<Property>,
    ) -> (TypeId, TypeId) {
        let parent_id = model.register_named(key(), parent, TypeKind::Resource, None);
        let child = model.register_anonymous(parent_id, "spec", None, None);
        let nested = model.register_anonymous(child, property, None, None);
        model.set_properties(nested, props);
        model.set_properties(
            child,
            vec![Property::new(property, TypeExpr::Type(nested), false)],
        );
        model.set_properties(
            parent_id,
            vec![Property::new("spec", TypeExpr::Type(child), true)],
        );
        (parent_id, nested)
    }

    #[test]
    fn test_identical_siblings_collapse() {
        let mut model = TypeModel::new();
        let props = vec![Property::new("name", string(), true)];
        let (_, a) = with_child(&mut model, "Alpha", "ref", props.clone());
        let (_, b) = with_child(&mut model, "Beta", "ref", props.clone());
        let (_, c) = with_child(&mut model, "Gamma", "ref", props);

        model.finalize();

        let retained: Vec<TypeId> = [a, b, c].iter().map(|id| model.resolve(*id)).collect();
        assert!(retained.iter().all(|id| *id == retained[0]));
        let kept = model.get(retained[0]);
        assert_eq!(kept.name, "REF");
        for id in [a, b, c] {
            assert_eq!(model.get(id).fqn, kept.fqn);
        }
    }

    #[test]
    fn test_dedup_insertion_order_independent() {
        let props = vec![Property::new("name", string(), true)];

        let mut forward = TypeModel::new();
        for parent in ["Alpha", "Beta", "Gamma"] {
            with_child(&mut forward, parent, "ref", props.clone());
        }
        forward.finalize();

        let mut backward = TypeModel::new();
        for parent in ["Gamma", "Beta", "Alpha"] {
            with_child(&mut backward, parent, "ref", props.clone());
        }
        backward.finalize();

        let kept_forward = forward.type_named(&key(), "REF").unwrap();
        let kept_backward = backward.type_named(&key(), "REF").unwrap();
        assert_eq!(kept_forward.fqn, kept_backward.fqn);
        assert_eq!(kept_forward.fqn, "example.com.AlphaSpecREF");
    }

    #[test]
    fn test_distinct_classes_get_suffixes() {
        let mut model = TypeModel::new();
        let shared = vec![Property::new("name", string(), true)];
        let other = vec![Property::new("port", TypeExpr::Primitive(Primitive::Integer), true)];

        with_child(&mut model, "Alpha", "endpoint", shared.clone());
        with_child(&mut model, "Beta", "endpoint", shared);
        let (_, lone) = with_child(&mut model, "Gamma", "endpoint", other);
        model.finalize();

        // The larger class keeps the short name; the lone class has a single
        // fullname and keeps it.
        let kept = model.type_named(&key(), "Endpoint").unwrap();
        assert_eq!(kept.properties[0].name, "name");
        assert_eq!(model.get(lone).name, "GammaSpecEndpoint");
    }

    #[test]
    fn test_mixed_fullnames_get_numeric_suffix() {
        let mut model = TypeModel::new();
        let shared = vec![Property::new("name", string(), true)];
        let other = vec![Property::new("port", TypeExpr::Primitive(Primitive::Integer), true)];

        with_child(&mut model, "Alpha", "endpoint", shared.clone());
        with_child(&mut model, "Beta", "endpoint", shared.clone());
        with_child(&mut model, "Alpha2", "endpoint", shared);
        with_child(&mut model, "Gamma", "endpoint", other.clone());
        with_child(&mut model, "Delta", "endpoint", other);
        model.finalize();

        assert!(model.type_named(&key(), "Endpoint").is_some());
        let second = model.type_named(&key(), "Endpoint2").unwrap();
        assert_eq!(second.properties[0].name, "port");
    }

    #[test]
    fn test_suffixing_is_deterministic() {
        let build = || {
            let mut model = TypeModel::new();
            for (i, parent) in ["A", "B", "C", "D"].iter().enumerate() {
                let props = vec![Property::new(&format!("f{}", i % 2), string(), true)];
                with_child(&mut model, parent, "item", props);
            }
            model.finalize();
            let mut names: Vec<(String, String)> = model
                .group_type_ids(&key())
                .into_iter()
                .map(|id| (model.get(id).fullname.clone(), model.get(id).name.clone()))
                .collect();
            names.sort();
            names
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_collision_with_named_type_uses_fullname() {
        let mut model = TypeModel::new();
        model.register_named(key(), "Template", TypeKind::Resource, None);
        let parent = model.register_named(key(), "Job", TypeKind::Resource, None);
        let spec = model.register_anonymous(parent, "spec", None, None);
        let template = model.register_anonymous(spec, "template", None, None);
        model.set_properties(template, vec![Property::new("name", string(), true)]);
        model.set_properties(
            spec,
            vec![Property::new("template", TypeExpr::Type(template), false)],
        );
        model.finalize();

        assert_eq!(model.get(template).name, "JobSpecTemplate");
        assert_eq!(
            model.type_named(&key(), "Template").unwrap().kind,
            TypeKind::Resource
        );
    }

    #[test]
    fn test_nested_merge_makes_parents_equal() {
        let mut model = TypeModel::new();
        let props = vec![Property::new("value", string(), false)];
        let (alpha, _) = with_child(&mut model, "Alpha", "inner", props.clone());
        let (beta, _) = with_child(&mut model, "Beta", "inner", props);
        model.finalize();

        // Both AlphaSpec and BetaSpec end up with identical properties once
        // their inner types merge, but they live in different buckets.
        let alpha_spec = model.get(alpha).properties[0].type_expr.clone();
        let beta_spec = model.get(beta).properties[0].type_expr.clone();
        let (TypeExpr::Type(a), TypeExpr::Type(b)) = (alpha_spec, beta_spec) else {
            panic!("expected type references");
        };
        assert_eq!(model.structural_key(a), model.structural_key(b));
        assert_ne!(model.resolve(a), model.resolve(b));
    }

    #[test]
    fn test_dependency_order_leaves_first() {
        let mut model = TypeModel::new();
        let (parent, nested) = with_child(
            &mut model,
            "Alpha",
            "inner",
            vec![Property::new("value", string(), false)],
        );
        model.finalize();

        let group = model.finalized(&key()).unwrap();
        let index = ordering_index(group);
        for id in &group.types {
            for property in &model.get(*id).properties {
                if let TypeExpr::Type(dep) = property.type_expr {
                    let dep = model.resolve(dep);
                    if dep != *id {
                        assert!(index[&dep] < index[id]);
                    }
                }
            }
        }
        assert!(index[&model.resolve(nested)] < index[&parent]);
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut model = TypeModel::new();
        let id = model.register_named(key(), "Props", TypeKind::Resource, None);
        model.set_properties(
            id,
            vec![
                Property::new("not", TypeExpr::Type(id), false),
                Property::new("items", TypeExpr::list_of(TypeExpr::Type(id)), false),
                Property::new("properties", TypeExpr::map_of(TypeExpr::Type(id)), false),
            ],
        );
        model.finalize();

        let group = model.finalized(&key()).unwrap();
        assert_eq!(group.types, vec![id]);
        assert!(group.generics.contains("List"));
        assert!(group.generics.contains("Dict"));
    }

    #[test]
    fn test_external_refs_and_base_types() {
        let mut model = TypeModel::new();
        let meta = GroupKey::new("meta", Some("v1"));
        let object_meta = model.register_named(meta.clone(), "ObjectMeta", TypeKind::Resource, None);
        let id = model.register_named(
            key(),
            "Widget",
            TypeKind::ApiResource(crate::ApiResourceInfo {
                api_version: "example.com/v1".to_string(),
                kind: "Widget".to_string(),
                scoped: false,
                plural: None,
            }),
            None,
        );
        model.set_properties(
            id,
            vec![
                Property::new("metadata", TypeExpr::Type(object_meta), false),
                Property::new(
                    "container",
                    TypeExpr::Ref(QualifiedName::new("Container", "core", Some("v1"))),
                    false,
                ),
                Property::new("created", TypeExpr::WellKnown(WellKnown::Time), false),
            ],
        );
        model.finalize();

        let group = model.finalized(&key()).unwrap();
        assert!(group.refs.contains(&meta));
        assert!(group.refs.contains(&GroupKey::new("core", Some("v1"))));
        assert!(group.base_types.contains("Time"));
        assert!(group.base_types.contains("ClusterResource"));
        assert_eq!(group.types, vec![id]);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut model = TypeModel::new();
        let props = vec![Property::new("name", string(), true)];
        with_child(&mut model, "Alpha", "ref", props.clone());
        with_child(&mut model, "Beta", "ref", props);

        model.finalize();
        let first = model.finalized(&key()).unwrap().types.clone();
        model.finalize();
        let second = model.finalized(&key()).unwrap().types.clone();
        assert_eq!(first, second);
    }
}
