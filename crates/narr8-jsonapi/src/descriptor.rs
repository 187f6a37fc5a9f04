//! Declarative per-resource-type serialisation descriptors.
//!
//! A descriptor says how one entity type becomes a resource object: where
//! its id comes from, which attributes and meta keys it exposes, and how
//! each relationship is linked. Nested resource types are named, not held,
//! and resolved through a [`DescriptorRegistry`] while serialising.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use narr8_core::{Entity, Registered, Registry};
use serde_json::Value;

use crate::error::AccessorError;

/// Descriptors keyed by resource type.
pub type DescriptorRegistry = Registry<ResourceDescriptor>;

pub type AccessorFuture = BoxFuture<'static, Result<Value, AccessorError>>;
pub type ComputeFn = Arc<dyn Fn(&Entity) -> AccessorFuture + Send + Sync>;

/// Builds a static link from an entity and the API base URL.
pub type LinkFn = Arc<dyn Fn(&Entity, &str) -> Option<String> + Send + Sync>;

// ── Accessors ──────────────────────────────────────────────────────

/// Where a value is read from.
#[derive(Clone)]
pub enum Accessor {
    /// Direct field read by wire name.
    Field(String),
    /// Computed from the whole entity, possibly asynchronously.
    Computed(ComputeFn),
}

impl Accessor {
    pub fn field(name: impl Into<String>) -> Self {
        Accessor::Field(name.into())
    }

    /// A synchronous computation.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Entity) -> Result<Value, AccessorError> + Send + Sync + 'static,
    {
        Accessor::Computed(Arc::new(move |entity| future::ready(f(entity)).boxed()))
    }

    /// An asynchronous computation. The future must own what it reads.
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(&Entity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AccessorError>> + Send + 'static,
    {
        Accessor::Computed(Arc::new(move |entity| f(entity).boxed()))
    }

    /// Resolve against `entity`. An absent direct field yields `Ok(None)`.
    pub async fn resolve(&self, entity: &Entity) -> Result<Option<Value>, AccessorError> {
        match self {
            Accessor::Field(name) => Ok(entity.field(name)),
            Accessor::Computed(f) => f(entity).await.map(Some),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Accessor::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

// ── Relationships ──────────────────────────────────────────────────

/// Dotted `outer.inner` path through an intermediate collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    pub outer: String,
    pub inner: String,
}

impl KeyPath {
    /// Split on the first `.`; both halves must be non-empty.
    pub fn parse(path: &str) -> Option<Self> {
        let (outer, inner) = path.split_once('.')?;
        if outer.is_empty() || inner.is_empty() {
            return None;
        }
        Some(Self {
            outer: outer.to_string(),
            inner: inner.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum RelationshipKind {
    /// `{type, id}` read from the entity itself.
    Identifier { resource_type: String, id: Accessor },
    /// A nested entity or list stored under `key`, serialised with the
    /// descriptor registered for `resource`.
    Embedded {
        key: String,
        resource: String,
        force_single: bool,
        excluded: bool,
    },
    /// Entities reached through `outer[*].inner`.
    Through {
        path: KeyPath,
        resource: String,
        force_single: bool,
        excluded: bool,
    },
}

#[derive(Clone)]
pub struct RelationshipDescriptor {
    pub name: String,
    pub kind: RelationshipKind,
    pub related: Option<LinkFn>,
}

impl RelationshipDescriptor {
    pub fn identifier(
        name: impl Into<String>,
        resource_type: impl Into<String>,
        id: Accessor,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::Identifier {
                resource_type: resource_type.into(),
                id,
            },
            related: None,
        }
    }

    /// Embedded relation whose key defaults to the relationship name.
    pub fn embedded(name: impl Into<String>, resource: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: RelationshipKind::Embedded {
                key: name.clone(),
                resource: resource.into(),
                force_single: false,
                excluded: false,
            },
            name,
            related: None,
        }
    }

    pub fn through(name: impl Into<String>, path: KeyPath, resource: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::Through {
                path,
                resource: resource.into(),
                force_single: false,
                excluded: false,
            },
            related: None,
        }
    }

    /// Emit single-object linkage even for a list.
    pub fn force_single(mut self) -> Self {
        match &mut self.kind {
            RelationshipKind::Embedded { force_single, .. }
            | RelationshipKind::Through { force_single, .. } => *force_single = true,
            RelationshipKind::Identifier { .. } => {}
        }
        self
    }

    /// Keep nested resources out of `included`.
    pub fn excluded(mut self) -> Self {
        match &mut self.kind {
            RelationshipKind::Embedded { excluded, .. }
            | RelationshipKind::Through { excluded, .. } => *excluded = true,
            RelationshipKind::Identifier { .. } => {}
        }
        self
    }

    /// Read an embedded relation from `key` instead of the relationship name.
    pub fn with_key(mut self, new_key: impl Into<String>) -> Self {
        if let RelationshipKind::Embedded { key, .. } = &mut self.kind {
            *key = new_key.into();
        }
        self
    }

    pub fn with_related<F>(mut self, f: F) -> Self
    where
        F: Fn(&Entity, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.related = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for RelationshipDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("related", &self.related.is_some())
            .finish()
    }
}

// ── Resource descriptor ────────────────────────────────────────────

/// Meta keys every descriptor starts with.
pub const DEFAULT_META: [&str; 3] = ["createdAt", "updatedAt", "recordCount"];

#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub resource_type: String,
    pub endpoint: String,
    pub id: Accessor,
    pub attributes: Vec<(String, Accessor)>,
    pub meta: Vec<(String, Accessor)>,
    pub relationships: Vec<RelationshipDescriptor>,
    pub self_link: bool,
}

impl ResourceDescriptor {
    /// A descriptor with the default meta set and self links enabled.
    /// The endpoint defaults to the resource type.
    pub fn new(resource_type: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        Self {
            endpoint: resource_type.clone(),
            resource_type,
            id: Accessor::field("id"),
            attributes: Vec::new(),
            meta: DEFAULT_META
                .iter()
                .map(|key| (key.to_string(), Accessor::field(*key)))
                .collect(),
            relationships: Vec::new(),
            self_link: true,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_id(mut self, id: Accessor) -> Self {
        self.id = id;
        self
    }

    /// Direct-field attribute.
    pub fn with_field(self, name: &str) -> Self {
        self.with_attribute(name, Accessor::field(name))
    }

    pub fn with_attribute(mut self, name: impl Into<String>, accessor: Accessor) -> Self {
        self.attributes.push((name.into(), accessor));
        self
    }

    /// Add or replace a meta key.
    pub fn with_meta(mut self, name: impl Into<String>, accessor: Accessor) -> Self {
        let name = name.into();
        match self.meta.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = accessor,
            None => self.meta.push((name, accessor)),
        }
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipDescriptor) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn without_self_link(mut self) -> Self {
        self.self_link = false;
        self
    }
}

impl Registered for ResourceDescriptor {
    fn registry_key(&self) -> &str {
        &self.resource_type
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entity() -> Entity {
        let props = json!({"id": "c1", "name": "Ada"});
        let props = props.as_object().cloned().unwrap_or_default();
        Entity::from_properties("character", &props).with_property(&props, "name")
    }

    #[tokio::test]
    async fn field_accessor_reads_present_and_absent_fields() {
        let entity = entity();
        assert_eq!(
            Accessor::field("name").resolve(&entity).await,
            Ok(Some(json!("Ada")))
        );
        assert_eq!(Accessor::field("avatar").resolve(&entity).await, Ok(None));
    }

    #[tokio::test]
    async fn computed_and_deferred_accessors_resolve() {
        let entity = entity();
        let upper = Accessor::computed(|e| {
            e.field("name")
                .and_then(|v| v.as_str().map(str::to_uppercase))
                .map(Value::from)
                .ok_or_else(|| AccessorError::MissingField("name".into()))
        });
        assert_eq!(upper.resolve(&entity).await, Ok(Some(json!("ADA"))));

        let deferred = Accessor::deferred(|e| {
            let id = e.id.clone();
            async move { Ok(Value::from(format!("#{id}"))) }
        });
        assert_eq!(deferred.resolve(&entity).await, Ok(Some(json!("#c1"))));
    }

    #[test]
    fn key_path_requires_both_halves() {
        assert_eq!(
            KeyPath::parse("memberships.server"),
            Some(KeyPath {
                outer: "memberships".into(),
                inner: "server".into()
            })
        );
        assert!(KeyPath::parse("server").is_none());
        assert!(KeyPath::parse(".server").is_none());
    }

    #[test]
    fn descriptor_defaults() {
        let descriptor = ResourceDescriptor::new("character")
            .with_endpoint("characters")
            .with_field("name")
            .with_meta("recordCount", Accessor::computed(|_| Ok(json!(0))));

        assert!(descriptor.self_link);
        assert_eq!(descriptor.attributes.len(), 1);
        let meta: Vec<&str> = descriptor.meta.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(meta, vec!["createdAt", "updatedAt", "recordCount"]);
        assert!(matches!(descriptor.meta[2].1, Accessor::Computed(_)));
    }

    #[test]
    fn relationship_modifiers_apply_to_nested_kinds() {
        let rel = RelationshipDescriptor::embedded("user", "user")
            .force_single()
            .excluded()
            .with_key("owner");
        match rel.kind {
            RelationshipKind::Embedded {
                key,
                force_single,
                excluded,
                ..
            } => {
                assert_eq!(key, "owner");
                assert!(force_single);
                assert!(excluded);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
