//! Declarative per-type materialization schemas.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use narr8_core::{Entity, Properties, Registered, Registry, Relationship, Row};

use crate::error::Result;
use crate::materializer::{Arena, GraphMaterializer};

/// Schemas keyed by type name.
pub type SchemaRegistry = Registry<Schema>;

/// Maps one node fragment of a row to an entity.
pub type MapperFn = Arc<dyn Fn(&MapperContext<'_>) -> Result<Entity> + Send + Sync>;

/// Everything a mapper can see when building an entity.
pub struct MapperContext<'a> {
    /// Type name of the schema being mapped.
    pub type_name: &'a str,
    /// Properties of the node being mapped.
    pub properties: &'a Properties,
    /// The full row, for relationship lookups.
    pub row: &'a dyn Row,
    /// Column the node was read from (`character`, `character_attribute`, ...).
    pub alias: &'a str,
    /// The materializer running this call.
    pub materializer: &'a GraphMaterializer,
    arena: Option<&'a RefCell<Arena>>,
}

impl<'a> MapperContext<'a> {
    /// A context detached from any materialization call. [`resolve`]
    /// always yields `None` on it.
    ///
    /// [`resolve`]: MapperContext::resolve
    pub fn new(
        type_name: &'a str,
        properties: &'a Properties,
        row: &'a dyn Row,
        alias: &'a str,
        materializer: &'a GraphMaterializer,
    ) -> Self {
        Self {
            type_name,
            properties,
            row,
            alias,
            materializer,
            arena: None,
        }
    }

    pub(crate) fn scoped(
        type_name: &'a str,
        properties: &'a Properties,
        row: &'a dyn Row,
        alias: &'a str,
        materializer: &'a GraphMaterializer,
        arena: &'a RefCell<Arena>,
    ) -> Self {
        Self {
            arena: Some(arena),
            ..Self::new(type_name, properties, row, alias, materializer)
        }
    }

    /// Resolve the node in column `alias` of this row as a `type_name`
    /// entity, sharing identities with the running call.
    ///
    /// The entity and its children land in the call's graph exactly as if
    /// a schema had reached them. The returned value is a snapshot of its
    /// own fields; relations are attached when the call finishes. `None`
    /// when the type is unknown, the column holds no usable node, the
    /// identity is already being mapped, or the context is detached.
    pub fn resolve(&self, type_name: &str, alias: &str) -> Option<Arc<Entity>> {
        let arena = self.arena?;
        let schema = self.materializer.registry().get(type_name)?;
        let slot = self.materializer.resolve(&schema, self.row, alias, arena)?;
        let entity = arena.borrow().snapshot(slot)?;
        Some(Arc::new(entity))
    }

    /// Alias of the node this one was reached from.
    ///
    /// `character_attribute` mapped as `attribute` yields `character`;
    /// a root alias yields `None`.
    pub fn parent_alias(&self) -> Option<&'a str> {
        let alias: &'a str = self.alias;
        alias
            .strip_suffix(self.type_name)
            .and_then(|prefix| prefix.strip_suffix('_'))
            .filter(|prefix| !prefix.is_empty())
    }

    /// The relationship in column `<parentAlias>_<suffix>`, if this row
    /// carries one.
    pub fn parent_relationship(&self, suffix: &str) -> Option<&'a Relationship> {
        let parent = self.parent_alias()?;
        self.row.relationship(&format!("{parent}_{suffix}"))
    }

    /// Start an entity envelope from the node's properties.
    pub fn entity(&self) -> Entity {
        Entity::from_properties(self.type_name, self.properties)
    }
}

/// How to materialize one entity type from row fragments.
///
/// Child types are referenced by name and resolved through the registry at
/// use-time, so mutually referencing types need no static cycle.
#[derive(Clone)]
pub struct Schema {
    pub type_name: String,
    /// Resource endpoint, e.g. `characters`.
    pub endpoint: String,
    pub single_children: Vec<String>,
    pub multi_children: Vec<String>,
    mapper: MapperFn,
}

impl Schema {
    pub fn new<F>(type_name: impl Into<String>, mapper: F) -> Self
    where
        F: Fn(&MapperContext<'_>) -> Result<Entity> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        Self {
            endpoint: type_name.clone(),
            type_name,
            single_children: Vec::new(),
            multi_children: Vec::new(),
            mapper: Arc::new(mapper),
        }
    }

    /// A schema whose mapper copies every node property into the entity.
    pub fn copying(type_name: impl Into<String>) -> Self {
        Self::new(type_name, |ctx| {
            let mut entity = ctx.entity();
            for (key, value) in ctx.properties {
                if !matches!(key.as_str(), "id" | "createdAt" | "updatedAt" | "recordCount") {
                    entity.fields.insert(key.clone(), value.clone());
                }
            }
            Ok(entity)
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_single_child(mut self, type_name: impl Into<String>) -> Self {
        self.single_children.push(type_name.into());
        self
    }

    pub fn with_multi_child(mut self, type_name: impl Into<String>) -> Self {
        self.multi_children.push(type_name.into());
        self
    }

    /// Run the mapper.
    pub fn map(&self, ctx: &MapperContext<'_>) -> Result<Entity> {
        (self.mapper)(ctx)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("endpoint", &self.endpoint)
            .field("single_children", &self.single_children)
            .field("multi_children", &self.multi_children)
            .finish_non_exhaustive()
    }
}

impl Registered for Schema {
    fn registry_key(&self) -> &str {
        &self.type_name
    }
}
