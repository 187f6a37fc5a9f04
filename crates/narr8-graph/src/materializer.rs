//! Graph materialization: flat rows in, deduplicated entity graph out.
//!
//! Entities live in a call-scoped arena while rows are scanned. The arena
//! index maps `type#id` to a dense slot, so a repeated identity always
//! lands on the same slot and slots keep first-seen order. Parent/child
//! links are slot indices until the arena is frozen into `Arc` entities
//! at the end of the call.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use narr8_core::entity::scalar_to_string;
use narr8_core::{Entity, Node, Relation, Row};
use serde_json::Value;

use crate::error::{MaterializeError, Result};
use crate::schema::{MapperContext, Schema, SchemaRegistry};

/// Rebuilds entity graphs from rows using schemas from a shared registry.
///
/// Holds no per-call state; one instance can serve any number of calls.
#[derive(Debug, Clone)]
pub struct GraphMaterializer {
    registry: Arc<SchemaRegistry>,
}

impl GraphMaterializer {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Fold `rows` into the list of distinct `root` entities.
    ///
    /// Roots come back in the order their identity was first seen. Rows
    /// without a usable root column are skipped for root purposes, and a
    /// malformed fragment only drops that fragment for that row.
    ///
    /// Relations that loop back to an entity still being assembled are
    /// truncated: the entity reached through the cycle is shared by every
    /// path, so it lacks the looping relation everywhere.
    pub fn create_graph_list<R: Row>(&self, root: &Schema, rows: &[R]) -> Vec<Entity> {
        let arena = RefCell::new(Arena::default());

        for row in rows {
            self.resolve(root, row, &root.type_name, &arena);
        }

        let arena = arena.into_inner();

        let root_slots: Vec<usize> = arena
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.type_name == root.type_name)
            .map(|(idx, _)| idx)
            .collect();

        tracing::debug!(
            root = %root.type_name,
            rows = rows.len(),
            entities = arena.slots.len(),
            roots = root_slots.len(),
            "Materialized entity graph"
        );

        arena.freeze(&root_slots)
    }

    /// Resolve the node in column `alias` as a `schema` entity, then
    /// attach its children from the same row. Returns the entity's slot.
    ///
    /// No arena borrow is held while a mapper runs, so mappers may resolve
    /// further aliases through [`MapperContext::resolve`].
    pub(crate) fn resolve(
        &self,
        schema: &Schema,
        row: &dyn Row,
        alias: &str,
        arena: &RefCell<Arena>,
    ) -> Option<usize> {
        let node = row.node(alias)?;

        let id = match identity_of(node, alias) {
            Ok(Some(id)) => id,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(alias = %alias, error = %err, "Skipping row fragment");
                return None;
            }
        };

        let key = format!("{}#{}", schema.type_name, id);
        let existing = arena.borrow().index.get(&key).copied();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                if !arena.borrow_mut().mapping.insert(key.clone()) {
                    tracing::trace!(key = %key, "Identity already being mapped, skipping");
                    return None;
                }
                let ctx = MapperContext::scoped(
                    &schema.type_name,
                    &node.properties,
                    row,
                    alias,
                    self,
                    arena,
                );
                let mapped = schema.map(&ctx);
                arena.borrow_mut().mapping.remove(&key);
                match mapped {
                    Ok(mut entity) => {
                        entity.type_name = schema.type_name.clone();
                        entity.id = id;
                        arena.borrow_mut().insert(key, entity)
                    }
                    Err(err) => {
                        tracing::warn!(
                            type_name = %schema.type_name,
                            alias = %alias,
                            error = %err,
                            "Skipping row fragment"
                        );
                        return None;
                    }
                }
            }
        };

        for token in &schema.single_children {
            let Some(child_schema) = self.child_schema(schema, token) else {
                continue;
            };
            let child_alias = format!("{alias}_{}", child_schema.type_name);
            if let Some(child) = self.resolve(&child_schema, row, &child_alias, arena) {
                arena.borrow_mut().slots[slot]
                    .single
                    .insert(child_schema.type_name.clone(), child);
            }
        }

        for token in &schema.multi_children {
            let Some(child_schema) = self.child_schema(schema, token) else {
                continue;
            };
            let child_alias = format!("{alias}_{}", child_schema.type_name);
            if let Some(child) = self.resolve(&child_schema, row, &child_alias, arena) {
                arena
                    .borrow_mut()
                    .push_child(slot, &child_schema.type_name, child);
            }
        }

        Some(slot)
    }

    fn child_schema(&self, parent: &Schema, token: &str) -> Option<Arc<Schema>> {
        let schema = self.registry.get(token);
        if schema.is_none() {
            tracing::trace!(
                parent = %parent.type_name,
                child = %token,
                "Child type not registered, skipping"
            );
        }
        schema
    }
}

/// Extract the identity of `node`.
///
/// A missing, null, or empty id means the node cannot be materialized and
/// is skipped silently. Anything other than a string or number is
/// malformed.
fn identity_of(node: &Node, alias: &str) -> Result<Option<String>> {
    match node.property("id") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match scalar_to_string(value) {
            Some(id) if id.is_empty() => Ok(None),
            Some(id) => Ok(Some(id)),
            None => Err(MaterializeError::MalformedIdentity {
                label: node.label.clone(),
                alias: alias.to_string(),
                value: value.to_string(),
            }),
        },
    }
}

// ── Arena ─────────────────────────────────────────────────────────

pub(crate) struct Slot {
    type_name: String,
    entity: Entity,
    /// Child type name → slot. Last write wins.
    single: BTreeMap<String, usize>,
    /// Child type name → slots, in insertion order, unique by id.
    multi: BTreeMap<String, Vec<usize>>,
}

/// Call-scoped identity map.
#[derive(Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
    /// Keys whose mapper is running.
    mapping: HashSet<String>,
}

enum Frozen {
    Pending,
    InProgress,
    Done(Arc<Entity>),
}

impl Arena {
    fn insert(&mut self, key: String, entity: Entity) -> usize {
        let slot = self.slots.len();
        self.slots.push(Slot {
            type_name: entity.type_name.clone(),
            entity,
            single: BTreeMap::new(),
            multi: BTreeMap::new(),
        });
        self.index.insert(key, slot);
        slot
    }

    fn push_child(&mut self, parent: usize, name: &str, child: usize) {
        let child_id = self.slots[child].entity.id.clone();
        let existing = self.slots[parent].multi.get(name).cloned().unwrap_or_default();
        if existing
            .iter()
            .any(|&slot| self.slots[slot].entity.id == child_id)
        {
            return;
        }
        self.slots[parent]
            .multi
            .entry(name.to_string())
            .or_default()
            .push(child);
    }

    /// Snapshot of the entity in `slot`, without relations.
    pub(crate) fn snapshot(&self, slot: usize) -> Option<Entity> {
        self.slots.get(slot).map(|s| s.entity.clone())
    }

    /// Turn the slots at `roots` into owned entities with their children
    /// attached as shared `Arc`s.
    fn freeze(self, roots: &[usize]) -> Vec<Entity> {
        let mut states: Vec<Frozen> = (0..self.slots.len()).map(|_| Frozen::Pending).collect();

        let frozen: Vec<Arc<Entity>> = roots
            .iter()
            .filter_map(|&slot| self.freeze_slot(slot, &mut states))
            .collect();
        drop(states);

        frozen
            .into_iter()
            .map(|entity| Arc::try_unwrap(entity).unwrap_or_else(|shared| (*shared).clone()))
            .collect()
    }

    fn freeze_slot(&self, idx: usize, states: &mut [Frozen]) -> Option<Arc<Entity>> {
        match &states[idx] {
            Frozen::Done(entity) => return Some(entity.clone()),
            // A back-edge to an entity still being assembled: cut it.
            Frozen::InProgress => return None,
            Frozen::Pending => {}
        }
        states[idx] = Frozen::InProgress;

        let slot = &self.slots[idx];
        let mut entity = slot.entity.clone();

        for (name, &child) in &slot.single {
            match self.freeze_slot(child, states) {
                Some(frozen) => entity.set_one(name.clone(), frozen),
                None => tracing::debug!(
                    parent = %slot.type_name,
                    id = %slot.entity.id,
                    child = %name,
                    "Cycle in entity graph, relation truncated"
                ),
            }
        }

        for (name, children) in &slot.multi {
            let items: Vec<Arc<Entity>> = children
                .iter()
                .filter_map(|&child| self.freeze_slot(child, states))
                .collect();
            entity.relations.insert(name.clone(), Relation::Many(items));
        }

        let entity = Arc::new(entity);
        states[idx] = Frozen::Done(entity.clone());
        Some(entity)
    }
}
