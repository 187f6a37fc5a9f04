//! Request-scoped document builder.
//!
//! Serialisation of a list fans out one future per entity; `included` is
//! assembled once all of them complete, so the result does not depend on
//! completion order.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use narr8_core::entity::scalar_to_string;
use narr8_core::{Entity, Narr8Config, Relation};
use serde_json::{Map, Value};

use crate::descriptor::{
    Accessor, DescriptorRegistry, RelationshipDescriptor, RelationshipKind, ResourceDescriptor,
};
use crate::document::{
    Document, DocumentLinks, Linkage, PrimaryData, RelationshipLinks, RelationshipObject,
    ResourceIdentifier, ResourceLinks, ResourceObject,
};
use crate::error::{AccessorError, JsonApiError, Result};
use crate::filters::QueryFilters;
use crate::links::{resource_link, LinkBase};
use crate::pagination::{Cursor, PageWindow};

/// One serialised entity plus the resources it pulls into `included`.
struct Serialised {
    resource: ResourceObject,
    included: Vec<ResourceObject>,
}

/// A serialised relationship plus the resources it pulls into `included`.
struct SerialisedRelationship {
    object: RelationshipObject,
    included: Vec<ResourceObject>,
}

/// Builds JSON:API documents for one request.
///
/// Holds the parsed query filters and never mutates after construction.
#[derive(Debug, Clone)]
pub struct JsonApiBuilder {
    filters: QueryFilters,
    page_size: usize,
    api_url: String,
    descriptors: Arc<DescriptorRegistry>,
}

impl JsonApiBuilder {
    /// Create a builder from the raw request query string.
    pub fn new(
        config: &Narr8Config,
        descriptors: Arc<DescriptorRegistry>,
        query: Option<&str>,
    ) -> Self {
        let filters = query.map(QueryFilters::parse).unwrap_or_default();
        let page_size = filters.page_size.unwrap_or(config.default_page_size);
        Self {
            filters,
            page_size,
            api_url: config.api_url.clone(),
            descriptors,
        }
    }

    pub fn filters(&self) -> &QueryFilters {
        &self.filters
    }

    /// Resolved page size: `page[size]` or the configured default.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn descriptor(&self, resource_type: &str) -> Result<Arc<ResourceDescriptor>> {
        self.descriptors
            .get(resource_type)
            .ok_or_else(|| JsonApiError::UnknownResource {
                resource_type: resource_type.to_string(),
            })
    }

    /// Lookahead request for the upstream query layer.
    pub fn generate_cursor(&self) -> Cursor {
        Cursor {
            cursor: self.filters.page_offset,
            take: self.page_size.saturating_add(1),
        }
    }

    /// Document whose `data` is `entity`; `NotFound` when it is absent.
    pub async fn build_single(
        &self,
        descriptor: &ResourceDescriptor,
        entity: Option<&Entity>,
    ) -> Result<Document> {
        let entity = entity.ok_or_else(|| JsonApiError::NotFound {
            resource_type: descriptor.resource_type.clone(),
        })?;

        let serialised = self.serialise_data(entity, descriptor).await;
        let links = DocumentLinks {
            self_link: resource_link(&self.api_url, &descriptor.endpoint, &serialised.resource.id),
            next: None,
            prev: None,
        };

        Ok(Document {
            links: Some(links),
            included: self.assemble_included(serialised.included),
            data: PrimaryData::Single(Box::new(serialised.resource)),
        })
    }

    /// Paginated collection document.
    ///
    /// `entities` is expected to be the result of a [`Self::generate_cursor`]
    /// query: one record past the page means a next page exists.
    pub async fn build_list(
        &self,
        descriptor: &ResourceDescriptor,
        entities: &[Entity],
    ) -> Result<Document> {
        let base = LinkBase::new(&self.api_url, &descriptor.endpoint, &self.filters.passthrough)?;
        let window = PageWindow::compute(self.page_size, self.filters.page_offset, entities.len());
        let visible = &entities[..window.visible_len(entities.len())];

        let links = DocumentLinks {
            self_link: base.with_page(window.size, window.self_offset()),
            next: window
                .offset_next
                .map(|offset| base.with_page(window.size, Some(offset))),
            prev: window
                .offset_previous
                .map(|offset| base.with_page(window.size, Some(offset))),
        };

        tracing::debug!(
            resource_type = %descriptor.resource_type,
            fetched = entities.len(),
            visible = visible.len(),
            has_next = window.has_next(),
            "Building list document"
        );

        let (data, included) = self.serialise_all(visible, descriptor).await;
        Ok(Document {
            links: Some(links),
            data: PrimaryData::Many(data),
            included,
        })
    }

    /// Collection document without links or pagination, for embedding.
    pub async fn build_nested_list(
        &self,
        descriptor: &ResourceDescriptor,
        entities: &[Entity],
    ) -> Document {
        let (data, included) = self.serialise_all(entities, descriptor).await;
        Document {
            links: None,
            data: PrimaryData::Many(data),
            included,
        }
    }

    async fn serialise_all(
        &self,
        entities: &[Entity],
        descriptor: &ResourceDescriptor,
    ) -> (Vec<ResourceObject>, Option<Vec<ResourceObject>>) {
        let serialised = join_all(
            entities
                .iter()
                .map(|entity| self.serialise_data(entity, descriptor)),
        )
        .await;

        let mut data = Vec::with_capacity(serialised.len());
        let mut included = Vec::new();
        for item in serialised {
            data.push(item.resource);
            included.extend(item.included);
        }
        (data, self.assemble_included(included))
    }

    // ── Per-entity serialisation ───────────────────────────────────

    fn serialise_data<'a>(
        &'a self,
        entity: &'a Entity,
        descriptor: &'a ResourceDescriptor,
    ) -> BoxFuture<'a, Serialised> {
        async move {
            let resource_type = descriptor.resource_type.as_str();

            let id = match descriptor.id.resolve(entity).await {
                Ok(Some(value)) => scalar_to_string(&value).unwrap_or_else(|| entity.id.clone()),
                Ok(None) => entity.id.clone(),
                Err(err) => {
                    tracing::warn!(resource_type, error = %err, "Id accessor failed; using entity id");
                    entity.id.clone()
                }
            };

            let mut attributes = Map::new();
            for (name, accessor) in &descriptor.attributes {
                if self.filters.allows_field(resource_type, name) {
                    resolve_into(&mut attributes, name, accessor, entity, resource_type).await;
                }
            }

            let mut meta = Map::new();
            for (name, accessor) in &descriptor.meta {
                resolve_into(&mut meta, name, accessor, entity, resource_type).await;
            }

            let mut relationships = BTreeMap::new();
            let mut included = Vec::new();
            for relationship in &descriptor.relationships {
                match self.serialise_relationship(entity, descriptor, relationship).await {
                    Ok(Some(serialised)) => {
                        relationships.insert(relationship.name.clone(), serialised.object);
                        included.extend(serialised.included);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(
                            resource_type,
                            id = %id,
                            relationship = %relationship.name,
                            error = %err,
                            "Relationship omitted"
                        );
                    }
                }
            }

            let links = descriptor.self_link.then(|| ResourceLinks {
                self_link: resource_link(&self.api_url, &descriptor.endpoint, &id),
            });

            Serialised {
                resource: ResourceObject {
                    resource_type: resource_type.to_string(),
                    id,
                    attributes,
                    meta,
                    relationships: (!relationships.is_empty()).then_some(relationships),
                    links,
                },
                included,
            }
        }
        .boxed()
    }

    async fn serialise_relationship(
        &self,
        entity: &Entity,
        descriptor: &ResourceDescriptor,
        relationship: &RelationshipDescriptor,
    ) -> Result<Option<SerialisedRelationship>> {
        let failed = |reason: String| JsonApiError::RelationshipResolution {
            resource_type: descriptor.resource_type.clone(),
            relationship: relationship.name.clone(),
            reason,
        };

        match &relationship.kind {
            RelationshipKind::Identifier { resource_type, id } => {
                let value = id
                    .resolve(entity)
                    .await
                    .map_err(|err| failed(err.to_string()))?
                    .ok_or_else(|| failed(AccessorError::MissingField(relationship.name.clone()).to_string()))?;
                let id = scalar_to_string(&value)
                    .ok_or_else(|| failed(format!("id {value} is not a scalar")))?;

                Ok(Some(SerialisedRelationship {
                    object: RelationshipObject {
                        data: Some(Linkage::One(ResourceIdentifier::new(resource_type, id))),
                        links: self.related_links(relationship, entity),
                    },
                    included: Vec::new(),
                }))
            }

            RelationshipKind::Embedded {
                key,
                resource,
                force_single,
                excluded,
            } => match entity.relation(key).filter(|r| !r.is_empty()) {
                Some(relation) => {
                    let nested = self.descriptor(resource).map_err(|err| failed(err.to_string()))?;
                    let (items, one) = match relation {
                        Relation::One(child) => (vec![child.clone()], true),
                        Relation::Many(children) => (children.clone(), false),
                    };
                    let serialised = self
                        .embed(relationship, entity, &items, one, &nested, *force_single, *excluded)
                        .await;
                    Ok(Some(serialised))
                }
                None => Ok(self.related_only(relationship, entity)),
            },

            RelationshipKind::Through {
                path,
                resource,
                force_single,
                excluded,
            } => {
                let (items, one) = match entity.relation(&relationship.name).filter(|r| !r.is_empty()) {
                    Some(Relation::One(child)) => (vec![child.clone()], true),
                    Some(Relation::Many(children)) => (children.clone(), false),
                    None => {
                        let mut items = Vec::new();
                        for outer in entity.many(&path.outer) {
                            match outer.relation(&path.inner) {
                                Some(Relation::One(inner)) => items.push(inner.clone()),
                                Some(Relation::Many(inner)) => items.extend(inner.iter().cloned()),
                                None => {}
                            }
                        }
                        (items, false)
                    }
                };

                if items.is_empty() {
                    return Ok(self.related_only(relationship, entity));
                }
                let nested = self.descriptor(resource).map_err(|err| failed(err.to_string()))?;
                let serialised = self
                    .embed(relationship, entity, &items, one, &nested, *force_single, *excluded)
                    .await;
                Ok(Some(serialised))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn embed(
        &self,
        relationship: &RelationshipDescriptor,
        parent: &Entity,
        items: &[Arc<Entity>],
        one: bool,
        nested: &ResourceDescriptor,
        force_single: bool,
        excluded: bool,
    ) -> SerialisedRelationship {
        let serialised = join_all(items.iter().map(|item| self.serialise_data(item, nested))).await;

        let identifiers: Vec<ResourceIdentifier> =
            serialised.iter().map(|s| s.resource.identifier()).collect();

        let (data, links) = if one {
            let self_link = serialised
                .first()
                .and_then(|s| s.resource.self_link())
                .map(str::to_string);
            let links = match self_link {
                Some(link) => Some(RelationshipLinks {
                    self_link: Some(link),
                    related: None,
                }),
                None => self.related_links(relationship, parent),
            };
            (identifiers.into_iter().next().map(Linkage::One), links)
        } else if force_single {
            (
                identifiers.into_iter().next().map(Linkage::One),
                self.related_links(relationship, parent),
            )
        } else {
            (
                Some(Linkage::Many(identifiers)),
                self.related_links(relationship, parent),
            )
        };

        let mut included = Vec::new();
        if !excluded {
            for item in serialised {
                included.push(item.resource);
                included.extend(item.included);
            }
        }

        SerialisedRelationship {
            object: RelationshipObject { data, links },
            included,
        }
    }

    fn related_links(
        &self,
        relationship: &RelationshipDescriptor,
        entity: &Entity,
    ) -> Option<RelationshipLinks> {
        let related = (relationship.related.as_ref()?)(entity, &self.api_url)?;
        Some(RelationshipLinks {
            self_link: None,
            related: Some(related),
        })
    }

    /// Relationship object carrying only the declared related link.
    fn related_only(
        &self,
        relationship: &RelationshipDescriptor,
        entity: &Entity,
    ) -> Option<SerialisedRelationship> {
        self.related_links(relationship, entity)
            .map(|links| SerialisedRelationship {
                object: RelationshipObject {
                    data: None,
                    links: Some(links),
                },
                included: Vec::new(),
            })
    }

    /// Deduplicate by `(type, id)` keeping first-seen order, then apply the
    /// `include` filter.
    fn assemble_included(&self, resources: Vec<ResourceObject>) -> Option<Vec<ResourceObject>> {
        let mut seen = HashSet::new();
        let included: Vec<ResourceObject> = resources
            .into_iter()
            .filter(|resource| self.filters.includes_type(&resource.resource_type))
            .filter(|resource| seen.insert(resource.identifier()))
            .collect();
        (!included.is_empty()).then_some(included)
    }
}

async fn resolve_into(
    target: &mut Map<String, Value>,
    name: &str,
    accessor: &Accessor,
    entity: &Entity,
    resource_type: &str,
) {
    match accessor.resolve(entity).await {
        Ok(Some(value)) => {
            target.insert(name.to_string(), value);
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(resource_type, key = name, error = %err, "Accessor failed; key omitted");
        }
    }
}
