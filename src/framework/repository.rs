//! # Generic Repository
//!
//! Persists a [`Resource`] through any [`DocumentStore`].
//!
//! The repository owns three things nobody else may touch:
//! - the `created`/`updated` timestamps (set here, never by callers),
//! - Entity encoding/decoding (JSON documents via `serde_json`),
//! - translation of [`StoreError`] into [`ResourceError`].

use std::marker::PhantomData;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::context::RequestContext;
use super::error::{ResourceError, Violations};
use super::query::{display_value, native_token, parse_timestamp, FilterPredicate};
use super::resource::{find_field, FieldKind, Mapper, Patch, Resource, Stamped, UPDATED_FIELD};
use crate::store::{timestamp_value, Document, DocumentStore, FieldWrite, StoreError, StoreFilter};

pub struct Repository<R: Resource, S> {
    store: S,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Mapper, S: DocumentStore> Repository<R, S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _resource: PhantomData,
        }
    }

    /// Stamps `created = updated = now` and inserts the entity under `id`.
    #[instrument(skip(self, ctx, model), fields(resource = R::NAME))]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        id: &str,
        model: R::Model,
    ) -> Result<(), ResourceError> {
        let mut entity = R::to_entity(model);
        entity.stamp(Utc::now());
        let document = encode(&entity)?;

        match ctx
            .guard(self.store.create_if_absent(R::COLLECTION, id, document))
            .await?
        {
            Ok(()) => Ok(()),
            Err(StoreError::AlreadyExists(_)) => Err(ResourceError::AlreadyExists {
                resource: R::NAME,
                id: id.to_string(),
            }),
            Err(e) => Err(store_failure(e)),
        }
    }

    /// Fetches and decodes the entity under `id`.
    ///
    /// A stored document that no longer decodes is reported as
    /// [`ResourceError::Corrupt`].
    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn read(&self, ctx: &RequestContext, id: &str) -> Result<R::Model, ResourceError> {
        let document = match ctx.guard(self.store.get(R::COLLECTION, id)).await? {
            Ok(document) => document,
            Err(StoreError::NotFound(_)) => {
                return Err(ResourceError::NotFound {
                    resource: R::NAME,
                    id: id.to_string(),
                })
            }
            Err(e) => return Err(store_failure(e)),
        };

        match decode::<R>(document.clone()) {
            Ok(model) => Ok(model),
            Err(e) => {
                error!(%id, ?document, error = %e, "Stored document does not decode");
                Err(ResourceError::Corrupt {
                    resource: R::NAME,
                    id: id.to_string(),
                })
            }
        }
    }

    /// Writes every present field plus `updated = now` as one mutation.
    ///
    /// An update carrying nothing but the key is a successful no-op.
    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn update(&self, ctx: &RequestContext, update: &R::Update) -> Result<(), ResourceError> {
        let mut writes = update.writes();
        if writes.is_empty() {
            debug!(id = update.id(), "Nothing to update");
            return Ok(());
        }
        writes.push(FieldWrite::new(UPDATED_FIELD, timestamp_value(Utc::now())));

        match ctx
            .guard(self.store.update_fields(R::COLLECTION, update.id(), writes))
            .await?
        {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(ResourceError::NotFound {
                resource: R::NAME,
                id: update.id().to_string(),
            }),
            Err(e) => Err(store_failure(e)),
        }
    }

    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), ResourceError> {
        match ctx.guard(self.store.delete(R::COLLECTION, id)).await? {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(ResourceError::NotFound {
                resource: R::NAME,
                id: id.to_string(),
            }),
            Err(e) => Err(store_failure(e)),
        }
    }

    /// Runs the predicates as one store query.
    ///
    /// Records the store skipped, or that fail to decode, are logged and left out.
    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn search(
        &self,
        ctx: &RequestContext,
        predicates: &[FilterPredicate],
    ) -> Result<Vec<R::Model>, ResourceError> {
        let filters = translate::<R>(predicates)?;
        let result = ctx
            .guard(self.store.query(R::COLLECTION, filters))
            .await?
            .map_err(store_failure)?;

        if !result.skipped.is_empty() {
            warn!(skipped = ?result.skipped, "Store skipped matching records");
        }

        let mut models = Vec::with_capacity(result.documents.len());
        for document in result.documents {
            match decode::<R>(document.clone()) {
                Ok(model) => models.push(model),
                Err(e) => warn!(?document, error = %e, "Skipping undecodable record"),
            }
        }
        Ok(models)
    }
}

/// Turns predicates into store filters.
///
/// Keys resolve to the canonical field name, operators go through the fixed token
/// table, and timestamp values are parsed and encoded the way entities store them.
/// An unparseable timestamp is refused rather than forwarded as a raw string.
pub fn translate<R: Resource>(predicates: &[FilterPredicate]) -> Result<Vec<StoreFilter>, ResourceError> {
    predicates
        .iter()
        .map(|p| {
            let field = find_field(R::FIELDS, &p.key);
            let path = field.map_or_else(|| p.key.clone(), |f| f.name.to_string());

            let value = match field.map(|f| f.kind) {
                Some(FieldKind::Timestamp) => {
                    let ts = p.value.as_str().and_then(parse_timestamp).ok_or_else(|| {
                        let mut v = Violations::new();
                        v.push(format!("value[{}]: time must be YYYY-MM-DD_hh:mm", display_value(&p.value)));
                        ResourceError::InvalidQuery(v)
                    })?;
                    timestamp_value(ts)
                }
                _ => p.value.clone(),
            };

            Ok(StoreFilter {
                path,
                operator: native_token(&p.operator),
                value,
            })
        })
        .collect()
}

fn encode<E: serde::Serialize>(entity: &E) -> Result<Document, ResourceError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(ResourceError::Store(format!(
            "entity must encode to an object, got {}",
            other
        ))),
        Err(e) => Err(ResourceError::Store(format!("encode entity: {}", e))),
    }
}

fn decode<R: Mapper>(document: Document) -> Result<R::Model, serde_json::Error> {
    let entity: R::Entity = serde_json::from_value(Value::Object(document))?;
    Ok(R::from_entity(entity))
}

fn store_failure(e: StoreError) -> ResourceError {
    ResourceError::Store(e.to_string())
}
