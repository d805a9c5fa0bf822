//! # Resource Capability Set
//!
//! The traits a resource type implements to be served by the generic pipeline.
//!
//! - [`Resource`] names the four representations (Model, DTO, Update, Entity), the
//!   store collection and the queryable field schema.
//! - [`Mapper`] converts between those representations. Pure, infallible.
//! - [`Validator`] checks models, partial updates and filter predicates.
//!
//! Implement all three on a zero-sized marker type (e.g. `UserResource`) and the
//! [`Repository`](super::Repository), [`Service`](super::Service) and
//! [`controller`](super::controller) work for it unchanged.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::Violations;
use super::query::{self, FilterPredicate};
use crate::store::FieldWrite;

/// Store field refreshed by the repository on every update.
pub const UPDATED_FIELD: &str = "updated";

/// How a queryable field's filter values are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Filter values are plain strings.
    String,
    /// Filter values are strings in [`query::TIME_FORMAT`].
    Timestamp,
}

/// One queryable field of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn string(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::String,
        }
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Timestamp,
        }
    }
}

/// Looks up a field by case-insensitive name.
pub fn find_field(fields: &[Field], key: &str) -> Option<Field> {
    fields
        .iter()
        .copied()
        .find(|f| f.name.eq_ignore_ascii_case(key))
}

/// A partial update: the target key plus only the fields the caller supplied.
pub trait Patch: Debug + Send + Sync {
    fn id(&self) -> &str;

    /// Field-path writes for every present field. Empty when only the key is set.
    fn writes(&self) -> Vec<FieldWrite>;
}

/// Entities whose `created`/`updated` pair is owned by the repository.
pub trait Stamped {
    /// Sets `created` and `updated` to `now`.
    fn stamp(&mut self, now: DateTime<Utc>);
}

/// Names a resource's representations and storage location.
pub trait Resource: Send + Sync + 'static {
    /// Singular name used in logs and error messages.
    const NAME: &'static str;

    /// Store collection holding the entities.
    const COLLECTION: &'static str;

    /// Fields accepted as filter keys, protected timestamps included.
    const FIELDS: &'static [Field];

    /// In-memory domain object.
    type Model: Clone + Debug + PartialEq + Send + Sync;

    /// Wire object.
    type Dto: Serialize + DeserializeOwned + Debug + Send + Sync;

    /// Partial-update descriptor.
    type Update: Patch;

    /// Persisted object.
    type Entity: Serialize + DeserializeOwned + Stamped + Debug + Send + Sync;

    /// The primary key of a model.
    fn model_id(model: &Self::Model) -> &str;
}

/// Conversions between representations.
pub trait Mapper: Resource {
    /// Absent optional fields become the model's zero value.
    fn to_model(dto: Self::Dto) -> Self::Model;

    /// Full projection; optional wire fields are always populated.
    fn to_dto(model: Self::Model) -> Self::Dto;

    /// Includes a field iff the DTO carried it. Protected fields cannot appear.
    fn to_update(dto: Self::Dto) -> Self::Update;

    fn to_entity(model: Self::Model) -> Self::Entity;

    fn from_entity(entity: Self::Entity) -> Self::Model;
}

/// Domain rules. Each check reports every violated rule, not just the first.
pub trait Validator: Resource {
    fn validate_model(model: &Self::Model) -> Result<(), Violations>;

    /// Checks only the fields present in the update.
    fn validate_update(update: &Self::Update) -> Result<(), Violations>;

    /// Key, operator and value checks for every predicate against [`Resource::FIELDS`].
    fn validate_query(predicates: &[FilterPredicate]) -> Result<(), Violations> {
        query::validate(Self::FIELDS, predicates)
    }
}
