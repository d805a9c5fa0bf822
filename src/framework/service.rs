//! # Generic Service
//!
//! Business rules on top of the [`Repository`]:
//!
//! - every write is validated before it reaches the repository,
//! - every read is re-validated before it is handed back,
//! - updates and deletes require the target to exist. A corrupt record still
//!   counts as existing, so an update can repair it and a delete can remove it.
//! - searches fail fast on a bad predicate but only drop (and log) bad records.

use tracing::{error, instrument, warn};

use super::context::RequestContext;
use super::error::ResourceError;
use super::query::FilterPredicate;
use super::repository::Repository;
use super::resource::{Mapper, Patch, Validator};
use crate::store::DocumentStore;

pub struct Service<R: Mapper + Validator, S> {
    repo: Repository<R, S>,
}

impl<R: Mapper + Validator, S: DocumentStore> Service<R, S> {
    pub fn new(repo: Repository<R, S>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn create(&self, ctx: &RequestContext, model: R::Model) -> Result<(), ResourceError> {
        R::validate_model(&model).map_err(|violations| ResourceError::InvalidModel {
            resource: R::NAME,
            violations,
        })?;

        let id = R::model_id(&model).to_string();
        self.repo.create(ctx, &id, model).await
    }

    /// Reads a record the service can vouch for.
    ///
    /// A stored record that fails validation is logged in full and reported as
    /// [`ResourceError::Corrupt`] instead of being returned.
    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn read(&self, ctx: &RequestContext, id: &str) -> Result<R::Model, ResourceError> {
        if id.is_empty() {
            return Err(ResourceError::EmptyId { resource: R::NAME });
        }

        let model = self.repo.read(ctx, id).await?;

        if let Err(violations) = R::validate_model(&model) {
            error!(record = ?model, %violations, "Found, but invalid");
            return Err(ResourceError::Corrupt {
                resource: R::NAME,
                id: id.to_string(),
            });
        }

        Ok(model)
    }

    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn update(&self, ctx: &RequestContext, update: R::Update) -> Result<(), ResourceError> {
        R::validate_update(&update).map_err(|violations| ResourceError::InvalidUpdate {
            resource: R::NAME,
            violations,
        })?;

        self.ensure_exists(ctx, update.id()).await?;
        self.repo.update(ctx, &update).await
    }

    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), ResourceError> {
        if id.is_empty() {
            return Err(ResourceError::EmptyId { resource: R::NAME });
        }

        self.ensure_exists(ctx, id).await?;
        self.repo.delete(ctx, id).await
    }

    /// Always returns a list; an empty match is an empty `Vec`.
    #[instrument(skip(self, ctx), fields(resource = R::NAME))]
    pub async fn search(
        &self,
        ctx: &RequestContext,
        predicates: Vec<FilterPredicate>,
    ) -> Result<Vec<R::Model>, ResourceError> {
        R::validate_query(&predicates).map_err(ResourceError::InvalidQuery)?;

        let found = self.repo.search(ctx, &predicates).await?;
        let valid = found
            .into_iter()
            .filter(|model| match R::validate_model(model) {
                Ok(()) => true,
                Err(violations) => {
                    warn!(record = ?model, %violations, "Dropping invalid record from results");
                    false
                }
            })
            .collect();

        Ok(valid)
    }

    /// Succeeds for valid and corrupt records alike.
    async fn ensure_exists(&self, ctx: &RequestContext, id: &str) -> Result<(), ResourceError> {
        match self.read(ctx, id).await {
            Ok(_) => Ok(()),
            Err(e) if e.implies_existence() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
