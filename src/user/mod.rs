//! User-specific resource definitions.

pub mod model;
pub mod resource;

pub use model::*;
pub use resource::*;

use crate::framework::{Repository, Service};
use crate::store::DocumentStore;

/// Route prefix for the User endpoints.
pub const USER_PATH: &str = "/api/v1/user";

/// The User service over `store`.
pub type UserService<S> = Service<UserResource, S>;

/// Wires the User pipeline onto a store.
pub fn new<S: DocumentStore>(store: S) -> UserService<S> {
    Service::new(Repository::new(store))
}
