use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::framework::{Patch, Stamped};
use crate::store::FieldWrite;

/// A registered user, as business logic sees it.
///
/// `created` and `updated` are owned by the repository: `None` until the record
/// has been persisted, never taken from a caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl User {
    /// Creates an unpersisted User.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Wire representation used by every `/api/v1/user` route.
///
/// `id` is required on input. `name` distinguishes "absent" (`None`, leave as is)
/// from "present" (`Some`, possibly empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Partial update for a User.
///
/// Only fields that exist on [`UserDto`] can be listed here, so `created` and
/// `updated` can never be written by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpdate {
    pub id: String,
    pub name: Option<String>,
}

impl Patch for UserUpdate {
    fn id(&self) -> &str {
        &self.id
    }

    fn writes(&self) -> Vec<FieldWrite> {
        let mut writes = Vec::new();
        if let Some(name) = &self.name {
            writes.push(FieldWrite::new("name", name.as_str()));
        }
        writes
    }
}

/// Stored representation. Timestamps persist as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntity {
    pub id: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub created: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub updated: Option<DateTime<Utc>>,
}

impl Stamped for UserEntity {
    fn stamp(&mut self, now: DateTime<Utc>) {
        self.created = Some(now);
        self.updated = Some(now);
    }
}
