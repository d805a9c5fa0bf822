//! Capability-set implementation for the User resource.
//!
//! See the trait implementations on [`UserResource`] for the mapping and
//! validation rules.

use crate::framework::{Field, Mapper, Resource, Validator, Violations};

use super::model::{User, UserDto, UserEntity, UserUpdate};

/// Longest accepted `name`, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Marker type binding the User representations to the generic pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResource;

impl Resource for UserResource {
    const NAME: &'static str = "user";
    const COLLECTION: &'static str = "user";
    const FIELDS: &'static [Field] = &[
        Field::string("id"),
        Field::string("name"),
        Field::timestamp("created"),
        Field::timestamp("updated"),
    ];

    type Model = User;
    type Dto = UserDto;
    type Update = UserUpdate;
    type Entity = UserEntity;

    fn model_id(model: &User) -> &str {
        &model.id
    }
}

impl Mapper for UserResource {
    fn to_model(dto: UserDto) -> User {
        User {
            id: dto.id,
            name: dto.name.unwrap_or_default(),
            created: None,
            updated: None,
        }
    }

    fn to_dto(model: User) -> UserDto {
        UserDto {
            id: model.id,
            name: Some(model.name),
        }
    }

    fn to_update(dto: UserDto) -> UserUpdate {
        UserUpdate {
            id: dto.id,
            name: dto.name,
        }
    }

    fn to_entity(model: User) -> UserEntity {
        UserEntity {
            id: model.id,
            name: model.name,
            created: model.created,
            updated: model.updated,
        }
    }

    fn from_entity(entity: UserEntity) -> User {
        User {
            id: entity.id,
            name: entity.name,
            created: entity.created,
            updated: entity.updated,
        }
    }
}

impl Validator for UserResource {
    /// # Rules
    /// - `id`: non-empty
    /// - `name`: at most [`MAX_NAME_CHARS`] characters
    fn validate_model(user: &User) -> Result<(), Violations> {
        let mut v = Violations::new();

        if user.id.is_empty() {
            v.push("id: empty");
        }

        if user.name.chars().count() > MAX_NAME_CHARS {
            v.push(format!("name: max {} chars", MAX_NAME_CHARS));
        }

        v.into_result()
    }

    /// Absent fields keep their stored value and are not checked.
    fn validate_update(update: &UserUpdate) -> Result<(), Violations> {
        let transient = User {
            id: update.id.clone(),
            name: update.name.clone().unwrap_or_default(),
            ..User::default()
        };
        Self::validate_model(&transient)
    }
}
