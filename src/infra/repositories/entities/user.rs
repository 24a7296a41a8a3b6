//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Role, User};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    /// Comma-separated role names, insertion-ordered
    pub roles: String,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub last_login_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Encode a role set for storage
pub fn roles_to_column(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a stored role set
pub fn roles_from_column(column: &str) -> Vec<Role> {
    let roles: Vec<Role> = column
        .split(',')
        .filter(|s| !s.is_empty())
        .map(Role::from)
        .collect();

    // The role set is non-empty by invariant; repair rather than panic
    // on a damaged row.
    if roles.is_empty() {
        vec![Role::User]
    } else {
        roles
    }
}

/// Convert database model to domain entity
impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            roles: roles_from_column(&model.roles),
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login_at: model.last_login_at,
        }
    }
}
