//! Refresh token database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::RefreshToken;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub token: String,
    pub token_family: Uuid,
    pub parent_token: Option<String>,
    pub issued_at: DateTimeUtc,
    pub expires_at: DateTimeUtc,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl From<Model> for RefreshToken {
    fn from(model: Model) -> Self {
        RefreshToken {
            id: model.id,
            user_id: model.user_id,
            token: model.token,
            token_family: model.token_family,
            parent_token: model.parent_token,
            issued_at: model.issued_at,
            expires_at: model.expires_at,
            is_revoked: model.is_revoked,
            revoked_at: model.revoked_at,
        }
    }
}
