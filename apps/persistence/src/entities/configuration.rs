use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Single-row table; the row always has `id = 1`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "configuration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    #[sea_orm(column_name = "registration_open")]
    pub registration_open: bool,
    #[sea_orm(column_name = "registration_window_secs")]
    pub registration_window_secs: i64,
    #[sea_orm(column_name = "session_ttl_secs")]
    pub session_ttl_secs: i64,
    #[sea_orm(column_name = "default_locale")]
    pub default_locale: String,
    #[sea_orm(column_name = "updated_at")]
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
