pub mod dto;

use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, PaginatorTrait, QueryFilter, Set};
use time::OffsetDateTime;
use tracing::debug;

use self::dto::{NewRegistration, NewUser, User};
use super::{Gateway, GatewayKind};
use crate::clock::truncate_to_seconds;
use crate::db::txn::TxnHandle;
use crate::entities::users;
use crate::error::AppError;
use crate::logging::pii::Redacted;

/// Reads and writes user accounts within one transaction.
#[derive(Debug, Clone)]
pub struct UserGateway {
    txn: TxnHandle,
}

impl Gateway for UserGateway {
    const KIND: GatewayKind = GatewayKind::Users;

    fn bind(txn: TxnHandle) -> Self {
        Self { txn }
    }
}

impl UserGateway {
    /// Insert an unconfirmed account that expires at `expires_at`.
    pub async fn register(&self, reg: NewRegistration) -> Result<User, AppError> {
        let conn = self.txn.conn("users.register").await?;
        let at = truncate_to_seconds(reg.registered_at);
        let model = users::ActiveModel {
            id: NotSet,
            username: Set(reg.username),
            email: Set(reg.email),
            password_hash: Set(Some(reg.password_hash)),
            confirmed: Set(false),
            registration_expires_at: Set(Some(truncate_to_seconds(reg.expires_at))),
            created_at: Set(at),
            updated_at: Set(at),
        }
        .insert(&*conn)
        .await?;
        debug!(
            txn = %self.txn.txn_id(),
            user_id = model.id,
            email = %Redacted(&model.email),
            "users=register"
        );
        Ok(model.into())
    }

    pub async fn create_confirmed(&self, user: NewUser) -> Result<User, AppError> {
        let conn = self.txn.conn("users.create_confirmed").await?;
        let at = truncate_to_seconds(user.created_at);
        let model = users::ActiveModel {
            id: NotSet,
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            confirmed: Set(true),
            registration_expires_at: Set(None),
            created_at: Set(at),
            updated_at: Set(at),
        }
        .insert(&*conn)
        .await?;
        debug!(txn = %self.txn.txn_id(), user_id = model.id, "users=create_confirmed");
        Ok(model.into())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let conn = self.txn.conn("users.find_by_id").await?;
        let found = users::Entity::find_by_id(id).one(&*conn).await?;
        Ok(found.map(User::from))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let conn = self.txn.conn("users.find_by_username").await?;
        let found = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&*conn)
            .await?;
        Ok(found.map(User::from))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let conn = self.txn.conn("users.find_by_email").await?;
        let found = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&*conn)
            .await?;
        Ok(found.map(User::from))
    }

    /// Confirm a pending registration that has not yet expired at `now`.
    ///
    /// Returns `false` when there is no such pending registration.
    pub async fn confirm(&self, id: i64, now: OffsetDateTime) -> Result<bool, AppError> {
        let conn = self.txn.conn("users.confirm").await?;
        let now = truncate_to_seconds(now);
        let res = users::Entity::update_many()
            .col_expr(users::Column::Confirmed, Expr::value(true))
            .col_expr(
                users::Column::RegistrationExpiresAt,
                Expr::value(Option::<OffsetDateTime>::None),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::Confirmed.eq(false))
            .filter(users::Column::RegistrationExpiresAt.gte(now))
            .exec(&*conn)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Replace the password hash; `now` stamps `updated_at`.
    pub async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<bool, AppError> {
        let conn = self.txn.conn("users.update_password").await?;
        let res = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(users::Column::UpdatedAt, Expr::value(truncate_to_seconds(now)))
            .filter(users::Column::Id.eq(id))
            .exec(&*conn)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Delete an account; its tokens go with it.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let conn = self.txn.conn("users.delete").await?;
        let res = users::Entity::delete_by_id(id).exec(&*conn).await?;
        Ok(res.rows_affected > 0)
    }

    /// Delete unconfirmed accounts whose registration window closed before `now`.
    pub async fn delete_stale_registrations(&self, now: OffsetDateTime) -> Result<u64, AppError> {
        let conn = self.txn.conn("users.delete_stale_registrations").await?;
        let res = users::Entity::delete_many()
            .filter(users::Column::Confirmed.eq(false))
            .filter(users::Column::RegistrationExpiresAt.lt(truncate_to_seconds(now)))
            .exec(&*conn)
            .await?;
        debug!(
            txn = %self.txn.txn_id(),
            deleted = res.rows_affected,
            "users=delete_stale_registrations"
        );
        Ok(res.rows_affected)
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        let conn = self.txn.conn("users.count").await?;
        Ok(users::Entity::find().count(&*conn).await?)
    }
}
