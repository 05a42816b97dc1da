pub mod dto;

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;
use tracing::debug;

use self::dto::{NewToken, Token};
use super::{Gateway, GatewayKind};
use crate::clock::truncate_to_seconds;
use crate::db::txn::TxnHandle;
use crate::entities::tokens;
use crate::error::AppError;
use crate::logging::pii::Redacted;

/// Bytes of entropy per token value.
const TOKEN_BYTES: usize = 32;

/// Reads and writes session/confirmation tokens within one transaction.
#[derive(Debug, Clone)]
pub struct TokenGateway {
    txn: TxnHandle,
}

impl Gateway for TokenGateway {
    const KIND: GatewayKind = GatewayKind::Tokens;

    fn bind(txn: TxnHandle) -> Self {
        Self { txn }
    }
}

/// Fresh 256-bit value, URL-safe base64 without padding.
fn generate_value() -> Result<String, AppError> {
    let mut rng =
        StdRng::try_from_os_rng().map_err(|e| AppError::db(format!("entropy unavailable: {e}")))?;
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

impl TokenGateway {
    /// Issue a new token. The owner is checked when the transaction commits.
    pub async fn issue(&self, new: NewToken) -> Result<Token, AppError> {
        let value = generate_value()?;
        let conn = self.txn.conn("tokens.issue").await?;
        let model = tokens::ActiveModel {
            id: NotSet,
            user_id: Set(new.user_id),
            kind: Set(new.kind.as_str().to_string()),
            value: Set(value),
            created_at: Set(truncate_to_seconds(new.issued_at)),
        }
        .insert(&*conn)
        .await?;
        debug!(
            txn = %self.txn.txn_id(),
            user_id = model.user_id,
            kind = %new.kind,
            value = %Redacted(&model.value),
            "tokens=issue"
        );
        Token::try_from(model)
    }

    pub async fn find_by_value(&self, value: &str) -> Result<Option<Token>, AppError> {
        let conn = self.txn.conn("tokens.find_by_value").await?;
        tokens::Entity::find()
            .filter(tokens::Column::Value.eq(value))
            .one(&*conn)
            .await?
            .map(Token::try_from)
            .transpose()
    }

    /// Oldest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Token>, AppError> {
        let conn = self.txn.conn("tokens.list_for_user").await?;
        tokens::Entity::find()
            .filter(tokens::Column::UserId.eq(user_id))
            .order_by_asc(tokens::Column::CreatedAt)
            .order_by_asc(tokens::Column::Id)
            .all(&*conn)
            .await?
            .into_iter()
            .map(Token::try_from)
            .collect()
    }

    pub async fn revoke(&self, value: &str) -> Result<bool, AppError> {
        let conn = self.txn.conn("tokens.revoke").await?;
        let res = tokens::Entity::delete_many()
            .filter(tokens::Column::Value.eq(value))
            .exec(&*conn)
            .await?;
        debug!(
            txn = %self.txn.txn_id(),
            value = %Redacted(value),
            revoked = res.rows_affected,
            "tokens=revoke"
        );
        Ok(res.rows_affected > 0)
    }

    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let conn = self.txn.conn("tokens.revoke_all_for_user").await?;
        let res = tokens::Entity::delete_many()
            .filter(tokens::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(res.rows_affected)
    }

    /// Delete tokens older than `max_age` at `now`.
    ///
    /// A token exactly `max_age` old is kept.
    pub async fn delete_expired(
        &self,
        now: OffsetDateTime,
        max_age: Duration,
    ) -> Result<u64, AppError> {
        let cutoff = expiry_cutoff(now, max_age)?;
        let conn = self.txn.conn("tokens.delete_expired").await?;
        let res = tokens::Entity::delete_many()
            .filter(tokens::Column::CreatedAt.lt(cutoff))
            .exec(&*conn)
            .await?;
        debug!(
            txn = %self.txn.txn_id(),
            cutoff = %cutoff,
            deleted = res.rows_affected,
            "tokens=delete_expired"
        );
        Ok(res.rows_affected)
    }
}

fn expiry_cutoff(now: OffsetDateTime, max_age: Duration) -> Result<OffsetDateTime, AppError> {
    let max_age = time::Duration::try_from(max_age)
        .map_err(|e| AppError::config(format!("token max age out of range: {e}")))?;
    truncate_to_seconds(now)
        .checked_sub(max_age)
        .ok_or_else(|| AppError::config("token max age reaches before the representable range"))
}
