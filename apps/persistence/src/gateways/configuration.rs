use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};

use super::{Gateway, GatewayKind};
use crate::clock::{Clock, SystemClock};
use crate::db::txn::TxnHandle;
use crate::entities::configuration;
use crate::error::AppError;
use crate::settings::model::Configuration;

const ROW_ID: i32 = 1;

/// The single `configuration` row.
#[derive(Debug, Clone)]
pub struct ConfigurationGateway {
    txn: TxnHandle,
}

impl Gateway for ConfigurationGateway {
    const KIND: GatewayKind = GatewayKind::Configuration;

    fn bind(txn: TxnHandle) -> Self {
        Self { txn }
    }
}

impl ConfigurationGateway {
    pub async fn load(&self) -> Result<Option<Configuration>, AppError> {
        let conn = self.txn.conn("configuration.load").await?;
        let row = configuration::Entity::find_by_id(ROW_ID).one(&*conn).await?;
        Ok(row.map(Configuration::from))
    }

    /// Insert or overwrite the row.
    pub async fn store(&self, value: &Configuration) -> Result<Configuration, AppError> {
        let conn = self.txn.conn("configuration.store").await?;
        let row = configuration::ActiveModel {
            id: Set(ROW_ID),
            registration_open: Set(value.registration_open),
            registration_window_secs: Set(value.registration_window_secs),
            session_ttl_secs: Set(value.session_ttl_secs),
            default_locale: Set(value.default_locale.clone()),
            updated_at: Set(SystemClock.now()),
        };
        configuration::Entity::insert(row)
            .on_conflict(
                OnConflict::column(configuration::Column::Id)
                    .update_columns([
                        configuration::Column::RegistrationOpen,
                        configuration::Column::RegistrationWindowSecs,
                        configuration::Column::SessionTtlSecs,
                        configuration::Column::DefaultLocale,
                        configuration::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*conn)
            .await?;
        Ok(value.clone())
    }
}
