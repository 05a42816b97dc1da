use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};

use super::{Gateway, GatewayKind};
use crate::clock::{Clock, SystemClock};
use crate::db::txn::TxnHandle;
use crate::entities::organization;
use crate::error::AppError;
use crate::settings::model::Organization;

const ROW_ID: i32 = 1;

#[derive(Debug, Clone)]
pub struct OrganizationGateway {
    txn: TxnHandle,
}

impl Gateway for OrganizationGateway {
    const KIND: GatewayKind = GatewayKind::Organization;

    fn bind(txn: TxnHandle) -> Self {
        Self { txn }
    }
}

impl OrganizationGateway {
    pub async fn load(&self) -> Result<Option<Organization>, AppError> {
        let conn = self.txn.conn("organization.load").await?;
        let row = organization::Entity::find_by_id(ROW_ID).one(&*conn).await?;
        Ok(row.map(Organization::from))
    }

    pub async fn store(&self, value: &Organization) -> Result<Organization, AppError> {
        let conn = self.txn.conn("organization.store").await?;
        let row = organization::ActiveModel {
            id: Set(ROW_ID),
            name: Set(value.name.clone()),
            contact_email: Set(value.contact_email.clone()),
            website: Set(value.website.clone()),
            address: Set(value.address.clone()),
            updated_at: Set(SystemClock.now()),
        };
        organization::Entity::insert(row)
            .on_conflict(
                OnConflict::column(organization::Column::Id)
                    .update_columns([
                        organization::Column::Name,
                        organization::Column::ContactEmail,
                        organization::Column::Website,
                        organization::Column::Address,
                        organization::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*conn)
            .await?;
        Ok(value.clone())
    }
}
