//! Balance history primitives.
//!
//! A `BalanceSnapshot` is an append-only fact recording a space's balance at
//! a point in time. Snapshots are the observable record of every balance
//! change: the engine inserts them and never updates or deletes them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// Regular balance fact, written by the transfer engine and on space
    /// creation with an opening balance.
    Current,
    /// Administrative balance override (reconciliation).
    Adjustment,
}

impl SnapshotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Adjustment => "adjustment",
        }
    }
}

impl TryFrom<&str> for SnapshotKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "current" => Ok(Self::Current),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(EngineError::Validation(format!(
                "invalid snapshot kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub id: Uuid,
    pub account_id: String,
    /// `None` for account-level snapshots written by the account balance
    /// service.
    pub space_id: Option<Uuid>,
    pub kind: SnapshotKind,
    pub amount: Decimal,
    pub as_of: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(
        account_id: String,
        space_id: Option<Uuid>,
        kind: SnapshotKind,
        amount: Decimal,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            space_id,
            kind,
            amount,
            as_of,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub space_id: Option<String>,
    pub kind: String,
    pub amount: String,
    pub as_of: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::spaces::Entity",
        from = "Column::SpaceId",
        to = "super::spaces::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Spaces,
}

impl Related<super::spaces::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Spaces.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BalanceSnapshot> for ActiveModel {
    fn from(snapshot: &BalanceSnapshot) -> Self {
        Self {
            id: ActiveValue::Set(snapshot.id.to_string()),
            account_id: ActiveValue::Set(snapshot.account_id.clone()),
            space_id: ActiveValue::Set(snapshot.space_id.map(|id| id.to_string())),
            kind: ActiveValue::Set(snapshot.kind.as_str().to_string()),
            amount: ActiveValue::Set(snapshot.amount.to_string()),
            as_of: ActiveValue::Set(snapshot.as_of),
        }
    }
}

impl TryFrom<Model> for BalanceSnapshot {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: util::parse_uuid(&model.id, "snapshot")?,
            account_id: model.account_id,
            space_id: model
                .space_id
                .as_deref()
                .map(|raw| util::parse_uuid(raw, "space"))
                .transpose()?,
            kind: SnapshotKind::try_from(model.kind.as_str())?,
            amount: util::parse_decimal(&model.amount, "amount")?,
            as_of: model.as_of,
        })
    }
}
