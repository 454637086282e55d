//! The module contains the `Space` struct and its implementation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TransferFrequency, util};

/// The kind of a space.
///
/// Every account has exactly one `Main` space (enforced by the account
/// lifecycle collaborator, not by this engine); the engine only guarantees
/// that a `Main` space can never be deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    Main,
    Savings,
    Goal,
    Spending,
}

impl SpaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Savings => "savings",
            Self::Goal => "goal",
            Self::Spending => "spending",
        }
    }
}

impl TryFrom<&str> for SpaceKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "main" => Ok(Self::Main),
            "savings" => Ok(Self::Savings),
            "goal" => Ok(Self::Goal),
            "spending" => Ok(Self::Spending),
            other => Err(EngineError::Validation(format!(
                "invalid space kind: {other}"
            ))),
        }
    }
}

/// Recurring transfer configuration attached to a space.
///
/// The configuration can be stored in a half-filled state (e.g. disabled
/// with a stale amount); only [`is_runnable`] configurations are picked up
/// by the executor.
///
/// [`is_runnable`]: AutoTransfer::is_runnable
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutoTransfer {
    pub enabled: bool,
    pub frequency: Option<TransferFrequency>,
    pub amount: Option<Decimal>,
    /// Source of the recurring transfer. When absent, the account's Main
    /// space is resolved at execution time.
    pub source_space_id: Option<Uuid>,
}

impl AutoTransfer {
    /// A configuration is runnable when it is enabled and complete.
    pub fn is_runnable(&self) -> bool {
        self.enabled
            && self.frequency.is_some()
            && self.amount.is_some_and(|amount| amount > Decimal::ZERO)
    }
}

/// A space.
///
/// A space is a named partition of one account's funds: a main space plus
/// optional savings or goal buckets. Spaces subdivide the account balance
/// without creating separate accounts; the sum of space balances is the
/// account balance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Stable identifier for this space.
    ///
    /// This is a UUID generated once and persisted in the database, so the
    /// space can be renamed without breaking references.
    pub id: Uuid,
    /// Owning account. Immutable after creation.
    pub account_id: String,
    pub name: String,
    pub kind: SpaceKind,
    /// Current balance. Never negative.
    pub balance: Decimal,
    pub visible: bool,
    pub frozen: bool,
    pub frozen_at: Option<DateTime<Utc>>,
    pub unfrozen_at: Option<DateTime<Utc>>,
    pub target_amount: Option<Decimal>,
    pub target_date: Option<DateTime<Utc>>,
    pub auto_transfer: Option<AutoTransfer>,
    /// Reason recorded by the last administrative balance override.
    pub adjustment_reason: Option<String>,
    pub adjusted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped on every balance write.
    pub version: i64,
}

impl Space {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: String,
        name: String,
        kind: SpaceKind,
        balance: Decimal,
        visible: bool,
        target_amount: Option<Decimal>,
        target_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            name,
            kind,
            balance,
            visible,
            frozen: false,
            frozen_at: None,
            unfrozen_at: None,
            target_amount,
            target_date,
            auto_transfer: None,
            adjustment_reason: None,
            adjusted_at: None,
            created_at,
            version: 0,
        }
    }

    pub fn has_target(&self) -> bool {
        self.target_amount.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "spaces")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub kind: String,
    pub balance: String,
    pub visible: bool,
    pub frozen: bool,
    pub frozen_at: Option<DateTimeUtc>,
    pub unfrozen_at: Option<DateTimeUtc>,
    pub target_amount: Option<String>,
    pub target_date: Option<DateTimeUtc>,
    pub auto_enabled: bool,
    pub auto_frequency: Option<String>,
    pub auto_amount: Option<String>,
    pub auto_source_space_id: Option<String>,
    pub adjustment_reason: Option<String>,
    pub adjusted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::snapshots::Entity")]
    Snapshots,
}

impl Related<super::snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Space> for ActiveModel {
    fn from(space: &Space) -> Self {
        let auto = space.auto_transfer.as_ref();
        Self {
            id: ActiveValue::Set(space.id.to_string()),
            account_id: ActiveValue::Set(space.account_id.clone()),
            name: ActiveValue::Set(space.name.clone()),
            kind: ActiveValue::Set(space.kind.as_str().to_string()),
            balance: ActiveValue::Set(space.balance.to_string()),
            visible: ActiveValue::Set(space.visible),
            frozen: ActiveValue::Set(space.frozen),
            frozen_at: ActiveValue::Set(space.frozen_at),
            unfrozen_at: ActiveValue::Set(space.unfrozen_at),
            target_amount: ActiveValue::Set(space.target_amount.map(|a| a.to_string())),
            target_date: ActiveValue::Set(space.target_date),
            auto_enabled: ActiveValue::Set(auto.is_some_and(|a| a.enabled)),
            auto_frequency: ActiveValue::Set(
                auto.and_then(|a| a.frequency).map(|f| f.as_str().to_string()),
            ),
            auto_amount: ActiveValue::Set(
                auto.and_then(|a| a.amount).map(|a| a.to_string()),
            ),
            auto_source_space_id: ActiveValue::Set(
                auto.and_then(|a| a.source_space_id).map(|id| id.to_string()),
            ),
            adjustment_reason: ActiveValue::Set(space.adjustment_reason.clone()),
            adjusted_at: ActiveValue::Set(space.adjusted_at),
            created_at: ActiveValue::Set(space.created_at),
            version: ActiveValue::Set(space.version),
        }
    }
}

impl TryFrom<Model> for Space {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let auto_transfer = model_auto_transfer(&model)?;
        Ok(Self {
            id: util::parse_uuid(&model.id, "space")?,
            account_id: model.account_id,
            name: model.name,
            kind: SpaceKind::try_from(model.kind.as_str())?,
            balance: util::parse_decimal(&model.balance, "balance")?,
            visible: model.visible,
            frozen: model.frozen,
            frozen_at: model.frozen_at,
            unfrozen_at: model.unfrozen_at,
            target_amount: model
                .target_amount
                .as_deref()
                .map(|raw| util::parse_decimal(raw, "target_amount"))
                .transpose()?,
            target_date: model.target_date,
            auto_transfer,
            adjustment_reason: model.adjustment_reason,
            adjusted_at: model.adjusted_at,
            created_at: model.created_at,
            version: model.version,
        })
    }
}

fn model_auto_transfer(model: &Model) -> ResultEngine<Option<AutoTransfer>> {
    if !model.auto_enabled
        && model.auto_frequency.is_none()
        && model.auto_amount.is_none()
        && model.auto_source_space_id.is_none()
    {
        return Ok(None);
    }
    Ok(Some(AutoTransfer {
        enabled: model.auto_enabled,
        frequency: model
            .auto_frequency
            .as_deref()
            .map(TransferFrequency::try_from)
            .transpose()?,
        amount: model
            .auto_amount
            .as_deref()
            .map(|raw| util::parse_decimal(raw, "auto_amount"))
            .transpose()?,
        source_space_id: model
            .auto_source_space_id
            .as_deref()
            .map(|raw| util::parse_uuid(raw, "source space"))
            .transpose()?,
    }))
}
