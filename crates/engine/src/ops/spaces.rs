//! Space lifecycle: create/read/update/delete, freeze/unfreeze and the
//! administrative balance override.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, SnapshotKind, Space, SpaceKind, spaces,
    util::validate_goal_fields,
};

use super::{Engine, normalize_required_text, with_tx};

/// Input for [`Engine::create_space`].
#[derive(Clone, Debug)]
pub struct NewSpace {
    pub account_id: String,
    pub name: String,
    pub kind: SpaceKind,
    /// Opening balance. Defaults to 0; rejected when negative.
    pub balance: Option<Decimal>,
    /// Defaults to `true`.
    pub visible: Option<bool>,
    pub target_amount: Option<Decimal>,
    pub target_date: Option<DateTime<Utc>>,
}

/// Field-level patch for [`Engine::update_space`].
///
/// The outer `Option` means "field supplied"; for the goal fields the inner
/// `Option` allows clearing a previously set value. `kind` may be supplied
/// but never changed, and the owning account is always preserved from the
/// stored record.
#[derive(Clone, Debug, Default)]
pub struct SpaceUpdate {
    pub name: Option<String>,
    pub kind: Option<SpaceKind>,
    pub visible: Option<bool>,
    pub target_amount: Option<Option<Decimal>>,
    pub target_date: Option<Option<DateTime<Utc>>>,
}

impl Engine {
    /// Creates a new space.
    ///
    /// A strictly positive opening balance is recorded as one `Current`
    /// snapshot so history starts at the opening fact.
    pub async fn create_space(&self, new: NewSpace) -> ResultEngine<Space> {
        let now = Utc::now();
        let account_id = normalize_required_text(&new.account_id, "account id")?;
        let name = normalize_required_text(&new.name, "space name")?;
        let balance = new.balance.unwrap_or(Decimal::ZERO);
        if balance < Decimal::ZERO {
            return Err(EngineError::Validation(
                "balance must be >= 0".to_string(),
            ));
        }
        validate_goal_fields(new.target_amount, new.target_date, now)?;

        let space = Space::new(
            account_id,
            name,
            new.kind,
            balance,
            new.visible.unwrap_or(true),
            new.target_amount,
            new.target_date,
            now,
        );

        with_tx!(self, |db_tx| {
            spaces::ActiveModel::from(&space).insert(&db_tx).await?;
            if space.balance > Decimal::ZERO {
                self.append_snapshot(
                    &db_tx,
                    &space.account_id,
                    Some(space.id),
                    SnapshotKind::Current,
                    space.balance,
                    now,
                )
                .await?;
            }
            Ok(space.clone())
        })
    }

    /// Return a space snapshot from DB.
    pub async fn space(&self, space_id: Uuid) -> ResultEngine<Space> {
        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            Space::try_from(model)
        })
    }

    /// Updates the mutable fields of a space.
    ///
    /// `kind` is immutable once set and the owning account is never taken
    /// from the payload.
    pub async fn update_space(
        &self,
        space_id: Uuid,
        update: SpaceUpdate,
    ) -> ResultEngine<Space> {
        let now = Utc::now();
        let name = update
            .name
            .as_deref()
            .map(|raw| normalize_required_text(raw, "space name"))
            .transpose()?;
        validate_goal_fields(
            update.target_amount.flatten(),
            update.target_date.flatten(),
            now,
        )?;

        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            if let Some(kind) = update.kind
                && kind.as_str() != model.kind
            {
                return Err(EngineError::Validation(
                    "space kind is immutable".to_string(),
                ));
            }

            let mut active = spaces::ActiveModel {
                id: ActiveValue::Set(space_id.to_string()),
                ..Default::default()
            };
            if let Some(name) = name {
                active.name = ActiveValue::Set(name);
            }
            if let Some(visible) = update.visible {
                active.visible = ActiveValue::Set(visible);
            }
            if let Some(target_amount) = update.target_amount {
                active.target_amount =
                    ActiveValue::Set(target_amount.map(|amount| amount.to_string()));
            }
            if let Some(target_date) = update.target_date {
                active.target_date = ActiveValue::Set(target_date);
            }

            let model = active.update(&db_tx).await?;
            Space::try_from(model)
        })
    }

    /// Deletes a space.
    ///
    /// The main space can never be deleted, and any other space only with a
    /// zero balance. Snapshots of the deleted space stay in the history.
    pub async fn delete_space(&self, space_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            if model.kind == SpaceKind::Main.as_str() {
                return Err(EngineError::InvalidState(
                    "cannot delete the main space".to_string(),
                ));
            }
            let space = Space::try_from(model)?;
            if !space.balance.is_zero() {
                return Err(EngineError::InvalidState(
                    "space balance must be zero before deletion".to_string(),
                ));
            }
            spaces::Entity::delete_by_id(space_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Freezes a space, gating all balance-changing operations on it.
    pub async fn freeze_space(&self, space_id: Uuid) -> ResultEngine<Space> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            if model.frozen {
                return Err(EngineError::InvalidState(
                    "space is already frozen".to_string(),
                ));
            }
            let active = spaces::ActiveModel {
                id: ActiveValue::Set(space_id.to_string()),
                frozen: ActiveValue::Set(true),
                frozen_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            };
            let model = active.update(&db_tx).await?;
            Space::try_from(model)
        })
    }

    /// Unfreezes a previously frozen space.
    pub async fn unfreeze_space(&self, space_id: Uuid) -> ResultEngine<Space> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            if !model.frozen {
                return Err(EngineError::InvalidState(
                    "space is not frozen".to_string(),
                ));
            }
            let active = spaces::ActiveModel {
                id: ActiveValue::Set(space_id.to_string()),
                frozen: ActiveValue::Set(false),
                unfrozen_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            };
            let model = active.update(&db_tx).await?;
            Space::try_from(model)
        })
    }

    /// Administrative balance override (reconciliation).
    ///
    /// This is a single-space correction and deliberately bypasses the
    /// transfer engine's two-space invariant. It still appends exactly one
    /// `Adjustment` snapshot and records the reason on the space.
    pub async fn set_balance(
        &self,
        space_id: Uuid,
        new_balance: Decimal,
        reason: &str,
    ) -> ResultEngine<Space> {
        let now = Utc::now();
        let reason = normalize_required_text(reason, "reason")?;
        if new_balance < Decimal::ZERO {
            return Err(EngineError::Validation(
                "balance must be >= 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            if model.frozen {
                return Err(EngineError::InvalidState(
                    "space is frozen".to_string(),
                ));
            }
            let mut space = Space::try_from(model)?;
            space.balance = new_balance;
            self.save_space_balance(&db_tx, &mut space).await?;

            let active = spaces::ActiveModel {
                id: ActiveValue::Set(space_id.to_string()),
                adjustment_reason: ActiveValue::Set(Some(reason.clone())),
                adjusted_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            space.adjustment_reason = Some(reason);
            space.adjusted_at = Some(now);

            self.append_snapshot(
                &db_tx,
                &space.account_id,
                Some(space.id),
                SnapshotKind::Adjustment,
                space.balance,
                now,
            )
            .await?;

            Ok(space)
        })
    }
}
