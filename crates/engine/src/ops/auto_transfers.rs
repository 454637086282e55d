//! Recurring transfer configuration and the due-transfer executor.

use rust_decimal::Decimal;
use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{
    AutoTransfer, EngineError, ResultEngine, Space, TransferFrequency, spaces,
    util::parse_uuid,
};

use super::{Engine, with_tx};

/// One runnable configuration captured before execution.
struct DuePlan {
    space_id: Uuid,
    source_space_id: Option<Uuid>,
    amount: Decimal,
}

impl Engine {
    /// Configures the recurring transfer attached to a space.
    ///
    /// Enabling requires a frequency and a positive amount. An explicit
    /// source space must exist, belong to the same account, and differ from
    /// the destination. Disabling is a strict transition: it is rejected
    /// unless the configuration is currently enabled, and it keeps the
    /// stored configuration so it can be re-enabled later.
    pub async fn configure_auto_transfer(
        &self,
        space_id: Uuid,
        enabled: bool,
        frequency: Option<TransferFrequency>,
        amount: Option<Decimal>,
        source_space_id: Option<Uuid>,
    ) -> ResultEngine<Space> {
        if enabled && frequency.is_none() {
            return Err(EngineError::Validation(
                "frequency is required to enable automatic transfers".to_string(),
            ));
        }
        if enabled && amount.is_none() {
            return Err(EngineError::Validation(
                "amount is required to enable automatic transfers".to_string(),
            ));
        }
        if let Some(amount) = amount
            && amount <= Decimal::ZERO
        {
            return Err(EngineError::Validation(
                "automatic transfer amount must be > 0".to_string(),
            ));
        }
        if source_space_id == Some(space_id) {
            return Err(EngineError::Validation(
                "source space must differ from the destination space".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let model = self.require_space(&db_tx, space_id).await?;
            if !enabled && !model.auto_enabled {
                return Err(EngineError::InvalidState(
                    "automatic transfers are not enabled".to_string(),
                ));
            }
            if let Some(source_id) = source_space_id {
                let source_model = self.require_space(&db_tx, source_id).await?;
                if source_model.account_id != model.account_id {
                    return Err(EngineError::Validation(
                        "source space belongs to a different account".to_string(),
                    ));
                }
            }

            let mut active = spaces::ActiveModel {
                id: ActiveValue::Set(space_id.to_string()),
                auto_enabled: ActiveValue::Set(enabled),
                ..Default::default()
            };
            if let Some(frequency) = frequency {
                active.auto_frequency = ActiveValue::Set(Some(frequency.as_str().to_string()));
            }
            if let Some(amount) = amount {
                active.auto_amount = ActiveValue::Set(Some(amount.to_string()));
            }
            if let Some(source_id) = source_space_id {
                active.auto_source_space_id = ActiveValue::Set(Some(source_id.to_string()));
            }

            let model = active.update(&db_tx).await?;
            Space::try_from(model)
        })
    }

    /// Executes all due automatic transfers of an account and returns the
    /// number that succeeded.
    ///
    /// Spaces are processed independently: a failing space (insufficient
    /// funds, frozen endpoint, missing source) is logged and counted as
    /// zero, never aborting the remaining spaces. Periodic invocation is the
    /// caller's job; the engine performs no scheduling of its own.
    pub async fn execute_due_transfers(&self, account_id: &str) -> ResultEngine<u32> {
        // Snapshot the runnable configurations up front; every transfer then
        // runs in its own transaction so failures stay isolated.
        let (plans, main_id) = with_tx!(self, |db_tx| {
            let models = self.account_spaces(&db_tx, account_id).await?;
            let main_id = self
                .find_main_space(&db_tx, account_id)
                .await?
                .map(|model| parse_uuid(&model.id, "space"))
                .transpose()?;

            let mut plans = Vec::new();
            for model in models {
                let space = Space::try_from(model)?;
                let Some(AutoTransfer {
                    amount: Some(amount),
                    source_space_id,
                    ..
                }) = space
                    .auto_transfer
                    .as_ref()
                    .filter(|auto| auto.is_runnable())
                    .cloned()
                else {
                    continue;
                };
                plans.push(DuePlan {
                    space_id: space.id,
                    source_space_id,
                    amount,
                });
            }
            Ok::<_, EngineError>((plans, main_id))
        })?;

        let mut executed = 0u32;
        for plan in plans {
            let Some(source_id) = plan.source_space_id.or(main_id) else {
                tracing::warn!(
                    space_id = %plan.space_id,
                    "automatic transfer skipped: account has no main space"
                );
                continue;
            };
            match self.transfer(source_id, plan.space_id, plan.amount).await {
                Ok(_) => {
                    executed += 1;
                    tracing::debug!(
                        space_id = %plan.space_id,
                        amount = %plan.amount,
                        "automatic transfer executed"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        space_id = %plan.space_id,
                        error = %err,
                        "automatic transfer failed"
                    );
                }
            }
        }
        Ok(executed)
    }
}
