//! The transfer engine: atomic, zero-sum balance movement between two
//! spaces of the same account.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use sea_orm::TransactionTrait;

use crate::{EngineError, ResultEngine, SnapshotKind, Space};

use super::{Engine, with_tx};

fn ensure_not_frozen(space: &Space) -> ResultEngine<()> {
    if space.frozen {
        return Err(EngineError::InvalidState(format!(
            "space '{}' is frozen",
            space.name
        )));
    }
    Ok(())
}

impl Engine {
    /// Moves `amount` from one space to another space of the same account.
    ///
    /// Preconditions are checked in order, each with its own error: distinct
    /// spaces, positive amount, both spaces exist, same account, neither
    /// endpoint frozen, and sufficient funds on the source.
    ///
    /// The effect is all-or-nothing: both balance writes and the two
    /// `Current` snapshots (sharing one timestamp, each carrying the new
    /// balance of its space) commit together or not at all.
    pub async fn transfer(
        &self,
        from_id: Uuid,
        to_id: Uuid,
        amount: Decimal,
    ) -> ResultEngine<(Space, Space)> {
        if from_id == to_id {
            return Err(EngineError::Validation(
                "from and to must be different spaces".to_string(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "transfer amount must be > 0".to_string(),
            ));
        }
        let as_of = Utc::now();

        with_tx!(self, |db_tx| {
            let from_model = self.require_space(&db_tx, from_id).await?;
            let to_model = self.require_space(&db_tx, to_id).await?;
            if from_model.account_id != to_model.account_id {
                return Err(EngineError::Validation(
                    "cross-account transfer".to_string(),
                ));
            }

            let mut from = Space::try_from(from_model)?;
            let mut to = Space::try_from(to_model)?;
            ensure_not_frozen(&from)?;
            ensure_not_frozen(&to)?;

            if from.balance < amount {
                return Err(EngineError::InsufficientFunds {
                    available: from.balance,
                    requested: amount,
                });
            }

            from.balance -= amount;
            to.balance += amount;
            self.save_space_balance(&db_tx, &mut from).await?;
            self.save_space_balance(&db_tx, &mut to).await?;

            self.append_snapshot(
                &db_tx,
                &from.account_id,
                Some(from.id),
                SnapshotKind::Current,
                from.balance,
                as_of,
            )
            .await?;
            self.append_snapshot(
                &db_tx,
                &to.account_id,
                Some(to.id),
                SnapshotKind::Current,
                to.balance,
                as_of,
            )
            .await?;

            Ok((from, to))
        })
    }
}
