//! Balance history recorder: append-only snapshot writes and range queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{BalanceSnapshot, EngineError, ResultEngine, SnapshotKind, snapshots};

use super::{Engine, with_tx};

impl Engine {
    /// Append one immutable snapshot row. Existing rows are never touched.
    pub(super) async fn append_snapshot(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
        space_id: Option<Uuid>,
        kind: SnapshotKind,
        amount: Decimal,
        as_of: DateTime<Utc>,
    ) -> ResultEngine<Uuid> {
        let snapshot =
            BalanceSnapshot::new(account_id.to_string(), space_id, kind, amount, as_of);
        snapshots::ActiveModel::from(&snapshot).insert(db).await?;
        Ok(snapshot.id)
    }

    pub(super) async fn snapshots_in_range(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
        space_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<BalanceSnapshot>> {
        let mut query = snapshots::Entity::find()
            .filter(snapshots::Column::AccountId.eq(account_id.to_string()));
        if let Some(space_id) = space_id {
            query = query.filter(snapshots::Column::SpaceId.eq(space_id.to_string()));
        }
        if let Some(from) = from {
            query = query.filter(snapshots::Column::AsOf.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(snapshots::Column::AsOf.lt(to));
        }
        let models = query
            .order_by_asc(snapshots::Column::AsOf)
            .order_by_asc(snapshots::Column::Id)
            .all(db)
            .await?;
        models.into_iter().map(BalanceSnapshot::try_from).collect()
    }

    /// Lists balance snapshots of an account, oldest first.
    ///
    /// `space_id` narrows the result to one space. `from` is inclusive and
    /// `to` is exclusive (`[from, to)`), both in UTC.
    pub async fn balance_history(
        &self,
        account_id: &str,
        space_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<BalanceSnapshot>> {
        if let (Some(from), Some(to)) = (from, to)
            && from >= to
        {
            return Err(EngineError::Validation(
                "invalid range: from must be < to".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.snapshots_in_range(&db_tx, account_id, space_id, from, to)
                .await
        })
    }
}
