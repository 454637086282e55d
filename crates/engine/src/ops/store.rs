//! Space store contract: lookups, aggregate queries and the
//! compare-and-swap balance write every mutating operation goes through.

use rust_decimal::Decimal;
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{EngineError, ResultEngine, Space, SpaceKind, spaces};

use super::{Engine, with_tx};

impl Engine {
    pub(super) async fn find_space(
        &self,
        db: &DatabaseTransaction,
        space_id: Uuid,
    ) -> ResultEngine<Option<spaces::Model>> {
        spaces::Entity::find_by_id(space_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_space(
        &self,
        db: &DatabaseTransaction,
        space_id: Uuid,
    ) -> ResultEngine<spaces::Model> {
        self.find_space(db, space_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("space {space_id}")))
    }

    pub(super) async fn find_main_space(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
    ) -> ResultEngine<Option<spaces::Model>> {
        spaces::Entity::find()
            .filter(spaces::Column::AccountId.eq(account_id.to_string()))
            .filter(spaces::Column::Kind.eq(SpaceKind::Main.as_str()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// All spaces of an account in a deterministic order (creation time,
    /// then id as tie-breaker).
    pub(super) async fn account_spaces(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
    ) -> ResultEngine<Vec<spaces::Model>> {
        spaces::Entity::find()
            .filter(spaces::Column::AccountId.eq(account_id.to_string()))
            .order_by_asc(spaces::Column::CreatedAt)
            .order_by_asc(spaces::Column::Id)
            .all(db)
            .await
            .map_err(Into::into)
    }

    /// Persist a new balance for a space with a compare-and-swap on the
    /// row version. A concurrent writer turns this into [`EngineError::Conflict`]
    /// instead of a lost update.
    pub(super) async fn save_space_balance(
        &self,
        db: &DatabaseTransaction,
        space: &mut Space,
    ) -> ResultEngine<()> {
        let current = space.version;
        let result = spaces::Entity::update_many()
            .col_expr(spaces::Column::Balance, Expr::value(space.balance.to_string()))
            .col_expr(spaces::Column::Version, Expr::value(current + 1))
            .filter(spaces::Column::Id.eq(space.id.to_string()))
            .filter(spaces::Column::Version.eq(current))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(format!(
                "space {} was updated concurrently",
                space.id
            )));
        }
        space.version = current + 1;
        Ok(())
    }

    /// Lists all spaces of an account.
    pub async fn spaces(&self, account_id: &str) -> ResultEngine<Vec<Space>> {
        with_tx!(self, |db_tx| {
            let models = self.account_spaces(&db_tx, account_id).await?;
            models.into_iter().map(Space::try_from).collect()
        })
    }

    /// Number of spaces belonging to an account.
    pub async fn space_count(&self, account_id: &str) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            spaces::Entity::find()
                .filter(spaces::Column::AccountId.eq(account_id.to_string()))
                .count(&db_tx)
                .await
                .map_err(Into::into)
        })
    }

    /// Sum of all space balances of an account.
    pub async fn account_balance(&self, account_id: &str) -> ResultEngine<Decimal> {
        let spaces = self.spaces(account_id).await?;
        Ok(spaces.iter().map(|space| space.balance).sum())
    }

    /// Spaces of an account that have a target amount set.
    pub async fn spaces_with_target(&self, account_id: &str) -> ResultEngine<Vec<Space>> {
        with_tx!(self, |db_tx| {
            let models = spaces::Entity::find()
                .filter(spaces::Column::AccountId.eq(account_id.to_string()))
                .filter(spaces::Column::TargetAmount.is_not_null())
                .order_by_asc(spaces::Column::CreatedAt)
                .order_by_asc(spaces::Column::Id)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Space::try_from).collect()
        })
    }

    /// Spaces of an account with the given kind.
    pub async fn spaces_by_kind(
        &self,
        account_id: &str,
        kind: SpaceKind,
    ) -> ResultEngine<Vec<Space>> {
        with_tx!(self, |db_tx| {
            let models = spaces::Entity::find()
                .filter(spaces::Column::AccountId.eq(account_id.to_string()))
                .filter(spaces::Column::Kind.eq(kind.as_str()))
                .order_by_asc(spaces::Column::CreatedAt)
                .order_by_asc(spaces::Column::Id)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Space::try_from).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::Database;

    use crate::NewSpace;

    use super::*;

    async fn engine_with_db() -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        Engine::builder().database(db).build().await.unwrap()
    }

    fn dec(value: &str) -> Decimal {
        Decimal::from_str_exact(value).unwrap()
    }

    #[tokio::test]
    async fn stale_version_write_is_a_conflict_not_a_lost_update() {
        let engine = engine_with_db().await;
        let space = engine
            .create_space(NewSpace {
                account_id: "acct-1".to_string(),
                name: "Savings".to_string(),
                kind: SpaceKind::Savings,
                balance: Some(dec("100.00")),
                visible: None,
                target_amount: None,
                target_date: None,
            })
            .await
            .unwrap();

        // Two writers load the same version of the row.
        let mut first = space.clone();
        let mut second = space.clone();

        first.balance = dec("150.00");
        let db_tx = engine.database.begin().await.unwrap();
        engine.save_space_balance(&db_tx, &mut first).await.unwrap();
        db_tx.commit().await.unwrap();
        assert_eq!(first.version, space.version + 1);

        // The second writer holds the stale version and must lose.
        second.balance = dec("25.00");
        let db_tx = engine.database.begin().await.unwrap();
        let err = engine
            .save_space_balance(&db_tx, &mut second)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
        drop(db_tx);

        // The first write survived; the stale one was never applied.
        let stored = engine.space(space.id).await.unwrap();
        assert_eq!(stored.balance, dec("150.00"));
        assert_eq!(stored.version, space.version + 1);
    }
}
