//! Initial schema migration - creates all tables from scratch.
//!
//! Two tables back the whole engine:
//!
//! - `spaces`: the sub-account buckets of each bank account, including the
//!   embedded automatic-transfer configuration
//! - `balance_snapshots`: the append-only balance history

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Spaces {
    Table,
    Id,
    AccountId,
    Name,
    Kind,
    Balance,
    Visible,
    Frozen,
    FrozenAt,
    UnfrozenAt,
    TargetAmount,
    TargetDate,
    AutoEnabled,
    AutoFrequency,
    AutoAmount,
    AutoSourceSpaceId,
    AdjustmentReason,
    AdjustedAt,
    CreatedAt,
    Version,
}

#[derive(Iden)]
enum BalanceSnapshots {
    Table,
    Id,
    AccountId,
    SpaceId,
    Kind,
    Amount,
    AsOf,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Spaces
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Spaces::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Spaces::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Spaces::AccountId).string().not_null())
                    .col(ColumnDef::new(Spaces::Name).string().not_null())
                    .col(ColumnDef::new(Spaces::Kind).string().not_null())
                    .col(ColumnDef::new(Spaces::Balance).string().not_null())
                    .col(ColumnDef::new(Spaces::Visible).boolean().not_null())
                    .col(ColumnDef::new(Spaces::Frozen).boolean().not_null())
                    .col(ColumnDef::new(Spaces::FrozenAt).timestamp())
                    .col(ColumnDef::new(Spaces::UnfrozenAt).timestamp())
                    .col(ColumnDef::new(Spaces::TargetAmount).string())
                    .col(ColumnDef::new(Spaces::TargetDate).timestamp())
                    .col(ColumnDef::new(Spaces::AutoEnabled).boolean().not_null())
                    .col(ColumnDef::new(Spaces::AutoFrequency).string())
                    .col(ColumnDef::new(Spaces::AutoAmount).string())
                    .col(ColumnDef::new(Spaces::AutoSourceSpaceId).string())
                    .col(ColumnDef::new(Spaces::AdjustmentReason).string())
                    .col(ColumnDef::new(Spaces::AdjustedAt).timestamp())
                    .col(ColumnDef::new(Spaces::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Spaces::Version).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-spaces-account_id")
                    .table(Spaces::Table)
                    .col(Spaces::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-spaces-account_id-kind")
                    .table(Spaces::Table)
                    .col(Spaces::AccountId)
                    .col(Spaces::Kind)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Balance snapshots
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BalanceSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BalanceSnapshots::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BalanceSnapshots::AccountId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BalanceSnapshots::SpaceId).string())
                    .col(ColumnDef::new(BalanceSnapshots::Kind).string().not_null())
                    .col(
                        ColumnDef::new(BalanceSnapshots::Amount)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceSnapshots::AsOf)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-balance_snapshots-account_id-as_of")
                    .table(BalanceSnapshots::Table)
                    .col(BalanceSnapshots::AccountId)
                    .col(BalanceSnapshots::AsOf)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-balance_snapshots-space_id-as_of")
                    .table(BalanceSnapshots::Table)
                    .col(BalanceSnapshots::SpaceId)
                    .col(BalanceSnapshots::AsOf)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BalanceSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Spaces::Table).to_owned())
            .await?;
        Ok(())
    }
}
