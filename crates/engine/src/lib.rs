//! Sub-ledger engine for bank accounts.
//!
//! Each account is subdivided into named **spaces** (a main space plus
//! optional savings/goal buckets) that partition one account's money without
//! creating separate accounts. The engine keeps per-space balances
//! consistent under transfers, enforces conservation of funds, executes
//! recurring automatic transfers between spaces, and computes goal and
//! growth projections from balance snapshots.
//!
//! The embedder hands the engine a database connection:
//!
//! ```ignore
//! let db = sea_orm::Database::connect("sqlite::memory:").await?;
//! migration::Migrator::up(&db, None).await?;
//! let engine = Engine::builder().database(db).build().await?;
//! ```

pub use error::EngineError;
pub use frequency::TransferFrequency;
pub use ops::{
    Engine, EngineBuilder, GoalMetrics, GoalProgress, NewSpace, SpaceAnalytics, SpaceUpdate,
};
pub use snapshots::{BalanceSnapshot, SnapshotKind};
pub use spaces::{AutoTransfer, Space, SpaceKind};

mod error;
mod frequency;
mod ops;
mod snapshots;
mod spaces;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
