//! Query Layer: typed CRUD and batch reads per table.
//!
//! # Responsibility
//! - Keep every SQL statement of the dish store inside this module.
//! - Provide composite reads that avoid one query per product.
//!
//! # Invariants
//! - Inserts are upserts keyed by surrogate id; id `0` lets the store assign one.
//! - Get-by-id of a missing row returns `Ok(None)`, never an error.
//! - DAOs never open transactions; callers pass a `Transaction` (it derefs
//!   to `Connection`) when several statements must commit together.

use crate::db::DbError;
use crate::model::RowId;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

pub mod dish_dao;
pub mod nutrition_dao;
pub mod product_dao;

pub use dish_dao::{DishDao, SqliteDishDao};
pub use nutrition_dao::{NutritionDao, SqliteNutritionDao};
pub use product_dao::{ProductDao, SqliteProductDao};

/// Tables the DAOs require, in dependency order.
pub const REQUIRED_TABLES: [&str; 4] =
    ["nutrition", "products", "dishes", "dish_product_cross_ref"];

pub type DaoResult<T> = Result<T, DaoError>;

/// Upper bound on ids bound into one `IN (...)` list; SQLite caps host parameters.
pub(crate) const MAX_IDS_PER_STATEMENT: usize = 500;

/// Query Layer failure.
#[derive(Debug)]
pub enum DaoError {
    /// Underlying SQLite failure, including constraint violations.
    Db(DbError),
    /// Connection was not migrated to the dish schema.
    MissingRequiredTable(&'static str),
    /// Persisted values cannot be converted into a row model.
    InvalidData(String),
}

impl DaoError {
    /// Whether SQLite rejected the statement on a constraint (FK, CHECK, PK).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl Display for DaoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "dish store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted dish data: {message}"),
        }
    }
}

impl Error for DaoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MissingRequiredTable(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for DaoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for DaoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Call counters for the reads whose count matters to callers.
///
/// Shared by all DAOs of one store; counts method calls, not SQL statements.
#[derive(Debug, Default)]
pub struct QueryStats {
    batch_nutrition_fetches: AtomicUsize,
    single_product_fetches: AtomicUsize,
    composite_dish_fetches: AtomicUsize,
}

/// Point-in-time copy of [`QueryStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryStatsSnapshot {
    /// `get_products_with_nutrition_by_ids` calls.
    pub batch_nutrition_fetches: usize,
    /// `get_product_with_nutrition_by_id` calls.
    pub single_product_fetches: usize,
    /// `get_dish_with_products_and_nutrition` and
    /// `get_all_dishes_with_products_and_nutrition` calls.
    pub composite_dish_fetches: usize,
}

impl QueryStats {
    pub fn snapshot(&self) -> QueryStatsSnapshot {
        QueryStatsSnapshot {
            batch_nutrition_fetches: self.batch_nutrition_fetches.load(Ordering::Relaxed),
            single_product_fetches: self.single_product_fetches.load(Ordering::Relaxed),
            composite_dish_fetches: self.composite_dish_fetches.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.batch_nutrition_fetches.store(0, Ordering::Relaxed);
        self.single_product_fetches.store(0, Ordering::Relaxed);
        self.composite_dish_fetches.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_nutrition_fetch(&self) {
        self.batch_nutrition_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_single_product_fetch(&self) {
        self.single_product_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_composite_dish_fetch(&self) {
        self.composite_dish_fetches.fetch_add(1, Ordering::Relaxed);
    }
}

/// Verifies the connection carries every table the DAOs query.
pub fn ensure_schema_ready(conn: &Connection) -> DaoResult<()> {
    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(DaoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DaoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Maps the domain "unset" id to `NULL` so the store assigns one.
pub(crate) fn id_param(id: RowId) -> Option<RowId> {
    (id != 0).then_some(id)
}

/// Returns the id the statement wrote to: the caller's id on upsert, the
/// generated one on plain insert.
pub(crate) fn written_id(conn: &Connection, requested: RowId) -> RowId {
    if requested != 0 {
        requested
    } else {
        conn.last_insert_rowid()
    }
}

/// Builds `?,?,...` for `count` positional parameters.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::{ensure_schema_ready, placeholders, DaoError, QueryStats};
    use crate::db::open_db_in_memory;
    use rusqlite::Connection;

    #[test]
    fn migrated_connection_is_ready() {
        let conn = open_db_in_memory().unwrap();
        ensure_schema_ready(&conn).unwrap();
    }

    #[test]
    fn bare_connection_reports_first_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = ensure_schema_ready(&conn).unwrap_err();
        assert!(matches!(err, DaoError::MissingRequiredTable("nutrition")));
    }

    #[test]
    fn placeholders_are_comma_separated() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn stats_reset_clears_counters() {
        let stats = QueryStats::default();
        stats.record_batch_nutrition_fetch();
        stats.record_composite_dish_fetch();
        assert_eq!(stats.snapshot().batch_nutrition_fetches, 1);

        stats.reset();
        assert_eq!(stats.snapshot().batch_nutrition_fetches, 0);
        assert_eq!(stats.snapshot().composite_dish_fetches, 0);
    }
}
