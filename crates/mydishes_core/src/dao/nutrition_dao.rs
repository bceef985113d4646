//! Nutrition table access.

use super::{ensure_schema_ready, id_param, written_id, DaoResult};
use crate::entity::NutritionRow;
use crate::model::RowId;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Column list shared by every nutrition read; keep in sync with [`nutrition_at`].
pub(crate) const NUTRITION_COLUMNS: &str = "id, calories, protein, fat, carb";

/// CRUD over `nutrition`.
pub trait NutritionDao {
    /// Upserts one row and returns its id.
    fn insert(&self, row: &NutritionRow) -> DaoResult<RowId>;
    /// Upserts rows in order and returns their ids in the same order.
    fn insert_batch(&self, rows: &[NutritionRow]) -> DaoResult<Vec<RowId>>;
    fn get_by_id(&self, id: RowId) -> DaoResult<Option<NutritionRow>>;
    fn get_all(&self) -> DaoResult<Vec<NutritionRow>>;
    /// Updates an existing row in place. Returns `false` when `row.id` is unknown.
    fn update(&self, row: &NutritionRow) -> DaoResult<bool>;
    /// Deletes by id, cascading to dishes/products that reference it.
    fn delete_by_id(&self, id: RowId) -> DaoResult<bool>;
    /// Deletes by id only when no dish or product references the row.
    fn delete_if_unreferenced(&self, id: RowId) -> DaoResult<bool>;
}

/// SQLite-backed nutrition DAO.
pub struct SqliteNutritionDao<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNutritionDao<'conn> {
    /// Wraps a connection already known to carry the dish schema.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Wraps a connection after verifying the dish schema is present.
    pub fn try_new(conn: &'conn Connection) -> DaoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self::new(conn))
    }
}

impl NutritionDao for SqliteNutritionDao<'_> {
    fn insert(&self, row: &NutritionRow) -> DaoResult<RowId> {
        self.conn.execute(
            "INSERT INTO nutrition (id, calories, protein, fat, carb)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                calories = excluded.calories,
                protein = excluded.protein,
                fat = excluded.fat,
                carb = excluded.carb;",
            params![id_param(row.id), row.calories, row.protein, row.fat, row.carb],
        )?;
        Ok(written_id(self.conn, row.id))
    }

    fn insert_batch(&self, rows: &[NutritionRow]) -> DaoResult<Vec<RowId>> {
        rows.iter().map(|row| self.insert(row)).collect()
    }

    fn get_by_id(&self, id: RowId) -> DaoResult<Option<NutritionRow>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {NUTRITION_COLUMNS} FROM nutrition WHERE id = ?1;"),
                [id],
                |row| nutrition_at(row, 0),
            )
            .optional()?;
        Ok(row.flatten())
    }

    fn get_all(&self) -> DaoResult<Vec<NutritionRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {NUTRITION_COLUMNS} FROM nutrition ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            if let Some(nutrition) = nutrition_at(row, 0)? {
                result.push(nutrition);
            }
        }
        Ok(result)
    }

    fn update(&self, row: &NutritionRow) -> DaoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE nutrition
             SET calories = ?2, protein = ?3, fat = ?4, carb = ?5
             WHERE id = ?1;",
            params![row.id, row.calories, row.protein, row.fat, row.carb],
        )?;
        Ok(changed > 0)
    }

    fn delete_by_id(&self, id: RowId) -> DaoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM nutrition WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn delete_if_unreferenced(&self, id: RowId) -> DaoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM nutrition
             WHERE id = ?1
               AND NOT EXISTS (SELECT 1 FROM dishes WHERE nutrition_id = ?1)
               AND NOT EXISTS (SELECT 1 FROM products WHERE nutrition_id = ?1);",
            [id],
        )?;
        Ok(changed > 0)
    }
}

/// Reads a nutrition row from `NUTRITION_COLUMNS` starting at column `start`.
///
/// Returns `None` when the id column is `NULL` (unmatched outer join).
pub(crate) fn nutrition_at(row: &Row<'_>, start: usize) -> rusqlite::Result<Option<NutritionRow>> {
    let Some(id) = row.get::<_, Option<RowId>>(start)? else {
        return Ok(None);
    };
    Ok(Some(NutritionRow {
        id,
        calories: row.get(start + 1)?,
        protein: row.get(start + 2)?,
        fat: row.get(start + 3)?,
        carb: row.get(start + 4)?,
    }))
}
