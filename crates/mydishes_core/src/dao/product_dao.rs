//! Product table access and product+nutrition joins.

use super::nutrition_dao::nutrition_at;
use super::{
    ensure_schema_ready, id_param, placeholders, written_id, DaoResult, QueryStats,
    MAX_IDS_PER_STATEMENT,
};
use crate::entity::{ProductRow, ProductWithNutrition};
use crate::model::RowId;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

/// Column list for plain product reads; keep in sync with [`product_at`].
pub(crate) const PRODUCT_COLUMNS: &str = "id, product_url, image_url, name, nutrition_id, mass";

const PRODUCT_WITH_NUTRITION_SELECT_SQL: &str = "SELECT
    p.id, p.product_url, p.image_url, p.name, p.nutrition_id, p.mass,
    n.id, n.calories, n.protein, n.fat, n.carb
FROM products p
LEFT JOIN nutrition n ON n.id = p.nutrition_id";


/// CRUD over `products` plus nutrition joins.
pub trait ProductDao {
    /// Upserts one row and returns its id.
    fn insert(&self, row: &ProductRow) -> DaoResult<RowId>;
    /// Upserts rows in order and returns their ids in the same order.
    fn insert_batch(&self, rows: &[ProductRow]) -> DaoResult<Vec<RowId>>;
    fn get_by_id(&self, id: RowId) -> DaoResult<Option<ProductRow>>;
    fn get_all(&self) -> DaoResult<Vec<ProductRow>>;
    /// Updates an existing row in place. Returns `false` when `row.id` is unknown.
    fn update(&self, row: &ProductRow) -> DaoResult<bool>;
    fn delete_by_id(&self, id: RowId) -> DaoResult<bool>;
    fn get_product_with_nutrition_by_id(&self, id: RowId)
        -> DaoResult<Option<ProductWithNutrition>>;
    fn get_all_products_with_nutrition(&self) -> DaoResult<Vec<ProductWithNutrition>>;
    /// Joins products with their per-100 g nutrition for a caller-supplied id
    /// set in one call. Unknown ids are skipped; result order is by id.
    fn get_products_with_nutrition_by_ids(
        &self,
        ids: &[RowId],
    ) -> DaoResult<Vec<ProductWithNutrition>>;
}

/// SQLite-backed product DAO.
pub struct SqliteProductDao<'conn> {
    conn: &'conn Connection,
    stats: Option<&'conn QueryStats>,
}

impl<'conn> SqliteProductDao<'conn> {
    /// Wraps a connection already known to carry the dish schema.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn, stats: None }
    }

    /// Wraps a connection after verifying the dish schema is present.
    pub fn try_new(conn: &'conn Connection) -> DaoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self::new(conn))
    }

    /// Records read calls into `stats`.
    pub fn with_stats(mut self, stats: &'conn QueryStats) -> Self {
        self.stats = Some(stats);
        self
    }
}

impl ProductDao for SqliteProductDao<'_> {
    fn insert(&self, row: &ProductRow) -> DaoResult<RowId> {
        self.conn.execute(
            "INSERT INTO products (id, product_url, image_url, name, nutrition_id, mass)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (id) DO UPDATE SET
                product_url = excluded.product_url,
                image_url = excluded.image_url,
                name = excluded.name,
                nutrition_id = excluded.nutrition_id,
                mass = excluded.mass;",
            params![
                id_param(row.id),
                row.product_url.as_deref(),
                row.image_url.as_deref(),
                row.name.as_deref(),
                row.nutrition_id,
                row.mass,
            ],
        )?;
        Ok(written_id(self.conn, row.id))
    }

    fn insert_batch(&self, rows: &[ProductRow]) -> DaoResult<Vec<RowId>> {
        rows.iter().map(|row| self.insert(row)).collect()
    }

    fn get_by_id(&self, id: RowId) -> DaoResult<Option<ProductRow>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1;"),
                [id],
                |row| product_at(row, 0),
            )
            .optional()?;
        Ok(row.flatten())
    }

    fn get_all(&self) -> DaoResult<Vec<ProductRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            if let Some(product) = product_at(row, 0)? {
                result.push(product);
            }
        }
        Ok(result)
    }

    fn update(&self, row: &ProductRow) -> DaoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE products
             SET product_url = ?2, image_url = ?3, name = ?4, nutrition_id = ?5, mass = ?6
             WHERE id = ?1;",
            params![
                row.id,
                row.product_url.as_deref(),
                row.image_url.as_deref(),
                row.name.as_deref(),
                row.nutrition_id,
                row.mass,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_by_id(&self, id: RowId) -> DaoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM products WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn get_product_with_nutrition_by_id(
        &self,
        id: RowId,
    ) -> DaoResult<Option<ProductWithNutrition>> {
        if let Some(stats) = self.stats {
            stats.record_single_product_fetch();
        }

        let row = self
            .conn
            .query_row(
                &format!("{PRODUCT_WITH_NUTRITION_SELECT_SQL} WHERE p.id = ?1;"),
                [id],
                product_with_nutrition_at,
            )
            .optional()?;
        Ok(row.flatten())
    }

    fn get_all_products_with_nutrition(&self) -> DaoResult<Vec<ProductWithNutrition>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PRODUCT_WITH_NUTRITION_SELECT_SQL} ORDER BY p.id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            if let Some(item) = product_with_nutrition_at(row)? {
                result.push(item);
            }
        }
        Ok(result)
    }

    fn get_products_with_nutrition_by_ids(
        &self,
        ids: &[RowId],
    ) -> DaoResult<Vec<ProductWithNutrition>> {
        if let Some(stats) = self.stats {
            stats.record_batch_nutrition_fetch();
        }

        let mut result = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
            let mut stmt = self.conn.prepare(&format!(
                "{PRODUCT_WITH_NUTRITION_SELECT_SQL}
                 WHERE p.id IN ({})
                 ORDER BY p.id ASC;",
                placeholders(chunk.len())
            ))?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                if let Some(item) = product_with_nutrition_at(row)? {
                    result.push(item);
                }
            }
        }
        if ids.len() > MAX_IDS_PER_STATEMENT {
            result.sort_by_key(|item| item.product.id);
            result.dedup_by_key(|item| item.product.id);
        }
        Ok(result)
    }
}

/// Reads a product row from `PRODUCT_COLUMNS` starting at column `start`.
///
/// Returns `None` when the id column is `NULL` (unmatched outer join).
pub(crate) fn product_at(row: &Row<'_>, start: usize) -> rusqlite::Result<Option<ProductRow>> {
    let Some(id) = row.get::<_, Option<RowId>>(start)? else {
        return Ok(None);
    };
    Ok(Some(ProductRow {
        id,
        product_url: row.get(start + 1)?,
        image_url: row.get(start + 2)?,
        name: row.get(start + 3)?,
        nutrition_id: row.get(start + 4)?,
        mass: row.get(start + 5)?,
    }))
}

fn product_with_nutrition_at(row: &Row<'_>) -> rusqlite::Result<Option<ProductWithNutrition>> {
    let Some(product) = product_at(row, 0)? else {
        return Ok(None);
    };
    Ok(Some(ProductWithNutrition {
        product,
        nutrition: nutrition_at(row, 6)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::{ProductDao, SqliteProductDao};
    use crate::dao::nutrition_dao::{NutritionDao, SqliteNutritionDao};
    use crate::dao::QueryStats;
    use crate::db::open_db_in_memory;
    use crate::entity::{NutritionRow, ProductRow};

    fn product(name: &str, nutrition_id: Option<i64>) -> ProductRow {
        ProductRow {
            id: 0,
            product_url: Some(format!("https://catalog.test/{name}")),
            image_url: None,
            name: Some(name.to_string()),
            nutrition_id,
            mass: 100.0,
        }
    }

    #[test]
    fn batch_join_returns_nutrition_for_requested_ids_only() {
        let conn = open_db_in_memory().unwrap();
        let nutrition = SqliteNutritionDao::new(&conn);
        let stats = QueryStats::default();
        let dao = SqliteProductDao::try_new(&conn).unwrap().with_stats(&stats);

        let n1 = nutrition
            .insert(&NutritionRow {
                calories: 52.0,
                ..NutritionRow::default()
            })
            .unwrap();
        let apple = dao.insert(&product("apple", Some(n1))).unwrap();
        let bare = dao.insert(&product("bare", None)).unwrap();
        let _skipped = dao.insert(&product("skipped", None)).unwrap();

        let items = dao
            .get_products_with_nutrition_by_ids(&[bare, apple, 999])
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product.id, apple);
        assert_eq!(items[0].nutrition.unwrap().calories, 52.0);
        assert_eq!(items[1].product.id, bare);
        assert!(items[1].nutrition.is_none());
        assert_eq!(stats.snapshot().batch_nutrition_fetches, 1);
    }

    #[test]
    fn large_id_sets_are_chunked_transparently() {
        let conn = open_db_in_memory().unwrap();
        let dao = SqliteProductDao::new(&conn);

        let ids = (0..1200)
            .map(|i| dao.insert(&product(&format!("p{i}"), None)).unwrap())
            .collect::<Vec<_>>();

        let items = dao.get_products_with_nutrition_by_ids(&ids).unwrap();
        assert_eq!(items.len(), 1200);
    }

    #[test]
    fn unknown_nutrition_fk_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let dao = SqliteProductDao::new(&conn);

        let err = dao.insert(&product("ghost", Some(4242))).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn deleting_nutrition_cascades_to_product() {
        let conn = open_db_in_memory().unwrap();
        let nutrition = SqliteNutritionDao::new(&conn);
        let dao = SqliteProductDao::new(&conn);

        let n1 = nutrition.insert(&NutritionRow::default()).unwrap();
        let id = dao.insert(&product("milk", Some(n1))).unwrap();
        nutrition.delete_by_id(n1).unwrap();

        assert!(dao.get_by_id(id).unwrap().is_none());
    }

    #[test]
    fn update_changes_mass_in_place() {
        let conn = open_db_in_memory().unwrap();
        let dao = SqliteProductDao::new(&conn);

        let id = dao.insert(&product("rice", None)).unwrap();
        let mut row = dao.get_by_id(id).unwrap().unwrap();
        row.mass = 250.0;
        assert!(dao.update(&row).unwrap());

        let single = dao.get_product_with_nutrition_by_id(id).unwrap().unwrap();
        assert_eq!(single.product.mass, 250.0);
        assert_eq!(dao.get_all().unwrap().len(), 1);
        assert_eq!(dao.get_all_products_with_nutrition().unwrap().len(), 1);
    }
}
