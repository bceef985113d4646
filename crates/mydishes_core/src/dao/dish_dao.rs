//! Dish table, dish↔product association, and composite dish reads.

use super::nutrition_dao::nutrition_at;
use super::product_dao::product_at;
use super::{
    ensure_schema_ready, id_param, placeholders, written_id, DaoResult, QueryStats,
    MAX_IDS_PER_STATEMENT,
};
use crate::entity::{DishProductCrossRef, DishRow, DishWithProductsAndNutrition};
use crate::model::RowId;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

const DISH_COLUMNS: &str = "id, name, photo_uri, nutrition_id";

/// One row per (dish, associated product); dishes without products yield a
/// single row with `NULL` product columns. Column layout:
/// `0..4` dish, `4..9` dish nutrition, `9..15` product.
const DISH_COMPOSITE_SELECT_SQL: &str = "SELECT
    d.id, d.name, d.photo_uri, d.nutrition_id,
    n.id, n.calories, n.protein, n.fat, n.carb,
    p.id, p.product_url, p.image_url, p.name, p.nutrition_id, p.mass
FROM dishes d
LEFT JOIN nutrition n ON n.id = d.nutrition_id
LEFT JOIN dish_product_cross_ref x ON x.dish_id = d.id
LEFT JOIN products p ON p.id = x.product_id";

/// CRUD over `dishes` and `dish_product_cross_ref`.
pub trait DishDao {
    /// Upserts one row and returns its id.
    fn insert(&self, row: &DishRow) -> DaoResult<RowId>;
    /// Upserts rows in order and returns their ids in the same order.
    fn insert_batch(&self, rows: &[DishRow]) -> DaoResult<Vec<RowId>>;
    fn get_by_id(&self, id: RowId) -> DaoResult<Option<DishRow>>;
    /// All dish rows, without nutrition or products.
    fn get_all_dishes_simple(&self) -> DaoResult<Vec<DishRow>>;
    /// Updates name, photo and nutrition FK. Returns `false` when `row.id` is unknown.
    fn update(&self, row: &DishRow) -> DaoResult<bool>;
    /// Deletes one dish; cross-refs and its nutrition go with it. Returns rows affected.
    fn delete_by_id(&self, id: RowId) -> DaoResult<usize>;
    fn insert_cross_ref(&self, cross_ref: &DishProductCrossRef) -> DaoResult<()>;
    fn insert_cross_refs(&self, cross_refs: &[DishProductCrossRef]) -> DaoResult<()>;
    /// Removes every association of one dish. Returns rows affected.
    fn delete_cross_refs_by_dish_id(&self, dish_id: RowId) -> DaoResult<usize>;
    /// Associations of one dish in insertion order.
    fn get_cross_refs_by_dish_id(&self, dish_id: RowId) -> DaoResult<Vec<DishProductCrossRef>>;
    /// Distinct ids of dishes associated with any of `product_ids`, ascending.
    fn get_dish_ids_by_product_ids(&self, product_ids: &[RowId]) -> DaoResult<Vec<RowId>>;
    /// Dish + aggregate nutrition + product shells in one statement.
    fn get_dish_with_products_and_nutrition(
        &self,
        id: RowId,
    ) -> DaoResult<Option<DishWithProductsAndNutrition>>;
    /// Every dish as [`DishWithProductsAndNutrition`], ordered by id.
    fn get_all_dishes_with_products_and_nutrition(
        &self,
    ) -> DaoResult<Vec<DishWithProductsAndNutrition>>;
}

/// SQLite-backed dish DAO.
pub struct SqliteDishDao<'conn> {
    conn: &'conn Connection,
    stats: Option<&'conn QueryStats>,
}

impl<'conn> SqliteDishDao<'conn> {
    /// Wraps a connection already known to carry the dish schema.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn, stats: None }
    }

    /// Wraps a connection after verifying the dish schema is present.
    pub fn try_new(conn: &'conn Connection) -> DaoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self::new(conn))
    }

    /// Records composite read calls into `stats`.
    pub fn with_stats(mut self, stats: &'conn QueryStats) -> Self {
        self.stats = Some(stats);
        self
    }

    fn query_composite(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> DaoResult<Vec<DishWithProductsAndNutrition>> {
        if let Some(stats) = self.stats {
            stats.record_composite_dish_fetch();
        }

        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut result: Vec<DishWithProductsAndNutrition> = Vec::new();

        while let Some(row) = rows.next()? {
            let dish = dish_at(row)?;
            let product = product_at(row, 9)?;

            match result.last_mut() {
                Some(current) if current.dish.id == dish.id => {
                    current.products.extend(product);
                    continue;
                }
                _ => {}
            }
            result.push(DishWithProductsAndNutrition {
                dish,
                dish_nutrition: nutrition_at(row, 4)?,
                products: product.into_iter().collect(),
            });
        }

        Ok(result)
    }
}

impl DishDao for SqliteDishDao<'_> {
    fn insert(&self, row: &DishRow) -> DaoResult<RowId> {
        self.conn.execute(
            "INSERT INTO dishes (id, name, photo_uri, nutrition_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                photo_uri = excluded.photo_uri,
                nutrition_id = excluded.nutrition_id;",
            params![
                id_param(row.id),
                row.name.as_deref(),
                row.photo_uri.as_deref(),
                row.nutrition_id,
            ],
        )?;
        Ok(written_id(self.conn, row.id))
    }

    fn insert_batch(&self, rows: &[DishRow]) -> DaoResult<Vec<RowId>> {
        rows.iter().map(|row| self.insert(row)).collect()
    }

    fn get_by_id(&self, id: RowId) -> DaoResult<Option<DishRow>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {DISH_COLUMNS} FROM dishes WHERE id = ?1;"),
                [id],
                dish_at,
            )
            .optional()?;
        Ok(row)
    }

    fn get_all_dishes_simple(&self) -> DaoResult<Vec<DishRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {DISH_COLUMNS} FROM dishes ORDER BY id ASC;"))?;
        let rows = stmt.query_map([], dish_at)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update(&self, row: &DishRow) -> DaoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE dishes
             SET name = ?2, photo_uri = ?3, nutrition_id = ?4
             WHERE id = ?1;",
            params![
                row.id,
                row.name.as_deref(),
                row.photo_uri.as_deref(),
                row.nutrition_id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_by_id(&self, id: RowId) -> DaoResult<usize> {
        Ok(self.conn.execute("DELETE FROM dishes WHERE id = ?1;", [id])?)
    }

    fn insert_cross_ref(&self, cross_ref: &DishProductCrossRef) -> DaoResult<()> {
        self.conn.execute(
            "INSERT INTO dish_product_cross_ref (dish_id, product_id)
             VALUES (?1, ?2)
             ON CONFLICT (dish_id, product_id) DO NOTHING;",
            params![cross_ref.dish_id, cross_ref.product_id],
        )?;
        Ok(())
    }

    fn insert_cross_refs(&self, cross_refs: &[DishProductCrossRef]) -> DaoResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO dish_product_cross_ref (dish_id, product_id)
             VALUES (?1, ?2)
             ON CONFLICT (dish_id, product_id) DO NOTHING;",
        )?;
        for cross_ref in cross_refs {
            stmt.execute(params![cross_ref.dish_id, cross_ref.product_id])?;
        }
        Ok(())
    }

    fn delete_cross_refs_by_dish_id(&self, dish_id: RowId) -> DaoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM dish_product_cross_ref WHERE dish_id = ?1;",
            [dish_id],
        )?)
    }

    fn get_cross_refs_by_dish_id(&self, dish_id: RowId) -> DaoResult<Vec<DishProductCrossRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT dish_id, product_id
             FROM dish_product_cross_ref
             WHERE dish_id = ?1
             ORDER BY rowid ASC;",
        )?;
        let rows = stmt.query_map([dish_id], |row| {
            Ok(DishProductCrossRef::new(row.get(0)?, row.get(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_dish_ids_by_product_ids(&self, product_ids: &[RowId]) -> DaoResult<Vec<RowId>> {
        let mut dish_ids = BTreeSet::<RowId>::new();
        for chunk in product_ids.chunks(MAX_IDS_PER_STATEMENT) {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT DISTINCT dish_id
                 FROM dish_product_cross_ref
                 WHERE product_id IN ({});",
                placeholders(chunk.len())
            ))?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| row.get(0))?;
            for dish_id in rows {
                dish_ids.insert(dish_id?);
            }
        }
        Ok(dish_ids.into_iter().collect())
    }

    fn get_dish_with_products_and_nutrition(
        &self,
        id: RowId,
    ) -> DaoResult<Option<DishWithProductsAndNutrition>> {
        let mut dishes = self.query_composite(
            &format!("{DISH_COMPOSITE_SELECT_SQL} WHERE d.id = ?1 ORDER BY x.rowid ASC;"),
            [id],
        )?;
        Ok(dishes.pop())
    }

    fn get_all_dishes_with_products_and_nutrition(
        &self,
    ) -> DaoResult<Vec<DishWithProductsAndNutrition>> {
        self.query_composite(
            &format!("{DISH_COMPOSITE_SELECT_SQL} ORDER BY d.id ASC, x.rowid ASC;"),
            [],
        )
    }
}

fn dish_at(row: &Row<'_>) -> rusqlite::Result<DishRow> {
    Ok(DishRow {
        id: row.get(0)?,
        name: row.get(1)?,
        photo_uri: row.get(2)?,
        nutrition_id: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{DishDao, SqliteDishDao};
    use crate::dao::nutrition_dao::{NutritionDao, SqliteNutritionDao};
    use crate::dao::product_dao::{ProductDao, SqliteProductDao};
    use crate::db::open_db_in_memory;
    use crate::entity::{DishProductCrossRef, DishRow, NutritionRow, ProductRow};
    use rusqlite::Connection;

    fn seed_dish(conn: &Connection, name: &str, product_names: &[&str]) -> (i64, Vec<i64>) {
        let nutrition = SqliteNutritionDao::new(conn);
        let products = SqliteProductDao::new(conn);
        let dishes = SqliteDishDao::new(conn);

        let nutrition_id = nutrition.insert(&NutritionRow::default()).unwrap();
        let dish_id = dishes
            .insert(&DishRow {
                id: 0,
                name: Some(name.to_string()),
                photo_uri: None,
                nutrition_id: Some(nutrition_id),
            })
            .unwrap();
        let product_ids = product_names
            .iter()
            .map(|product_name| {
                products
                    .insert(&ProductRow {
                        name: Some((*product_name).to_string()),
                        mass: 50.0,
                        ..ProductRow::default()
                    })
                    .unwrap()
            })
            .collect::<Vec<_>>();
        let cross_refs = product_ids
            .iter()
            .map(|product_id| DishProductCrossRef::new(dish_id, *product_id))
            .collect::<Vec<_>>();
        dishes.insert_cross_refs(&cross_refs).unwrap();
        (dish_id, product_ids)
    }

    #[test]
    fn composite_read_groups_products_under_their_dish() {
        let conn = open_db_in_memory().unwrap();
        let (dish_id, product_ids) = seed_dish(&conn, "salad", &["tomato", "cucumber"]);
        let dao = SqliteDishDao::try_new(&conn).unwrap();

        let composite = dao
            .get_dish_with_products_and_nutrition(dish_id)
            .unwrap()
            .unwrap();
        assert_eq!(composite.dish.name.as_deref(), Some("salad"));
        assert!(composite.dish_nutrition.is_some());
        let ids = composite.products.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids, product_ids);
    }

    #[test]
    fn composite_read_of_dish_without_products_has_empty_list() {
        let conn = open_db_in_memory().unwrap();
        let (first, _) = seed_dish(&conn, "water", &[]);
        let (second, _) = seed_dish(&conn, "tea", &["leaf"]);
        let dao = SqliteDishDao::new(&conn);

        let all = dao.get_all_dishes_with_products_and_nutrition().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].dish.id, first);
        assert!(all[0].products.is_empty());
        assert_eq!(all[1].dish.id, second);
        assert_eq!(all[1].products.len(), 1);
    }

    #[test]
    fn dish_ids_by_product_ids_are_distinct_and_sorted() {
        let conn = open_db_in_memory().unwrap();
        let (first, first_products) = seed_dish(&conn, "soup", &["beet", "onion"]);
        let (second, _) = seed_dish(&conn, "stew", &["carrot"]);
        let (_, third_products) = seed_dish(&conn, "tea", &["leaf"]);
        let dao = SqliteDishDao::new(&conn);
        dao.insert_cross_ref(&DishProductCrossRef::new(second, first_products[1]))
            .unwrap();

        let ids = dao.get_dish_ids_by_product_ids(&first_products).unwrap();
        assert_eq!(ids, vec![first, second]);
        assert!(dao.get_dish_ids_by_product_ids(&[]).unwrap().is_empty());
        assert_eq!(dao.get_dish_ids_by_product_ids(&third_products).unwrap().len(), 1);
    }

    #[test]
    fn missing_dish_is_none() {
        let conn = open_db_in_memory().unwrap();
        let dao = SqliteDishDao::new(&conn);
        assert!(dao.get_dish_with_products_and_nutrition(7).unwrap().is_none());
        assert!(dao.get_by_id(7).unwrap().is_none());
        assert_eq!(dao.delete_by_id(7).unwrap(), 0);
    }

    #[test]
    fn delete_cascades_cross_refs_and_nutrition_but_keeps_products() {
        let conn = open_db_in_memory().unwrap();
        let (dish_id, product_ids) = seed_dish(&conn, "stew", &["beef", "carrot"]);
        let dao = SqliteDishDao::new(&conn);
        let nutrition_id = dao.get_by_id(dish_id).unwrap().unwrap().nutrition_id.unwrap();

        assert_eq!(dao.delete_by_id(dish_id).unwrap(), 1);

        assert!(dao.get_cross_refs_by_dish_id(dish_id).unwrap().is_empty());
        assert!(SqliteNutritionDao::new(&conn)
            .get_by_id(nutrition_id)
            .unwrap()
            .is_none());
        let products = SqliteProductDao::new(&conn);
        for product_id in product_ids {
            assert!(products.get_by_id(product_id).unwrap().is_some());
        }
    }

    #[test]
    fn cross_ref_to_unknown_product_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let (dish_id, _) = seed_dish(&conn, "pie", &[]);
        let dao = SqliteDishDao::new(&conn);

        let err = dao
            .insert_cross_ref(&DishProductCrossRef::new(dish_id, 31337))
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn clearing_cross_refs_reports_removed_count() {
        let conn = open_db_in_memory().unwrap();
        let (dish_id, _) = seed_dish(&conn, "plov", &["rice", "lamb", "carrot"]);
        let dao = SqliteDishDao::new(&conn);

        assert_eq!(dao.delete_cross_refs_by_dish_id(dish_id).unwrap(), 3);
        assert_eq!(dao.get_all_dishes_simple().unwrap().len(), 1);
    }
}
