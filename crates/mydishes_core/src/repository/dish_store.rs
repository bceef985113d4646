//! Transactional dish persistence over one owned connection.
//!
//! # Responsibility
//! - Run each multi-table repository operation as one SQLite transaction.
//! - Reconstruct full dishes with a fixed number of queries.
//!
//! # Invariants
//! - Writes use `IMMEDIATE` transactions; a failing step rolls back all steps.
//! - Cross-references of a dish are replaced wholesale, never patched.
//! - A dish with products gets its aggregate recomputed from them.
//! - Dish reconstruction issues at most one batch nutrition fetch per call,
//!   regardless of dish or product count.

use super::adapter;
use super::error::{RepoError, RepoResult};
use crate::calc::aggregate::aggregate_products;
use crate::dao::{
    ensure_schema_ready, DishDao, NutritionDao, ProductDao, QueryStats, SqliteDishDao,
    SqliteNutritionDao, SqliteProductDao,
};
use crate::entity::{DishProductCrossRef, DishRow, NutritionRow, ProductRow, ProductWithNutrition};
use crate::model::dish::Dish;
use crate::model::nutrition::Nutrition;
use crate::model::product::Product;
use crate::model::{RowId, UNSET_ID};
use log::debug;
use rusqlite::{Connection, TransactionBehavior};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Owner of the store connection. Not `Sync`; lives on the repository worker.
pub struct DishStore {
    conn: Connection,
    stats: Arc<QueryStats>,
}

impl DishStore {
    /// Takes ownership of a migrated connection.
    pub fn new(conn: Connection) -> RepoResult<Self> {
        Self::with_stats(conn, Arc::new(QueryStats::default()))
    }

    /// Like [`DishStore::new`], recording Query Layer calls into `stats`.
    pub fn with_stats(conn: Connection, stats: Arc<QueryStats>) -> RepoResult<Self> {
        ensure_schema_ready(&conn)?;
        Ok(Self { conn, stats })
    }

    pub fn stats(&self) -> &Arc<QueryStats> {
        &self.stats
    }

    /// Persists a new dish, its nutrition, its products and their
    /// associations. Incoming ids are ignored; every row is fresh.
    pub fn insert_dish_with_details(&mut self, dish: &Dish) -> RepoResult<RowId> {
        let aggregate = resolve_aggregate(dish)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let dish_id = {
            let nutrition_dao = SqliteNutritionDao::new(&tx);
            let product_dao = SqliteProductDao::new(&tx);
            let dish_dao = SqliteDishDao::new(&tx);

            let dish_nutrition_id = aggregate
                .map(|nutrition| nutrition_dao.insert(&fresh_nutrition_row(&nutrition)))
                .transpose()?;
            let dish_id = dish_dao.insert(&DishRow {
                id: UNSET_ID,
                ..adapter::dish_to_row(dish, dish_nutrition_id)
            })?;

            let mut cross_refs = Vec::with_capacity(dish.products.len());
            for product in &dish.products {
                let nutrition_id = product
                    .nutrition
                    .map(|nutrition| nutrition_dao.insert(&fresh_nutrition_row(&nutrition)))
                    .transpose()?;
                let product_id = product_dao.insert(&ProductRow {
                    id: UNSET_ID,
                    ..adapter::product_to_row(product, nutrition_id)
                })?;
                cross_refs.push(DishProductCrossRef::new(dish_id, product_id));
            }
            dish_dao.insert_cross_refs(&cross_refs)?;
            dish_id
        };

        tx.commit()?;
        debug!(
            "event=dish_insert module=repository status=committed dish_id={dish_id} product_count={}",
            dish.products.len()
        );
        Ok(dish_id)
    }

    /// Loads one fully populated dish, or `None` for an unknown id.
    pub fn get_dish_by_id(&self, dish_id: RowId) -> RepoResult<Option<Dish>> {
        let Some(composite) = self
            .dish_dao()
            .get_dish_with_products_and_nutrition(dish_id)?
        else {
            return Ok(None);
        };

        let product_ids = composite
            .products
            .iter()
            .map(|product| product.id)
            .collect::<Vec<_>>();
        let products_by_id = self.fetch_products_by_ids(&product_ids)?;
        Ok(Some(adapter::assemble_dish(composite, &products_by_id)))
    }

    /// Lists dishes with id, name and photo only.
    pub fn get_all_dishes_simple(&self) -> RepoResult<Vec<Dish>> {
        let rows = self.dish_dao().get_all_dishes_simple()?;
        Ok(rows.into_iter().map(adapter::dish_summary_from_row).collect())
    }

    /// Lists every dish fully populated with one composite read and one
    /// batch nutrition fetch over the union of referenced products.
    pub fn get_all_dishes_with_details(&self) -> RepoResult<Vec<Dish>> {
        let composites = self.dish_dao().get_all_dishes_with_products_and_nutrition()?;

        let product_ids = composites
            .iter()
            .flat_map(|composite| composite.products.iter().map(|product| product.id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let products_by_id = self.fetch_products_by_ids(&product_ids)?;

        Ok(composites
            .into_iter()
            .map(|composite| adapter::assemble_dish(composite, &products_by_id))
            .collect())
    }

    /// Deletes a dish; its nutrition and associations cascade, products stay.
    pub fn delete_dish_by_id(&mut self, dish_id: RowId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deleted = SqliteDishDao::new(&tx).delete_by_id(dish_id)?;
        if deleted == 0 {
            return Err(RepoError::DishNotFound(dish_id));
        }
        tx.commit()?;
        Ok(())
    }

    /// Rewrites a stored dish from its domain object.
    ///
    /// Nutrition and products carrying ids are updated in place, the rest are
    /// inserted. All previous associations are replaced by the incoming
    /// product list; an empty list clears them. Nutrition rows made
    /// unreachable by this update are reclaimed. Product rows are kept.
    ///
    /// A product updated in place may belong to other dishes too; their
    /// aggregates are recomputed in the same transaction. A product id may
    /// appear at most once in the list.
    pub fn update_dish(&mut self, dish: &Dish) -> RepoResult<()> {
        if dish.id == UNSET_ID {
            return Err(RepoError::InvalidArgument(
                "dish id is unset; cannot update".to_string(),
            ));
        }
        reject_duplicate_products(dish)?;
        let aggregate = resolve_aggregate(dish)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let nutrition_dao = SqliteNutritionDao::new(&tx);
            let product_dao = SqliteProductDao::new(&tx);
            let dish_dao = SqliteDishDao::new(&tx);

            let stored = dish_dao
                .get_by_id(dish.id)?
                .ok_or(RepoError::DishNotFound(dish.id))?;
            let mut unreachable_nutrition = Vec::new();

            let dish_nutrition_id = aggregate
                .map(|nutrition| upsert_nutrition(&nutrition_dao, &nutrition))
                .transpose()?;
            if stored.nutrition_id != dish_nutrition_id {
                unreachable_nutrition.extend(stored.nutrition_id);
            }

            dish_dao.update(&adapter::dish_to_row(dish, dish_nutrition_id))?;
            dish_dao.delete_cross_refs_by_dish_id(dish.id)?;

            let mut cross_refs = Vec::with_capacity(dish.products.len());
            let mut updated_product_ids = Vec::new();
            for product in &dish.products {
                let nutrition_id = product
                    .nutrition
                    .map(|nutrition| upsert_nutrition(&nutrition_dao, &nutrition))
                    .transpose()?;
                let product_id = if product.id == UNSET_ID {
                    product_dao.insert(&adapter::product_to_row(product, nutrition_id))?
                } else {
                    let previous = product_dao.get_by_id(product.id)?.ok_or_else(|| {
                        RepoError::InvalidArgument(format!(
                            "product {} does not exist",
                            product.id
                        ))
                    })?;
                    if previous.nutrition_id != nutrition_id {
                        unreachable_nutrition.extend(previous.nutrition_id);
                    }
                    product_dao.update(&adapter::product_to_row(product, nutrition_id))?;
                    updated_product_ids.push(product.id);
                    product.id
                };
                cross_refs.push(DishProductCrossRef::new(dish.id, product_id));
            }
            dish_dao.insert_cross_refs(&cross_refs)?;

            let refreshed = refresh_linked_aggregates(
                &dish_dao,
                &product_dao,
                &nutrition_dao,
                &updated_product_ids,
                dish.id,
            )?;
            if refreshed > 0 {
                debug!(
                    "event=dish_update module=repository status=linked_refreshed dish_id={} linked_dishes={refreshed}",
                    dish.id
                );
            }

            for nutrition_id in unreachable_nutrition {
                nutrition_dao.delete_if_unreferenced(nutrition_id)?;
            }
        }
        tx.commit()?;
        debug!(
            "event=dish_update module=repository status=committed dish_id={} product_count={}",
            dish.id,
            dish.products.len()
        );
        Ok(())
    }

    /// Loads one product with its per-100 g nutrition.
    pub fn get_product_by_id(&self, product_id: RowId) -> RepoResult<Option<Product>> {
        let item = self
            .product_dao()
            .get_product_with_nutrition_by_id(product_id)?;
        Ok(item.map(adapter::product_from_joined))
    }

    fn fetch_products_by_ids(
        &self,
        product_ids: &[RowId],
    ) -> RepoResult<HashMap<RowId, ProductWithNutrition>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let items = self
            .product_dao()
            .get_products_with_nutrition_by_ids(product_ids)?;
        Ok(items
            .into_iter()
            .map(|item| (item.product.id, item))
            .collect())
    }

    fn dish_dao(&self) -> SqliteDishDao<'_> {
        SqliteDishDao::new(&self.conn).with_stats(&self.stats)
    }

    fn product_dao(&self) -> SqliteProductDao<'_> {
        SqliteProductDao::new(&self.conn).with_stats(&self.stats)
    }
}

/// Aggregate to persist for `dish`: recomputed from its products when it has
/// any (keeping the caller's nutrition id), otherwise the caller's value.
fn resolve_aggregate(dish: &Dish) -> RepoResult<Option<Nutrition>> {
    if dish.products.is_empty() {
        return Ok(dish.nutrition);
    }
    let existing_id = dish.nutrition.map_or(UNSET_ID, |nutrition| nutrition.id);
    let computed = aggregate_products(&dish.products)?;
    Ok(Some(computed.with_id(existing_id)))
}

fn reject_duplicate_products(dish: &Dish) -> RepoResult<()> {
    let mut seen = HashSet::new();
    for product in dish.products.iter().filter(|p| p.id != UNSET_ID) {
        if !seen.insert(product.id) {
            return Err(RepoError::InvalidArgument(format!(
                "product {} is listed more than once",
                product.id
            )));
        }
    }
    Ok(())
}

/// Recomputes the stored aggregate of every dish other than `skip_dish_id`
/// that is associated with one of `product_ids`. Returns how many were refreshed.
fn refresh_linked_aggregates(
    dish_dao: &impl DishDao,
    product_dao: &impl ProductDao,
    nutrition_dao: &impl NutritionDao,
    product_ids: &[RowId],
    skip_dish_id: RowId,
) -> RepoResult<usize> {
    if product_ids.is_empty() {
        return Ok(0);
    }

    let mut refreshed = 0;
    for dish_id in dish_dao.get_dish_ids_by_product_ids(product_ids)? {
        if dish_id == skip_dish_id {
            continue;
        }
        let Some(row) = dish_dao.get_by_id(dish_id)? else {
            continue;
        };
        let linked_ids = dish_dao
            .get_cross_refs_by_dish_id(dish_id)?
            .into_iter()
            .map(|cross_ref| cross_ref.product_id)
            .collect::<Vec<_>>();
        let products = product_dao
            .get_products_with_nutrition_by_ids(&linked_ids)?
            .into_iter()
            .map(adapter::product_from_joined)
            .collect::<Vec<_>>();
        let computed = aggregate_products(&products)?;

        match row.nutrition_id {
            Some(nutrition_id) => {
                let nutrition_row = adapter::nutrition_to_row(&computed.with_id(nutrition_id));
                nutrition_dao.update(&nutrition_row)?;
            }
            None => {
                let nutrition_id = nutrition_dao.insert(&fresh_nutrition_row(&computed))?;
                dish_dao.update(&DishRow {
                    nutrition_id: Some(nutrition_id),
                    ..row
                })?;
            }
        }
        refreshed += 1;
    }
    Ok(refreshed)
}

fn fresh_nutrition_row(nutrition: &Nutrition) -> NutritionRow {
    NutritionRow {
        id: UNSET_ID,
        ..adapter::nutrition_to_row(nutrition)
    }
}

fn upsert_nutrition(dao: &impl NutritionDao, nutrition: &Nutrition) -> RepoResult<RowId> {
    if !nutrition.is_persisted() {
        return Ok(dao.insert(&adapter::nutrition_to_row(nutrition))?);
    }
    if !dao.update(&adapter::nutrition_to_row(nutrition))? {
        return Err(RepoError::InvalidArgument(format!(
            "nutrition {} does not exist",
            nutrition.id
        )));
    }
    Ok(nutrition.id)
}
