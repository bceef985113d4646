//! Caller-facing dish repository.
//!
//! # Responsibility
//! - Own the worker that owns the store, and expose every store operation in
//!   a blocking-future flavour and a callback flavour.
//!
//! # Invariants
//! - `READY` from construction until `shutdown` or drop, then `STOPPED`.
//! - Work submitted after `STOPPED` reports `WORKER_UNAVAILABLE`.
//!
//! # See also
//! - [`super::worker`] for ordering, cancellation and panic isolation.

use super::dish_store::DishStore;
use super::dispatch::Dispatcher;
use super::error::RepoResult;
use super::worker::{CancelHandle, PendingResult, SerializedWorker};
use crate::config::CoreConfig;
use crate::dao::{QueryStats, QueryStatsSnapshot};
use crate::db::open_db;
use crate::model::dish::Dish;
use crate::model::product::Product;
use crate::model::RowId;
use log::info;
use rusqlite::Connection;
use std::sync::Arc;

/// Serialized, asynchronous access to one dish store.
pub struct DishRepository {
    worker: SerializedWorker,
    stats: Arc<QueryStats>,
}

impl DishRepository {
    /// Opens (and migrates) the store at `config.db_path` and starts the worker.
    pub fn open(config: &CoreConfig) -> RepoResult<Self> {
        let conn = open_db(&config.db_path)?;
        let repository = Self::spawn(conn)?;
        info!("event=repo_open module=repository status=ok");
        Ok(repository)
    }

    /// Starts the worker over an already migrated connection.
    pub fn spawn(conn: Connection) -> RepoResult<Self> {
        let stats = Arc::new(QueryStats::default());
        let store = DishStore::with_stats(conn, Arc::clone(&stats))?;
        let worker = SerializedWorker::spawn(store)?;
        Ok(Self { worker, stats })
    }

    /// Query Layer call counts since start or the last reset.
    pub fn query_stats(&self) -> QueryStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_query_stats(&self) {
        self.stats.reset();
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Finishes queued work, then stops the worker. Idempotent.
    pub fn shutdown(&mut self) {
        self.worker.shutdown();
    }

    pub fn insert_dish_with_details(&self, dish: Dish) -> PendingResult<RowId> {
        self.worker
            .submit("dish_insert", move |store| store.insert_dish_with_details(&dish))
    }

    pub fn get_dish_by_id(&self, dish_id: RowId) -> PendingResult<Option<Dish>> {
        self.worker
            .submit("dish_get", move |store| store.get_dish_by_id(dish_id))
    }

    pub fn get_all_dishes_simple(&self) -> PendingResult<Vec<Dish>> {
        self.worker
            .submit("dish_list_simple", |store| store.get_all_dishes_simple())
    }

    pub fn get_all_dishes_with_details(&self) -> PendingResult<Vec<Dish>> {
        self.worker
            .submit("dish_list_details", |store| store.get_all_dishes_with_details())
    }

    /// Fails with `NOT_FOUND` when no dish has `dish_id`.
    pub fn delete_dish_by_id(&self, dish_id: RowId) -> PendingResult<()> {
        self.worker
            .submit("dish_delete", move |store| store.delete_dish_by_id(dish_id))
    }

    /// Fails with `INVALID_ARGUMENT` when `dish.id` is unset.
    pub fn update_dish(&self, dish: Dish) -> PendingResult<()> {
        self.worker
            .submit("dish_update", move |store| store.update_dish(&dish))
    }

    pub fn get_product_by_id(&self, product_id: RowId) -> PendingResult<Option<Product>> {
        self.worker
            .submit("product_get", move |store| store.get_product_by_id(product_id))
    }

    // ── Callback flavour ───────────────────────────────────────────

    pub fn insert_dish_with_details_with(
        &self,
        dish: Dish,
        dispatcher: Arc<dyn Dispatcher>,
        callback: impl FnOnce(RepoResult<RowId>) + Send + 'static,
    ) -> CancelHandle {
        self.worker.submit_with(
            "dish_insert",
            move |store| store.insert_dish_with_details(&dish),
            dispatcher,
            callback,
        )
    }

    pub fn get_dish_by_id_with(
        &self,
        dish_id: RowId,
        dispatcher: Arc<dyn Dispatcher>,
        callback: impl FnOnce(RepoResult<Option<Dish>>) + Send + 'static,
    ) -> CancelHandle {
        self.worker.submit_with(
            "dish_get",
            move |store| store.get_dish_by_id(dish_id),
            dispatcher,
            callback,
        )
    }

    pub fn get_all_dishes_simple_with(
        &self,
        dispatcher: Arc<dyn Dispatcher>,
        callback: impl FnOnce(RepoResult<Vec<Dish>>) + Send + 'static,
    ) -> CancelHandle {
        self.worker.submit_with(
            "dish_list_simple",
            |store| store.get_all_dishes_simple(),
            dispatcher,
            callback,
        )
    }

    pub fn get_all_dishes_with_details_with(
        &self,
        dispatcher: Arc<dyn Dispatcher>,
        callback: impl FnOnce(RepoResult<Vec<Dish>>) + Send + 'static,
    ) -> CancelHandle {
        self.worker.submit_with(
            "dish_list_details",
            |store| store.get_all_dishes_with_details(),
            dispatcher,
            callback,
        )
    }

    pub fn delete_dish_by_id_with(
        &self,
        dish_id: RowId,
        dispatcher: Arc<dyn Dispatcher>,
        callback: impl FnOnce(RepoResult<()>) + Send + 'static,
    ) -> CancelHandle {
        self.worker.submit_with(
            "dish_delete",
            move |store| store.delete_dish_by_id(dish_id),
            dispatcher,
            callback,
        )
    }

    pub fn update_dish_with(
        &self,
        dish: Dish,
        dispatcher: Arc<dyn Dispatcher>,
        callback: impl FnOnce(RepoResult<()>) + Send + 'static,
    ) -> CancelHandle {
        self.worker.submit_with(
            "dish_update",
            move |store| store.update_dish(&dish),
            dispatcher,
            callback,
        )
    }

    pub fn get_product_by_id_with(
        &self,
        product_id: RowId,
        dispatcher: Arc<dyn Dispatcher>,
        callback: impl FnOnce(RepoResult<Option<Product>>) + Send + 'static,
    ) -> CancelHandle {
        self.worker.submit_with(
            "product_get",
            move |store| store.get_product_by_id(product_id),
            dispatcher,
            callback,
        )
    }
}
