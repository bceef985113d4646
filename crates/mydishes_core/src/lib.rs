//! Dish persistence and nutrition aggregation core for MyDishes.
//! Owns the store schema and every invariant about dishes and their products.

pub mod calc;
pub mod catalog;
pub mod config;
pub mod dao;
pub mod db;
pub mod entity;
pub mod logging;
pub mod model;
pub mod repository;

pub use calc::aggregate::{aggregate, aggregate_products, AggregateError};
pub use calc::amount::parse_amount;
pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::dish::Dish;
pub use model::nutrition::Nutrition;
pub use model::product::Product;
pub use model::{RowId, UNSET_ID};
pub use repository::{
    dispatch_queue, CancelHandle, DishRepository, Dispatcher, ErrorKind, InlineDispatcher,
    PendingResult, QueueDispatcher, RepoError, RepoResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
