//! Domain objects shared with display and scraping collaborators.
//!
//! # Responsibility
//! - Define the in-memory `Dish`/`Product`/`Nutrition` shapes callers work with.
//! - Keep persistence details (foreign keys, cross-references) out of them.
//!
//! # Invariants
//! - Id `0` means "not persisted yet" for every domain object.
//! - Equality is value-based over all fields, ids included.

pub mod dish;
pub mod nutrition;
pub mod product;

/// Surrogate row identity assigned by the store. `0` means unset.
pub type RowId = i64;

/// Sentinel id for objects that have not been persisted.
pub const UNSET_ID: RowId = 0;
