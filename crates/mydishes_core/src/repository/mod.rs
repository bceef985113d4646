//! Repository façade over the dish store.
//!
//! # Responsibility
//! - Translate domain dishes to rows and back.
//! - Run each multi-table operation as one transaction on a single worker.
//! - Deliver results as blocking futures or dispatched callbacks.
//!
//! # Invariants
//! - No two store operations run concurrently.
//! - Every failure reaches the caller as a [`RepoError`] with an [`ErrorKind`].
//!
//! # See also
//! - [`crate::dao`] for the SQL it composes.

mod adapter;
pub mod dish_repository;
pub mod dish_store;
pub mod dispatch;
pub mod error;
pub mod worker;

pub use dish_repository::DishRepository;
pub use dish_store::DishStore;
pub use dispatch::{
    dispatch_queue, DispatchQueue, DispatchTask, Dispatcher, InlineDispatcher, QueueDispatcher,
};
pub use error::{ErrorKind, RepoError, RepoResult};
pub use worker::{CancelHandle, PendingResult, SerializedWorker};
