//! Pure nutrition arithmetic.
//!
//! # Responsibility
//! - Combine per-100 g nutrition of weighed products into one record.
//! - Turn scraped nutrition text into numbers.
//!
//! # Invariants
//! - Functions here have no side effects and are safe from any thread.

pub mod aggregate;
pub mod amount;
