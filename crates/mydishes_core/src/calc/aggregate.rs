//! Mass-weighted nutrition aggregation.
//!
//! # Invariants
//! - Output is nutrition per 100 g of the combined mixture, not the absolute
//!   total of the dish.
//! - Every output field is rounded half away from zero to 2 decimals.

use crate::model::nutrition::Nutrition;
use crate::model::product::Product;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected aggregation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateError {
    /// No items were supplied.
    EmptyInput,
    /// Item at `index` carries no nutrition facts.
    MissingNutrition { index: usize },
    /// Item at `index` has a negative or non-finite mass.
    InvalidMass { index: usize },
    /// Masses sum to zero.
    ZeroTotalMass,
}

impl Display for AggregateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "cannot aggregate an empty product set"),
            Self::MissingNutrition { index } => {
                write!(f, "product at index {index} has no nutrition facts")
            }
            Self::InvalidMass { index } => {
                write!(f, "product at index {index} has an invalid mass")
            }
            Self::ZeroTotalMass => write!(f, "total product mass must be greater than zero"),
        }
    }
}

impl Error for AggregateError {}

/// Aggregates `(per-100 g nutrition, mass in grams)` pairs.
///
/// `result.field = 100 * sum(field_i * mass_i / 100) / sum(mass_i)`.
pub fn aggregate(items: &[(Option<Nutrition>, f64)]) -> Result<Nutrition, AggregateError> {
    if items.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let mut total = Nutrition::default();
    let mut total_mass = 0.0;
    for (index, (nutrition, mass)) in items.iter().enumerate() {
        let nutrition = nutrition.ok_or(AggregateError::MissingNutrition { index })?;
        if !mass.is_finite() || *mass < 0.0 {
            return Err(AggregateError::InvalidMass { index });
        }

        let scale = mass / 100.0;
        total.calories += nutrition.calories * scale;
        total.protein += nutrition.protein * scale;
        total.fat += nutrition.fat * scale;
        total.carb += nutrition.carb * scale;
        total_mass += mass;
    }

    if total_mass <= 0.0 {
        return Err(AggregateError::ZeroTotalMass);
    }

    let per_100g = total_mass / 100.0;
    Ok(Nutrition::new(
        round_hundredths(total.calories / per_100g),
        round_hundredths(total.protein / per_100g),
        round_hundredths(total.fat / per_100g),
        round_hundredths(total.carb / per_100g),
    ))
}

/// Aggregates the per-100 g nutrition of weighed products.
pub fn aggregate_products(products: &[Product]) -> Result<Nutrition, AggregateError> {
    let items = products
        .iter()
        .map(|product| (product.nutrition, product.mass))
        .collect::<Vec<_>>();
    aggregate(&items)
}

/// Rounds to 2 decimals, ties away from zero.
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
