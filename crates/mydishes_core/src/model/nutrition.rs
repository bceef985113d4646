//! Nutrition facts quadruple.

use super::{RowId, UNSET_ID};
use serde::{Deserialize, Serialize};

/// Calories/protein/fat/carb, either per 100 g of a product or the resolved
/// aggregate of a dish.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrition {
    /// Store id of the backing row, `0` when not persisted.
    #[serde(default)]
    pub id: RowId,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carb: f64,
}

impl Nutrition {
    /// Creates an unpersisted record.
    pub fn new(calories: f64, protein: f64, fat: f64, carb: f64) -> Self {
        Self {
            id: UNSET_ID,
            calories,
            protein,
            fat,
            carb,
        }
    }

    /// Returns a copy bound to the given store id.
    pub fn with_id(self, id: RowId) -> Self {
        Self { id, ..self }
    }

    /// Whether this record already has a backing row.
    pub fn is_persisted(&self) -> bool {
        self.id != UNSET_ID
    }

    /// Whether all four facts are finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.calories, self.protein, self.fat, self.carb]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0)
    }
}
