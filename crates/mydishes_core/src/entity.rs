//! Persisted rows and relation read models.
//!
//! # Responsibility
//! - Mirror the four store tables one struct per table.
//! - Describe the joined shapes returned by composite DAO reads.
//!
//! # Invariants
//! - `id == 0` on a row means "let the store assign one".
//! - `nutrition_id == None` means "no nutrition yet" (stored as `NULL`).

use crate::model::RowId;

/// `nutrition` table row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NutritionRow {
    pub id: RowId,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carb: f64,
}

/// `products` table row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductRow {
    pub id: RowId,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    pub name: Option<String>,
    pub nutrition_id: Option<RowId>,
    pub mass: f64,
}

/// `dishes` table row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DishRow {
    pub id: RowId,
    pub name: Option<String>,
    pub photo_uri: Option<String>,
    pub nutrition_id: Option<RowId>,
}

/// `dish_product_cross_ref` table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DishProductCrossRef {
    pub dish_id: RowId,
    pub product_id: RowId,
}

impl DishProductCrossRef {
    pub fn new(dish_id: RowId, product_id: RowId) -> Self {
        Self {
            dish_id,
            product_id,
        }
    }
}

/// Dish row joined with its aggregate nutrition and product shells.
///
/// Product rows here do not carry their own nutrition; resolve it with a
/// batch `ProductDao::get_products_with_nutrition_by_ids` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DishWithProductsAndNutrition {
    pub dish: DishRow,
    pub dish_nutrition: Option<NutritionRow>,
    /// Ordered by association insertion.
    pub products: Vec<ProductRow>,
}

/// Product row joined with its per-100 g nutrition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductWithNutrition {
    pub product: ProductRow,
    pub nutrition: Option<NutritionRow>,
}
