//! Weighed catalog product.

use super::nutrition::Nutrition;
use super::{RowId, UNSET_ID};
use serde::{Deserialize, Serialize};

/// A catalog product as used inside one dish.
///
/// `mass` is the weight in grams this product contributes to the dish it is
/// attached to, so the same catalog item weighed twice is two products.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: RowId,
    /// Catalog page the product was scraped from.
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    pub name: Option<String>,
    /// Per-100 g facts. Absent until the catalog detail fetch fills it in.
    pub nutrition: Option<Nutrition>,
    /// Grams.
    pub mass: f64,
}

impl Product {
    /// Creates an unpersisted product shell as returned by catalog search.
    pub fn new(
        product_url: impl Into<String>,
        image_url: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: UNSET_ID,
            product_url: Some(product_url.into()),
            image_url: Some(image_url.into()),
            name: Some(name.into()),
            nutrition: None,
            mass: 0.0,
        }
    }

    /// Sets per-100 g nutrition facts.
    pub fn with_nutrition(mut self, nutrition: Nutrition) -> Self {
        self.nutrition = Some(nutrition);
        self
    }

    /// Sets the weighed mass in grams.
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }
}
