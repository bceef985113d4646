//! Composed dish.

use super::nutrition::Nutrition;
use super::product::Product;
use super::{RowId, UNSET_ID};
use crate::calc::aggregate::{aggregate_products, AggregateError};
use serde::{Deserialize, Serialize};

/// A named dish made of weighed products.
///
/// `nutrition` is the aggregate for the whole dish. It is derived from
/// `products` and is recomputed by the repository whenever products change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dish {
    #[serde(default)]
    pub id: RowId,
    pub name: Option<String>,
    pub photo_uri: Option<String>,
    pub nutrition: Option<Nutrition>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Dish {
    /// Creates an unpersisted dish without products.
    pub fn new(name: impl Into<String>, photo_uri: Option<String>) -> Self {
        Self {
            id: UNSET_ID,
            name: Some(name.into()),
            photo_uri,
            nutrition: None,
            products: Vec::new(),
        }
    }

    /// Builds a dish whose aggregate nutrition is computed from `products`.
    ///
    /// # Errors
    /// Fails like [`aggregate_products`] when the products cannot be aggregated.
    pub fn compose(
        name: impl Into<String>,
        photo_uri: Option<String>,
        products: Vec<Product>,
    ) -> Result<Self, AggregateError> {
        let nutrition = aggregate_products(&products)?;
        Ok(Self {
            id: UNSET_ID,
            name: Some(name.into()),
            photo_uri,
            nutrition: Some(nutrition),
            products,
        })
    }

    /// Lightweight copy used by list display: id, name and photo only.
    pub fn summary(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            photo_uri: self.photo_uri.clone(),
            nutrition: None,
            products: Vec::new(),
        }
    }

    /// Total weighed mass of all products, in grams.
    pub fn total_mass(&self) -> f64 {
        self.products.iter().map(|product| product.mass).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::Dish;
    use crate::calc::aggregate::AggregateError;
    use crate::model::nutrition::Nutrition;
    use crate::model::product::Product;

    #[test]
    fn compose_computes_aggregate_from_products() {
        let products = vec![
            Product::new("u/flour", "i/flour", "flour")
                .with_nutrition(Nutrition::new(340.0, 7.0, 0.5, 77.0))
                .with_mass(718.0),
            Product::new("u/chicken", "i/chicken", "chicken")
                .with_nutrition(Nutrition::new(147.0, 19.0, 4.0, 0.4))
                .with_mass(774.0),
        ];

        let dish = Dish::compose("pie", None, products).unwrap();
        let nutrition = dish.nutrition.unwrap();
        assert_eq!(nutrition.calories, 239.88);
        assert_eq!(dish.products.len(), 2);
        assert_eq!(dish.total_mass(), 1492.0);
    }

    #[test]
    fn compose_rejects_empty_product_list() {
        let err = Dish::compose("air", None, Vec::new()).unwrap_err();
        assert_eq!(err, AggregateError::EmptyInput);
    }

    #[test]
    fn summary_drops_nutrition_and_products() {
        let mut dish = Dish::new("soup", Some("content://photo/1".to_string()));
        dish.id = 3;
        dish.nutrition = Some(Nutrition::new(1.0, 1.0, 1.0, 1.0));
        dish.products.push(Product::new("u", "i", "n"));

        let summary = dish.summary();
        assert_eq!(summary.id, 3);
        assert_eq!(summary.name.as_deref(), Some("soup"));
        assert!(summary.nutrition.is_none());
        assert!(summary.products.is_empty());
    }
}
