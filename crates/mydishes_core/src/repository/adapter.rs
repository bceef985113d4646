//! Mapping between store rows and domain objects.
//!
//! # Invariants
//! - Domain id `0` maps to "no row" and back; nothing else is special-cased.
//! - Product order in an assembled dish follows the association order.

use crate::entity::{
    DishRow, DishWithProductsAndNutrition, NutritionRow, ProductRow, ProductWithNutrition,
};
use crate::model::dish::Dish;
use crate::model::nutrition::Nutrition;
use crate::model::product::Product;
use crate::model::RowId;
use std::collections::HashMap;

pub fn nutrition_to_row(nutrition: &Nutrition) -> NutritionRow {
    NutritionRow {
        id: nutrition.id,
        calories: nutrition.calories,
        protein: nutrition.protein,
        fat: nutrition.fat,
        carb: nutrition.carb,
    }
}

pub fn nutrition_from_row(row: NutritionRow) -> Nutrition {
    Nutrition {
        id: row.id,
        calories: row.calories,
        protein: row.protein,
        fat: row.fat,
        carb: row.carb,
    }
}

pub fn product_to_row(product: &Product, nutrition_id: Option<RowId>) -> ProductRow {
    ProductRow {
        id: product.id,
        product_url: product.product_url.clone(),
        image_url: product.image_url.clone(),
        name: product.name.clone(),
        nutrition_id,
        mass: product.mass,
    }
}

pub fn product_from_row(row: ProductRow, nutrition: Option<NutritionRow>) -> Product {
    Product {
        id: row.id,
        product_url: row.product_url,
        image_url: row.image_url,
        name: row.name,
        nutrition: nutrition.map(nutrition_from_row),
        mass: row.mass,
    }
}

pub fn product_from_joined(item: ProductWithNutrition) -> Product {
    product_from_row(item.product, item.nutrition)
}

pub fn dish_to_row(dish: &Dish, nutrition_id: Option<RowId>) -> DishRow {
    DishRow {
        id: dish.id,
        name: dish.name.clone(),
        photo_uri: dish.photo_uri.clone(),
        nutrition_id,
    }
}

/// Dish with only id, name and photo populated.
pub fn dish_summary_from_row(row: DishRow) -> Dish {
    Dish {
        id: row.id,
        name: row.name,
        photo_uri: row.photo_uri,
        nutrition: None,
        products: Vec::new(),
    }
}

/// Builds a full domain dish from a composite read and a batch of
/// product+nutrition rows keyed by product id.
///
/// A product shell missing from `products_by_id` keeps no nutrition.
pub fn assemble_dish(
    composite: DishWithProductsAndNutrition,
    products_by_id: &HashMap<RowId, ProductWithNutrition>,
) -> Dish {
    let products = composite
        .products
        .into_iter()
        .map(|shell| match products_by_id.get(&shell.id) {
            Some(joined) => product_from_joined(joined.clone()),
            None => product_from_row(shell, None),
        })
        .collect();

    Dish {
        id: composite.dish.id,
        name: composite.dish.name,
        photo_uri: composite.dish.photo_uri,
        nutrition: composite.dish_nutrition.map(nutrition_from_row),
        products,
    }
}

#[cfg(test)]
mod tests {
    use super::{assemble_dish, dish_to_row, product_to_row};
    use crate::entity::{
        DishRow, DishWithProductsAndNutrition, NutritionRow, ProductRow, ProductWithNutrition,
    };
    use crate::model::dish::Dish;
    use crate::model::product::Product;
    use std::collections::HashMap;

    #[test]
    fn assembled_products_keep_shell_order_and_merge_nutrition() {
        let shells = vec![
            ProductRow {
                id: 9,
                name: Some("second-inserted-first".to_string()),
                ..ProductRow::default()
            },
            ProductRow {
                id: 3,
                name: Some("no-nutrition".to_string()),
                ..ProductRow::default()
            },
        ];
        let composite = DishWithProductsAndNutrition {
            dish: DishRow {
                id: 1,
                name: Some("bowl".to_string()),
                photo_uri: None,
                nutrition_id: None,
            },
            dish_nutrition: None,
            products: shells.clone(),
        };
        let mut by_id = HashMap::new();
        by_id.insert(
            9,
            ProductWithNutrition {
                product: shells[0].clone(),
                nutrition: Some(NutritionRow {
                    id: 77,
                    calories: 10.0,
                    ..NutritionRow::default()
                }),
            },
        );

        let dish = assemble_dish(composite, &by_id);
        assert_eq!(dish.products.len(), 2);
        assert_eq!(dish.products[0].id, 9);
        assert_eq!(dish.products[0].nutrition.unwrap().id, 77);
        assert_eq!(dish.products[1].id, 3);
        assert!(dish.products[1].nutrition.is_none());
        assert!(dish.nutrition.is_none());
    }

    #[test]
    fn rows_carry_domain_fields_and_given_fk() {
        let product = Product::new("u", "i", "n").with_mass(12.5);
        let row = product_to_row(&product, Some(4));
        assert_eq!(row.nutrition_id, Some(4));
        assert_eq!(row.mass, 12.5);
        assert_eq!(row.product_url.as_deref(), Some("u"));

        let dish = Dish::new("d", Some("p".to_string()));
        let row = dish_to_row(&dish, None);
        assert_eq!(row.id, 0);
        assert_eq!(row.photo_uri.as_deref(), Some("p"));
        assert!(row.nutrition_id.is_none());
    }
}
