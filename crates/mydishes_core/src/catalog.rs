//! Contract for the product catalog collaborator.
//!
//! Searching returns product shells (url, image, name). Nutrition arrives
//! through a second, per-product detail fetch as raw scraped text that is
//! parsed leniently. Catalog failures are opaque and never retried here.

use crate::calc::amount::parse_amount;
use crate::model::nutrition::Nutrition;
use crate::model::product::Product;
use log::warn;
use std::fmt::{Display, Formatter};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Any failure reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogError {
    message: String,
}

impl CatalogError {
    pub fn external(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "catalog failure: {}", self.message)
    }
}

impl std::error::Error for CatalogError {}

/// Per-100 g facts as scraped, e.g. `"12,5 г"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedNutrition {
    pub calories: String,
    pub protein: String,
    pub fat: String,
    pub carb: String,
}

impl ScrapedNutrition {
    pub fn to_nutrition(&self) -> Nutrition {
        Nutrition::new(
            parse_amount(&self.calories),
            parse_amount(&self.protein),
            parse_amount(&self.fat),
            parse_amount(&self.carb),
        )
    }
}

/// Source of catalog products.
pub trait ProductCatalog {
    /// Product shells matching `query`; nutrition is absent.
    fn search(&self, query: &str) -> CatalogResult<Vec<Product>>;

    /// Raw per-100 g facts for the product page at `product_url`.
    fn fetch_nutrition(&self, product_url: &str) -> CatalogResult<ScrapedNutrition>;
}

/// Fills `product.nutrition` from its catalog detail page.
pub fn populate_nutrition<C: ProductCatalog + ?Sized>(
    catalog: &C,
    mut product: Product,
) -> CatalogResult<Product> {
    let Some(url) = product.product_url.as_deref() else {
        return Err(CatalogError::external("product has no catalog url"));
    };
    let scraped = catalog.fetch_nutrition(url).map_err(|err| {
        warn!("event=catalog_fetch module=catalog status=error");
        err
    })?;
    product.nutrition = Some(scraped.to_nutrition());
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::{populate_nutrition, CatalogError, CatalogResult, ProductCatalog, ScrapedNutrition};
    use crate::model::product::Product;
    use std::cell::Cell;

    struct FakeCatalog {
        fetches: Cell<usize>,
        fail: bool,
    }

    impl ProductCatalog for FakeCatalog {
        fn search(&self, query: &str) -> CatalogResult<Vec<Product>> {
            Ok(vec![Product::new(
                format!("https://shop/{query}"),
                format!("https://shop/{query}.jpg"),
                query,
            )])
        }

        fn fetch_nutrition(&self, _product_url: &str) -> CatalogResult<ScrapedNutrition> {
            self.fetches.set(self.fetches.get() + 1);
            if self.fail {
                return Err(CatalogError::external("timeout"));
            }
            Ok(ScrapedNutrition {
                calories: "340 ккал".into(),
                protein: "7,0 г".into(),
                fat: "0,5 г".into(),
                carb: "n/a".into(),
            })
        }
    }

    #[test]
    fn search_then_detail_fetch_fills_nutrition() {
        let catalog = FakeCatalog {
            fetches: Cell::new(0),
            fail: false,
        };
        let shell = catalog.search("rice").unwrap().remove(0);
        assert!(shell.nutrition.is_none());

        let product = populate_nutrition(&catalog, shell).unwrap();
        let nutrition = product.nutrition.unwrap();
        assert_eq!(nutrition.calories, 340.0);
        assert_eq!(nutrition.protein, 7.0);
        assert_eq!(nutrition.fat, 0.5);
        assert_eq!(nutrition.carb, 0.0);
    }

    #[test]
    fn failures_are_passed_through_without_retry() {
        let catalog = FakeCatalog {
            fetches: Cell::new(0),
            fail: true,
        };
        let shell = catalog.search("rice").unwrap().remove(0);

        let err = populate_nutrition(&catalog, shell).unwrap_err();
        assert_eq!(err, CatalogError::external("timeout"));
        assert_eq!(catalog.fetches.get(), 1);
    }

    #[test]
    fn product_without_url_is_rejected() {
        let catalog = FakeCatalog {
            fetches: Cell::new(0),
            fail: false,
        };
        let mut shell = Product::new("u", "i", "n");
        shell.product_url = None;

        assert!(populate_nutrition(&catalog, shell).is_err());
        assert_eq!(catalog.fetches.get(), 0);
    }
}
