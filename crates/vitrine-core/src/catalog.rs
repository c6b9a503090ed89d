//! Product catalog document store
//!
//! Products are held in memory and written back to a single JSON file after
//! every mutation. The file holds a plain array of product documents so it
//! can be edited by hand or produced by other tools.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::product::{check_price, Category, Product, ProductDraft, ProductError, ProductId};

/// Largest page size a query may request
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("product not found: {0}")]
    NotFound(ProductId),
    #[error("invalid product: {0}")]
    Invalid(#[from] ProductError),
    #[error("invalid product at position {index}: {error}")]
    InvalidImport { index: usize, error: ProductError },
    #[error("catalog document {id} is invalid: {error}")]
    InvalidDocument { id: ProductId, error: ProductError },
}

/// Result ordering for catalog queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

/// Filters, ordering and paging for listing products
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductQuery {
    /// Case-insensitive substring matched against name, description and category
    pub search: Option<String>,
    pub category: Option<Category>,
    pub in_stock: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: SortOrder,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ProductQuery {
    fn matches(&self, product: &Product, needle: Option<&str>) -> bool {
        if let Some(category) = self.category {
            if product.category != category {
                return false;
            }
        }
        if let Some(in_stock) = self.in_stock {
            if product.in_stock != in_stock {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        match needle {
            Some(needle) => {
                product.name.to_lowercase().contains(needle)
                    || product.description.to_lowercase().contains(needle)
                    || product.category.as_str().contains(needle)
            }
            None => true,
        }
    }
}

/// Number of products in one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub label: String,
    pub count: usize,
}

/// The product collection and the file that backs it
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    products: HashMap<ProductId, Product>,
}

impl Catalog {
    /// Empty catalog that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            products: HashMap::new(),
        }
    }

    /// Load the catalog file, or start empty if it does not exist
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        if !path.exists() {
            info!(path = %path.display(), "Catalog file not found, starting empty");
            return Ok(Self::new(path));
        }

        let content = std::fs::read_to_string(&path)?;
        let documents: Vec<Product> = serde_json::from_str(&content)?;
        let products = documents
            .into_iter()
            .map(|p| match check_price(p.price) {
                Ok(()) => Ok((p.id.clone(), p)),
                Err(error) => Err(CatalogError::InvalidDocument { id: p.id, error }),
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        info!(path = %path.display(), products = products.len(), "Loaded catalog");
        Ok(Self { path, products })
    }

    /// Write all products to the backing file, oldest first
    pub fn save(&self) -> Result<(), CatalogError> {
        write_documents(&self.path, &self.products)
    }

    /// Persist a modified copy of the products and adopt it only once written
    fn commit(&mut self, staged: HashMap<ProductId, Product>) -> Result<(), CatalogError> {
        write_documents(&self.path, &staged)?;
        self.products = staged;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Validate and add a new product, then persist
    pub fn insert(&mut self, draft: ProductDraft) -> Result<Product, CatalogError> {
        let product = Product::from_draft(ProductId::generate(), draft, Utc::now())?;
        let mut staged = self.products.clone();
        staged.insert(product.id.clone(), product.clone());
        self.commit(staged)?;
        info!(product = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Replace a product's fields, keeping its id and creation time
    pub fn update(&mut self, id: &ProductId, draft: ProductDraft) -> Result<Product, CatalogError> {
        let created_at = self
            .products
            .get(id)
            .map(|p| p.created_at)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        let product = Product::from_draft(id.clone(), draft, created_at)?;
        let mut staged = self.products.clone();
        staged.insert(id.clone(), product.clone());
        self.commit(staged)?;
        info!(product = %id, "Product updated");
        Ok(product)
    }

    pub fn remove(&mut self, id: &ProductId) -> Result<Product, CatalogError> {
        let mut staged = self.products.clone();
        let product = staged
            .remove(id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        self.commit(staged)?;
        info!(product = %id, "Product removed");
        Ok(product)
    }

    /// Add many drafts at once; nothing is inserted if any draft is invalid
    pub fn import_drafts(&mut self, drafts: Vec<ProductDraft>) -> Result<Vec<Product>, CatalogError> {
        let now = Utc::now();
        let products = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                Product::from_draft(ProductId::generate(), draft, now)
                    .map_err(|error| CatalogError::InvalidImport { index, error })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut staged = self.products.clone();
        for product in &products {
            staged.insert(product.id.clone(), product.clone());
        }
        self.commit(staged)?;
        info!(count = products.len(), "Imported products");
        Ok(products)
    }

    /// Filter, sort and page the catalog
    pub fn query(&self, query: &ProductQuery) -> Vec<Product> {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matches: Vec<&Product> = self
            .products
            .values()
            .filter(|p| query.matches(p, needle.as_deref()))
            .collect();

        match query.sort {
            SortOrder::Newest => matches.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
            }),
            SortOrder::PriceAsc => matches.sort_by(|a, b| {
                a.price.total_cmp(&b.price).then_with(|| a.id.cmp(&b.id))
            }),
            SortOrder::PriceDesc => matches.sort_by(|a, b| {
                b.price.total_cmp(&a.price).then_with(|| a.id.cmp(&b.id))
            }),
            SortOrder::Name => matches.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }

        let limit = query.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
        matches
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Product count for every category, in display order
    pub fn category_counts(&self) -> Vec<CategoryCount> {
        Category::ALL
            .iter()
            .map(|&category| CategoryCount {
                category,
                label: category.label().to_string(),
                count: self.products.values().filter(|p| p.category == category).count(),
            })
            .collect()
    }
}

fn write_documents(path: &Path, products: &HashMap<ProductId, Product>) -> Result<(), CatalogError> {
    let mut documents: Vec<&Product> = products.values().collect();
    documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let content = serde_json::to_string_pretty(&documents)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    debug!(path = %path.display(), products = documents.len(), "Saved catalog");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{AnimationMeta, Specifications};

    fn draft(name: &str, price: f64, category: Category) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: format!("{} description", name),
            price,
            category,
            images: Vec::new(),
            model3d: format!("{}.glb", name.to_lowercase()),
            animations: AnimationMeta::default(),
            specifications: Specifications::default(),
            in_stock: true,
        }
    }

    fn sample(dir: &Path) -> Catalog {
        let mut catalog = Catalog::new(dir.join("products.json"));
        catalog.insert(draft("Sofa", 900.0, Category::Furniture)).unwrap();
        catalog.insert(draft("Robot", 59.0, Category::Toys)).unwrap();
        let mut lamp = draft("Lamp", 120.0, Category::Home);
        lamp.in_stock = false;
        catalog.insert(lamp).unwrap();
        catalog
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = sample(dir.path());

        let reloaded = Catalog::load_or_create(catalog.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.len(), 3);
        for product in catalog.query(&ProductQuery::default()) {
            assert_eq!(reloaded.get(&product.id), Some(&product));
        }
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load_or_create(dir.path().join("none.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_query_filters() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = sample(dir.path());

        let q = ProductQuery {
            search: Some("  ROB ".to_string()),
            ..Default::default()
        };
        let names: Vec<_> = catalog.query(&q).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Robot"]);

        let q = ProductQuery {
            in_stock: Some(true),
            sort: SortOrder::PriceAsc,
            ..Default::default()
        };
        let names: Vec<_> = catalog.query(&q).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Robot", "Sofa"]);

        let q = ProductQuery {
            category: Some(Category::Home),
            ..Default::default()
        };
        assert_eq!(catalog.query(&q).len(), 1);

        let q = ProductQuery {
            min_price: Some(100.0),
            max_price: Some(500.0),
            ..Default::default()
        };
        let names: Vec<_> = catalog.query(&q).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Lamp"]);
    }

    #[test]
    fn test_query_sort_and_paging() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = sample(dir.path());

        let q = ProductQuery {
            sort: SortOrder::Name,
            offset: 1,
            limit: Some(1),
            ..Default::default()
        };
        let names: Vec<_> = catalog.query(&q).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Robot"]);

        let q = ProductQuery {
            sort: SortOrder::PriceDesc,
            ..Default::default()
        };
        let names: Vec<_> = catalog.query(&q).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Sofa", "Lamp", "Robot"]);
    }

    #[test]
    fn test_update_keeps_identity() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = sample(dir.path());
        let original = catalog
            .query(&ProductQuery { search: Some("sofa".into()), ..Default::default() })
            .remove(0);

        let updated = catalog
            .update(&original.id, draft("Sofa XL", 1200.0, Category::Furniture))
            .unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.price, 1200.0);

        let missing = catalog.update(&ProductId::from("nope"), draft("X", 1.0, Category::Other));
        assert!(matches!(missing, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = sample(dir.path());
        let id = catalog.query(&ProductQuery::default())[0].id.clone();

        catalog.remove(&id).unwrap();
        assert!(catalog.get(&id).is_none());
        assert!(matches!(catalog.remove(&id), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(dir.path().join("products.json"));

        let mut bad = draft("Broken", 10.0, Category::Other);
        bad.model3d.clear();
        let result = catalog.import_drafts(vec![draft("Fine", 1.0, Category::Toys), bad]);
        assert!(matches!(
            result,
            Err(CatalogError::InvalidImport { index: 1, error: ProductError::MissingModel })
        ));
        assert!(catalog.is_empty());

        let imported = catalog
            .import_drafts(vec![draft("Fine", 1.0, Category::Toys)])
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_failed_save_leaves_catalog_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = sample(dir.path());
        let id = catalog.query(&ProductQuery::default())[0].id.clone();

        // A regular file where the parent directory should be makes every write fail
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();
        catalog.path = blocker.join("products.json");

        assert!(matches!(
            catalog.insert(draft("Chair", 80.0, Category::Furniture)),
            Err(CatalogError::IoError(_))
        ));
        assert_eq!(catalog.len(), 3);

        assert!(catalog.update(&id, draft("Renamed", 1.0, Category::Other)).is_err());
        assert_ne!(catalog.get(&id).unwrap().name, "Renamed");

        assert!(catalog.remove(&id).is_err());
        assert!(catalog.get(&id).is_some());

        assert!(catalog.import_drafts(vec![draft("Desk", 200.0, Category::Home)]).is_err());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_load_rejects_negative_price() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = sample(dir.path());
        let id = catalog.query(&ProductQuery::default())[0].id.clone();
        catalog.products.get_mut(&id).unwrap().price = -5.0;
        catalog.save().unwrap();

        let result = Catalog::load_or_create(catalog.path().to_path_buf());
        assert!(matches!(
            result,
            Err(CatalogError::InvalidDocument { id: bad, error: ProductError::InvalidPrice(_) }) if bad == id
        ));
    }

    #[test]
    fn test_category_counts() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = sample(dir.path());
        let counts = catalog.category_counts();

        assert_eq!(counts.len(), Category::ALL.len());
        assert_eq!(counts[0].category, Category::Furniture);
        assert_eq!(counts[0].count, 1);
        let toys = counts.iter().find(|c| c.category == Category::Toys).unwrap();
        assert_eq!(toys.count, 1);
        assert_eq!(toys.label, "Toys");
    }
}
