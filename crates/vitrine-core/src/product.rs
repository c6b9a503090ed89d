//! Product records served by the catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProductError {
    #[error("product name must not be empty")]
    EmptyName,
    #[error("price must be a non-negative number, got {0}")]
    InvalidPrice(f64),
    #[error("a 3D model reference is required")]
    MissingModel,
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// Unique identifier for a product
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Fixed set of catalog categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Furniture,
    Electronics,
    Fashion,
    Accessories,
    Toys,
    Sports,
    Home,
    Other,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 8] = [
        Category::Furniture,
        Category::Electronics,
        Category::Fashion,
        Category::Accessories,
        Category::Toys,
        Category::Sports,
        Category::Home,
        Category::Other,
    ];

    /// Wire name (lowercase)
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Furniture => "furniture",
            Category::Electronics => "electronics",
            Category::Fashion => "fashion",
            Category::Accessories => "accessories",
            Category::Toys => "toys",
            Category::Sports => "sports",
            Category::Home => "home",
            Category::Other => "other",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Furniture => "Furniture",
            Category::Electronics => "Electronics",
            Category::Fashion => "Fashion",
            Category::Accessories => "Accessories",
            Category::Toys => "Toys",
            Category::Sports => "Sports",
            Category::Home => "Home",
            Category::Other => "Other",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Other
    }
}

impl FromStr for Category {
    type Err = ProductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ProductError::UnknownCategory(s.to_string()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Animation metadata declared by the catalog for a product's model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationMeta {
    /// Clip names the catalog expects the asset to contain
    #[serde(default)]
    pub available: Vec<String>,
    /// Clip to start automatically, if any
    #[serde(default)]
    pub default_animation: Option<String>,
    /// Whether a clip should start playing as soon as the model loads
    #[serde(default)]
    pub auto_play: bool,
}

impl AnimationMeta {
    /// Declared default as a non-empty name
    pub fn declared_default(&self) -> Option<&str> {
        self.default_animation
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Free-form specification fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Specifications {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category: Category,
    #[serde(default)]
    pub images: Vec<String>,
    /// Reference to the 3D asset (path under the models directory or URL).
    /// Records written by other tools may lack it; see [`Product::model_ref`].
    #[serde(default)]
    pub model3d: String,
    #[serde(default)]
    pub animations: AnimationMeta,
    #[serde(default)]
    pub specifications: Specifications,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
}

fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Build a product from a validated draft
    pub fn from_draft(id: ProductId, draft: ProductDraft, created_at: DateTime<Utc>) -> Result<Self, ProductError> {
        let draft = draft.validate()?;
        Ok(Self {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            images: draft.images,
            model3d: draft.model3d,
            animations: draft.animations,
            specifications: draft.specifications,
            in_stock: draft.in_stock,
            created_at,
        })
    }

    /// Asset reference when present, `None` for blank references
    pub fn model_ref(&self) -> Option<&str> {
        let r = self.model3d.trim();
        (!r.is_empty()).then_some(r)
    }
}

/// Create/update payload for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub model3d: String,
    #[serde(default)]
    pub animations: AnimationMeta,
    #[serde(default)]
    pub specifications: Specifications,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

impl ProductDraft {
    /// Check invariants and normalize fields
    pub fn validate(mut self) -> Result<Self, ProductError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ProductError::EmptyName);
        }
        check_price(self.price)?;
        self.model3d = self.model3d.trim().to_string();
        if self.model3d.is_empty() {
            return Err(ProductError::MissingModel);
        }
        self.animations.default_animation = self.animations.declared_default().map(str::to_string);
        Ok(self)
    }
}

/// Prices must be finite and not negative
pub fn check_price(price: f64) -> Result<(), ProductError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ProductError::InvalidPrice(price));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "  Lounge Chair ".to_string(),
            description: "Walnut frame".to_string(),
            price: 349.0,
            category: Category::Furniture,
            images: vec!["/images/chair.jpg".to_string()],
            model3d: "chair.glb".to_string(),
            animations: AnimationMeta::default(),
            specifications: Specifications::default(),
            in_stock: true,
        }
    }

    #[test]
    fn test_validate_trims_name() {
        let d = draft().validate().unwrap();
        assert_eq!(d.name, "Lounge Chair");
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut d = draft();
        d.price = -1.0;
        assert_eq!(d.validate(), Err(ProductError::InvalidPrice(-1.0)));

        let mut d = draft();
        d.price = f64::NAN;
        assert!(matches!(d.validate(), Err(ProductError::InvalidPrice(_))));

        let mut d = draft();
        d.model3d = "   ".to_string();
        assert_eq!(d.validate(), Err(ProductError::MissingModel));

        let mut d = draft();
        d.name = String::new();
        assert_eq!(d.validate(), Err(ProductError::EmptyName));
    }

    #[test]
    fn test_empty_default_animation_becomes_none() {
        let mut d = draft();
        d.animations.default_animation = Some("  ".to_string());
        let d = d.validate().unwrap();
        assert_eq!(d.animations.default_animation, None);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Toys".parse::<Category>().unwrap(), Category::Toys);
        assert_eq!(
            "spaceships".parse::<Category>(),
            Err(ProductError::UnknownCategory("spaceships".to_string()))
        );
    }

    #[test]
    fn test_wire_field_names() {
        let product = Product::from_draft(ProductId::from("p1"), draft(), Utc::now()).unwrap();
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("model3d").is_some());
        assert!(json.get("inStock").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["category"], "furniture");
        assert!(json["animations"].get("autoPlay").is_some());
    }

    #[test]
    fn test_unknown_category_rejected_on_deserialize() {
        let json = r#"{"name":"x","price":1,"category":"spaceships","model3d":"a.glb"}"#;
        assert!(serde_json::from_str::<ProductDraft>(json).is_err());
    }
}
