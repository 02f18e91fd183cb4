//! Static product catalog and quantity policy.
//!
//! Loaded once at startup, from a TOML file when configured:
//!
//! ```toml
//! [[product]]
//! key = "riesling"
//! name = "Riesling Kabinett"
//!
//! [[product]]
//! key = "gruender"
//! name = "Gründer-Edition"
//! founder = true
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

/// Quantity fields accept at most this many digits.
const MAX_QUANTITY_DIGITS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub key: String,
    #[serde(rename = "name")]
    pub display_name: String,
    /// Founder products are limited to one per order.
    #[serde(default)]
    pub founder: bool,
}

impl Product {
    pub fn new(key: &str, display_name: &str, founder: bool) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            founder,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog has no products")]
    Empty,
    #[error("duplicate product key `{0}`")]
    DuplicateKey(String),
    #[error("invalid product key `{0}` (use a-z, 0-9, '-' or '_', at most 32 chars)")]
    InvalidKey(String),
}

/// Why a quantity was refused. The `Display` text is shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("Unbekanntes Produkt `{0}`.")]
    UnknownProduct(String),
    #[error("Ungültige Menge für {product}: „{raw}“ ist keine positive ganze Zahl.")]
    NotPositive { product: String, raw: String },
    #[error("{product} ist auf 1 Stück pro Bestellung begrenzt (angefragt: {requested}).")]
    FounderLimit { product: String, requested: u32 },
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "product", default)]
    products: Vec<Product>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        if products.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for p in &products {
            if !valid_key(&p.key) {
                return Err(CatalogError::InvalidKey(p.key.clone()));
            }
            if !seen.insert(p.key.as_str()) {
                return Err(CatalogError::DuplicateKey(p.key.clone()));
            }
        }
        Ok(Self { products })
    }

    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        Self::new(file.products)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Catalog used when no file is configured.
    pub fn builtin() -> Self {
        Self {
            products: vec![
                Product::new("riesling", "Riesling Kabinett", false),
                Product::new("spaetburgunder", "Spätburgunder", false),
                Product::new("grauburgunder", "Grauburgunder", false),
                Product::new("rose", "Rosé", false),
                Product::new("gruender", "Gründer-Edition", true),
            ],
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.key == key)
    }

    /// Display name for a key, falling back to the key itself for products
    /// that have left the catalog since the order was placed.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map(|p| p.display_name.as_str()).unwrap_or(key)
    }

    /// Parse and check a quantity field for one product.
    pub fn check_quantity(&self, key: &str, raw: &str) -> Result<u32, QuantityError> {
        let product = self
            .get(key)
            .ok_or_else(|| QuantityError::UnknownProduct(key.to_string()))?;
        let trimmed = raw.trim();
        let not_positive = || QuantityError::NotPositive {
            product: product.display_name.clone(),
            raw: raw.to_string(),
        };
        if trimmed.is_empty()
            || trimmed.len() > MAX_QUANTITY_DIGITS
            || !trimmed.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(not_positive());
        }
        let quantity: u32 = trimmed.parse().map_err(|_| not_positive())?;
        if quantity == 0 {
            return Err(not_positive());
        }
        if product.founder && quantity != 1 {
            return Err(QuantityError::FounderLimit {
                product: product.display_name.clone(),
                requested: quantity,
            });
        }
        Ok(quantity)
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 32
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}
