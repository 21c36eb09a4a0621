//! Product documents as stored in the content store.
//!
//! Only the fields the cart and checkout read are typed; everything else on
//! the document (brand, categories, stock, ...) is carried through untouched
//! in [`Product::extra`] so listing endpoints can return it verbatim.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;

/// A product snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Content store document id.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// URL slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<Slug>,
    /// Unit price in the currency's standard unit. Missing prices read as zero.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Percentage discount advertised for the product, if any.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount: Option<Decimal>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Product images, first one is the primary image.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRef>,
    /// Remaining document fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Create a product with just an id, name and price.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            slug: None,
            price,
            discount: None,
            description: None,
            images: Vec::new(),
            extra: Map::new(),
        }
    }

    /// The first image, if the product has any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ImageRef> {
        self.images.first()
    }
}

/// Document slug wrapper (`{ "current": "..." }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    pub current: String,
}

/// Weak or strong reference to another document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub reference: String,
}

/// An image field on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<Reference>,
    /// Hotspot, crop, `_key` and anything else the editor stored.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageRef {
    /// Create an image field pointing at an asset id.
    #[must_use]
    pub fn from_asset(asset_ref: impl Into<String>) -> Self {
        Self {
            asset: Some(Reference {
                reference: asset_ref.into(),
            }),
            extra: Map::new(),
        }
    }

    /// Parse the referenced asset id.
    #[must_use]
    pub fn asset(&self) -> Option<ImageAsset> {
        self.asset
            .as_ref()
            .and_then(|r| ImageAsset::parse(&r.reference))
    }
}

/// Parsed image asset id of the form `image-{id}-{width}x{height}-{format}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl ImageAsset {
    /// Parse an asset reference. Returns `None` for anything malformed.
    #[must_use]
    pub fn parse(reference: &str) -> Option<Self> {
        let rest = reference.strip_prefix("image-")?;
        let (rest, format) = rest.rsplit_once('-')?;
        let (id, dimensions) = rest.rsplit_once('-')?;
        let (width, height) = dimensions.split_once('x')?;

        if id.is_empty() || format.is_empty() {
            return None;
        }

        Some(Self {
            id: id.to_owned(),
            width: width.parse().ok()?,
            height: height.parse().ok()?,
            format: format.to_owned(),
        })
    }

    /// File name on the image CDN (`{id}-{w}x{h}.{format}`).
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}x{}.{}", self.id, self.width, self.height, self.format)
    }
}
