//! Data models for wishlist items and the products they snapshot.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Ids written by other clients may be JSON numbers rather than strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleId {
    Text(String),
    Number(i64),
}

impl From<FlexibleId> for String {
    fn from(id: FlexibleId) -> Self {
        match id {
            FlexibleId::Text(id) => id,
            FlexibleId::Number(id) => id.to_string(),
        }
    }
}

/// Accept a string or an integer id and keep it as a string.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    FlexibleId::deserialize(deserializer).map(String::from)
}

/// A seller offer attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub seller: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    /// Discount in percent, when the seller advertises one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<u8>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

/// A catalog product as handed to the store by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub offers: Vec<Offer>,
    #[serde(default)]
    pub trending: bool,
    #[serde(default)]
    pub hot: bool,
    #[serde(default)]
    pub instant_delivery: bool,
}

/// A stored wishlist entry.
///
/// Product fields are a snapshot taken when the item was added; they are
/// never refreshed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    /// Local id until the remote mirror assigns one.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub offers: Vec<Offer>,
    #[serde(default)]
    pub trending: bool,
    #[serde(default)]
    pub hot: bool,
    #[serde(default)]
    pub instant_delivery: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

impl WishlistItem {
    /// Snapshot a product into a new wishlist entry.
    pub fn from_product(product: &Product, id: String, added_at: OffsetDateTime) -> Self {
        Self {
            id,
            product_id: product.id.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            platform: product.platform.clone(),
            region: product.region.clone(),
            category: product.category.clone(),
            rating: product.rating,
            review_count: product.review_count,
            description: product.description.clone(),
            offers: product.offers.clone(),
            trending: product.trending,
            hot: product.hot,
            instant_delivery: product.instant_delivery,
            added_at,
        }
    }

    /// Lowest-priced offer that is in stock, if any.
    pub fn best_offer(&self) -> Option<&Offer> {
        self.offers
            .iter()
            .filter(|offer| offer.in_stock)
            .min_by(|a, b| a.price.total_cmp(&b.price))
    }
}

/// Snapshot of the store as observed by subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistState {
    pub items: Vec<WishlistItem>,
    pub is_loading: bool,
}

impl WishlistState {
    pub fn contains(&self, product_id: &str) -> bool {
        self.position(product_id).is_some()
    }

    pub(crate) fn position(&self, product_id: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_id == product_id)
    }
}

/// Informational outcome of a wishlist mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

impl Notice {
    /// Text shown to the user, if the outcome is worth a toast.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Notice::Added => Some("Added to wishlist"),
            Notice::AlreadyPresent => Some("Already in wishlist"),
            Notice::Removed => Some("Removed from wishlist"),
            Notice::NotPresent => None,
        }
    }

    /// Stable integer code used across the C ABI.
    pub fn code(&self) -> i32 {
        match self {
            Notice::Added => 0,
            Notice::AlreadyPresent => 1,
            Notice::Removed => 2,
            Notice::NotPresent => 3,
        }
    }
}
