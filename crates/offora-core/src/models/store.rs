use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Offer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StoreCategory {
    Food,
    Grocery,
    Fashion,
    Salon,
    #[serde(other)]
    Other,
}

impl StoreCategory {
    pub const ALL: [StoreCategory; 5] = [
        StoreCategory::Food,
        StoreCategory::Grocery,
        StoreCategory::Fashion,
        StoreCategory::Salon,
        StoreCategory::Other,
    ];

    /// Wire value used in query strings (`?category=FOOD`).
    pub fn code(&self) -> &'static str {
        match self {
            StoreCategory::Food => "FOOD",
            StoreCategory::Grocery => "GROCERY",
            StoreCategory::Fashion => "FASHION",
            StoreCategory::Salon => "SALON",
            StoreCategory::Other => "OTHER",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StoreCategory::Food => "Food & Dining",
            StoreCategory::Grocery => "Grocery",
            StoreCategory::Fashion => "Fashion & Apparel",
            StoreCategory::Salon => "Salon & Spa",
            StoreCategory::Other => "Other",
        }
    }
}

impl fmt::Display for StoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for StoreCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreCategory::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown store category: {}", s))
    }
}

/// Store as returned by the list endpoint and favorite-shops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub category: StoreCategory,
    #[serde(default)]
    pub address: Option<String>,
    pub logo: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_favorited: bool,
}

impl Store {
    pub fn rating_display(&self) -> String {
        if self.review_count == 0 {
            "No reviews yet".to_string()
        } else {
            format!("{:.1} ({} reviews)", self.rating, self.review_count)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.is_active {
            return None;
        }
        self.end_date.map(|end| (end - now).num_days().max(0))
    }
}

/// The vendor's own store, with offers and subscription state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyStore {
    pub id: i64,
    pub name: String,
    pub category: StoreCategory,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub offers: Vec<Offer>,
    pub logo: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
    pub subscription: Option<Subscription>,
}

impl MyStore {
    pub fn has_active_subscription(&self) -> bool {
        self.subscription.as_ref().map(|s| s.is_active).unwrap_or(false)
    }

    pub fn pending_offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers.iter().filter(|o| !o.is_approved)
    }
}

/// Store fields a vendor can edit or submit at registration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<StoreCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Filters accepted by the store list endpoint.
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    pub search: Option<String>,
    pub category: Option<StoreCategory>,
    pub near: Option<(f64, f64)>,
    pub page: Option<u32>,
}
