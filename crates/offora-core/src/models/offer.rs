use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{format_price, parse_price};

/// An offer as listed by `/api/offers/` and `/api/offers/{id}/`.
/// Store fields are flattened in by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub original_price: Option<String>,
    pub discounted_price: Option<String>,
    pub discount_percentage: Option<i32>,
    pub image: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub store: i64,
    pub store_name: Option<String>,
    pub store_address: Option<String>,
    pub store_logo: Option<String>,
    pub store_rating: Option<f64>,
    pub store_review_count: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub store_phone_number: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_favorited: bool,
}

impl Offer {
    /// Discount as shown on a card: the explicit percentage when present,
    /// otherwise derived from the two prices.
    pub fn effective_discount(&self) -> Option<i32> {
        if let Some(pct) = self.discount_percentage {
            return Some(pct);
        }
        let original = parse_price(self.original_price.as_deref()?)?;
        let discounted = parse_price(self.discounted_price.as_deref()?)?;
        if original <= 0.0 || discounted > original {
            return None;
        }
        Some((((original - discounted) / original) * 100.0).round() as i32)
    }

    pub fn price_display(&self) -> String {
        match (&self.original_price, &self.discounted_price) {
            (Some(original), Some(discounted)) => {
                format!("{} (was {})", format_price(discounted), format_price(original))
            }
            (None, Some(discounted)) => format_price(discounted),
            (Some(original), None) => format_price(original),
            (None, None) => "See store".to_string(),
        }
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }
}

/// Payload for creating or editing an offer. Image upload is not handled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OfferDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl OfferDraft {
    /// Reject drafts the backend would refuse anyway.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end <= start {
                return Err("end_time must be after start_time".to_string());
            }
        }
        if let Some(pct) = self.discount_percentage {
            if !(0..=100).contains(&pct) {
                return Err(format!("discount_percentage out of range: {}", pct));
            }
        }
        Ok(())
    }
}

/// Filters accepted by the offer list endpoint.
#[derive(Debug, Clone, Default)]
pub struct OfferQuery {
    pub search: Option<String>,
    pub category: Option<super::StoreCategory>,
    pub store: Option<i64>,
    pub near: Option<(f64, f64)>,
    pub page: Option<u32>,
}

/// Response of the favorite toggle endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteStatus {
    Favorited,
    Unfavorited,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FavoriteToggleResponse {
    pub status: FavoriteStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER_JSON: &str = r#"{
        "id": 12,
        "title": "Two pizzas for one",
        "description": "Weekdays only",
        "original_price": "499.00",
        "discounted_price": "249.50",
        "discount_percentage": null,
        "image": null,
        "start_time": "2026-10-01T10:00:00Z",
        "end_time": "2026-10-31T22:00:00Z",
        "store": 3,
        "store_name": "Slice House",
        "store_address": "MG Road",
        "store_logo": null,
        "store_rating": 4.5,
        "store_review_count": 12,
        "latitude": 12.97,
        "longitude": 77.59,
        "is_approved": true,
        "store_phone_number": "9999999999",
        "is_favorited": false
    }"#;

    #[test]
    fn test_parse_offer() {
        let offer: Offer = serde_json::from_str(OFFER_JSON).expect("parse offer");
        assert_eq!(offer.id, 12);
        assert_eq!(offer.store_name.as_deref(), Some("Slice House"));
        assert_eq!(offer.effective_discount(), Some(50));
        assert_eq!(offer.price_display(), "₹249.50 (was ₹499.00)");

        let inside = "2026-10-15T12:00:00Z".parse().expect("date");
        let after = "2026-11-01T00:00:00Z".parse().expect("date");
        assert!(offer.is_live_at(inside));
        assert!(!offer.is_live_at(after));
    }

    #[test]
    fn test_draft_validation_and_partial_body() {
        let draft = OfferDraft {
            title: Some("Happy hour".to_string()),
            discount_percentage: Some(120),
            ..Default::default()
        };
        assert!(draft.validate().is_err());

        let draft = OfferDraft {
            title: Some("Happy hour".to_string()),
            ..Default::default()
        };
        assert!(draft.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&draft).expect("serialize"),
            serde_json::json!({ "title": "Happy hour" })
        );
    }

    #[test]
    fn test_favorite_status() {
        let parsed: FavoriteToggleResponse =
            serde_json::from_str(r#"{"status":"unfavorited"}"#).expect("parse");
        assert_eq!(parsed.status, FavoriteStatus::Unfavorited);
    }
}
