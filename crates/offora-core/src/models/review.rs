use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest and highest star rating the backend accepts.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Review left on an offer. `offer_title` is filled in on vendor listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferReview {
    pub id: i64,
    pub user_username: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub offer_title: Option<String>,
}

/// Review left on a shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopReview {
    pub id: i64,
    pub user_username: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    pub fn new(rating: u8, comment: impl Into<String>) -> Result<Self, String> {
        let review = Self {
            rating,
            comment: comment.into(),
        };
        review.validate()?;
        Ok(review)
    }

    /// Check the rating range and that the comment is not blank.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(format!(
                "rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, self.rating
            ));
        }
        if self.comment.trim().is_empty() {
            return Err("comment must not be empty".to_string());
        }
        Ok(())
    }
}

/// Star string for a 1..=5 rating, e.g. `★★★☆☆`.
pub fn stars(rating: u8) -> String {
    let filled = rating.min(MAX_RATING) as usize;
    format!(
        "{}{}",
        "★".repeat(filled),
        "☆".repeat(MAX_RATING as usize - filled)
    )
}

/// Mean rating across reviews, `None` when there are none.
pub fn average_rating<'a>(ratings: impl IntoIterator<Item = &'a u8>) -> Option<f64> {
    let (sum, count) = ratings
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), r| (sum + *r as u32, count + 1));
    (count > 0).then(|| sum as f64 / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_review_validation() {
        assert!(NewReview::new(0, "meh").is_err());
        assert!(NewReview::new(6, "wow").is_err());
        assert!(NewReview::new(4, "   ").is_err());
        let review = NewReview::new(5, "Great deal").expect("valid");
        assert_eq!(review.rating, 5);

        // Struct literals bypass `new`; `validate` still catches them
        let literal = NewReview {
            rating: 9,
            comment: String::new(),
        };
        assert!(literal.validate().is_err());
        assert!(review.validate().is_ok());
    }

    #[test]
    fn test_stars_and_average() {
        assert_eq!(stars(3), "★★★☆☆");
        assert_eq!(stars(9), "★★★★★");

        let reviews: Vec<OfferReview> = serde_json::from_str(
            r#"[
                {"id": 1, "user_username": "a", "rating": 5, "comment": "x",
                 "created_at": "2026-10-01T00:00:00Z", "offer_title": "Pizza"},
                {"id": 2, "user_username": "b", "rating": 2, "comment": "y",
                 "created_at": "2026-10-02T00:00:00Z"}
            ]"#,
        )
        .expect("parse");
        assert_eq!(reviews[0].offer_title.as_deref(), Some("Pizza"));
        assert_eq!(average_rating(reviews.iter().map(|r| &r.rating)), Some(3.5));
        assert_eq!(average_rating(std::iter::empty()), None);
    }
}
