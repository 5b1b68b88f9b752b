//! Data models for marketplace entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `Offer`, `OfferDraft`: vendor deals and the create/edit payload
//! - `Store`, `MyStore`, `Subscription`: shops and the vendor's own store
//! - `OfferReview`, `ShopReview`, `NewReview`: ratings and comments
//! - Account types: registration forms and subscription checkout

pub mod account;
pub mod offer;
pub mod review;
pub mod store;

use serde::{Deserialize, Serialize};

pub use account::{
    CheckoutOrder, CheckoutPrefill, PaymentConfirmation, RegisteredAccount, Registration,
    VendorRegistration,
};
pub use offer::{FavoriteStatus, Offer, OfferDraft, OfferQuery};
pub use review::{average_rating, stars, NewReview, OfferReview, ShopReview};
pub use store::{MyStore, Store, StoreCategory, StoreDraft, StoreQuery, Subscription};

/// Page-number pagination envelope used by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Some list endpoints are unpaginated and return a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paged(Page<T>),
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Paged(page) => page.results,
            Listing::Plain(items) => items,
        }
    }
}
