//! Marketplace endpoints: offers, stores, reviews, favorites and the
//! vendor dashboard. Every call goes through [`ApiClient::execute`].

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::models::offer::FavoriteToggleResponse;
use crate::models::{
    CheckoutOrder, FavoriteStatus, Listing, MyStore, NewReview, Offer, OfferDraft, OfferQuery,
    OfferReview, Page, PaymentConfirmation, RegisteredAccount, Registration, ShopReview, Store,
    StoreDraft, StoreQuery, VendorRegistration,
};

use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    // ===== Accounts =====

    pub async fn register(&self, form: &Registration) -> Result<RegisteredAccount> {
        let request = ApiRequest::post("/api/register/").anonymous().json(form)?;
        self.fetch_json(request)
            .await
            .context("Failed to register account")
    }

    pub async fn register_vendor(&self, form: &VendorRegistration) -> Result<RegisteredAccount> {
        let request = ApiRequest::post("/api/vendor/register/")
            .anonymous()
            .json(form)?;
        self.fetch_json(request)
            .await
            .context("Failed to register vendor")
    }

    // ===== Offers =====

    pub async fn fetch_offers(&self, query: &OfferQuery) -> Result<Page<Offer>> {
        let (lat, lon) = query.near.unzip();
        let request = ApiRequest::get("/api/offers/")
            .query_opt("search", query.search.as_deref().filter(|s| !s.is_empty()))
            .query_opt("store__category", query.category.map(|c| c.code()))
            .query_opt("store", query.store)
            .query_opt("lat", lat)
            .query_opt("lon", lon)
            .query_opt("page", query.page);

        let page: Page<Offer> = self
            .fetch_json(request)
            .await
            .context("Failed to fetch offers")?;
        debug!(count = page.count, returned = page.results.len(), "Fetched offers");
        Ok(page)
    }

    pub async fn fetch_offer(&self, offer_id: i64) -> Result<Offer> {
        self.fetch_json(ApiRequest::get(format!("/api/offers/{}/", offer_id)))
            .await
            .with_context(|| format!("Failed to fetch offer {}", offer_id))
    }

    pub async fn fetch_offer_reviews(&self, offer_id: i64) -> Result<Vec<OfferReview>> {
        let listing: Listing<OfferReview> = self
            .fetch_json(ApiRequest::get(format!("/api/offers/{}/reviews/", offer_id)))
            .await
            .with_context(|| format!("Failed to fetch reviews for offer {}", offer_id))?;
        Ok(listing.into_vec())
    }

    pub async fn post_offer_review(
        &self,
        offer_id: i64,
        review: &NewReview,
    ) -> Result<OfferReview> {
        review.validate().map_err(ApiError::InvalidRequest)?;
        let request =
            ApiRequest::post(format!("/api/offers/{}/reviews/", offer_id)).json(review)?;
        self.fetch_json(request)
            .await
            .with_context(|| format!("Failed to review offer {}", offer_id))
    }

    pub async fn toggle_offer_favorite(&self, offer_id: i64) -> Result<FavoriteStatus> {
        let response: FavoriteToggleResponse = self
            .fetch_json(ApiRequest::post(format!("/api/offers/{}/favorite/", offer_id)))
            .await
            .with_context(|| format!("Failed to toggle favorite for offer {}", offer_id))?;
        info!(offer_id, status = ?response.status, "Toggled offer favorite");
        Ok(response.status)
    }

    pub async fn fetch_favorite_offers(&self, page: Option<u32>) -> Result<Vec<Offer>> {
        let listing: Listing<Offer> = self
            .fetch_json(ApiRequest::get("/api/favorites/").query_opt("page", page))
            .await
            .context("Failed to fetch favorite offers")?;
        Ok(listing.into_vec())
    }

    // ===== Stores =====

    pub async fn fetch_stores(&self, query: &StoreQuery) -> Result<Page<Store>> {
        let (lat, lon) = query.near.unzip();
        let request = ApiRequest::get("/api/stores/")
            .query_opt("search", query.search.as_deref().filter(|s| !s.is_empty()))
            .query_opt("category", query.category.map(|c| c.code()))
            .query_opt("lat", lat)
            .query_opt("lon", lon)
            .query_opt("page", query.page);

        self.fetch_json(request)
            .await
            .context("Failed to fetch stores")
    }

    pub async fn fetch_store(&self, store_id: i64) -> Result<Store> {
        self.fetch_json(ApiRequest::get(format!("/api/stores/{}/", store_id)))
            .await
            .with_context(|| format!("Failed to fetch store {}", store_id))
    }

    pub async fn fetch_store_reviews(&self, store_id: i64) -> Result<Vec<ShopReview>> {
        let listing: Listing<ShopReview> = self
            .fetch_json(ApiRequest::get(format!("/api/stores/{}/reviews/", store_id)))
            .await
            .with_context(|| format!("Failed to fetch reviews for store {}", store_id))?;
        Ok(listing.into_vec())
    }

    pub async fn post_store_review(
        &self,
        store_id: i64,
        review: &NewReview,
    ) -> Result<ShopReview> {
        review.validate().map_err(ApiError::InvalidRequest)?;
        let request =
            ApiRequest::post(format!("/api/stores/{}/reviews/", store_id)).json(review)?;
        self.fetch_json(request)
            .await
            .with_context(|| format!("Failed to review store {}", store_id))
    }

    pub async fn toggle_store_favorite(&self, store_id: i64) -> Result<FavoriteStatus> {
        let response: FavoriteToggleResponse = self
            .fetch_json(ApiRequest::post(format!("/api/stores/{}/favorite/", store_id)))
            .await
            .with_context(|| format!("Failed to toggle favorite for store {}", store_id))?;
        info!(store_id, status = ?response.status, "Toggled store favorite");
        Ok(response.status)
    }

    pub async fn fetch_favorite_stores(&self) -> Result<Vec<Store>> {
        let listing: Listing<Store> = self
            .fetch_json(ApiRequest::get("/api/favorite-shops/"))
            .await
            .context("Failed to fetch favorite stores")?;
        Ok(listing.into_vec())
    }

    // ===== Vendor =====

    pub async fn fetch_my_store(&self) -> Result<MyStore> {
        self.fetch_json(ApiRequest::get("/api/vendor/my-store/"))
            .await
            .context("Failed to fetch vendor store")
    }

    pub async fn update_my_store(&self, changes: &StoreDraft) -> Result<MyStore> {
        let request = ApiRequest::patch("/api/vendor/my-store/update/").json(changes)?;
        self.fetch_json(request)
            .await
            .context("Failed to update vendor store")
    }

    pub async fn create_offer(&self, draft: &OfferDraft) -> Result<Offer> {
        draft.validate().map_err(ApiError::InvalidRequest)?;
        let request = ApiRequest::post("/api/vendor/offers/create/").json(draft)?;
        let offer: Offer = self
            .fetch_json(request)
            .await
            .context("Failed to create offer")?;
        info!(offer_id = offer.id, "Created offer");
        Ok(offer)
    }

    pub async fn update_offer(&self, offer_id: i64, draft: &OfferDraft) -> Result<Offer> {
        draft.validate().map_err(ApiError::InvalidRequest)?;
        let request =
            ApiRequest::patch(format!("/api/vendor/offers/{}/update/", offer_id)).json(draft)?;
        self.fetch_json(request)
            .await
            .with_context(|| format!("Failed to update offer {}", offer_id))
    }

    pub async fn delete_offer(&self, offer_id: i64) -> Result<()> {
        self.fetch_empty(ApiRequest::delete(format!(
            "/api/vendor/offers/{}/delete/",
            offer_id
        )))
        .await
        .with_context(|| format!("Failed to delete offer {}", offer_id))?;
        info!(offer_id, "Deleted offer");
        Ok(())
    }

    pub async fn fetch_my_shop_reviews(&self) -> Result<Vec<ShopReview>> {
        let listing: Listing<ShopReview> = self
            .fetch_json(ApiRequest::get("/api/vendor/shop-reviews/"))
            .await
            .context("Failed to fetch shop reviews")?;
        Ok(listing.into_vec())
    }

    pub async fn fetch_my_offer_reviews(&self) -> Result<Vec<OfferReview>> {
        let listing: Listing<OfferReview> = self
            .fetch_json(ApiRequest::get("/api/vendor/offer-reviews/"))
            .await
            .context("Failed to fetch offer reviews")?;
        Ok(listing.into_vec())
    }

    // ===== Subscription =====

    pub async fn create_subscription_order(&self) -> Result<CheckoutOrder> {
        self.fetch_json(ApiRequest::post("/api/vendor/subscription/create/"))
            .await
            .context("Failed to create subscription order")
    }

    pub async fn verify_payment(&self, confirmation: &PaymentConfirmation) -> Result<MyStore> {
        let request = ApiRequest::post("/api/vendor/subscription/verify/").json(confirmation)?;
        let store: MyStore = self
            .fetch_json(request)
            .await
            .context("Failed to verify subscription payment")?;
        info!(store_id = store.id, active = store.has_active_subscription(), "Payment verified");
        Ok(store)
    }
}
