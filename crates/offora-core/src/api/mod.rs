//! REST API client module for the Offora marketplace backend.
//!
//! This module provides the `ApiClient`, which routes every call through
//! the authenticated request pipeline, plus typed methods for offers,
//! stores, reviews, favorites and the vendor dashboard.
//!
//! The API uses JWT bearer authentication; expired access tokens are
//! refreshed transparently and the call is retried once.

pub mod client;
pub mod error;
pub mod marketplace;
pub mod request;

pub use client::{ApiClient, ClientOptions, DEFAULT_API_URL, DEFAULT_REFRESH_PATH};
pub use error::{is_unauthenticated, ApiError};
pub use request::{ApiRequest, Attempt};
