//! Core library for the Offora local-deals marketplace client.
//!
//! - [`auth`]: session state, token storage and single-flight refresh
//! - [`api`]: the authenticated request pipeline and marketplace endpoints
//! - [`models`]: offers, stores, reviews and account payloads
//! - [`config`]: client configuration
//!
//! A typical client opens one [`auth::Session`] at startup and routes every
//! call through an [`api::ApiClient`] sharing it:
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use offora_core::{api::ApiClient, auth::Session, config::Config};
//!
//! let config = Config::load()?;
//! let session = Arc::new(Session::open(config.token_store()?));
//! let api = ApiClient::with_options(&config.api_base_url(), session, config.client_options())?;
//! api.login("meera", "secret").await?;
//! let offers = api.fetch_offers(&Default::default()).await?;
//! # let _ = offers;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;
