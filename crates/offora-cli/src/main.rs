//! Offora CLI - browse local deals and manage a vendor store from the terminal.
//!
//! All authenticated calls go through the shared session, so an expired
//! access token is refreshed transparently; if the session cannot be
//! refreshed the user is asked to log in again.

mod commands;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use offora_core::api::{is_unauthenticated, ApiClient};
use offora_core::auth::Session;
use offora_core::config::Config;

use commands::Command;

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

fn usage() -> &'static str {
    "Usage: offora <command> [args]

Commands:
  login [username]                 Log in (password is prompted)
  logout                           Forget the stored session
  whoami                           Show the logged-in account
  offers [search]                  List offers
  offer <id>                       Show one offer
  stores [search]                  List stores
  store <id>                       Show one store and its reviews
  favorite <offer-id>              Toggle an offer favorite
  favorites                        List favorite offers
  reviews <offer-id>               List reviews of an offer
  review <offer-id> <1-5> <text>   Review an offer
  my-store                         Show your store (vendors)
  vendor-reviews                   Reviews of your store and offers (vendors)
  subscribe                        Start a subscription checkout (vendors)"
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, usage());
            std::process::exit(2);
        }
    };

    let mut config = Config::load()?;
    let session = Arc::new(Session::open(config.token_store()?));
    let api = ApiClient::with_options(&config.api_base_url(), session, config.client_options())?;
    info!(api_url = api.base_url(), ?command, "Offora CLI starting");

    match commands::run(command, &api, &mut config).await {
        Ok(()) => Ok(()),
        Err(e) if is_unauthenticated(&e) => {
            eprintln!("Your session has expired. Run `offora login` to sign in again.");
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}
