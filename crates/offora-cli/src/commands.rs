use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;

use offora_core::api::ApiClient;
use offora_core::config::Config;
use offora_core::models::{stars, NewReview, Offer, OfferQuery, StoreQuery};
use offora_core::utils::{format_date, format_phone, format_time_left, truncate_string};

/// Width of the title column in listings.
const TITLE_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: Option<String> },
    Logout,
    WhoAmI,
    Offers { search: Option<String> },
    Offer { id: i64 },
    Stores { search: Option<String> },
    Store { id: i64 },
    Favorite { offer_id: i64 },
    Favorites,
    Reviews { offer_id: i64 },
    Review { offer_id: i64, rating: u8, comment: String },
    MyStore,
    VendorReviews,
    Subscribe,
}

fn parse_id(arg: Option<&String>, what: &str) -> Result<i64> {
    let raw = arg.ok_or_else(|| anyhow!("Missing {}", what))?;
    raw.parse()
        .with_context(|| format!("Invalid {}: {}", what, raw))
}

fn joined(rest: &[String]) -> Option<String> {
    let text = rest.join(" ");
    (!text.trim().is_empty()).then_some(text)
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| anyhow!("Missing command"))?;

        Ok(match name.as_str() {
            "login" => Command::Login {
                username: rest.first().cloned(),
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "offers" => Command::Offers {
                search: joined(rest),
            },
            "offer" => Command::Offer {
                id: parse_id(rest.first(), "offer id")?,
            },
            "stores" => Command::Stores {
                search: joined(rest),
            },
            "store" => Command::Store {
                id: parse_id(rest.first(), "store id")?,
            },
            "favorite" => Command::Favorite {
                offer_id: parse_id(rest.first(), "offer id")?,
            },
            "favorites" => Command::Favorites,
            "reviews" => Command::Reviews {
                offer_id: parse_id(rest.first(), "offer id")?,
            },
            "review" => {
                let offer_id = parse_id(rest.first(), "offer id")?;
                let rating = rest
                    .get(1)
                    .ok_or_else(|| anyhow!("Missing rating"))?
                    .parse()
                    .context("Rating must be a number from 1 to 5")?;
                let comment = joined(rest.get(2..).unwrap_or_default())
                    .ok_or_else(|| anyhow!("Missing review text"))?;
                Command::Review {
                    offer_id,
                    rating,
                    comment,
                }
            }
            "my-store" => Command::MyStore,
            "vendor-reviews" => Command::VendorReviews,
            "subscribe" => Command::Subscribe,
            other => bail!("Unknown command: {}", other),
        })
    }
}

fn print_offer_row(offer: &Offer) {
    let discount = offer
        .effective_discount()
        .map(|pct| format!("-{}%", pct))
        .unwrap_or_default();
    println!(
        "{:>6}  {:<width$}  {:<18}  {:>5}  {}",
        offer.id,
        truncate_string(&offer.title, TITLE_WIDTH),
        truncate_string(offer.store_name.as_deref().unwrap_or("-"), 18),
        discount,
        format_time_left(&offer.end_time, Utc::now()),
        width = TITLE_WIDTH,
    );
}

fn require_vendor(api: &ApiClient) -> Result<()> {
    match api.session().current() {
        Some(principal) if principal.is_vendor => Ok(()),
        Some(_) => bail!("This command is only available to vendor accounts"),
        None => bail!("Not logged in. Run `offora login` first."),
    }
}

pub async fn run(command: Command, api: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { username } => {
            let username = match username.or_else(|| config.last_username.clone()) {
                Some(username) => username,
                None => bail!("Usage: offora login <username>"),
            };
            let password = rpassword::prompt_password(format!("Password for {}: ", username))
                .context("Failed to read password")?;

            let principal = api.login(&username, &password).await?;
            config.last_username = Some(username);
            config.save()?;
            println!("Logged in as {} ({})", principal.username, principal.role_display());
        }
        Command::Logout => {
            api.logout();
            println!("Logged out");
        }
        Command::WhoAmI => match api.session().current() {
            Some(principal) => {
                println!("{} ({})", principal.username, principal.role_display());
                if principal.is_expired() {
                    println!("Access token expired; it will be refreshed on the next request");
                } else {
                    println!("Access token valid for {}s", principal.seconds_until_expiry());
                }
            }
            None => println!("Not logged in"),
        },
        Command::Offers { search } => {
            let query = OfferQuery {
                search,
                ..Default::default()
            };
            let page = api.fetch_offers(&query).await?;
            println!("{} offers", page.count);
            page.results.iter().for_each(print_offer_row);
            if page.has_next() {
                println!("(more results available)");
            }
        }
        Command::Offer { id } => {
            let offer = api.fetch_offer(id).await?;
            println!("{}", offer.title);
            println!("  {}", offer.price_display());
            if let Some(store) = offer.store_name.as_deref() {
                println!("  at {} (store #{})", store, offer.store);
            }
            if let Some(phone) = offer.store_phone_number.as_deref().filter(|p| !p.is_empty()) {
                println!("  call {}", format_phone(phone));
            }
            println!(
                "  {} - {} ({})",
                format_date(&offer.start_time),
                format_date(&offer.end_time),
                format_time_left(&offer.end_time, Utc::now())
            );
            if offer.is_favorited {
                println!("  ♥ in your favorites");
            }
            if !offer.description.is_empty() {
                println!("\n{}", offer.description);
            }
        }
        Command::Stores { search } => {
            let query = StoreQuery {
                search,
                ..Default::default()
            };
            let page = api.fetch_stores(&query).await?;
            println!("{} stores", page.count);
            for store in &page.results {
                println!(
                    "{:>6}  {:<30}  {:<18}  {}",
                    store.id,
                    truncate_string(&store.name, 30),
                    store.category.display_name(),
                    store.rating_display()
                );
            }
        }
        Command::Store { id } => {
            let store = api.fetch_store(id).await?;
            let reviews = api.fetch_store_reviews(id).await?;
            println!("{} ({})", store.name, store.category.display_name());
            if let Some(address) = store.address.as_deref() {
                println!("  {}", address);
            }
            println!("  {}", store.rating_display());
            for review in reviews {
                println!(
                    "  {} {} - {}",
                    stars(review.rating),
                    review.user_username,
                    truncate_string(&review.comment, 60)
                );
            }
        }
        Command::Favorite { offer_id } => {
            let status = api.toggle_offer_favorite(offer_id).await?;
            println!("Offer {} is now {:?}", offer_id, status);
        }
        Command::Favorites => {
            let offers = api.fetch_favorite_offers(None).await?;
            if offers.is_empty() {
                println!("No favorite offers yet");
            }
            offers.iter().for_each(print_offer_row);
        }
        Command::Reviews { offer_id } => {
            let reviews = api.fetch_offer_reviews(offer_id).await?;
            if reviews.is_empty() {
                println!("No reviews yet");
            }
            for review in reviews {
                println!(
                    "{} {} ({}): {}",
                    stars(review.rating),
                    review.user_username,
                    format_date(&review.created_at),
                    review.comment
                );
            }
        }
        Command::Review {
            offer_id,
            rating,
            comment,
        } => {
            let review = NewReview::new(rating, comment).map_err(|e| anyhow!(e))?;
            let posted = api.post_offer_review(offer_id, &review).await?;
            println!("Posted review #{}", posted.id);
        }
        Command::MyStore => {
            require_vendor(api)?;
            let store = api.fetch_my_store().await?;
            println!("{} ({})", store.name, store.category.display_name());
            println!("  {}", store.address);
            match store.subscription.as_ref() {
                Some(sub) if sub.is_active => println!(
                    "  Subscription active, {} days left",
                    sub.days_remaining(Utc::now()).unwrap_or(0)
                ),
                _ => println!("  No active subscription (run `offora subscribe`)"),
            }
            let pending = store.pending_offers().count();
            println!("  {} offers, {} pending approval", store.offers.len(), pending);
            store.offers.iter().for_each(print_offer_row);
        }
        Command::VendorReviews => {
            require_vendor(api)?;
            let (shop, offers) =
                tokio::try_join!(api.fetch_my_shop_reviews(), api.fetch_my_offer_reviews())?;
            println!("Shop reviews ({}):", shop.len());
            for review in shop {
                println!("  {} {}: {}", stars(review.rating), review.user_username, review.comment);
            }
            println!("Offer reviews ({}):", offers.len());
            for review in offers {
                println!(
                    "  {} {} on {}: {}",
                    stars(review.rating),
                    review.user_username,
                    review.offer_title.as_deref().unwrap_or("?"),
                    review.comment
                );
            }
        }
        Command::Subscribe => {
            require_vendor(api)?;
            let order = api.create_subscription_order().await?;
            println!("Checkout order {} for {}", order.order_id, order.amount_display());
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
    }
    Ok(())
}
