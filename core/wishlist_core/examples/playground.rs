//! Interactive playground to try the wishlist API.
//!
//! Run with: cargo run -p wishlist_core --example playground
//!
//! Set `WISHLIST_API_BASE_URL` to also mirror changes to a remote API.

use wishlist_core::view::{bottom_nav, NavBadges, WishlistPage};
use wishlist_core::{Offer, Product, WishlistConfig, WishlistStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🎮 Wishlist Playground\n");

    let mut config = WishlistConfig::from_env()?;
    if std::env::var("WISHLIST_DB_PATH").is_err() {
        config.db_path = "/tmp/wishlist_playground.db".into();
        // Clean up previous runs
        let _ = std::fs::remove_file(&config.db_path);
    }

    println!("📂 Opening store at {:?}\n", config.db_path);
    let store = WishlistStore::open(&config)?;

    if config.remote.is_some() {
        println!("🔐 Signing in as demo-user...");
        store.establish_session("demo-user").await;
        println!("  {} item(s) after hydration\n", store.count());
    }

    println!("➕ Adding games...");
    let games = [
        ("elden-ring", "Elden Ring", 39.99, true),
        ("hades-2", "Hades II", 24.99, false),
        ("stardew", "Stardew Valley", 9.99, false),
    ];
    for (id, name, price, trending) in games {
        let product = Product {
            id: id.to_string(),
            name: name.to_string(),
            platform: "Steam".to_string(),
            region: "Global".to_string(),
            offers: vec![Offer {
                seller: "playground".to_string(),
                price,
                original_price: None,
                discount: None,
                in_stock: true,
            }],
            trending,
            instant_delivery: true,
            ..Default::default()
        };
        let notice = store.add_item(&product);
        println!("  ✓ {} ({})", name, notice.message().unwrap_or("unchanged"));
    }

    println!("\n🔁 Toggling Hades II...");
    let hades = Product {
        id: "hades-2".to_string(),
        name: "Hades II".to_string(),
        ..Default::default()
    };
    println!("  {}", store.toggle_item(&hades).message().unwrap_or("unchanged"));

    println!("\n🧭 Bottom navigation on /wishlist:");
    for tab in bottom_nav("/wishlist", &NavBadges::new(&store.state(), 0)) {
        let marker = if tab.active { "▶" } else { " " };
        let badge = tab.badge.map(|b| format!(" [{}]", b)).unwrap_or_default();
        println!("  {} {}{}", marker, tab.label, badge);
    }

    println!("\n📋 Wishlist page:");
    match WishlistPage::from_state(&store.state()) {
        WishlistPage::Loading => println!("  loading..."),
        WishlistPage::Empty => println!("  (empty)"),
        WishlistPage::Items { count_label, cards } => {
            println!("  {}", count_label);
            for card in cards {
                println!(
                    "    - {} | {} | {}",
                    card.title,
                    card.subtitle,
                    card.price.unwrap_or_else(|| "n/a".to_string())
                );
            }
        }
    }

    store.settle().await;

    println!("\n🧹 Clearing...");
    store.clear_all();
    println!("  {} item(s) left", store.count());

    println!("\n✨ Done!");
    Ok(())
}
