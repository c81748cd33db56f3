//! View models for the storefront shell.
//!
//! Navigation drawer, bottom navigation bar and the wishlist page are pure
//! functions of the current route and the store state, so UI code only has
//! to render what is returned here.

use crate::models::{WishlistItem, WishlistState};

/// Badges above this value are shown as `"99+"`.
pub const BADGE_CAP: usize = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTab {
    Home,
    Browse,
    Wishlist,
    Cart,
    Account,
}

impl NavTab {
    pub const ALL: [NavTab; 5] = [
        NavTab::Home,
        NavTab::Browse,
        NavTab::Wishlist,
        NavTab::Cart,
        NavTab::Account,
    ];

    pub fn route(&self) -> &'static str {
        match self {
            NavTab::Home => "/",
            NavTab::Browse => "/products",
            NavTab::Wishlist => "/wishlist",
            NavTab::Cart => "/cart",
            NavTab::Account => "/account",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NavTab::Home => "Home",
            NavTab::Browse => "Browse",
            NavTab::Wishlist => "Wishlist",
            NavTab::Cart => "Cart",
            NavTab::Account => "Account",
        }
    }
}

/// Counts shown next to navigation entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavBadges {
    pub wishlist: usize,
    pub cart: usize,
}

impl NavBadges {
    pub fn new(state: &WishlistState, cart: usize) -> Self {
        Self {
            wishlist: state.items.len(),
            cart,
        }
    }

    fn for_route(&self, route: &str) -> Option<String> {
        match route {
            "/wishlist" => badge_label(self.wishlist),
            "/cart" => badge_label(self.cart),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub route: &'static str,
    pub active: bool,
    pub badge: Option<String>,
}

impl NavItem {
    fn new(label: &'static str, route: &'static str, current: &str, badges: &NavBadges) -> Self {
        Self {
            label,
            route,
            active: route_matches(route, current),
            badge: badges.for_route(route),
        }
    }
}

/// `None` hides the badge.
pub fn badge_label(count: usize) -> Option<String> {
    match count {
        0 => None,
        n if n > BADGE_CAP => Some(format!("{}+", BADGE_CAP)),
        n => Some(n.to_string()),
    }
}

/// Whether `current` is inside the section rooted at `route`.
///
/// The root only matches itself; other routes match on a segment boundary, so
/// `/cart/checkout` is inside `/cart` but `/cartography` is not.
pub fn route_matches(route: &str, current: &str) -> bool {
    let current = current.split(['?', '#']).next().unwrap_or_default();
    let current = match current.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    if route == "/" {
        return current == "/";
    }
    current == route
        || current
            .strip_prefix(route)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Tabs of the bottom mobile navigation bar.
pub fn bottom_nav(current: &str, badges: &NavBadges) -> Vec<NavItem> {
    NavTab::ALL
        .iter()
        .map(|tab| NavItem::new(tab.label(), tab.route(), current, badges))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawerSection {
    pub title: &'static str,
    pub items: Vec<NavItem>,
}

/// Sections of the slide-out navigation drawer.
pub fn drawer_menu(current: &str, badges: &NavBadges, signed_in: bool) -> Vec<DrawerSection> {
    let shop = [
        ("Home", "/"),
        ("All products", "/products"),
        ("Trending", "/products/trending"),
        ("Gift cards", "/products/gift-cards"),
        ("Wishlist", "/wishlist"),
        ("Cart", "/cart"),
    ];
    let account: &[(&'static str, &'static str)] = if signed_in {
        &[("My account", "/account"), ("Orders", "/account/orders")]
    } else {
        &[("Sign in", "/login")]
    };

    let build = |entries: &[(&'static str, &'static str)]| {
        entries
            .iter()
            .map(|&(label, route)| NavItem::new(label, route, current, badges))
            .collect::<Vec<_>>()
    };

    vec![
        DrawerSection {
            title: "Shop",
            items: build(&shop[..]),
        },
        DrawerSection {
            title: "Account",
            items: build(account),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardBadge {
    Trending,
    Hot,
    InstantDelivery,
}

impl CardBadge {
    pub fn label(&self) -> &'static str {
        match self {
            CardBadge::Trending => "Trending",
            CardBadge::Hot => "Hot",
            CardBadge::InstantDelivery => "Instant delivery",
        }
    }
}

/// One tile on the wishlist page.
#[derive(Debug, Clone, PartialEq)]
pub struct WishlistCard {
    pub product_id: String,
    pub title: String,
    pub image: String,
    /// e.g. `"Steam · Global"`.
    pub subtitle: String,
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub discount: Option<String>,
    pub rating: String,
    pub badges: Vec<CardBadge>,
}

impl WishlistCard {
    pub fn from_item(item: &WishlistItem) -> Self {
        let subtitle = [item.platform.as_str(), item.region.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" · ");

        let best = item.best_offer();
        let mut badges = Vec::new();
        if item.trending {
            badges.push(CardBadge::Trending);
        }
        if item.hot {
            badges.push(CardBadge::Hot);
        }
        if item.instant_delivery {
            badges.push(CardBadge::InstantDelivery);
        }

        Self {
            product_id: item.product_id.clone(),
            title: item.name.clone(),
            image: item.image.clone(),
            subtitle,
            price: best.map(|offer| format_price(offer.price)),
            original_price: best
                .and_then(|offer| offer.original_price)
                .filter(|original| best.is_some_and(|offer| *original > offer.price))
                .map(format_price),
            discount: best
                .and_then(|offer| offer.discount)
                .filter(|percent| *percent > 0)
                .map(|percent| format!("-{}%", percent)),
            rating: format!("{:.1} ({})", item.rating, item.review_count),
            badges,
        }
    }
}

fn format_price(price: f64) -> String {
    format!("${:.2}", price)
}

#[derive(Debug, Clone, PartialEq)]
pub enum WishlistPage {
    Loading,
    Empty,
    Items {
        count_label: String,
        cards: Vec<WishlistCard>,
    },
}

impl WishlistPage {
    /// The spinner only replaces the page while there is nothing to show.
    pub fn from_state(state: &WishlistState) -> Self {
        if state.items.is_empty() {
            return if state.is_loading {
                WishlistPage::Loading
            } else {
                WishlistPage::Empty
            };
        }

        let count = state.items.len();
        WishlistPage::Items {
            count_label: if count == 1 {
                "1 item".to_string()
            } else {
                format!("{} items", count)
            },
            cards: state.items.iter().map(WishlistCard::from_item).collect(),
        }
    }
}
