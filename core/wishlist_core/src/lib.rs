//! Core library for the storefront wishlist.
//!
//! Copyright (C) 2025 Wishlist Core Contributors
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program. If not, see <https://www.gnu.org/licenses/>.
//!
//! Keeps a user's wishlist in SQLite-backed local storage and mirrors it to a
//! remote API while a user session is active. Local writes always win; the
//! remote copy is refreshed in the background.
//!
//! # Example
//!
//! ```no_run
//! use wishlist_core::{Notice, Product, WishlistConfig, WishlistStore};
//!
//! let store = WishlistStore::open(&WishlistConfig::default()).unwrap();
//!
//! let product = Product {
//!     id: "p1".to_string(),
//!     name: "Game A".to_string(),
//!     ..Default::default()
//! };
//!
//! assert_eq!(store.add_item(&product), Notice::Added);
//! assert!(store.is_in_wishlist("p1"));
//! assert_eq!(store.toggle_item(&product), Notice::Removed);
//! ```

mod clock;
mod config;
mod db;
mod error;
mod models;
mod remote;
mod storage;
mod store;

pub mod ffi;
pub mod view;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, RemoteConfig, WishlistConfig};
pub use db::Database;
pub use error::{RemoteError, StorageError, WishlistError};
pub use models::{Notice, Offer, Product, WishlistItem, WishlistState};
pub use remote::{HttpRemoteWishlist, RemoteWishlist};
pub use storage::{KeyValueStore, MemoryKeyValueStore, WishlistStorage};
pub use store::{WishlistStore, WishlistStoreBuilder};
