//! End-to-end behaviour of the wishlist store against real storage and a
//! scripted remote mirror.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::tempdir;
use wishlist_core::{
    Database, KeyValueStore, MemoryKeyValueStore, Notice, Offer, Product, RemoteError,
    RemoteWishlist, WishlistItem, WishlistStorage, WishlistStore,
};

fn game(id: &str, name: &str) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        image: format!("https://cdn.example.com/{}.jpg", id),
        platform: "Steam".to_string(),
        region: "Global".to_string(),
        category: "RPG".to_string(),
        rating: 4.6,
        review_count: 312,
        description: "Open world adventure".to_string(),
        offers: vec![Offer {
            seller: "KeyHub".to_string(),
            price: 29.99,
            original_price: Some(59.99),
            discount: Some(50),
            in_stock: true,
        }],
        trending: true,
        hot: false,
        instant_delivery: true,
    }
}

/// Remote mirror that records calls and answers from a script.
#[derive(Default)]
struct FakeRemote {
    items: Mutex<Vec<WishlistItem>>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<u32>,
    fetch_delay: Duration,
    /// Per-user override of `fetch_delay`.
    user_delays: Vec<(&'static str, Duration)>,
    add_delay: Duration,
    fail_fetch: bool,
}

impl FakeRemote {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteWishlist for FakeRemote {
    async fn fetch_for_user(&self, user_id: &str) -> Result<Vec<WishlistItem>, RemoteError> {
        self.calls.lock().push(format!("fetch {}", user_id));
        let delay = self
            .user_delays
            .iter()
            .find(|(user, _)| *user == user_id)
            .map_or(self.fetch_delay, |(_, delay)| *delay);
        tokio::time::sleep(delay).await;
        if self.fail_fetch {
            return Err(RemoteError::Network("offline".to_string()));
        }
        Ok(self.items.lock().clone())
    }

    async fn add_item(&self, user_id: &str, item: &WishlistItem) -> Result<String, RemoteError> {
        self.calls
            .lock()
            .push(format!("add {} {}", user_id, item.product_id));
        tokio::time::sleep(self.add_delay).await;

        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("r-{}", next)
        };
        let mut stored = item.clone();
        stored.id = id.clone();
        self.items.lock().push(stored);
        Ok(id)
    }

    async fn remove_item(&self, remote_id: &str) -> Result<(), RemoteError> {
        self.calls.lock().push(format!("remove {}", remote_id));
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|item| item.id != remote_id);
        if items.len() == before {
            return Err(RemoteError::Server {
                status: 404,
                body: "not found".to_string(),
            });
        }
        Ok(())
    }
}

fn memory_storage() -> WishlistStorage {
    WishlistStorage::new(Arc::new(MemoryKeyValueStore::new()), "wishlist")
}

fn synced_store(storage: &WishlistStorage, remote: Arc<FakeRemote>) -> WishlistStore {
    WishlistStore::builder(storage.clone())
        .remote(remote)
        .build()
        .unwrap()
}

#[test]
fn test_add_on_empty_state() {
    let storage = memory_storage();
    let store = WishlistStore::builder(storage.clone()).build().unwrap();

    assert_eq!(store.add_item(&game("p1", "Game A")), Notice::Added);

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, "p1");
    assert_eq!(items[0].name, "Game A");
    assert_eq!(items[0].platform, "Steam");
    assert_eq!(items[0].offers[0].price, 29.99);
    assert!(items[0].instant_delivery);
    assert_eq!(storage.load(), items);
}

#[test]
fn test_add_twice_is_idempotent() {
    let store = WishlistStore::builder(memory_storage()).build().unwrap();

    store.add_item(&game("p1", "Game A"));
    let after_first = store.items();

    assert_eq!(store.add_item(&game("p1", "Renamed")), Notice::AlreadyPresent);
    assert_eq!(store.items(), after_first);
}

#[test]
fn test_add_then_remove_persists_empty_list() {
    let storage = memory_storage();
    let store = WishlistStore::builder(storage.clone()).build().unwrap();

    store.add_item(&game("p1", "Game A"));
    assert_eq!(store.remove_item("p1"), Notice::Removed);

    assert!(store.items().is_empty());
    assert_eq!(storage.raw().unwrap().as_deref(), Some("[]"));
}

#[test]
fn test_toggle_adds_then_removes() {
    let store = WishlistStore::builder(memory_storage()).build().unwrap();
    let product = game("p1", "Game A");

    assert_eq!(store.toggle_item(&product), Notice::Added);
    assert!(store.is_in_wishlist("p1"));

    assert_eq!(store.toggle_item(&product), Notice::Removed);
    assert!(!store.is_in_wishlist("p1"));
}

#[test]
fn test_clear_all_removes_payload() {
    let storage = memory_storage();
    let store = WishlistStore::builder(storage.clone()).build().unwrap();

    for (id, name) in [("p1", "A"), ("p2", "B"), ("p3", "C")] {
        store.add_item(&game(id, name));
    }
    assert_eq!(store.count(), 3);

    store.clear_all();
    assert!(store.items().is_empty());
    assert_eq!(storage.raw().unwrap(), None);
}

#[test]
fn test_insertion_order_is_preserved() {
    let store = WishlistStore::builder(memory_storage()).build().unwrap();

    for id in ["p3", "p1", "p2"] {
        store.add_item(&game(id, id));
    }
    store.remove_item("p1");
    store.add_item(&game("p1", "p1"));

    let order: Vec<_> = store.items().into_iter().map(|item| item.product_id).collect();
    assert_eq!(order, vec!["p3", "p2", "p1"]);
}

#[test]
fn test_random_sequences_keep_products_unique() {
    let store = WishlistStore::builder(memory_storage()).build().unwrap();
    let mut seed: u64 = 0x5eed;

    for _ in 0..500 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let product_id = format!("p{}", (seed >> 33) % 7);
        match (seed >> 40) % 3 {
            0 => {
                store.add_item(&game(&product_id, "Game"));
            }
            1 => {
                store.remove_item(&product_id);
            }
            _ => {
                store.toggle_item(&game(&product_id, "Game"));
            }
        }

        let mut ids: Vec<_> = store.items().into_iter().map(|item| item.product_id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}

#[test]
fn test_sqlite_round_trip_and_corruption() {
    let dir = tempdir().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("wishlist.db")).unwrap());
    let storage = WishlistStorage::new(db.clone(), "wishlist");

    let store = WishlistStore::builder(storage.clone()).build().unwrap();
    store.add_item(&game("p1", "Game A"));
    store.add_item(&game("p2", "Game B"));
    assert_eq!(storage.load(), store.items());

    db.set("wishlist", "[{\"id\":").unwrap();
    assert!(storage.load().is_empty());
    assert_eq!(db.get("wishlist").unwrap(), None);
    assert!(storage.load().is_empty());

    // A store started over the discarded payload begins empty
    let store = WishlistStore::builder(storage).build().unwrap();
    assert_eq!(store.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remote_add_patches_identifier() {
    let storage = memory_storage();
    let remote = Arc::new(FakeRemote::default());
    let store = synced_store(&storage, remote.clone());

    store.establish_session("u1").await;
    store.add_item(&game("p1", "Game A"));
    store.settle().await;

    let items = store.items();
    assert_eq!(items[0].id, "r-1");
    assert_eq!(storage.load()[0].id, "r-1");
    assert_eq!(remote.calls(), vec!["fetch u1", "add u1 p1"]);
}

#[tokio::test(start_paused = true)]
async fn test_remove_uses_remote_identifier() {
    let remote = Arc::new(FakeRemote::default());
    let store = synced_store(&memory_storage(), remote.clone());

    store.establish_session("u1").await;
    store.add_item(&game("p1", "Game A"));
    store.settle().await;

    store.remove_item("p1");
    store.settle().await;

    assert_eq!(remote.calls(), vec!["fetch u1", "add u1 p1", "remove r-1"]);
    assert!(remote.items.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_remove_during_slow_add_deletes_confirmed_record() {
    let storage = memory_storage();
    let remote = Arc::new(FakeRemote {
        add_delay: Duration::from_millis(500),
        ..Default::default()
    });
    let store = synced_store(&storage, remote.clone());

    store.establish_session("u1").await;
    store.add_item(&game("p1", "Game A"));
    store.remove_item("p1");
    assert!(store.items().is_empty());

    store.settle().await;

    // The remove waited for the add and targeted the server's id
    assert_eq!(remote.calls(), vec!["fetch u1", "add u1 p1", "remove r-1"]);
    assert!(remote.items.lock().is_empty());
    // The late add result did not resurrect or re-persist the item
    assert!(store.items().is_empty());
    assert_eq!(storage.raw().unwrap().as_deref(), Some("[]"));
}

#[tokio::test(start_paused = true)]
async fn test_session_hydration_replaces_local_items() {
    let storage = memory_storage();
    let remote = Arc::new(FakeRemote {
        fetch_delay: Duration::from_millis(200),
        ..Default::default()
    });
    {
        let mut server_item = WishlistItem::from_product(
            &game("p9", "Server Game"),
            "r-90".to_string(),
            time::OffsetDateTime::UNIX_EPOCH,
        );
        server_item.hot = true;
        remote.items.lock().push(server_item);
    }

    let store = synced_store(&storage, remote.clone());
    store.add_item(&game("p1", "Local Game"));

    let mut updates = store.subscribe();
    let session = {
        let store = store.clone();
        tokio::spawn(async move { store.establish_session("u1").await })
    };

    updates.changed().await.unwrap();
    assert!(updates.borrow_and_update().is_loading);

    session.await.unwrap();
    let state = store.state();
    assert!(!state.is_loading);
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].product_id, "p9");
    assert_eq!(state.items[0].id, "r-90");
    assert_eq!(storage.load(), state.items);
}

#[tokio::test(start_paused = true)]
async fn test_empty_remote_keeps_local_items() {
    let remote = Arc::new(FakeRemote::default());
    let store = synced_store(&memory_storage(), remote);

    store.add_item(&game("p1", "Local Game"));
    store.establish_session("u1").await;

    assert_eq!(store.count(), 1);
    assert!(!store.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_keeps_local_items() {
    let remote = Arc::new(FakeRemote {
        fail_fetch: true,
        ..Default::default()
    });
    let store = synced_store(&memory_storage(), remote);

    store.add_item(&game("p1", "Local Game"));
    store.establish_session("u1").await;

    assert_eq!(store.count(), 1);
    assert!(!store.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_stale_session_result_is_discarded() {
    let remote = Arc::new(FakeRemote {
        fetch_delay: Duration::from_millis(200),
        ..Default::default()
    });
    remote.items.lock().push(WishlistItem::from_product(
        &game("p9", "Server Game"),
        "r-90".to_string(),
        time::OffsetDateTime::UNIX_EPOCH,
    ));
    let store = synced_store(&memory_storage(), remote);
    store.add_item(&game("p1", "Local Game"));

    let mut updates = store.subscribe();
    let session = {
        let store = store.clone();
        tokio::spawn(async move { store.establish_session("u1").await })
    };
    // Sign out while the fetch is still in flight
    updates.changed().await.unwrap();
    store.end_session();
    session.await.unwrap();

    let ids: Vec<_> = store.items().into_iter().map(|item| item.product_id).collect();
    assert_eq!(ids, vec!["p1"]);
    assert!(!store.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_loading_until_every_fetch_finishes() {
    let remote = Arc::new(FakeRemote {
        user_delays: vec![("u1", Duration::from_millis(500)), ("u2", Duration::from_millis(100))],
        ..Default::default()
    });
    remote.items.lock().push(WishlistItem::from_product(
        &game("p9", "Server Game"),
        "r-90".to_string(),
        time::OffsetDateTime::UNIX_EPOCH,
    ));
    let store = synced_store(&memory_storage(), remote);
    store.add_item(&game("p1", "Local Game"));

    let slow = {
        let store = store.clone();
        tokio::spawn(async move { store.establish_session("u1").await })
    };
    let fast = {
        let store = store.clone();
        tokio::spawn(async move { store.establish_session("u2").await })
    };

    fast.await.unwrap();
    // u2 hydrated, but the u1 fetch is still in flight
    assert!(store.is_loading());
    assert_eq!(store.user_id().as_deref(), Some("u2"));
    assert!(store.is_in_wishlist("p9"));

    slow.await.unwrap();
    assert!(!store.is_loading());
    let ids: Vec<_> = store.items().into_iter().map(|item| item.product_id).collect();
    assert_eq!(ids, vec!["p9"]);
}

#[tokio::test(start_paused = true)]
async fn test_signed_out_changes_stay_local() {
    let remote = Arc::new(FakeRemote::default());
    let store = synced_store(&memory_storage(), remote.clone());

    store.establish_session("u1").await;
    store.end_session();
    store.add_item(&game("p1", "Game A"));
    store.settle().await;

    assert_eq!(remote.calls(), vec!["fetch u1"]);
    assert_eq!(store.user_id(), None);
}
