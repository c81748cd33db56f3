//! The wishlist store.
//!
//! Every mutation is applied to the in-memory list and persisted before the
//! call returns. When a user session is active the store also queues a call to
//! the remote mirror; those calls run on the tokio runtime, never block the
//! caller, and only ever refine local state (by patching in the identifier the
//! server assigned). Failures are logged and otherwise ignored.
//!
//! Remote calls for the same product run one after another in the order the
//! local mutations happened. A remove queued behind a pending add therefore
//! sees the identifier the add was given by the server.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::{unix_millis, Clock, SystemClock};
use crate::config::WishlistConfig;
use crate::db::Database;
use crate::error::{StorageError, WishlistError};
use crate::models::{Notice, Product, WishlistItem, WishlistState};
use crate::remote::{HttpRemoteWishlist, RemoteWishlist};
use crate::storage::{KeyValueStore, WishlistStorage};

/// Handle to a wishlist. Cheap to clone; clones share the same list.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<WishlistState>,
    storage: WishlistStorage,
    clock: Arc<dyn Clock>,
    session: Mutex<Option<String>>,
    last_local_id: Mutex<i64>,
    fetches_in_flight: Mutex<usize>,
    remote: Option<Remote>,
}

struct Remote {
    api: Arc<dyn RemoteWishlist>,
    runtime: Handle,
    chain: Mutex<SyncChain>,
    confirmed: Mutex<HashMap<String, Confirmed>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

/// Tail of the per-product queue of remote calls.
#[derive(Default)]
struct SyncChain {
    next_seq: u64,
    tails: HashMap<String, (u64, oneshot::Receiver<()>)>,
}

/// Identifier the server assigned to an item we sent it.
struct Confirmed {
    local_id: String,
    remote_id: String,
}

enum SyncJob {
    Add { user_id: String, item: WishlistItem },
    Remove { product_id: String, id: String },
}

impl SyncJob {
    fn product_id(&self) -> &str {
        match self {
            SyncJob::Add { item, .. } => &item.product_id,
            SyncJob::Remove { product_id, .. } => product_id,
        }
    }
}

pub struct WishlistStoreBuilder {
    storage: WishlistStorage,
    remote: Option<Arc<dyn RemoteWishlist>>,
    clock: Arc<dyn Clock>,
    runtime: Option<Handle>,
}

impl WishlistStoreBuilder {
    /// Mirror the wishlist to a remote API while a session is active.
    pub fn remote(mut self, remote: Arc<dyn RemoteWishlist>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runtime that runs remote calls. Defaults to the current runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Hydrate the list from storage and build the store.
    pub fn build(self) -> Result<WishlistStore, WishlistError> {
        let remote = match self.remote {
            Some(api) => {
                let runtime = match self.runtime {
                    Some(runtime) => runtime,
                    None => Handle::try_current().map_err(|_| WishlistError::NoRuntime)?,
                };
                Some(Remote {
                    api,
                    runtime,
                    chain: Mutex::new(SyncChain::default()),
                    confirmed: Mutex::new(HashMap::new()),
                    pending: Mutex::new(Vec::new()),
                })
            }
            None => None,
        };

        let items = dedupe(self.storage.load());
        debug!(key = %self.storage.key(), count = items.len(), "hydrated wishlist from storage");

        let (state, _) = watch::channel(WishlistState {
            items,
            is_loading: false,
        });

        Ok(WishlistStore {
            inner: Arc::new(Inner {
                state,
                storage: self.storage,
                clock: self.clock,
                session: Mutex::new(None),
                last_local_id: Mutex::new(0),
                fetches_in_flight: Mutex::new(0),
                remote,
            }),
        })
    }
}

impl WishlistStore {
    pub fn builder(storage: WishlistStorage) -> WishlistStoreBuilder {
        WishlistStoreBuilder {
            storage,
            remote: None,
            clock: Arc::new(SystemClock),
            runtime: None,
        }
    }

    /// Open a store backed by the SQLite database named in `config`.
    ///
    /// Remote sync is enabled when `config.remote` is set, in which case this
    /// must be called from within a tokio runtime.
    pub fn open(config: &WishlistConfig) -> Result<Self, WishlistError> {
        let db = Database::open(&config.db_path).map_err(StorageError::from)?;
        let backend: Arc<dyn KeyValueStore> = Arc::new(db);
        let mut builder = Self::builder(WishlistStorage::new(backend, config.storage_key.clone()));

        if let Some(remote) = &config.remote {
            builder = builder.remote(Arc::new(HttpRemoteWishlist::new(remote)?));
        }

        builder.build()
    }

    /// Add a product unless it is already in the wishlist.
    pub fn add_item(&self, product: &Product) -> Notice {
        self.inner.mutate(|state| self.inner.add_locked(state, product))
    }

    /// Remove the item for `product_id`, if present.
    pub fn remove_item(&self, product_id: &str) -> Notice {
        self.inner.mutate(|state| self.inner.remove_locked(state, product_id))
    }

    /// Add the product if absent, remove it if present.
    pub fn toggle_item(&self, product: &Product) -> Notice {
        self.inner.mutate(|state| {
            if state.contains(&product.id) {
                self.inner.remove_locked(state, &product.id)
            } else {
                self.inner.add_locked(state, product)
            }
        })
    }

    /// Empty the wishlist and remove the persisted payload.
    ///
    /// The remote mirror is left as is.
    pub fn clear_all(&self) {
        let inner = &self.inner;
        inner.state.send_if_modified(|state| {
            let had_items = !state.items.is_empty();
            state.items.clear();
            if let Err(err) = inner.storage.clear() {
                error!(error = %err, "failed to clear persisted wishlist");
            }
            had_items
        });
        if let Some(remote) = &inner.remote {
            remote.confirmed.lock().clear();
        }
        debug!("cleared wishlist");
    }

    /// Record the signed-in user and hydrate from the remote mirror.
    ///
    /// A non-empty remote list replaces the local one. An empty list or a
    /// failed fetch leaves local items untouched.
    pub async fn establish_session(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        *self.inner.session.lock() = Some(user_id.clone());

        let Some(remote) = &self.inner.remote else {
            debug!(user_id = %user_id, "session established without remote sync");
            return;
        };

        self.inner.begin_fetch();
        let result = remote.api.fetch_for_user(&user_id).await;
        let still_current = self.inner.session.lock().as_deref() == Some(user_id.as_str());

        match result {
            Ok(items) if !still_current => {
                debug!(user_id = %user_id, count = items.len(), "discarding wishlist of a stale session");
                self.inner.end_fetch();
            }
            Ok(items) if items.is_empty() => {
                info!(user_id = %user_id, "remote wishlist is empty, keeping local items");
                self.inner.end_fetch();
            }
            Ok(items) => {
                let items = dedupe(items);
                info!(user_id = %user_id, count = items.len(), "replacing wishlist with remote copy");
                remote.confirmed.lock().clear();
                self.inner.replace_items(items);
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "failed to fetch remote wishlist");
                self.inner.end_fetch();
            }
        }
    }

    /// Forget the signed-in user. Local items are kept.
    pub fn end_session(&self) {
        if let Some(user_id) = self.inner.session.lock().take() {
            debug!(user_id = %user_id, "session ended");
        }
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.current_user()
    }

    pub fn is_in_wishlist(&self, product_id: &str) -> bool {
        self.inner.state.borrow().contains(product_id)
    }

    pub fn items(&self) -> Vec<WishlistItem> {
        self.inner.state.borrow().items.clone()
    }

    pub fn count(&self) -> usize {
        self.inner.state.borrow().items.len()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn state(&self) -> WishlistState {
        self.inner.state.borrow().clone()
    }

    /// Observe every change to the list or the loading flag.
    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.inner.state.subscribe()
    }

    /// Wait until every queued remote call has finished.
    pub async fn settle(&self) {
        let Some(remote) = &self.inner.remote else {
            return;
        };

        loop {
            let handles = std::mem::take(&mut *remote.pending.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(err) = handle.await {
                    warn!(error = %err, "wishlist sync task aborted");
                }
            }
        }
    }
}

impl Inner {
    /// Run a local transition under the state lock. Subscribers are only
    /// notified when the list actually changed.
    fn mutate(&self, transition: impl FnOnce(&mut WishlistState) -> Notice) -> Notice {
        let mut notice = Notice::NotPresent;
        self.state.send_if_modified(|state| {
            notice = transition(state);
            matches!(notice, Notice::Added | Notice::Removed)
        });
        notice
    }

    fn add_locked(self: &Arc<Self>, state: &mut WishlistState, product: &Product) -> Notice {
        if state.contains(&product.id) {
            debug!(product_id = %product.id, "product already in wishlist");
            return Notice::AlreadyPresent;
        }

        let now = self.clock.now();
        let item = WishlistItem::from_product(product, self.next_local_id(unix_millis(now)), now);
        state.items.push(item.clone());
        self.persist(&state.items);
        debug!(product_id = %product.id, id = %item.id, "added to wishlist");

        if let Some(user_id) = self.current_user() {
            self.enqueue(SyncJob::Add { user_id, item });
        }
        Notice::Added
    }

    fn remove_locked(self: &Arc<Self>, state: &mut WishlistState, product_id: &str) -> Notice {
        let Some(position) = state.position(product_id) else {
            return Notice::NotPresent;
        };

        let removed = state.items.remove(position);
        self.persist(&state.items);
        debug!(product_id = %product_id, id = %removed.id, "removed from wishlist");

        if self.current_user().is_some() {
            self.enqueue(SyncJob::Remove {
                product_id: removed.product_id,
                id: removed.id,
            });
        }
        Notice::Removed
    }

    fn replace_items(&self, items: Vec<WishlistItem>) {
        let mut in_flight = self.fetches_in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        let still_loading = *in_flight > 0;
        self.state.send_modify(|state| {
            state.items = items;
            state.is_loading = still_loading;
            self.persist(&state.items);
        });
    }

    fn begin_fetch(&self) {
        let mut in_flight = self.fetches_in_flight.lock();
        *in_flight += 1;
        self.state.send_if_modified(|state| !std::mem::replace(&mut state.is_loading, true));
    }

    fn end_fetch(&self) {
        let mut in_flight = self.fetches_in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        let still_loading = *in_flight > 0;
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.is_loading, still_loading) != still_loading);
    }

    fn persist(&self, items: &[WishlistItem]) {
        if let Err(err) = self.storage.save(items) {
            error!(error = %err, count = items.len(), "failed to persist wishlist");
        }
    }

    fn current_user(&self) -> Option<String> {
        self.session.lock().clone()
    }

    /// Clock-derived id, strictly increasing within this store.
    fn next_local_id(&self, now_ms: i64) -> String {
        let mut last = self.last_local_id.lock();
        *last = now_ms.max(*last + 1);
        last.to_string()
    }

    /// Queue a remote call behind any earlier call for the same product.
    fn enqueue(self: &Arc<Self>, job: SyncJob) {
        let Some(remote) = &self.remote else {
            return;
        };

        let product_id = job.product_id().to_string();
        let (done_tx, done_rx) = oneshot::channel();
        let (seq, previous) = {
            let mut chain = remote.chain.lock();
            chain.next_seq += 1;
            let seq = chain.next_seq;
            let previous = chain
                .tails
                .insert(product_id.clone(), (seq, done_rx))
                .map(|(_, rx)| rx);
            (seq, previous)
        };

        let inner = Arc::clone(self);
        let handle = remote.runtime.spawn(async move {
            if let Some(previous) = previous {
                // Err only means the earlier task died; run anyway.
                let _ = previous.await;
            }
            inner.run(job).await;
            let _ = done_tx.send(());
            inner.release(&product_id, seq);
        });

        let mut pending = remote.pending.lock();
        pending.retain(|task| !task.is_finished());
        pending.push(handle);
    }

    fn release(&self, product_id: &str, seq: u64) {
        let Some(remote) = &self.remote else {
            return;
        };
        let mut chain = remote.chain.lock();
        if chain.tails.get(product_id).map(|(tail, _)| *tail) == Some(seq) {
            chain.tails.remove(product_id);
        }
    }

    async fn run(&self, job: SyncJob) {
        let Some(remote) = &self.remote else {
            return;
        };

        match job {
            SyncJob::Add { user_id, item } => match remote.api.add_item(&user_id, &item).await {
                Ok(remote_id) => {
                    remote.confirmed.lock().insert(
                        item.product_id.clone(),
                        Confirmed {
                            local_id: item.id.clone(),
                            remote_id: remote_id.clone(),
                        },
                    );
                    self.patch_id(&item.product_id, &item.id, remote_id);
                }
                Err(err) => {
                    remote.confirmed.lock().remove(&item.product_id);
                    warn!(product_id = %item.product_id, error = %err, "failed to add item to remote wishlist");
                }
            },
            SyncJob::Remove { product_id, id } => {
                let confirmed = remote.confirmed.lock().remove(&product_id);
                let remote_id = match confirmed {
                    Some(confirmed) if confirmed.local_id == id || confirmed.remote_id == id => {
                        confirmed.remote_id
                    }
                    _ => id,
                };
                if let Err(err) = remote.api.remove_item(&remote_id).await {
                    warn!(product_id = %product_id, id = %remote_id, error = %err, "failed to remove item from remote wishlist");
                }
            }
        }
    }

    /// Swap the local id for the server's, if the same record is still listed.
    fn patch_id(&self, product_id: &str, local_id: &str, remote_id: String) {
        self.state.send_if_modified(|state| {
            let Some(item) = state
                .items
                .iter_mut()
                .find(|item| item.product_id == product_id && item.id == local_id)
            else {
                debug!(product_id = %product_id, "item gone before remote add returned");
                return false;
            };
            item.id = remote_id;
            self.persist(&state.items);
            true
        });
    }
}

/// Keep the first item per product.
fn dedupe(items: Vec<WishlistItem>) -> Vec<WishlistItem> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.product_id.clone()))
        .collect()
}
