//! FFI (Foreign Function Interface) layer for native UI shells.
//!
//! This module provides a C-compatible API over [`WishlistStore`].
//! All functions are marked `extern "C"` and use C-compatible types.
//! Products and item lists cross the boundary as JSON strings.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_longlong};
use std::path::PathBuf;
use std::ptr;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::warn;

use crate::config::{
    RemoteConfig, WishlistConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_STORAGE_KEY,
};
use crate::{Notice, Product, WishlistStore};

/// Opaque pointer to a store instance (passed to the host as an opaque pointer)
pub struct StoreHandle {
    // Declared first so the store (and its queued sync tasks) drops before the runtime.
    store: WishlistStore,
    runtime: Runtime,
}

/// Create a new store instance
///
/// # Safety
/// - db_path must be a valid UTF-8 null-terminated string
/// - api_base_url can be NULL to keep the wishlist local-only
/// - api_token can be NULL when the remote API needs no bearer token
/// - Caller must call wishlist_store_free() when done
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_open(
    db_path: *const c_char,
    api_base_url: *const c_char,
    api_token: *const c_char,
) -> *mut StoreHandle {
    let Some(db_path) = str_arg(db_path) else {
        return ptr::null_mut();
    };

    let api_token = if api_token.is_null() {
        None
    } else {
        match str_arg(api_token) {
            Some(token) if !token.is_empty() => Some(token.to_string()),
            Some(_) => None,
            None => return ptr::null_mut(),
        }
    };

    let remote = if api_base_url.is_null() {
        None
    } else {
        match str_arg(api_base_url) {
            Some(url) => Some(RemoteConfig {
                base_url: url.trim_end_matches('/').to_string(),
                api_token,
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            }),
            None => return ptr::null_mut(),
        }
    };

    let config = WishlistConfig {
        db_path: PathBuf::from(db_path),
        storage_key: DEFAULT_STORAGE_KEY.to_string(),
        remote,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            warn!(error = %err, "failed to start wishlist runtime");
            return ptr::null_mut();
        }
    };

    let store = {
        let _guard = runtime.enter();
        WishlistStore::open(&config)
    };

    match store {
        Ok(store) => Box::into_raw(Box::new(StoreHandle { store, runtime })),
        Err(err) => {
            warn!(error = %err, "failed to open wishlist store");
            ptr::null_mut()
        }
    }
}

/// Free a store instance
///
/// # Safety
/// - handle must be a valid pointer returned by wishlist_store_open()
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_free(handle: *mut StoreHandle) {
    if !handle.is_null() {
        let handle = Box::from_raw(handle);
        handle.runtime.block_on(handle.store.settle());
    }
}

/// Add a product (JSON object) to the wishlist
///
/// Returns 0 added, 1 already present, -1 on error
///
/// # Safety
/// - handle must be valid
/// - product_json must be valid UTF-8 null-terminated string
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_add(
    handle: *mut StoreHandle,
    product_json: *const c_char,
) -> c_int {
    let Some(handle) = handle.as_ref() else {
        return -1;
    };
    let Some(product) = product_arg(product_json) else {
        return -1;
    };

    let _guard = handle.runtime.enter();
    notice_code(handle.store.add_item(&product))
}

/// Toggle a product (JSON object) in the wishlist
///
/// Returns 0 added, 2 removed, -1 on error
///
/// # Safety
/// - handle must be valid
/// - product_json must be valid UTF-8 null-terminated string
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_toggle(
    handle: *mut StoreHandle,
    product_json: *const c_char,
) -> c_int {
    let Some(handle) = handle.as_ref() else {
        return -1;
    };
    let Some(product) = product_arg(product_json) else {
        return -1;
    };

    let _guard = handle.runtime.enter();
    notice_code(handle.store.toggle_item(&product))
}

/// Remove a product by ID
///
/// Returns 2 removed, 3 not present, -1 on error
///
/// # Safety
/// - handle must be valid
/// - product_id must be valid UTF-8 null-terminated string
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_remove(
    handle: *mut StoreHandle,
    product_id: *const c_char,
) -> c_int {
    let Some(handle) = handle.as_ref() else {
        return -1;
    };
    let Some(product_id) = str_arg(product_id) else {
        return -1;
    };

    let _guard = handle.runtime.enter();
    notice_code(handle.store.remove_item(product_id))
}

/// Check membership
///
/// Returns 1 if present, 0 if not, -1 on error
///
/// # Safety
/// - handle must be valid
/// - product_id must be valid UTF-8 null-terminated string
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_contains(
    handle: *mut StoreHandle,
    product_id: *const c_char,
) -> c_int {
    let Some(handle) = handle.as_ref() else {
        return -1;
    };
    let Some(product_id) = str_arg(product_id) else {
        return -1;
    };

    c_int::from(handle.store.is_in_wishlist(product_id))
}

/// Number of items, -1 on error
///
/// # Safety
/// - handle must be valid
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_count(handle: *mut StoreHandle) -> c_longlong {
    match handle.as_ref() {
        Some(handle) => handle.store.count() as c_longlong,
        None => -1,
    }
}

/// Remove every item
///
/// Returns 0 on success, -1 on error
///
/// # Safety
/// - handle must be valid
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_clear(handle: *mut StoreHandle) -> c_int {
    match handle.as_ref() {
        Some(handle) => {
            handle.store.clear_all();
            0
        }
        None => -1,
    }
}

/// Current items as a JSON array
///
/// # Safety
/// - handle must be valid
/// - Caller must call wishlist_string_free() on the returned string
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_items_json(handle: *mut StoreHandle) -> *mut c_char {
    let Some(handle) = handle.as_ref() else {
        return ptr::null_mut();
    };

    let json = match serde_json::to_string(&handle.store.items()) {
        Ok(json) => json,
        Err(_) => return ptr::null_mut(),
    };

    match CString::new(json) {
        Ok(s) => s.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Sign a user in and hydrate from the remote mirror (blocks until done)
///
/// Returns 0 on success, -1 on error
///
/// # Safety
/// - handle must be valid
/// - user_id must be valid UTF-8 null-terminated string
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_establish_session(
    handle: *mut StoreHandle,
    user_id: *const c_char,
) -> c_int {
    let Some(handle) = handle.as_ref() else {
        return -1;
    };
    let Some(user_id) = str_arg(user_id) else {
        return -1;
    };

    handle
        .runtime
        .block_on(handle.store.establish_session(user_id));
    0
}

/// Sign the current user out. Local items are kept.
///
/// Returns 0 on success, -1 on error
///
/// # Safety
/// - handle must be valid
#[no_mangle]
pub unsafe extern "C" fn wishlist_store_end_session(handle: *mut StoreHandle) -> c_int {
    match handle.as_ref() {
        Some(handle) => {
            handle.store.end_session();
            0
        }
        None => -1,
    }
}

/// Free a string returned by this library
///
/// # Safety
/// - s must be a pointer returned by wishlist_store_items_json()
#[no_mangle]
pub unsafe extern "C" fn wishlist_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

// Helper functions

unsafe fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

unsafe fn product_arg(json: *const c_char) -> Option<Product> {
    let json = str_arg(json)?;
    match serde_json::from_str(json) {
        Ok(product) => Some(product),
        Err(err) => {
            warn!(error = %err, "rejecting malformed product json");
            None
        }
    }
}

fn notice_code(notice: Notice) -> c_int {
    notice.code() as c_int
}
