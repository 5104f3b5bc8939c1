//! Username lookup for dashboard and snapshot rows.

use std::sync::{PoisonError, RwLock};

use rustc_hash::FxHashMap;

/// Caches uid to username lookups from the system password database.
#[derive(Debug, Default)]
pub struct UserDirectory {
    names: RwLock<FxHashMap<u32, String>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Username for `uid`, or the uid itself if it has no passwd entry.
    pub fn name(&self, uid: u32) -> String {
        if let Some(name) = self
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uid)
        {
            return name.clone();
        }
        let name = uid_to_username(uid);
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uid, name.clone());
        name
    }
}

fn uid_to_username(uid: u32) -> String {
    // getpwuid returns a pointer into static storage; copy out immediately.
    let pw = unsafe { libc::getpwuid(uid) };
    if pw.is_null() {
        return uid.to_string();
    }
    let name = unsafe { std::ffi::CStr::from_ptr((*pw).pw_name) };
    name.to_string_lossy().into_owned()
}
