//! Process-scoped identifiers resolved when the thread class loads.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::sys::jni::{jfieldID, jmethodID};

/// The two identifiers the class-load watcher caches for the rest of the
/// process: `Thread.start()`'s method id and `Thread.name`'s field id.
///
/// Null is the unset sentinel. Field-modification events can arrive before
/// the watcher has run; they compare their field id against null and never
/// match. Stores are `Release` and loads `Acquire`, so no reader observes a
/// torn identifier, and re-entry (class redefinition) simply overwrites.
pub struct WatchTargets {
    start_method: AtomicPtr<c_void>,
    name_field: AtomicPtr<c_void>,
}

impl WatchTargets {
    pub const fn new() -> Self {
        Self {
            start_method: AtomicPtr::new(ptr::null_mut()),
            name_field: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Publishes both identifiers.
    pub fn cache(&self, start_method: jmethodID, name_field: jfieldID) {
        self.start_method.store(start_method, Ordering::Release);
        self.name_field.store(name_field, Ordering::Release);
    }

    pub fn start_method(&self) -> jmethodID {
        self.start_method.load(Ordering::Acquire)
    }

    pub fn name_field(&self) -> jfieldID {
        self.name_field.load(Ordering::Acquire)
    }

    /// True once `field` equals the cached name field. Never true while the
    /// cache is unset.
    pub fn is_name_field(&self, field: jfieldID) -> bool {
        let cached = self.name_field();
        !cached.is_null() && cached == field
    }
}

impl Default for WatchTargets {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_cache_matches_nothing() {
        let targets = WatchTargets::new();
        assert!(!targets.is_name_field(ptr::null_mut()));
        assert!(!targets.is_name_field(0x10 as jfieldID));
    }

    #[test]
    fn cached_field_matches_itself_only() {
        let targets = WatchTargets::new();
        targets.cache(0x20 as jmethodID, 0x30 as jfieldID);
        assert!(targets.is_name_field(0x30 as jfieldID));
        assert!(!targets.is_name_field(0x31 as jfieldID));
        assert_eq!(targets.start_method(), 0x20 as jmethodID);
    }

    #[test]
    fn recaching_overwrites() {
        let targets = WatchTargets::new();
        targets.cache(0x20 as jmethodID, 0x30 as jfieldID);
        targets.cache(0x21 as jmethodID, 0x31 as jfieldID);
        assert!(targets.is_name_field(0x31 as jfieldID));
        assert!(!targets.is_name_field(0x30 as jfieldID));
    }
}
