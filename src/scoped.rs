//! Single-owner guard for host-allocated buffers.

use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::ptr;

use crate::host::Dealloc;

/// Owns at most one buffer allocated by the host and returns it through the
/// host's deallocation entry point exactly once.
///
/// The guard cannot be cloned; a Rust move transfers ownership and leaves
/// nothing behind in the source, so no sequence of moves can double-release.
/// Dropping an empty guard is a no-op.
pub struct ScopedBuf<'h, T> {
    ptr: *mut T,
    host: &'h dyn Dealloc,
}

impl<'h, T> ScopedBuf<'h, T> {
    /// An empty guard; drops without touching the host.
    pub fn empty(host: &'h dyn Dealloc) -> Self {
        Self { ptr: ptr::null_mut(), host }
    }

    /// Takes ownership of `ptr`. Null is allowed and yields an empty guard.
    pub fn from_raw(host: &'h dyn Dealloc, ptr: *mut T) -> Self {
        Self { ptr, host }
    }

    pub fn is_valid(&self) -> bool {
        !self.ptr.is_null()
    }

    /// Write slot for host out-parameters: pass `slot()` to a query that
    /// populates it and the guard owns whatever lands there.
    pub fn slot(&mut self) -> *mut *mut T {
        &mut self.ptr
    }

    pub fn get(&self) -> *const T {
        self.ptr
    }
}

impl ScopedBuf<'_, c_char> {
    /// Lossy text view of the owned C string, or `None` for an empty guard.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        if self.ptr.is_null() {
            return None;
        }
        // Owned pointer is a null-terminated string from the host.
        Some(unsafe { CStr::from_ptr(self.ptr) }.to_string_lossy())
    }
}

impl<T> Drop for ScopedBuf<'_, T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            self.host.deallocate(self.ptr as *mut c_void);
            self.ptr = ptr::null_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::ffi::CString;

    #[derive(Default)]
    struct CountingDealloc {
        released: Cell<usize>,
    }

    impl Dealloc for CountingDealloc {
        fn deallocate(&self, mem: *mut c_void) {
            assert!(!mem.is_null());
            self.released.set(self.released.get() + 1);
            unsafe { drop(CString::from_raw(mem as *mut c_char)) };
        }
    }

    fn leak_cstr(s: &str) -> *mut c_char {
        CString::new(s).unwrap().into_raw()
    }

    #[test]
    fn drop_releases_exactly_once() {
        let host = CountingDealloc::default();
        {
            let buf = ScopedBuf::from_raw(&host, leak_cstr("hello"));
            assert!(buf.is_valid());
            assert_eq!(buf.to_text().unwrap(), "hello");
        }
        assert_eq!(host.released.get(), 1);
    }

    #[test]
    fn moves_do_not_double_release() {
        let host = CountingDealloc::default();
        {
            let a = ScopedBuf::from_raw(&host, leak_cstr("x"));
            let b = a;
            let c = b;
            assert!(c.is_valid());
        }
        assert_eq!(host.released.get(), 1);
    }

    #[test]
    fn empty_guard_never_deallocates() {
        let host = CountingDealloc::default();
        {
            let buf: ScopedBuf<'_, c_char> = ScopedBuf::empty(&host);
            assert!(!buf.is_valid());
            assert!(buf.to_text().is_none());
        }
        assert_eq!(host.released.get(), 0);
    }

    #[test]
    fn slot_population_transfers_ownership() {
        let host = CountingDealloc::default();
        {
            let mut buf = ScopedBuf::empty(&host);
            // Simulates a host query writing through the out-parameter.
            unsafe { *buf.slot() = leak_cstr("populated") };
            assert_eq!(buf.to_text().unwrap(), "populated");
        }
        assert_eq!(host.released.get(), 1);
    }
}
