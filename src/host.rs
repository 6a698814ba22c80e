//! The introspection surface the pipeline runs against.
//!
//! Event logic never touches a `jvmtiEnv` directly; it goes through [`Host`],
//! so the watcher, filter, and capture path can be exercised in tests with a
//! mock host and no running VM. [`crate::jvmti_host::JvmtiHost`] is the live
//! implementation.

use std::ffi::c_void;
use std::os::raw::c_char;

use thiserror::Error;

use crate::scoped::ScopedBuf;
use crate::sys::jni::{jclass, jfieldID, jmethodID, jobject, jthread};
use crate::sys::jvmti::{jlocation, jvmtiError};

/// A failed host query. Every variant is recoverable: callers log it and
/// degrade the current operation rather than stopping event processing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    #[error("jvmti call failed: {0:?}")]
    Jvmti(jvmtiError),
    #[error("jni lookup returned null")]
    NullId,
}

/// Release path for host-allocated memory.
///
/// Split out of [`Host`] so [`ScopedBuf`] borrows only the one capability it
/// needs, and tests can count releases with a bare counting implementation.
pub trait Dealloc {
    fn deallocate(&self, mem: *mut c_void);
}

/// One call frame as reported by the host, innermost first.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub method: jmethodID,
    pub location: jlocation,
}

/// Host introspection queries.
///
/// Identifiers (`jclass`, `jmethodID`, `jfieldID`, `jthread`) are opaque and
/// never validated here; an invalid identifier surfaces as a host-reported
/// error. Every buffer-returning query hands ownership to the caller through
/// a [`ScopedBuf`].
pub trait Host: Dealloc {
    /// The class's JVM type signature, e.g. `Ljava/lang/Thread;`.
    fn class_signature(&self, class: jclass) -> Result<ScopedBuf<'_, c_char>, HostError>;

    /// The method's simple name.
    fn method_name(&self, method: jmethodID) -> Result<ScopedBuf<'_, c_char>, HostError>;

    /// The class that declares `method`.
    fn method_declaring_class(&self, method: jmethodID) -> Result<jclass, HostError>;

    /// The thread's display name.
    fn thread_name(&self, thread: jthread) -> Result<ScopedBuf<'_, c_char>, HostError>;

    /// Up to `max_frames` frames of `thread`'s stack, starting `start_depth`
    /// frames below the top. Deeper frames are silently truncated.
    fn stack_trace(
        &self,
        thread: jthread,
        start_depth: i32,
        max_frames: i32,
    ) -> Result<Vec<FrameInfo>, HostError>;

    /// JNI method lookup by name and signature.
    fn method_id(&self, class: jclass, name: &str, sig: &str) -> Result<jmethodID, HostError>;

    /// JNI field lookup by name and signature.
    fn field_id(&self, class: jclass, name: &str, sig: &str) -> Result<jfieldID, HostError>;

    /// Asks the host to report every future write to `field`.
    fn set_field_modification_watch(&self, class: jclass, field: jfieldID)
        -> Result<(), HostError>;

    /// The text of a `java.lang.String` reference, or `None` if it cannot be
    /// read. The host-side chars are released before returning.
    fn string_text(&self, s: jobject) -> Option<String>;
}
