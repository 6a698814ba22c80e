//! Symbol resolution helpers with a uniform failure policy.
//!
//! Both helpers log a host failure and hand back an empty guard. Callers
//! treat an empty result as "unknown" and keep going; nothing here is fatal.

use std::os::raw::c_char;

use log::error;

use crate::host::Host;
use crate::scoped::ScopedBuf;
use crate::sys::jni::{jclass, jmethodID};

/// Resolves a class's JVM type signature, e.g. `Ljava/lang/Thread;`.
pub fn resolve_class_signature<'h, H: Host>(host: &'h H, class: jclass) -> ScopedBuf<'h, c_char> {
    match host.class_signature(class) {
        Ok(sig) => sig,
        Err(e) => {
            error!("failed to take class signature: {e}");
            ScopedBuf::empty(host)
        }
    }
}

/// Resolves a method's simple name.
pub fn resolve_method_name<'h, H: Host>(host: &'h H, method: jmethodID) -> ScopedBuf<'h, c_char> {
    match host.method_name(method) {
        Ok(name) => name,
        Err(e) => {
            error!("failed to take method name: {e}");
            ScopedBuf::empty(host)
        }
    }
}
