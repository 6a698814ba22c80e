//! Class-load watcher: spots the thread class and installs the field watch.

use log::{error, info};

use crate::host::Host;
use crate::introspect::resolve_class_signature;
use crate::state::WatchTargets;
use crate::sys::jni::jclass;

/// Signature of the runtime's built-in thread class.
pub const THREAD_CLASS_SIGNATURE: &str = "Ljava/lang/Thread;";

const START_METHOD: (&str, &str) = ("start", "()V");
const NAME_FIELD: (&str, &str) = ("name", "Ljava/lang/String;");

/// What one class-load event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Not the thread class. The dominant, cheap path.
    NotTarget,
    /// Identifiers cached and the modification watch installed.
    Watching,
    /// The thread class loaded but the watch could not be set up; the agent
    /// keeps running without capture capability.
    WatchFailed,
}

/// Reacts to one class-definition event.
///
/// Runs for every class the host loads, so the mismatch path does nothing
/// but one signature resolution and a string compare. On the thread class it
/// caches the `start()` method id and `name` field id into `targets` and
/// installs the modification watch. Tolerates re-entry: redefinition just
/// re-resolves and re-caches.
pub fn class_loaded<H: Host>(host: &H, targets: &WatchTargets, class: jclass) -> WatchOutcome {
    let signature = resolve_class_signature(host, class);
    match signature.to_text() {
        Some(sig) if sig == THREAD_CLASS_SIGNATURE => {}
        _ => return WatchOutcome::NotTarget,
    }

    let start_method = match host.method_id(class, START_METHOD.0, START_METHOD.1) {
        Ok(id) => id,
        Err(e) => {
            error!("thread class loaded but start() lookup failed: {e}");
            return WatchOutcome::WatchFailed;
        }
    };
    let name_field = match host.field_id(class, NAME_FIELD.0, NAME_FIELD.1) {
        Ok(id) => id,
        Err(e) => {
            error!("thread class loaded but name field lookup failed: {e}");
            return WatchOutcome::WatchFailed;
        }
    };

    targets.cache(start_method, name_field);

    if let Err(e) = host.set_field_modification_watch(class, name_field) {
        error!("failed to attach field watcher: {e}");
        return WatchOutcome::WatchFailed;
    }
    info!("watching {THREAD_CLASS_SIGNATURE} name writes");
    WatchOutcome::Watching
}
