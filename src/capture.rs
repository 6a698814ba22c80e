//! Stack capture and rendering.

use std::borrow::Cow;
use std::io::Write;

use log::{error, warn};

use crate::config::Config;
use crate::host::Host;
use crate::introspect::{resolve_class_signature, resolve_method_name};
use crate::sys::jni::jthread;

/// Marker rendered for a symbol whose resolution failed.
const UNKNOWN: &str = "???";

/// Captures `thread`'s call stack and writes it to `out`, one
/// `<class-signature>#<method-name>` line per frame, innermost first.
///
/// Every host failure degrades rather than aborts: a missing thread name
/// skips the header, a failed stack query skips the frames, a frame whose
/// declaring class cannot be resolved is skipped, and an unresolvable symbol
/// renders as `???`. Nothing here panics across the callback boundary.
pub fn capture_and_print<H: Host>(host: &H, out: &mut dyn Write, cfg: &Config, thread: jthread) {
    match host.thread_name(thread) {
        Ok(name) => {
            let shown = name.to_text().unwrap_or(Cow::Borrowed(UNKNOWN));
            let _ = writeln!(out, "========= {shown} ==============");
        }
        Err(e) => warn!("thread info unavailable, tracing without header: {e}"),
    }

    // Skips the capture machinery's own frames; see Config::skip_frames.
    let frames = match host.stack_trace(thread, cfg.skip_frames, cfg.max_frames) {
        Ok(frames) => frames,
        Err(e) => {
            error!("GetStackTrace failed: {e}");
            return;
        }
    };

    for frame in &frames {
        let class = match host.method_declaring_class(frame.method) {
            Ok(class) => class,
            Err(e) => {
                warn!("frame skip, failed to get class id: {e}");
                continue;
            }
        };
        let signature = resolve_class_signature(host, class);
        let name = resolve_method_name(host, frame.method);
        let _ = writeln!(
            out,
            "{}#{}",
            signature.to_text().unwrap_or(Cow::Borrowed(UNKNOWN)),
            name.to_text().unwrap_or(Cow::Borrowed(UNKNOWN)),
        );
    }
}
