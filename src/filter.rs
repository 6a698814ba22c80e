//! Field-modification filter: one field, one value, one action.

use std::io::Write;

use log::debug;

use crate::config::Config;
use crate::host::Host;
use crate::state::WatchTargets;
use crate::sys::jni::{jfieldID, jobject, jthread};

/// A field-modification event, narrowed to what the filter reads. The host
/// delivers one event type for every watched field process-wide; everything
/// else about the event is irrelevant here.
#[derive(Debug, Clone, Copy)]
pub struct FieldWrite {
    /// The thread performing the write. On a match this is the thread being
    /// constructed, observed from inside its own constructor.
    pub thread: jthread,
    pub field: jfieldID,
    /// The new value, tagged as an object reference to a string.
    pub new_value: jobject,
}

/// What the filter decided for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureDecision {
    /// Not our field or not our value; nothing was printed.
    Ignore,
    /// The target thread is being constructed; capture its stack.
    Capture { thread: jthread },
}

/// Reacts to one watched-field write.
///
/// The field-id comparison comes first so the dominant non-matching path
/// does no string extraction at all; an unset cache naturally never equals a
/// real identifier. On a full match the "about to get started" line is
/// written before returning, so it precedes the capture output the caller
/// produces next.
pub fn field_written<H: Host>(
    host: &H,
    targets: &WatchTargets,
    cfg: &Config,
    out: &mut dyn Write,
    event: &FieldWrite,
) -> CaptureDecision {
    if !targets.is_name_field(event.field) {
        return CaptureDecision::Ignore;
    }

    let Some(name) = host.string_text(event.new_value) else {
        debug!("name write with unreadable value, ignoring");
        return CaptureDecision::Ignore;
    };

    if name != cfg.thread_name {
        return CaptureDecision::Ignore;
    }

    let _ = writeln!(out, "Thread {name} is about to get started");
    CaptureDecision::Capture { thread: event.thread }
}
