//! End-to-end tests of the event pipeline against a scripted in-memory host.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use startcatch::config::Config;
use startcatch::filter::{field_written, CaptureDecision, FieldWrite};
use startcatch::host::{Dealloc, FrameInfo, Host, HostError};
use startcatch::scoped::ScopedBuf;
use startcatch::state::WatchTargets;
use startcatch::sys::jni::{jclass, jfieldID, jmethodID, jobject, jthread};
use startcatch::sys::jvmti::jvmtiError;
use startcatch::watcher::{class_loaded, WatchOutcome};
use startcatch::{capture_and_print, THREAD_CLASS_SIGNATURE};

const START_METHOD_ID: usize = 0x1000;
const NAME_FIELD_ID: usize = 0x2000;

fn id(n: usize) -> *mut c_void {
    n as *mut c_void
}

/// A host scripted from plain maps. Allocation counting mirrors the real
/// host's contract: every buffer handed out must come back through
/// `deallocate` exactly once.
#[derive(Default)]
struct MockHost {
    class_signatures: HashMap<usize, &'static str>,
    method_names: HashMap<usize, &'static str>,
    declaring_classes: HashMap<usize, usize>,
    thread_names: HashMap<usize, &'static str>,
    stacks: HashMap<usize, Vec<usize>>,
    strings: HashMap<usize, &'static str>,

    allocated: Cell<usize>,
    released: Cell<usize>,
    extractions: Cell<usize>,
    watches: RefCell<Vec<(usize, usize)>>,

    fail_watch: Cell<bool>,
    fail_thread_info: Cell<bool>,
    fail_stack: Cell<bool>,
    fail_signature_for: RefCell<HashSet<usize>>,
    fail_declaring_class_for: RefCell<HashSet<usize>>,
}

impl MockHost {
    fn lease(&self, text: &str) -> *mut c_char {
        self.allocated.set(self.allocated.get() + 1);
        CString::new(text).unwrap().into_raw()
    }

    fn balanced(&self) -> bool {
        self.allocated.get() == self.released.get()
    }
}

impl Dealloc for MockHost {
    fn deallocate(&self, mem: *mut c_void) {
        assert!(!mem.is_null(), "deallocate called with null");
        self.released.set(self.released.get() + 1);
        unsafe { drop(CString::from_raw(mem as *mut c_char)) };
    }
}

impl Host for MockHost {
    fn class_signature(&self, class: jclass) -> Result<ScopedBuf<'_, c_char>, HostError> {
        let key = class as usize;
        if self.fail_signature_for.borrow().contains(&key) {
            return Err(HostError::Jvmti(jvmtiError(112)));
        }
        let sig = self.class_signatures.get(&key).ok_or(HostError::Jvmti(jvmtiError(21)))?;
        Ok(ScopedBuf::from_raw(self, self.lease(sig)))
    }

    fn method_name(&self, method: jmethodID) -> Result<ScopedBuf<'_, c_char>, HostError> {
        let name =
            self.method_names.get(&(method as usize)).ok_or(HostError::Jvmti(jvmtiError(23)))?;
        Ok(ScopedBuf::from_raw(self, self.lease(name)))
    }

    fn method_declaring_class(&self, method: jmethodID) -> Result<jclass, HostError> {
        let key = method as usize;
        if self.fail_declaring_class_for.borrow().contains(&key) {
            return Err(HostError::Jvmti(jvmtiError(23)));
        }
        self.declaring_classes
            .get(&key)
            .map(|c| id(*c))
            .ok_or(HostError::Jvmti(jvmtiError(23)))
    }

    fn thread_name(&self, thread: jthread) -> Result<ScopedBuf<'_, c_char>, HostError> {
        if self.fail_thread_info.get() {
            return Err(HostError::Jvmti(jvmtiError(10)));
        }
        let name =
            self.thread_names.get(&(thread as usize)).ok_or(HostError::Jvmti(jvmtiError(10)))?;
        Ok(ScopedBuf::from_raw(self, self.lease(name)))
    }

    fn stack_trace(
        &self,
        thread: jthread,
        start_depth: i32,
        max_frames: i32,
    ) -> Result<Vec<FrameInfo>, HostError> {
        if self.fail_stack.get() {
            return Err(HostError::Jvmti(jvmtiError(15)));
        }
        let stack = self.stacks.get(&(thread as usize)).cloned().unwrap_or_default();
        Ok(stack
            .into_iter()
            .skip(start_depth.max(0) as usize)
            .take(max_frames.max(0) as usize)
            .map(|m| FrameInfo { method: id(m), location: 0 })
            .collect())
    }

    fn method_id(&self, _class: jclass, name: &str, sig: &str) -> Result<jmethodID, HostError> {
        match (name, sig) {
            ("start", "()V") => Ok(id(START_METHOD_ID)),
            _ => Err(HostError::NullId),
        }
    }

    fn field_id(&self, _class: jclass, name: &str, sig: &str) -> Result<jfieldID, HostError> {
        match (name, sig) {
            ("name", "Ljava/lang/String;") => Ok(id(NAME_FIELD_ID)),
            _ => Err(HostError::NullId),
        }
    }

    fn set_field_modification_watch(
        &self,
        class: jclass,
        field: jfieldID,
    ) -> Result<(), HostError> {
        if self.fail_watch.get() {
            return Err(HostError::Jvmti(jvmtiError(99)));
        }
        self.watches.borrow_mut().push((class as usize, field as usize));
        Ok(())
    }

    fn string_text(&self, s: jobject) -> Option<String> {
        self.extractions.set(self.extractions.get() + 1);
        self.strings.get(&(s as usize)).map(|t| t.to_string())
    }
}

const THREAD_CLASS: usize = 0x10;
const OTHER_CLASS: usize = 0x11;

fn host_with_thread_class() -> MockHost {
    let mut host = MockHost::default();
    host.class_signatures.insert(THREAD_CLASS, THREAD_CLASS_SIGNATURE);
    host.class_signatures.insert(OTHER_CLASS, "Lcom/example/Worker;");
    host
}

fn watched_targets(host: &MockHost) -> WatchTargets {
    let targets = WatchTargets::new();
    assert_eq!(class_loaded(host, &targets, id(THREAD_CLASS)), WatchOutcome::Watching);
    targets
}

fn output_of(buf: &[u8]) -> String {
    String::from_utf8(buf.to_vec()).unwrap()
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

#[test]
fn unrelated_classes_are_not_watched() {
    let host = host_with_thread_class();
    let targets = WatchTargets::new();

    assert_eq!(class_loaded(&host, &targets, id(OTHER_CLASS)), WatchOutcome::NotTarget);
    assert!(host.watches.borrow().is_empty());
    assert!(targets.name_field().is_null());
    assert!(host.balanced());
}

#[test]
fn thread_class_load_installs_the_watch() {
    let host = host_with_thread_class();
    let targets = watched_targets(&host);

    assert_eq!(*host.watches.borrow(), vec![(THREAD_CLASS, NAME_FIELD_ID)]);
    assert_eq!(targets.start_method(), id(START_METHOD_ID));
    assert_eq!(targets.name_field(), id(NAME_FIELD_ID));
    assert!(host.balanced());
}

#[test]
fn rejected_watch_is_reported_but_ids_stay_cached() {
    let host = host_with_thread_class();
    host.fail_watch.set(true);
    let targets = WatchTargets::new();

    assert_eq!(class_loaded(&host, &targets, id(THREAD_CLASS)), WatchOutcome::WatchFailed);
    assert_eq!(targets.name_field(), id(NAME_FIELD_ID));
}

#[test]
fn class_redefinition_rewatches() {
    let host = host_with_thread_class();
    let targets = watched_targets(&host);

    assert_eq!(class_loaded(&host, &targets, id(THREAD_CLASS)), WatchOutcome::Watching);
    assert_eq!(host.watches.borrow().len(), 2);
    assert!(host.balanced());
}

#[test]
fn unresolvable_signature_is_treated_as_non_target() {
    let host = host_with_thread_class();
    host.fail_signature_for.borrow_mut().insert(THREAD_CLASS);
    let targets = WatchTargets::new();

    assert_eq!(class_loaded(&host, &targets, id(THREAD_CLASS)), WatchOutcome::NotTarget);
    assert!(host.balanced());
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

const TIMER_THREAD: usize = 0x40;
const NAME_VALUE: usize = 0x50;

fn name_write(field: usize, value: usize) -> FieldWrite {
    FieldWrite { thread: id(TIMER_THREAD), field: id(field), new_value: id(value) }
}

#[test]
fn writes_to_other_fields_cost_no_string_extraction() {
    let host = host_with_thread_class();
    let targets = watched_targets(&host);
    let mut out = Vec::new();

    let decision =
        field_written(&host, &targets, &Config::default(), &mut out, &name_write(0x9999, NAME_VALUE));

    assert_eq!(decision, CaptureDecision::Ignore);
    assert_eq!(host.extractions.get(), 0);
    assert!(out.is_empty());
}

#[test]
fn events_before_the_watcher_runs_are_ignored() {
    let mut host = host_with_thread_class();
    host.strings.insert(NAME_VALUE, "HighResTimer");
    let targets = WatchTargets::new();
    let mut out = Vec::new();

    let decision = field_written(
        &host,
        &targets,
        &Config::default(),
        &mut out,
        &name_write(NAME_FIELD_ID, NAME_VALUE),
    );

    assert_eq!(decision, CaptureDecision::Ignore);
    assert!(out.is_empty());
}

#[test]
fn name_comparison_is_exact_and_case_sensitive() {
    let mut host = host_with_thread_class();
    host.strings.insert(0x51, "HighResTimer2");
    host.strings.insert(0x52, "highrestimer");
    host.strings.insert(0x53, "HighResTime");
    host.strings.insert(NAME_VALUE, "HighResTimer");
    let targets = watched_targets(&host);
    let cfg = Config::default();
    let mut out = Vec::new();

    for near_miss in [0x51, 0x52, 0x53] {
        let decision =
            field_written(&host, &targets, &cfg, &mut out, &name_write(NAME_FIELD_ID, near_miss));
        assert_eq!(decision, CaptureDecision::Ignore);
    }
    assert!(out.is_empty());

    let decision =
        field_written(&host, &targets, &cfg, &mut out, &name_write(NAME_FIELD_ID, NAME_VALUE));
    assert_eq!(decision, CaptureDecision::Capture { thread: id(TIMER_THREAD) });
    assert_eq!(output_of(&out), "Thread HighResTimer is about to get started\n");
}

#[test]
fn unreadable_name_value_is_ignored() {
    let host = host_with_thread_class();
    let targets = watched_targets(&host);
    let mut out = Vec::new();

    // 0x60 is not in the string table, standing in for a value the host
    // cannot read back.
    let decision = field_written(
        &host,
        &targets,
        &Config::default(),
        &mut out,
        &name_write(NAME_FIELD_ID, 0x60),
    );

    assert_eq!(decision, CaptureDecision::Ignore);
    assert!(out.is_empty());
}

#[test]
fn configured_name_overrides_the_default() {
    let mut host = host_with_thread_class();
    host.strings.insert(NAME_VALUE, "Reaper");
    let targets = watched_targets(&host);
    let cfg = Config::from_options("thread=Reaper").unwrap();
    let mut out = Vec::new();

    let decision =
        field_written(&host, &targets, &cfg, &mut out, &name_write(NAME_FIELD_ID, NAME_VALUE));
    assert_eq!(decision, CaptureDecision::Capture { thread: id(TIMER_THREAD) });
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

fn host_with_stack(methods: &[(usize, &'static str, usize)]) -> MockHost {
    let mut host = host_with_thread_class();
    host.class_signatures.insert(0x20, "Ljava/lang/Thread;");
    host.class_signatures.insert(0x21, "Lcom/example/timer/TimerFactory;");
    host.class_signatures.insert(0x22, "Lcom/example/App;");
    host.thread_names.insert(TIMER_THREAD, "HighResTimer");
    let mut stack = Vec::new();
    for (method, name, class) in methods {
        host.method_names.insert(*method, name);
        host.declaring_classes.insert(*method, *class);
        stack.push(*method);
    }
    host.stacks.insert(TIMER_THREAD, stack);
    host
}

#[test]
fn capture_renders_header_and_frames_innermost_first() {
    let host = host_with_stack(&[
        (0x100, "setName", 0x20),
        (0x101, "newTimer", 0x21),
        (0x102, "main", 0x22),
    ]);
    let cfg = Config { skip_frames: 0, ..Config::default() };
    let mut out = Vec::new();

    capture_and_print(&host, &mut out, &cfg, id(TIMER_THREAD));

    assert_eq!(
        output_of(&out),
        "========= HighResTimer ==============\n\
         Ljava/lang/Thread;#setName\n\
         Lcom/example/timer/TimerFactory;#newTimer\n\
         Lcom/example/App;#main\n"
    );
    assert!(host.balanced());
}

#[test]
fn deep_stacks_are_truncated_and_skipped() {
    let methods: Vec<(usize, &'static str, usize)> =
        (0..15).map(|i| (0x200 + i, "run", 0x22)).collect();
    let host = host_with_stack(&methods);
    let cfg = Config::default();
    let mut out = Vec::new();

    capture_and_print(&host, &mut out, &cfg, id(TIMER_THREAD));

    let text = output_of(&out);
    // Header plus at most max_frames lines; the first two frames are skipped
    // and only 10 of the remaining 13 survive the bound.
    assert_eq!(text.lines().count(), 1 + 10);
}

#[test]
fn frames_without_a_declaring_class_are_skipped() {
    let host = host_with_stack(&[
        (0x100, "setName", 0x20),
        (0x101, "newTimer", 0x21),
        (0x102, "main", 0x22),
    ]);
    host.fail_declaring_class_for.borrow_mut().insert(0x101);
    let cfg = Config { skip_frames: 0, ..Config::default() };
    let mut out = Vec::new();

    capture_and_print(&host, &mut out, &cfg, id(TIMER_THREAD));

    let text = output_of(&out);
    assert!(!text.contains("newTimer"));
    assert!(text.contains("Ljava/lang/Thread;#setName"));
    assert!(text.contains("Lcom/example/App;#main"));
    assert!(host.balanced());
}

#[test]
fn unresolvable_symbols_render_as_placeholders() {
    let host = host_with_stack(&[(0x100, "setName", 0x20)]);
    host.fail_signature_for.borrow_mut().insert(0x20);
    let cfg = Config { skip_frames: 0, ..Config::default() };
    let mut out = Vec::new();

    capture_and_print(&host, &mut out, &cfg, id(TIMER_THREAD));

    assert!(output_of(&out).contains("???#setName"));
    assert!(host.balanced());
}

#[test]
fn missing_thread_info_drops_the_header_only() {
    let host = host_with_stack(&[(0x100, "setName", 0x20)]);
    host.fail_thread_info.set(true);
    let cfg = Config { skip_frames: 0, ..Config::default() };
    let mut out = Vec::new();

    capture_and_print(&host, &mut out, &cfg, id(TIMER_THREAD));

    let text = output_of(&out);
    assert!(!text.contains("========="));
    assert!(text.contains("Ljava/lang/Thread;#setName"));
}

#[test]
fn failed_stack_query_leaves_the_header_alone() {
    let host = host_with_stack(&[(0x100, "setName", 0x20)]);
    host.fail_stack.set(true);
    let mut out = Vec::new();

    capture_and_print(&host, &mut out, &Config::default(), id(TIMER_THREAD));

    assert_eq!(output_of(&out), "========= HighResTimer ==============\n");
    assert!(host.balanced());
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn matching_write_prints_announcement_then_stack() {
    let mut host = host_with_stack(&[
        (0x100, "setName", 0x20),
        (0x101, "newTimer", 0x21),
        (0x102, "main", 0x22),
    ]);
    host.strings.insert(NAME_VALUE, "HighResTimer");
    let targets = watched_targets(&host);
    assert_eq!(host.watches.borrow().len(), 1);
    let cfg = Config { skip_frames: 0, ..Config::default() };
    let mut out = Vec::new();

    let decision =
        field_written(&host, &targets, &cfg, &mut out, &name_write(NAME_FIELD_ID, NAME_VALUE));
    if let CaptureDecision::Capture { thread } = decision {
        capture_and_print(&host, &mut out, &cfg, thread);
    }

    assert_eq!(
        output_of(&out),
        "Thread HighResTimer is about to get started\n\
         ========= HighResTimer ==============\n\
         Ljava/lang/Thread;#setName\n\
         Lcom/example/timer/TimerFactory;#newTimer\n\
         Lcom/example/App;#main\n"
    );
    assert!(host.balanced());
}

#[test]
fn heavy_non_matching_traffic_allocates_nothing() {
    let mut host = host_with_thread_class();
    host.strings.insert(NAME_VALUE, "pool-1-thread-7");
    let targets = watched_targets(&host);
    let cfg = Config::default();
    let mut out = Vec::new();
    let allocated_after_setup = host.allocated.get();

    for i in 0..10_000 {
        let field = if i % 2 == 0 { 0x9999 } else { NAME_FIELD_ID };
        let decision =
            field_written(&host, &targets, &cfg, &mut out, &name_write(field, NAME_VALUE));
        assert_eq!(decision, CaptureDecision::Ignore);
    }

    assert!(out.is_empty());
    // Non-matching traffic reads strings but never leases host buffers.
    assert_eq!(host.allocated.get(), allocated_after_setup);
    assert_eq!(host.extractions.get(), 5_000);
    assert!(host.balanced());
}
