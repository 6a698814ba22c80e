//! Agent entry points and the raw JVMTI callback trampolines.
//!
//! `Agent_OnLoad` runs on the VM's primordial thread before `main`; it
//! parses options, claims capabilities, registers callbacks, and enables
//! events. The trampolines are thin: they wrap the raw environment pointers
//! in a [`JvmtiHost`] and hand off to the event functions, which hold all
//! the logic and all the tests.

use std::ffi::{c_void, CStr};
use std::io::Write;
use std::mem;
use std::os::raw::c_char;
use std::ptr;
use std::sync::OnceLock;

use log::{debug, error, info};

use crate::capture::capture_and_print;
use crate::config::Config;
use crate::filter::{field_written, CaptureDecision, FieldWrite};
use crate::jvmti_host::JvmtiHost;
use crate::state::WatchTargets;
use crate::sys::jni::{
    jclass, jfieldID, jint, jmethodID, jobject, jthread, jvalue, JavaVM, JNIEnv, JNI_ERR, JNI_OK,
};
use crate::sys::jvmti::{
    jlocation, jvmtiCapabilities, jvmtiEnv, jvmtiError, jvmtiEventCallbacks, JVMTI_ENABLE,
    JVMTI_ERROR_NONE, JVMTI_EVENT_CLASS_LOAD, JVMTI_EVENT_FIELD_MODIFICATION,
    JVMTI_EVENT_VM_START, JVMTI_VERSION_1_2,
};
use crate::watcher::class_loaded;

/// Everything the callbacks need, initialized once in `Agent_OnLoad` before
/// any event is enabled. Events started arriving only after this is set, so
/// `get()` returning `None` in a trampoline means a stray late event during
/// shutdown; those are dropped.
struct Runtime {
    config: Config,
    targets: WatchTargets,
}

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

unsafe extern "system" fn on_class_load(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    _thread: jthread,
    klass: jclass,
) {
    let Some(runtime) = RUNTIME.get() else { return };
    let host = JvmtiHost::from_raw(jvmti_env, jni_env);
    class_loaded(&host, &runtime.targets, klass);
}

unsafe extern "system" fn on_field_modification(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    _method: jmethodID,
    _location: jlocation,
    _field_klass: jclass,
    _object: jobject,
    field: jfieldID,
    _signature_type: c_char,
    new_value: jvalue,
) {
    let Some(runtime) = RUNTIME.get() else { return };
    let host = JvmtiHost::from_raw(jvmti_env, jni_env);
    let event = FieldWrite { thread, field, new_value: new_value.l };

    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    match field_written(&host, &runtime.targets, &runtime.config, &mut out, &event) {
        CaptureDecision::Ignore => {}
        CaptureDecision::Capture { thread } => {
            capture_and_print(&host, &mut out, &runtime.config, thread);
            let _ = out.flush();
        }
    }
}

fn wanted_capabilities() -> jvmtiCapabilities {
    let mut caps = jvmtiCapabilities::default();
    caps.set_can_tag_objects(true);
    caps.set_can_generate_field_modification_events(true);
    caps.set_can_get_bytecodes(true);
    caps.set_can_get_source_file_name(true);
    caps.set_can_get_line_numbers(true);
    caps.set_can_generate_method_entry_events(true);
    caps.set_can_generate_all_class_hook_events(true);
    caps.set_can_generate_compiled_method_load_events(true);
    caps.set_can_generate_monitor_events(true);
    caps.set_can_get_constant_pool(true);
    caps.set_can_retransform_classes(true);
    caps.set_can_retransform_any_class(true);
    caps
}

fn fatal(step: &str, err: jvmtiError) -> jint {
    error!("agent setup failed at {step}: {err:?}");
    JNI_ERR
}

/// Called by the VM when the library is loaded via `-agentpath`. Any failure
/// here returns `JNI_ERR`, which aborts VM startup; a partially initialized
/// agent would silently miss events.
///
/// # Safety
///
/// Called by the VM with a live `JavaVM` pointer and a NUL-terminated
/// options string (or null).
#[no_mangle]
pub unsafe extern "system" fn Agent_OnLoad(
    vm: *mut JavaVM,
    options: *mut c_char,
    _reserved: *mut c_void,
) -> jint {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();

    let options = if options.is_null() {
        ""
    } else {
        match CStr::from_ptr(options).to_str() {
            Ok(s) => s,
            Err(_) => {
                error!("agent options are not valid utf-8");
                return JNI_ERR;
            }
        }
    };
    let config = match Config::from_options(options) {
        Ok(config) => config,
        Err(e) => {
            error!("bad agent options: {e}");
            return JNI_ERR;
        }
    };
    info!(
        "watching for thread {:?} (max {} frames, skip {})",
        config.thread_name, config.max_frames, config.skip_frames
    );

    let mut env_ptr: *mut c_void = ptr::null_mut();
    let rc = ((**vm).GetEnv)(vm, &mut env_ptr, JVMTI_VERSION_1_2);
    if rc != JNI_OK || env_ptr.is_null() {
        error!("unable to access jvmti (GetEnv returned {rc})");
        return JNI_ERR;
    }
    let jvmti = env_ptr as *mut jvmtiEnv;
    let table = &*(*jvmti).functions;

    // Must be published before the first event can fire.
    if RUNTIME.set(Runtime { config, targets: WatchTargets::new() }).is_err() {
        error!("agent loaded twice");
        return JNI_ERR;
    }

    let caps = wanted_capabilities();
    let err = (table.AddCapabilities)(jvmti, &caps);
    if err != JVMTI_ERROR_NONE {
        return fatal("AddCapabilities", err);
    }

    let mut callbacks = jvmtiEventCallbacks::default();
    callbacks.ClassLoad = Some(on_class_load);
    callbacks.FieldModification = Some(on_field_modification);
    let err =
        (table.SetEventCallbacks)(jvmti, &callbacks, mem::size_of::<jvmtiEventCallbacks>() as jint);
    if err != JVMTI_ERROR_NONE {
        return fatal("SetEventCallbacks", err);
    }

    for event in [JVMTI_EVENT_VM_START, JVMTI_EVENT_CLASS_LOAD, JVMTI_EVENT_FIELD_MODIFICATION] {
        let err = (table.SetEventNotificationMode)(jvmti, JVMTI_ENABLE, event, ptr::null_mut());
        if err != JVMTI_ERROR_NONE {
            return fatal("SetEventNotificationMode", err);
        }
    }

    info!("agent loaded successfully");
    JNI_OK
}

/// Called by the VM as the library is about to be unloaded.
///
/// # Safety
///
/// Called by the VM during shutdown.
#[no_mangle]
pub unsafe extern "system" fn Agent_OnUnload(_vm: *mut JavaVM) {
    debug!("agent unloading");
}
