// startcatch/src/sys/jvmti.rs
//
// Minimal JVMTI bindings. The interface has been stable since JDK 1.5 and
// newer JDKs only append to the vtable, so a fixed slot layout covers
// JDK 8 through current releases.
//
// Only the ten entry points the agent calls are named; every other slot is
// pointer-sized padding that keeps the offsets correct. Slot numbers in the
// comments are the 1-based positions from jvmti.h.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

use std::ffi::c_void;
use std::os::raw::{c_char, c_uchar};
use std::ptr;

use crate::sys::jni::{jboolean, jclass, jfieldID, jint, jlong, jmethodID, jobject, jthread, jvalue, JNIEnv};

// =============================================================================
// Constants
// =============================================================================

pub const JVMTI_VERSION_1_2: jint = 0x30010200;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

pub const JVMTI_EVENT_CLASS_LOAD: u32 = 55;
pub const JVMTI_EVENT_VM_START: u32 = 57;
pub const JVMTI_EVENT_FIELD_MODIFICATION: u32 = 64;

pub type jlocation = jlong;

// =============================================================================
// Error codes
//
// A transparent newtype rather than an enum: the VM may hand back any of the
// hundred-plus documented codes and a Rust enum with missing variants would
// be undefined behavior at the FFI boundary.
// =============================================================================

#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct jvmtiError(pub u32);

pub const JVMTI_ERROR_NONE: jvmtiError = jvmtiError(0);

// =============================================================================
// Structs
// =============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiFrameInfo {
    pub method: jmethodID,
    pub location: jlocation,
}

impl Default for jvmtiFrameInfo {
    fn default() -> Self {
        Self { method: ptr::null_mut(), location: 0 }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiThreadInfo {
    pub name: *mut c_char,
    pub priority: jint,
    pub is_daemon: jboolean,
    pub thread_group: jobject,
    pub context_class_loader: jobject,
}

impl Default for jvmtiThreadInfo {
    fn default() -> Self {
        Self {
            name: ptr::null_mut(),
            priority: 0,
            is_daemon: 0,
            thread_group: ptr::null_mut(),
            context_class_loader: ptr::null_mut(),
        }
    }
}

// =============================================================================
// Capabilities
//
// 144 bits of flags; only the setters for the capabilities this agent
// requests are exposed. Bit offsets from jvmti.h.
// =============================================================================

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl Default for jvmtiCapabilities {
    fn default() -> Self {
        Self { bits: [0; 4] }
    }
}

impl jvmtiCapabilities {
    fn set_bit(&mut self, bit_offset: usize, value: bool) {
        let word = bit_offset / 32;
        let bit = bit_offset % 32;
        if value {
            self.bits[word] |= 1 << bit;
        } else {
            self.bits[word] &= !(1 << bit);
        }
    }

    // [0]
    pub fn set_can_tag_objects(&mut self, v: bool) { self.set_bit(0, v); }
    // [1]
    pub fn set_can_generate_field_modification_events(&mut self, v: bool) { self.set_bit(1, v); }
    // [3]
    pub fn set_can_get_bytecodes(&mut self, v: bool) { self.set_bit(3, v); }
    // [11]
    pub fn set_can_get_source_file_name(&mut self, v: bool) { self.set_bit(11, v); }
    // [12]
    pub fn set_can_get_line_numbers(&mut self, v: bool) { self.set_bit(12, v); }
    // [24]
    pub fn set_can_generate_method_entry_events(&mut self, v: bool) { self.set_bit(24, v); }
    // [26]
    pub fn set_can_generate_all_class_hook_events(&mut self, v: bool) { self.set_bit(26, v); }
    // [27]
    pub fn set_can_generate_compiled_method_load_events(&mut self, v: bool) { self.set_bit(27, v); }
    // [28]
    pub fn set_can_generate_monitor_events(&mut self, v: bool) { self.set_bit(28, v); }
    // [35]
    pub fn set_can_get_constant_pool(&mut self, v: bool) { self.set_bit(35, v); }
    // [37]
    pub fn set_can_retransform_classes(&mut self, v: bool) { self.set_bit(37, v); }
    // [38]
    pub fn set_can_retransform_any_class(&mut self, v: bool) { self.set_bit(38, v); }
}

// =============================================================================
// Function typedefs for the named vtable slots
// =============================================================================

pub type JvmtiSetEventNotificationModeFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    mode: jint,
    event_type: u32,
    event_thread: jthread,
) -> jvmtiError;

pub type JvmtiGetThreadInfoFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    thread: jthread,
    info_ptr: *mut jvmtiThreadInfo,
) -> jvmtiError;

pub type JvmtiSetFieldModificationWatchFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, field: jfieldID) -> jvmtiError;

pub type JvmtiDeallocateFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;

pub type JvmtiGetClassSignatureFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    klass: jclass,
    signature_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError;

pub type JvmtiGetMethodNameFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    method: jmethodID,
    name_ptr: *mut *mut c_char,
    signature_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError;

pub type JvmtiGetMethodDeclaringClassFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    method: jmethodID,
    declaring_class_ptr: *mut jclass,
) -> jvmtiError;

pub type JvmtiGetStackTraceFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    thread: jthread,
    start_depth: jint,
    max_frame_count: jint,
    frame_buffer: *mut jvmtiFrameInfo,
    count_ptr: *mut jint,
) -> jvmtiError;

pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    callbacks: *const jvmtiEventCallbacks,
    size_of_callbacks: jint,
) -> jvmtiError;

pub type JvmtiAddCapabilitiesFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    capabilities_ptr: *const jvmtiCapabilities,
) -> jvmtiError;

// =============================================================================
// Event callback typedefs
// =============================================================================

pub type JvmtiClassLoadFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    klass: jclass,
);

pub type JvmtiFieldModificationFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
    location: jlocation,
    field_klass: jclass,
    object: jobject,
    field: jfieldID,
    signature_type: c_char,
    new_value: jvalue,
);

/// Placeholder for callback slots this agent never fills.
pub type JvmtiEventReservedFn = unsafe extern "system" fn();

// =============================================================================
// jvmtiInterface_1_ - the jvmtiEnv function table
//
// Padding spans (1-based slots):
//   1        reserved
//   3-8      GetAllModules .. InterruptThread
//   10-42    monitors, thread groups, frames, locals, raw monitors,
//            breakpoints, field access watches
//   44-46    ClearFieldModificationWatch .. Allocate
//   49-63    class queries, object queries, field queries
//   66-103   method queries, class lists, early return, redefinition,
//            modules, per-thread storage
//   105-121  tagging and heap iteration
//   123-141  extensions, environment queries, timers
// =============================================================================

#[repr(C)]
pub struct jvmtiInterface_1_ {
    pub reserved1: *mut c_void,
    /*   2 */ pub SetEventNotificationMode: JvmtiSetEventNotificationModeFn,
    pub pad_to_get_thread_info: [*mut c_void; 6],
    /*   9 */ pub GetThreadInfo: JvmtiGetThreadInfoFn,
    pub pad_to_field_watch: [*mut c_void; 33],
    /*  43 */ pub SetFieldModificationWatch: JvmtiSetFieldModificationWatchFn,
    pub pad_to_deallocate: [*mut c_void; 3],
    /*  47 */ pub Deallocate: JvmtiDeallocateFn,
    /*  48 */ pub GetClassSignature: JvmtiGetClassSignatureFn,
    pub pad_to_method_name: [*mut c_void; 15],
    /*  64 */ pub GetMethodName: JvmtiGetMethodNameFn,
    /*  65 */ pub GetMethodDeclaringClass: JvmtiGetMethodDeclaringClassFn,
    pub pad_to_stack_trace: [*mut c_void; 38],
    /* 104 */ pub GetStackTrace: JvmtiGetStackTraceFn,
    pub pad_to_set_callbacks: [*mut c_void; 17],
    /* 122 */ pub SetEventCallbacks: JvmtiSetEventCallbacksFn,
    pub pad_to_add_capabilities: [*mut c_void; 19],
    /* 142 */ pub AddCapabilities: JvmtiAddCapabilitiesFn,
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}

// =============================================================================
// Event callbacks
//
// Truncated after the FieldModification slot; SetEventCallbacks takes the
// struct size, and the VM treats everything past it as unset.
// =============================================================================

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct jvmtiEventCallbacks {
    pub VMInit: Option<JvmtiEventReservedFn>,
    pub VMDeath: Option<JvmtiEventReservedFn>,
    pub ThreadStart: Option<JvmtiEventReservedFn>,
    pub ThreadEnd: Option<JvmtiEventReservedFn>,
    pub ClassFileLoadHook: Option<JvmtiEventReservedFn>,
    pub ClassLoad: Option<JvmtiClassLoadFn>,
    pub ClassPrepare: Option<JvmtiEventReservedFn>,
    pub VMStart: Option<JvmtiEventReservedFn>,
    pub Exception: Option<JvmtiEventReservedFn>,
    pub ExceptionCatch: Option<JvmtiEventReservedFn>,
    pub SingleStep: Option<JvmtiEventReservedFn>,
    pub FramePop: Option<JvmtiEventReservedFn>,
    pub Breakpoint: Option<JvmtiEventReservedFn>,
    pub FieldAccess: Option<JvmtiEventReservedFn>,
    pub FieldModification: Option<JvmtiFieldModificationFn>,
}
