// startcatch/src/sys/jni.rs
//
// Minimal JNI bindings: the types and function-table slots this agent
// touches, nothing more. Slot numbering follows jni.h (stable since JDK 1.6;
// newer JDKs only append). Untouched slots are kept as pointer-sized padding
// so the named slots land at the right offsets.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

use std::ffi::c_void;
use std::os::raw::c_char;

// =============================================================================
// Primitive types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jchar = u16;
pub type jshort = i16;
pub type jfloat = f32;
pub type jdouble = f64;

// =============================================================================
// Reference and ID types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jstring = jobject;
pub type jthread = jobject;

pub type jmethodID = *mut c_void;
pub type jfieldID = *mut c_void;

// =============================================================================
// jvalue union
// =============================================================================

#[repr(C)]
#[derive(Copy, Clone)]
pub union jvalue {
    pub z: jboolean,
    pub b: jbyte,
    pub c: jchar,
    pub s: jshort,
    pub i: jint,
    pub j: jlong,
    pub f: jfloat,
    pub d: jdouble,
    pub l: jobject,
}

// =============================================================================
// Constants
// =============================================================================

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;

// =============================================================================
// JNINativeInterface_ - the JNIEnv function table
//
// Named slots: GetMethodID (33), GetFieldID (94), GetStringUTFChars (169),
// ReleaseStringUTFChars (170). Padding spans:
//   0-3    reserved
//   4-32   GetVersion .. IsInstanceOf
//   34-93  Call<Type>Method / CallNonvirtual<Type>Method families
//   95-168 field accessors, static members, string functions up to
//          GetStringUTFLength
// =============================================================================

#[repr(C)]
pub struct JNINativeInterface_ {
    pub reserved: [*mut c_void; 4],
    pub pad_to_get_method_id: [*mut c_void; 29],
    pub GetMethodID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jmethodID,
    pub pad_to_get_field_id: [*mut c_void; 60],
    pub GetFieldID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jfieldID,
    pub pad_to_string_utf: [*mut c_void; 74],
    pub GetStringUTFChars: unsafe extern "system" fn(
        env: *mut JNIEnv,
        str: jstring,
        isCopy: *mut jboolean,
    ) -> *const c_char,
    pub ReleaseStringUTFChars:
        unsafe extern "system" fn(env: *mut JNIEnv, str: jstring, chars: *const c_char),
}

/// In C, `JNIEnv` is a pointer to the function table; callbacks receive a
/// `*mut JNIEnv`.
pub type JNIEnv = *const JNINativeInterface_;

// =============================================================================
// JNIInvokeInterface_ - the JavaVM function table
// =============================================================================

#[repr(C)]
pub struct JNIInvokeInterface_ {
    pub reserved0: *mut c_void,
    pub reserved1: *mut c_void,
    pub reserved2: *mut c_void,
    pub DestroyJavaVM: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub AttachCurrentThread:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
    pub DetachCurrentThread: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub GetEnv:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint,
    pub AttachCurrentThreadAsDaemon:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
}

/// `JavaVM` is directly the vtable pointer (C ABI definition).
pub type JavaVM = *const JNIInvokeInterface_;
