//! Raw FFI bindings to the subset of JNI and JVMTI this agent calls.

pub mod jni;
pub mod jvmti;
