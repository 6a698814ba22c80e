//! The live [`Host`] over raw `jvmtiEnv`/`JNIEnv` pointers.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_uchar};
use std::ptr;

use log::warn;

use crate::host::{Dealloc, FrameInfo, Host, HostError};
use crate::scoped::ScopedBuf;
use crate::sys::jni::{jclass, jfieldID, jint, jmethodID, jobject, jthread, JNIEnv};
use crate::sys::jvmti::{
    jvmtiEnv, jvmtiError, jvmtiFrameInfo, jvmtiInterface_1_, jvmtiThreadInfo, JVMTI_ERROR_NONE,
};

/// Borrowed view of the two VM interfaces a callback receives. Holds raw
/// pointers only; the VM owns both environments.
pub struct JvmtiHost {
    jvmti: *mut jvmtiEnv,
    jni: *mut JNIEnv,
}

impl JvmtiHost {
    /// # Safety
    ///
    /// Both pointers must be the live, non-null environment pointers the VM
    /// passed into the current callback, and the host must not outlive them.
    pub unsafe fn from_raw(jvmti: *mut jvmtiEnv, jni: *mut JNIEnv) -> Self {
        Self { jvmti, jni }
    }

    fn table(&self) -> &jvmtiInterface_1_ {
        unsafe { &*(*self.jvmti).functions }
    }

    fn check(err: jvmtiError) -> Result<(), HostError> {
        if err == JVMTI_ERROR_NONE {
            Ok(())
        } else {
            Err(HostError::Jvmti(err))
        }
    }
}

impl Dealloc for JvmtiHost {
    fn deallocate(&self, mem: *mut c_void) {
        let err = unsafe { (self.table().Deallocate)(self.jvmti, mem as *mut c_uchar) };
        if err != JVMTI_ERROR_NONE {
            warn!("Deallocate failed: {err:?}");
        }
    }
}

impl Host for JvmtiHost {
    fn class_signature(&self, class: jclass) -> Result<ScopedBuf<'_, c_char>, HostError> {
        let mut signature = ScopedBuf::empty(self);
        let err = unsafe {
            (self.table().GetClassSignature)(self.jvmti, class, signature.slot(), ptr::null_mut())
        };
        Self::check(err)?;
        Ok(signature)
    }

    fn method_name(&self, method: jmethodID) -> Result<ScopedBuf<'_, c_char>, HostError> {
        let mut name = ScopedBuf::empty(self);
        let err = unsafe {
            (self.table().GetMethodName)(
                self.jvmti,
                method,
                name.slot(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        Self::check(err)?;
        Ok(name)
    }

    fn method_declaring_class(&self, method: jmethodID) -> Result<jclass, HostError> {
        let mut class: jclass = ptr::null_mut();
        let err =
            unsafe { (self.table().GetMethodDeclaringClass)(self.jvmti, method, &mut class) };
        Self::check(err)?;
        Ok(class)
    }

    fn thread_name(&self, thread: jthread) -> Result<ScopedBuf<'_, c_char>, HostError> {
        let mut info = jvmtiThreadInfo::default();
        let err = unsafe { (self.table().GetThreadInfo)(self.jvmti, thread, &mut info) };
        Self::check(err)?;
        Ok(ScopedBuf::from_raw(self, info.name))
    }

    fn stack_trace(
        &self,
        thread: jthread,
        start_depth: i32,
        max_frames: i32,
    ) -> Result<Vec<FrameInfo>, HostError> {
        let mut raw = vec![jvmtiFrameInfo::default(); max_frames.max(0) as usize];
        let mut count: jint = 0;
        let err = unsafe {
            (self.table().GetStackTrace)(
                self.jvmti,
                thread,
                start_depth,
                max_frames,
                raw.as_mut_ptr(),
                &mut count,
            )
        };
        Self::check(err)?;
        raw.truncate(count.max(0) as usize);
        Ok(raw
            .into_iter()
            .map(|f| FrameInfo { method: f.method, location: f.location })
            .collect())
    }

    fn method_id(&self, class: jclass, name: &str, sig: &str) -> Result<jmethodID, HostError> {
        let c_name = CString::new(name).map_err(|_| HostError::NullId)?;
        let c_sig = CString::new(sig).map_err(|_| HostError::NullId)?;
        let id = unsafe {
            ((**self.jni).GetMethodID)(self.jni, class, c_name.as_ptr(), c_sig.as_ptr())
        };
        if id.is_null() {
            return Err(HostError::NullId);
        }
        Ok(id)
    }

    fn field_id(&self, class: jclass, name: &str, sig: &str) -> Result<jfieldID, HostError> {
        let c_name = CString::new(name).map_err(|_| HostError::NullId)?;
        let c_sig = CString::new(sig).map_err(|_| HostError::NullId)?;
        let id =
            unsafe { ((**self.jni).GetFieldID)(self.jni, class, c_name.as_ptr(), c_sig.as_ptr()) };
        if id.is_null() {
            return Err(HostError::NullId);
        }
        Ok(id)
    }

    fn set_field_modification_watch(
        &self,
        class: jclass,
        field: jfieldID,
    ) -> Result<(), HostError> {
        let err =
            unsafe { (self.table().SetFieldModificationWatch)(self.jvmti, class, field) };
        Self::check(err)
    }

    fn string_text(&self, s: jobject) -> Option<String> {
        if s.is_null() {
            return None;
        }
        let jni = unsafe { &**self.jni };
        let chars = unsafe { (jni.GetStringUTFChars)(self.jni, s, ptr::null_mut()) };
        if chars.is_null() {
            return None;
        }
        let text = unsafe { CStr::from_ptr(chars) }.to_string_lossy().into_owned();
        unsafe { (jni.ReleaseStringUTFChars)(self.jni, s, chars) };
        Some(text)
    }
}
