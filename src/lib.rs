//! # startcatch
//!
//! An in-process JVMTI agent that answers one question: **who starts the
//! thread with a given name?**
//!
//! Some library buried in a dependency tree spins up a thread (the classic
//! offender is `HighResTimer`) and nothing in the application names the code
//! that created it. This agent watches writes to `java.lang.Thread`'s `name`
//! field and, when the incoming value matches the configured name, prints
//! the constructing call stack to stderr while the `Thread` object is still
//! inside its constructor.
//!
//! ## Usage
//!
//! ```bash
//! cargo build --release
//! java -agentpath:./target/release/libstartcatch.so SomeApp
//! java -agentpath:./target/release/libstartcatch.so=thread=Reaper,frames=15 SomeApp
//! ```
//!
//! Output on a match:
//!
//! ```text
//! Thread HighResTimer is about to get started
//! ========= main ==============
//! Ljava/lang/Thread;#setName
//! Lcom/example/timer/TimerFactory;#newTimer
//! Lcom/example/App;#main
//! ```
//!
//! ## Architecture
//!
//! The event logic ([`watcher`], [`filter`], [`capture`]) is written against
//! the [`host::Host`] trait and never touches an environment pointer, so it
//! runs under tests with a mock host. [`jvmti_host::JvmtiHost`] is the live
//! implementation and [`agent`] owns the FFI boundary: `Agent_OnLoad`,
//! `Agent_OnUnload`, and the two event trampolines.

pub mod agent;
pub mod capture;
pub mod config;
pub mod filter;
pub mod host;
pub mod introspect;
pub mod jvmti_host;
pub mod scoped;
pub mod state;
pub mod sys;
pub mod watcher;

pub use capture::capture_and_print;
pub use config::{Config, ConfigError};
pub use filter::{field_written, CaptureDecision, FieldWrite};
pub use host::{Dealloc, FrameInfo, Host, HostError};
pub use jvmti_host::JvmtiHost;
pub use scoped::ScopedBuf;
pub use state::WatchTargets;
pub use watcher::{class_loaded, WatchOutcome, THREAD_CLASS_SIGNATURE};
