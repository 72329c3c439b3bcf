//! FFI bindings for Escape Rig
//!
//! This module provides C-compatible functions for driving a session from a
//! host UI shell. Snapshots are returned as JSON C strings that must be freed by
//! the caller using `escape_free_string`. Action functions return the attempt
//! outcome code (0 ignored, 1 missed, 2 progressed, 3 completed) or -1 on error.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::random::SeededRandom;
use crate::session::Session;
use crate::stage::{AttemptOutcome, Knot};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Borrow the session behind a handle, recording an error for NULL
unsafe fn session_mut<'a>(handle: *mut EscapeSessionHandle) -> Option<&'a mut Session> {
    if handle.is_null() {
        set_last_error("Null session pointer");
        return None;
    }
    Some(&mut (*handle).session)
}

fn outcome_code(outcome: Option<AttemptOutcome>) -> i32 {
    outcome.map_or(-1, AttemptOutcome::code)
}

// ============================================================================
// Session Lifecycle
// ============================================================================

/// Opaque handle to a Session
pub struct EscapeSessionHandle {
    session: Session,
}

/// Create a session with the default configuration and a seeded random stream.
///
/// # Safety
/// - Returns a pointer to a newly allocated session.
/// - Must be freed with `escape_session_free`.
#[no_mangle]
pub unsafe extern "C" fn escape_session_new(seed: u64) -> *mut EscapeSessionHandle {
    clear_last_error();
    let handle = Box::new(EscapeSessionHandle {
        session: Session::with_seed(seed),
    });
    Box::into_raw(handle)
}

/// Create a session from a JSON configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string.
/// - Must be freed with `escape_session_free`.
/// - Returns NULL on error; call `escape_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn escape_session_new_with_config(
    config_json: *const c_char,
    seed: u64,
) -> *mut EscapeSessionHandle {
    clear_last_error();

    let json_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        }
    };

    let session = EngineConfig::from_json(&json_str)
        .and_then(|config| Session::new(config, Box::new(SeededRandom::from_seed(seed))));

    match session {
        Ok(session) => Box::into_raw(Box::new(EscapeSessionHandle { session })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a session.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn escape_session_free(handle: *mut EscapeSessionHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Reset the session to stage 0 with fresh random parameters.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn escape_session_reset(handle: *mut EscapeSessionHandle) -> i32 {
    clear_last_error();
    match session_mut(handle) {
        Some(session) => {
            session.reset();
            0
        }
        None => -1,
    }
}

// ============================================================================
// Time
// ============================================================================

/// Advance the session clock by one second.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn escape_session_tick(handle: *mut EscapeSessionHandle) -> i32 {
    clear_last_error();
    match session_mut(handle) {
        Some(session) => {
            session.tick();
            0
        }
        None => -1,
    }
}

/// Let `delta_ms` milliseconds pass, driving stage timers and whole-second ticks.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn escape_session_pass_time(
    handle: *mut EscapeSessionHandle,
    delta_ms: u64,
) -> i32 {
    clear_last_error();
    match session_mut(handle) {
        Some(session) => {
            session.pass_time_ms(delta_ms);
            0
        }
        None => -1,
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Lockpick: stop the needle.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
#[no_mangle]
pub unsafe extern "C" fn escape_session_try(handle: *mut EscapeSessionHandle) -> i32 {
    clear_last_error();
    outcome_code(session_mut(handle).map(|s| s.try_lock()))
}

/// Memory: press knot `knot` (0 rose, 1 amber, 2 emerald, 3 sky).
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
#[no_mangle]
pub unsafe extern "C" fn escape_session_press(handle: *mut EscapeSessionHandle, knot: u8) -> i32 {
    clear_last_error();
    let knot = match Knot::try_from(knot) {
        Ok(k) => k,
        Err(e) => {
            set_last_error(&e.to_string());
            return -1;
        }
    };
    outcome_code(session_mut(handle).map(|s| s.press(knot)))
}

/// Slider: drag the handle to `position` (0-100). Not an attempt.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
/// - Returns 1 if applied, 0 if ignored, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn escape_session_set_position(
    handle: *mut EscapeSessionHandle,
    position: f64,
) -> i32 {
    clear_last_error();
    match session_mut(handle) {
        Some(session) => i32::from(session.set_slider_position(position)),
        None => -1,
    }
}

/// Slider: let go of the handle.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
#[no_mangle]
pub unsafe extern "C" fn escape_session_release(handle: *mut EscapeSessionHandle) -> i32 {
    clear_last_error();
    outcome_code(session_mut(handle).map(|s| s.release()))
}

// ============================================================================
// State
// ============================================================================

/// Current session snapshot as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `escape_session_new*`.
/// - Returns a newly allocated string that must be freed with `escape_free_string`.
/// - Returns NULL on error; call `escape_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn escape_session_snapshot(handle: *mut EscapeSessionHandle) -> *mut c_char {
    clear_last_error();
    let Some(session) = session_mut(handle) else {
        return ptr::null_mut();
    };

    match serde_json::to_string(&session.snapshot()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Escape Rig functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an Escape Rig function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn escape_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Escape Rig call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn escape_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn escape_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
