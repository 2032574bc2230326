//! Listen-only key-down tap: the system-wide observer on macOS.
//!
//! A listen-only tap cannot consume events, so the combination still reaches
//! whatever application it was typed into.

use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::OnceLock;

use tauri::AppHandle;

use super::{HotkeyCombo, HotkeySource, ModifierFlags};

type CGEventTapProxy = *mut std::ffi::c_void;
type CGEventRef = *mut std::ffi::c_void;
type CFMachPortRef = *mut std::ffi::c_void;
type CFRunLoopSourceRef = *mut std::ffi::c_void;
type CFRunLoopRef = *mut std::ffi::c_void;
type CFStringRef = *const std::ffi::c_void;

type CGEventType = u32;
type CGEventMask = u64;
type CGEventField = u32;
type CGEventTapLocation = u32;
type CGEventTapPlacement = u32;
type CGEventTapOptions = u32;

const K_CG_SESSION_EVENT_TAP: CGEventTapLocation = 1;
const K_CG_HEAD_INSERT_EVENT_TAP: CGEventTapPlacement = 0;
const K_CG_EVENT_TAP_OPTION_LISTEN_ONLY: CGEventTapOptions = 1;
const K_CG_EVENT_KEY_DOWN: CGEventType = 10;
const K_CG_EVENT_TAP_DISABLED_BY_TIMEOUT: CGEventType = 0xFFFF_FFFE;
const K_CG_EVENT_TAP_DISABLED_BY_USER_INPUT: CGEventType = 0xFFFF_FFFF;
const K_CG_KEYBOARD_EVENT_KEYCODE: CGEventField = 9;

type CGEventTapCallBack = unsafe extern "C" fn(
    CGEventTapProxy,
    CGEventType,
    CGEventRef,
    *mut std::ffi::c_void,
) -> CGEventRef;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: CGEventTapLocation,
        place: CGEventTapPlacement,
        options: CGEventTapOptions,
        events_of_interest: CGEventMask,
        callback: CGEventTapCallBack,
        user_info: *mut std::ffi::c_void,
    ) -> CFMachPortRef;
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    fn CGEventGetIntegerValueField(event: CGEventRef, field: CGEventField) -> i64;
    fn CGEventGetFlags(event: CGEventRef) -> u64;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: *const std::ffi::c_void,
        port: CFMachPortRef,
        order: i64,
    ) -> CFRunLoopSourceRef;
    fn CFRunLoopGetCurrent() -> CFRunLoopRef;
    fn CFRunLoopAddSource(rl: CFRunLoopRef, source: CFRunLoopSourceRef, mode: CFStringRef);
    fn CFRunLoopRun();
    fn CFRunLoopStop(rl: CFRunLoopRef);
    fn CFRelease(cf: *const std::ffi::c_void);
    fn CFMachPortInvalidate(port: CFMachPortRef);

    static kCFRunLoopCommonModes: CFStringRef;
}

static RUNNING: AtomicBool = AtomicBool::new(false);
static RUN_LOOP_REF: AtomicPtr<std::ffi::c_void> = AtomicPtr::new(std::ptr::null_mut());
static TAP_REF: AtomicPtr<std::ffi::c_void> = AtomicPtr::new(std::ptr::null_mut());
static APP_HANDLE: OnceLock<AppHandle> = OnceLock::new();

unsafe extern "C" fn tap_callback(
    _proxy: CGEventTapProxy,
    event_type: CGEventType,
    event: CGEventRef,
    _user_info: *mut std::ffi::c_void,
) -> CGEventRef {
    if event_type == K_CG_EVENT_TAP_DISABLED_BY_TIMEOUT
        || event_type == K_CG_EVENT_TAP_DISABLED_BY_USER_INPUT
    {
        let tap = TAP_REF.load(Ordering::SeqCst);
        if !tap.is_null() {
            tracing::warn!("Key event tap was disabled by the system, re-enabling");
            unsafe { CGEventTapEnable(tap, true) };
        }
        return event;
    }
    if event_type != K_CG_EVENT_KEY_DOWN {
        return event;
    }

    let keycode = unsafe { CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_KEYCODE) };
    let flags = ModifierFlags::from_cg_flags(unsafe { CGEventGetFlags(event) });
    let Ok(keycode) = u16::try_from(keycode) else {
        return event;
    };
    if !HotkeyCombo::TRANSLATE.matches(flags, keycode) {
        return event;
    }

    // Presses inside our own window are the local observer's business.
    if crate::platform::is_own_app_active() {
        return event;
    }

    if let Some(app) = APP_HANDLE.get() {
        super::handle_hotkey(app, HotkeySource::Global);
    }

    event
}

pub fn start_key_tap(app_handle: &AppHandle) -> anyhow::Result<()> {
    if RUNNING.load(Ordering::SeqCst) {
        return Ok(());
    }

    let _ = APP_HANDLE.set(app_handle.clone());

    let event_mask: CGEventMask = 1 << K_CG_EVENT_KEY_DOWN;

    std::thread::Builder::new()
        .name("hotkey-tap".into())
        .spawn(move || unsafe {
            let tap = CGEventTapCreate(
                K_CG_SESSION_EVENT_TAP,
                K_CG_HEAD_INSERT_EVENT_TAP,
                K_CG_EVENT_TAP_OPTION_LISTEN_ONLY,
                event_mask,
                tap_callback,
                std::ptr::null_mut(),
            );

            if tap.is_null() {
                tracing::error!(
                    "Failed to create key event tap. \
                     Accessibility permission may be required."
                );
                if let Some(app) = APP_HANDLE.get() {
                    use tauri::Manager;
                    app.state::<crate::state::AppState>()
                        .diagnostics
                        .log("Failed to register global hotkey: event tap could not be created");
                }
                return;
            }

            let source = CFMachPortCreateRunLoopSource(std::ptr::null(), tap, 0);
            let run_loop = CFRunLoopGetCurrent();

            TAP_REF.store(tap, Ordering::SeqCst);
            RUN_LOOP_REF.store(run_loop, Ordering::SeqCst);
            RUNNING.store(true, Ordering::SeqCst);

            CFRunLoopAddSource(run_loop, source, kCFRunLoopCommonModes);
            tracing::info!("Key event tap started");
            CFRunLoopRun();

            // Cleanup after CFRunLoopStop
            TAP_REF.store(std::ptr::null_mut(), Ordering::SeqCst);
            CFMachPortInvalidate(tap);
            CFRelease(tap);
            CFRelease(source);
            RUNNING.store(false, Ordering::SeqCst);
            RUN_LOOP_REF.store(std::ptr::null_mut(), Ordering::SeqCst);
            tracing::info!("Key event tap stopped");
        })?;

    Ok(())
}

pub fn stop_key_tap() {
    if !RUNNING.load(Ordering::SeqCst) {
        return;
    }
    let rl = RUN_LOOP_REF.load(Ordering::SeqCst);
    if !rl.is_null() {
        unsafe { CFRunLoopStop(rl) };
    }
}
