//! ESP-IDF runtime symbol providers for third-party crates.
//!
//! Two symbol pairs are resolved at link time:
//!
//! - `critical-section` 1.x acquire/release, used by `embassy-sync`'s
//!   `CriticalSectionRawMutex`.  Backed by one process-wide mutex,
//!   re-entrant per thread.
//! - The `embassy-time` driver (`now` + `schedule_wake`), which
//!   `async-io-mini`'s `Timer` reads for every back-off and deadline in the
//!   request server.  Backed by `esp_timer`.
//!
//! On the host both come from the `std` features of those crates.

// Linked for its `std` time driver; nothing calls it by name.
#[cfg(not(target_os = "espidf"))]
use embassy_time as _;

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use core::time::Duration;
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static CRITICAL_SECTION_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static CRITICAL_SECTION_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CRITICAL_SECTION_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Runtime-backed critical-section acquire used by `critical-section` 1.x.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        CRITICAL_SECTION_GUARD.with(|guard| {
            let d = depth.get();
            if d == 0 {
                // The guarded value is `()`; a poisoned lock carries no
                // broken state.
                let lock = CRITICAL_SECTION_MUTEX
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                *guard.borrow_mut() = Some(lock);
            }
            let new_depth = d.saturating_add(1);
            depth.set(new_depth);
            new_depth
        })
    })
}

/// Runtime-backed critical-section release used by `critical-section` 1.x.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        CRITICAL_SECTION_GUARD.with(|guard| {
            let d = depth.get();
            if d == 0 {
                return;
            }
            let new_depth = d - 1;
            depth.set(new_depth);
            if new_depth == 0 {
                *guard.borrow_mut() = None;
            }
        })
    })
}

/// Monotonic microseconds since boot.  `embassy-time`'s tick rate is 1 MHz.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_now() -> u64 {
    // SAFETY: esp_timer_get_time has no preconditions once the IDF is up.
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

/// Runtime-backed wake scheduler for async timers.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_schedule_wake(at: u64, waker: *mut core::ffi::c_void) {
    if waker.is_null() {
        return;
    }

    // SAFETY: embassy-time passes a valid pointer to a `Waker` for the duration
    // of schedule registration. We clone it immediately and move the clone.
    let waker = unsafe { (&*(waker as *const core::task::Waker)).clone() };
    std::thread::spawn(move || {
        let now = _embassy_time_now();
        if at > now {
            std::thread::sleep(Duration::from_micros(at - now));
        }
        waker.wake();
    });
}
