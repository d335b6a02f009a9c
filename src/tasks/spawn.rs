//! Core-pinned task spawning for the ESP32 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority
//! and stack size, and registers the task name for the headroom monitor.
//! On non-ESP targets, falls back to plain thread spawn.
//!
//! # ESP-IDF threading model
//!
//! ESP-IDF implements `std::thread` via pthreads, which are thin wrappers
//! around FreeRTOS tasks. `esp_pthread_set_cfg()` sets thread-local
//! configuration that applies to the *next* `pthread_create()` call from
//! the calling thread, so the config→spawn pair must not be interleaved
//! with other thread creation on the same thread.

use crate::diagnostics::TaskRegistry;

/// CPU core identifiers for the ESP32 Xtensa LX6 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU) — protocol stacks (WiFi, lwIP) and serial I/O.
    Pro = 0,
    /// Core 1 (APP_CPU) — acquisition and control loops.
    App = 1,
}

/// Spawn a task thread pinned to a core, with its name registered for
/// stack-headroom reporting. The `name` parameter must be NUL-terminated
/// (e.g. `"gps\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_task(
    registry: &TaskRegistry,
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> std::thread::JoinHandle<()> {
    unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = stack_kb * 1024;
        cfg.thread_name = name.as_ptr() as *const _;
        let ret = esp_idf_svc::sys::esp_pthread_set_cfg(&cfg);
        assert!(
            ret == esp_idf_svc::sys::ESP_OK,
            "esp_pthread_set_cfg failed: {ret}"
        );
    }

    let display_name = name.trim_end_matches('\0');
    registry.register(display_name);
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
        .expect("spawn_task: thread creation failed")
}

/// Simulation fallback — ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_task(
    registry: &TaskRegistry,
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> std::thread::JoinHandle<()> {
    let display_name = name.trim_end_matches('\0');
    registry.register(display_name);
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        display_name,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .expect("spawn_task(sim): thread creation failed")
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn spawned_task_is_registered_without_nul() {
        let registry = TaskRegistry::new();
        let handle = spawn_task(&registry, Core::App, 5, 4, "unit-spawn\0", || {});
        handle.join().unwrap();
        assert!(registry.names().contains(&"unit-spawn"));
    }
}
