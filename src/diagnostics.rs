//! Runtime diagnostics: per-task stack headroom and free heap.
//!
//! Every spawned task registers its name; the monitor task periodically
//! collects a [`DiagnosticsReport`] and prints it, gated by the
//! diagnostics log category. Stack headroom is the FreeRTOS high-water
//! mark — the closest any task has come to overflowing its stack since
//! boot — which is what you watch when resizing task stacks.

use std::sync::Mutex;

use crate::logging::{LogCategories, LogCategory};

/// Upper bound on registered tasks; spawning more than this is a bug in
/// the bootstrap wiring.
pub const MAX_TASKS: usize = 12;

/// Names of every spawned task, registered at spawn time.
pub struct TaskRegistry {
    names: Mutex<heapless::Vec<&'static str, MAX_TASKS>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub const fn new() -> Self {
        Self {
            names: Mutex::new(heapless::Vec::new()),
        }
    }

    /// Record a task name. Names must be unique and NUL-free; they are
    /// looked up against the FreeRTOS task table by exact match.
    pub fn register(&self, name: &'static str) {
        let mut names = match self.names.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if names.push(name).is_err() {
            log::error!("task registry full, {name} not tracked");
        }
    }

    pub fn names(&self) -> heapless::Vec<&'static str, MAX_TASKS> {
        match self.names.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TaskReport {
    pub name: &'static str,
    /// Minimum free stack observed since boot, in bytes. `None` when the
    /// task is not (or no longer) known to the scheduler.
    pub stack_headroom_bytes: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct DiagnosticsReport {
    pub tasks: heapless::Vec<TaskReport, MAX_TASKS>,
    pub free_heap_bytes: u32,
}

impl DiagnosticsReport {
    #[cfg(target_os = "espidf")]
    pub fn collect(registry: &TaskRegistry) -> Self {
        use esp_idf_svc::sys::*;

        let mut tasks = heapless::Vec::new();
        for name in registry.names() {
            let mut name_buf = [0u8; 24];
            let bytes = name.as_bytes();
            let len = bytes.len().min(name_buf.len() - 1);
            name_buf[..len].copy_from_slice(&bytes[..len]);

            // SAFETY: name_buf is NUL-terminated; the returned handle is
            // only used for an immediate high-water-mark query.
            let headroom = unsafe {
                let handle = xTaskGetHandle(name_buf.as_ptr() as *const _);
                if handle.is_null() {
                    None
                } else {
                    // Words to bytes.
                    Some(uxTaskGetStackHighWaterMark(handle) * 4)
                }
            };
            let _ = tasks.push(TaskReport {
                name,
                stack_headroom_bytes: headroom,
            });
        }

        Self {
            tasks,
            free_heap_bytes: unsafe { esp_get_free_heap_size() },
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect(registry: &TaskRegistry) -> Self {
        // Synthetic values so the host report path exercises the same
        // formatting and gating branches as real hardware.
        let mut tasks = heapless::Vec::new();
        for name in registry.names() {
            let _ = tasks.push(TaskReport {
                name,
                stack_headroom_bytes: Some(1024 + (name.len() as u32) * 16),
            });
        }
        Self {
            tasks,
            free_heap_bytes: 307_200,
        }
    }

    /// Print the report, one line per task, if the diagnostics category
    /// is enabled.
    pub fn log(&self, categories: &LogCategories) {
        if !categories.enabled(LogCategory::Diagnostics) {
            return;
        }
        for task in &self.tasks {
            match task.stack_headroom_bytes {
                Some(bytes) => {
                    log::info!("[Task]{} has {bytes} bytes of free stack", task.name);
                }
                None => log::info!("[Task]{} not found in scheduler", task.name),
            }
        }
        log::info!("[Task]System free heap: {}", self.free_heap_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_each_registered_task() {
        let registry = TaskRegistry::new();
        registry.register("beacon");
        registry.register("gps");
        let report = DiagnosticsReport::collect(&registry);
        let names: Vec<&str> = report.tasks.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["beacon", "gps"]);
    }

    #[test]
    fn collected_report_has_heap_and_headroom() {
        let registry = TaskRegistry::new();
        registry.register("instrumentation");
        let report = DiagnosticsReport::collect(&registry);
        assert!(report.free_heap_bytes > 0);
        assert!(report.tasks[0].stack_headroom_bytes.is_some());
    }

    #[test]
    fn disabled_category_suppresses_output() {
        // Only checks the gate does not panic with an empty registry.
        let registry = TaskRegistry::new();
        let categories = LogCategories::none();
        DiagnosticsReport::collect(&registry).log(&categories);
    }

    #[test]
    fn registry_overflow_is_non_fatal() {
        let registry = TaskRegistry::new();
        for _ in 0..(MAX_TASKS + 2) {
            registry.register("extra");
        }
        assert_eq!(registry.names().len(), MAX_TASKS);
    }
}
