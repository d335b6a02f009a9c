//! Task headroom monitor.
//!
//! Periodically collects stack high-water marks and free heap for every
//! registered task and prints them, gated by the diagnostics log category.

use core::time::Duration;

use futures_lite::future::block_on;

use crate::config::SystemConfig;
use crate::diagnostics::{DiagnosticsReport, TaskRegistry};
use crate::logging::LogCategories;

pub const NAME: &str = "monitor\0";

pub fn run(
    registry: &'static TaskRegistry,
    categories: &'static LogCategories,
    config: &SystemConfig,
) {
    let period = Duration::from_secs(u64::from(config.diagnostics_period_secs));

    block_on(async {
        loop {
            async_io_mini::Timer::after(period).await;
            DiagnosticsReport::collect(registry).log(categories);
        }
    })
}
