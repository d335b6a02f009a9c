//! Serial console task: command input and telemetry output.
//!
//! Two cooperative futures on a local executor share the console:
//!
//! ```text
//!  ┌─────────────────────────────────────────────┐
//!  │  futures_lite::block_on                     │
//!  │  ┌───────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor         │  │
//!  │  │  ┌──────────────┐  ┌───────────────┐  │  │
//!  │  │  │ Read + parse │  │ Frame writer  │  │  │
//!  │  │  │ 10ms poll ⏱  │  │ wake-on-send  │  │  │
//!  │  │  └──────────────┘  └───────────────┘  │  │
//!  │  └───────────────────────────────────────┘  │
//!  └─────────────────────────────────────────────┘
//! ```
//!
//! The reader polls for operator bytes and feeds them through the framer
//! and dispatcher; the writer parks on the telemetry channel and writes
//! each frame as it arrives. An `R` verb's HTTP fetch runs inline on the
//! reader future — it stalls telemetry for the duration, which is fine
//! for a bench diagnostic.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use futures_lite::future::block_on;
use log::warn;

use crate::mailbox::Hub;
use crate::ports::{Console, HttpFetch};
use crate::protocol::{Dispatcher, LineFramer};

pub const NAME: &str = "serial\0";

/// Input poll period. Human typing and a 115200 console both fit easily.
const READ_POLL: Duration = Duration::from_millis(10);

pub fn run<C: Console, H: HttpFetch>(hub: &'static Hub, console: C, http: H) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    let console = Rc::new(RefCell::new(console));

    let reader_console = Rc::clone(&console);
    let _reader = executor.spawn(async move {
        let mut framer = LineFramer::new();
        let mut dispatcher = Dispatcher::new(hub, http);
        let mut buf = [0u8; 32];
        loop {
            let n = match reader_console.borrow_mut().read(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    warn!("[SER] console read failed: {e:?}");
                    0
                }
            };
            for &byte in &buf[..n] {
                dispatcher.feed(&mut framer, byte);
            }
            async_io_mini::Timer::after(READ_POLL).await;
        }
    });

    let writer_console = Rc::clone(&console);
    let _writer = executor.spawn(async move {
        loop {
            let frame = hub.telemetry.receive().await;
            if let Err(e) = writer_console.borrow_mut().write(&frame) {
                warn!("[SER] telemetry frame write failed: {e:?}");
            }
        }
    });

    block_on(executor.run(futures_lite::future::pending::<()>()));
}
