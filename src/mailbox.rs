//! Single-slot command mailboxes and the hub wiring tasks together.
//!
//! Every consumer task owns one [`Mailbox`] per command kind. A send
//! overwrites whatever is pending, so a consumer always observes the most
//! recent command and never a backlog of stale ones. The telemetry stream
//! is the one bounded queue in the system; when it fills, new records are
//! dropped with a warning rather than blocking an acquisition task.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use futures_lite::future::or;

use crate::commands::{AuxCommand, BlinkRate, GpsOutputMode, TemperatureCommand};
use crate::telemetry::Frame;

/// Telemetry queue depth. Small: the serial task drains far faster than the
/// acquisition periods refill.
const TELEMETRY_DEPTH: usize = 8;

/// How often a parked [`ReadySignal`] waiter re-checks the flag.
const READY_RECHECK: Duration = Duration::from_millis(100);

/// Overwrite-on-send single-slot mailbox.
///
/// `send` never blocks and never fails; it replaces any pending value.
/// `recv` parks until a value arrives and consumes it.
pub struct Mailbox<T: Send> {
    slot: Signal<CriticalSectionRawMutex, T>,
}

impl<T: Send> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Mailbox<T> {
    pub const fn new() -> Self {
        Self { slot: Signal::new() }
    }

    /// Deposit a value, replacing any undelivered one.
    pub fn send(&self, value: T) {
        self.slot.signal(value);
    }

    /// Take the pending value without waiting.
    pub fn try_recv(&self) -> Option<T> {
        self.slot.try_take()
    }

    /// Park until a value is deposited.
    pub async fn recv(&self) -> T {
        self.slot.wait().await
    }

    /// Park until a value is deposited or `timeout` elapses.
    ///
    /// This is how periodic tasks sleep: the timeout is the task period and
    /// an incoming command interrupts the sleep.
    pub async fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        or(async { Some(self.slot.wait().await) }, async {
            async_io_mini::Timer::after(timeout).await;
            None
        })
        .await
    }
}

/// Latching one-shot flag with async waiters.
///
/// Unlike [`Mailbox`], observation does not consume: once marked ready the
/// flag stays set and every past and future waiter proceeds. The underlying
/// signal stores a single waker, so a woken waiter re-signals to pass the
/// wakeup down the line; a periodic re-check covers the race where a waiter
/// parks after the last signal was consumed.
pub struct ReadySignal {
    ready: AtomicBool,
    wakeup: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            wakeup: Signal::new(),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        self.wakeup.signal(());
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Park until [`mark_ready`](Self::mark_ready) has been called.
    pub async fn wait(&self) {
        while !self.is_ready() {
            let signalled = or(async { self.wakeup.wait().await; true }, async {
                async_io_mini::Timer::after(READY_RECHECK).await;
                false
            })
            .await;

            if signalled && self.is_ready() {
                // Pass the single stored wakeup on to the next waiter.
                self.wakeup.signal(());
                return;
            }
        }
    }
}

/// Every inter-task channel in the system, wired once at bootstrap.
///
/// Producers and consumers share `&'static Hub`; no task reaches for a
/// hidden global.
pub struct Hub {
    /// Status beacon rate selection (serial `B` verb, calibration, bootstrap).
    pub beacon: Mailbox<BlinkRate>,
    /// Temperature task commands (serial `T` verb).
    pub temperature: Mailbox<TemperatureCommand>,
    /// GPS diagnostic output mode (serial `G` verb).
    pub gps: Mailbox<GpsOutputMode>,
    /// Auxiliary task calibration commands (serial `C` and `Q` verbs).
    pub auxiliary: Mailbox<AuxCommand>,
    /// Encoded telemetry frames headed for the console.
    pub telemetry: Channel<CriticalSectionRawMutex, Frame, TELEMETRY_DEPTH>,
    /// Set once the network glue has an association (or immediately when
    /// there is no radio).
    pub net_ready: ReadySignal,
}

impl Hub {
    pub const fn new() -> Self {
        Self {
            beacon: Mailbox::new(),
            temperature: Mailbox::new(),
            gps: Mailbox::new(),
            auxiliary: Mailbox::new(),
            telemetry: Channel::new(),
            net_ready: ReadySignal::new(),
        }
    }

    /// Allocate the process-lifetime hub.
    pub fn leak() -> &'static Hub {
        Box::leak(Box::new(Hub::new()))
    }

    /// Queue a telemetry frame, dropping it with a warning when the serial
    /// task has fallen behind.
    pub fn publish_telemetry(&self, frame: Frame) {
        if self.telemetry.try_send(frame).is_err() {
            log::warn!("telemetry queue full, dropping frame");
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;
    use std::time::Instant;

    #[test]
    fn send_overwrites_pending_value() {
        let mailbox: Mailbox<BlinkRate> = Mailbox::new();
        mailbox.send(BlinkRate::Slow);
        mailbox.send(BlinkRate::Fast);
        assert_eq!(mailbox.try_recv(), Some(BlinkRate::Fast));
        assert_eq!(mailbox.try_recv(), None);
    }

    #[test]
    fn recv_consumes_exactly_once() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        mailbox.send(7);
        assert_eq!(block_on(mailbox.recv()), 7);
        assert_eq!(mailbox.try_recv(), None);
    }

    #[test]
    fn recv_timeout_returns_none_on_empty_mailbox() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        let start = Instant::now();
        let got = block_on(mailbox.recv_timeout(Duration::from_millis(50)));
        assert_eq!(got, None);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn recv_timeout_returns_pending_value_immediately() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        mailbox.send(42);
        let got = block_on(mailbox.recv_timeout(Duration::from_secs(10)));
        assert_eq!(got, Some(42));
    }

    #[test]
    fn recv_sees_value_sent_from_another_thread() {
        let mailbox: &'static Mailbox<u32> = Box::leak(Box::new(Mailbox::new()));
        let sender = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            mailbox.send(99);
        });
        assert_eq!(block_on(mailbox.recv()), 99);
        sender.join().unwrap();
    }

    #[test]
    fn ready_signal_releases_waiter_marked_before_wait() {
        let ready = ReadySignal::new();
        ready.mark_ready();
        block_on(ready.wait());
        assert!(ready.is_ready());
    }

    #[test]
    fn ready_signal_releases_multiple_threads() {
        let hub: &'static Hub = Hub::leak();
        let waiters: Vec<_> = (0..3)
            .map(|_| std::thread::spawn(move || block_on(hub.net_ready.wait())))
            .collect();
        std::thread::sleep(Duration::from_millis(20));
        hub.net_ready.mark_ready();
        for w in waiters {
            w.join().unwrap();
        }
    }

    #[test]
    fn telemetry_queue_drops_when_full() {
        let hub = Hub::new();
        for _ in 0..(TELEMETRY_DEPTH + 2) {
            hub.publish_telemetry(Frame::new());
        }
        let mut drained = 0;
        while hub.telemetry.try_receive().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, TELEMETRY_DEPTH);
    }
}
