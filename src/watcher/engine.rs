//! The debounce loop.
//!
//! A single thread multiplexes four sources with `crossbeam_channel::select!`:
//! notifications, subscription errors, the deadline timer and the stop
//! signal. All state lives on that thread; callers interact only through
//! channels.
//!
//! ```text
//!  Armed --(tracked path)--> Armed (timer restarted)
//!  Armed --(timer expiry)--> Fired (one settled-event sent)
//!  Fired --(tracked path)--> Armed
//!  any   --(stop)----------> closed subscription, loop exits
//! ```

use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, select};
use serde::{Deserialize, Serialize};

use super::sink::ErrorSink;
use super::subscription::DirectorySubscription;
use super::target::WatchTarget;
use super::timer::DeadlineTimer;

/// How the loop hands a settled-event to the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Wait until the caller receives. At most one event is ever in flight.
    /// A stop request still interrupts the wait.
    #[default]
    Blocking,
    /// Deliver only if a receiver is already waiting, otherwise drop the event.
    BestEffort,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Stopped,
    SubscriptionEnded,
    ReceiverGone,
}

pub(crate) struct DebounceEngine<S> {
    target: WatchTarget,
    subscription: S,
    timer: DeadlineTimer,
    delivery: Delivery,
    settled_tx: Sender<()>,
    stop_rx: Receiver<()>,
    sink: Box<dyn ErrorSink>,
}

impl<S: DirectorySubscription> DebounceEngine<S> {
    pub(crate) fn new(
        target: WatchTarget,
        subscription: S,
        dead_time: Duration,
        delivery: Delivery,
        settled_tx: Sender<()>,
        stop_rx: Receiver<()>,
        sink: Box<dyn ErrorSink>,
    ) -> Self {
        Self {
            target,
            subscription,
            timer: DeadlineTimer::new(dead_time),
            delivery,
            settled_tx,
            stop_rx,
            sink,
        }
    }

    /// Run until stopped. Closes the subscription on every exit path.
    pub(crate) fn run(mut self) {
        let events = self.subscription.events().clone();
        let errors = self.subscription.errors().clone();
        let stop = self.stop_rx.clone();

        self.timer.arm();
        crate::log_event!("watcher", "started", "{}", self.target.file().display());

        let exit = loop {
            let deadline = self.timer.channel();

            let step = select! {
                recv(events) -> msg => match msg {
                    Ok(path) => {
                        self.on_notification(&path);
                        ControlFlow::Continue(())
                    }
                    Err(_) => ControlFlow::Break(Exit::SubscriptionEnded),
                },
                recv(errors) -> msg => match msg {
                    Ok(error) => {
                        self.sink.report(&error);
                        ControlFlow::Continue(())
                    }
                    Err(_) => ControlFlow::Break(Exit::SubscriptionEnded),
                },
                recv(deadline) -> _ => {
                    self.timer.expire();
                    self.deliver()
                },
                // A dropped sender counts as a stop request too
                recv(stop) -> _ => ControlFlow::Break(Exit::Stopped),
            };

            if let ControlFlow::Break(exit) = step {
                break exit;
            }
        };

        // The subscription may join a producer blocked on these channels
        drop(events);
        drop(errors);
        self.shutdown(exit);
    }

    fn on_notification(&mut self, path: &Path) {
        if !self.target.matches(path) {
            crate::debug_event!("watcher", "ignored", "{}", path.display());
            return;
        }

        // Restarting replaces any pending expiry, fired or not
        self.timer.arm();
        crate::debug_event!(
            "watcher",
            "re-armed",
            "settles in {}ms",
            self.timer.remaining().unwrap_or_default().as_millis()
        );
    }

    fn deliver(&self) -> ControlFlow<Exit> {
        match self.delivery {
            Delivery::Blocking => select! {
                send(self.settled_tx, ()) -> res => match res {
                    Ok(()) => {
                        crate::log_event!("watcher", "settled", "{}", self.target.file().display());
                        ControlFlow::Continue(())
                    }
                    Err(_) => ControlFlow::Break(Exit::ReceiverGone),
                },
                recv(self.stop_rx) -> _ => ControlFlow::Break(Exit::Stopped),
            },
            Delivery::BestEffort => match self.settled_tx.try_send(()) {
                Ok(()) => {
                    crate::log_event!("watcher", "settled", "{}", self.target.file().display());
                    ControlFlow::Continue(())
                }
                Err(TrySendError::Full(())) => {
                    crate::debug_event!("watcher", "settle dropped", "no receiver waiting");
                    ControlFlow::Continue(())
                }
                Err(TrySendError::Disconnected(())) => ControlFlow::Break(Exit::ReceiverGone),
            },
        }
    }

    fn shutdown(mut self, exit: Exit) {
        if self.timer.is_armed() {
            self.timer.cancel();
        }
        self.subscription.close();

        match exit {
            Exit::Stopped => crate::log_event!("watcher", "stopped"),
            Exit::SubscriptionEnded => {
                tracing::warn!("[watcher] subscription ended unexpectedly, watch stopped")
            }
            Exit::ReceiverGone => {
                crate::debug_event!("watcher", "stopped", "settled receiver dropped")
            }
        }
    }
}

// Behaviour is exercised through `Watcher` so that construction, the loop and
// shutdown are covered together.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::{WatchError, Watcher};
    use crate::watcher::subscription::fake::{ChannelSubscription, Feeds, FloodingSubscription};
    use crossbeam_channel::{RecvTimeoutError, unbounded};
    use std::path::PathBuf;
    use std::thread::sleep;
    use std::time::Instant;

    fn tracked() -> PathBuf {
        std::env::temp_dir().join("settlewatch-engine").join("tracked.txt")
    }

    fn other() -> PathBuf {
        std::env::temp_dir().join("settlewatch-engine").join("other.txt")
    }

    fn start(dead_time: Duration, delivery: Delivery) -> (Watcher, Feeds) {
        let (subscription, feeds) = ChannelSubscription::new();
        let watcher = Watcher::builder(tracked())
            .dead_time(dead_time)
            .delivery(delivery)
            .build_with(subscription)
            .unwrap();
        (watcher, feeds)
    }

    /// Consume the settle produced by the timer armed at startup.
    fn drain_initial(watcher: &Watcher) {
        watcher.recv_timeout(Duration::from_secs(2)).unwrap();
    }

    #[test]
    fn test_initial_settle_without_activity() {
        let (watcher, _feeds) = start(Duration::from_millis(50), Delivery::Blocking);

        let started = Instant::now();
        watcher.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        watcher.stop();
    }

    #[test]
    fn test_burst_settles_once_after_last_notification() {
        let (watcher, feeds) = start(Duration::from_millis(200), Delivery::Blocking);

        // t=0, t=50ms, t=120ms
        feeds.notify(tracked());
        sleep(Duration::from_millis(50));
        feeds.notify(tracked());
        sleep(Duration::from_millis(70));
        feeds.notify(tracked());
        let last = Instant::now();

        // Nothing before last + dead-time
        assert_eq!(
            watcher.recv_timeout(Duration::from_millis(150)),
            Err(RecvTimeoutError::Timeout)
        );

        watcher.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(last.elapsed() >= Duration::from_millis(190));

        // Exactly one
        assert_eq!(
            watcher.recv_timeout(Duration::from_millis(400)),
            Err(RecvTimeoutError::Timeout)
        );

        watcher.stop();
    }

    #[test]
    fn test_other_files_do_not_reset_or_fire() {
        let (watcher, feeds) = start(Duration::from_millis(100), Delivery::Blocking);
        drain_initial(&watcher);

        for _ in 0..10 {
            feeds.notify(other());
            sleep(Duration::from_millis(30));
        }

        assert_eq!(
            watcher.recv_timeout(Duration::from_millis(200)),
            Err(RecvTimeoutError::Timeout)
        );

        watcher.stop();
    }

    #[test]
    fn test_other_file_does_not_extend_pending_timer() {
        let (watcher, feeds) = start(Duration::from_millis(200), Delivery::Blocking);
        drain_initial(&watcher);

        feeds.notify(tracked());
        let armed = Instant::now();
        sleep(Duration::from_millis(100));
        feeds.notify(other());

        watcher.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(armed.elapsed() < Duration::from_millis(290));

        watcher.stop();
    }

    #[test]
    fn test_continuous_activity_never_settles() {
        let (watcher, feeds) = start(Duration::from_millis(150), Delivery::Blocking);
        drain_initial(&watcher);

        let until = Instant::now() + Duration::from_millis(600);
        while Instant::now() < until {
            feeds.notify(tracked());
            sleep(Duration::from_millis(30));
            // A fired timer would leave the loop blocked in send
            assert!(watcher.try_recv().is_err());
        }

        watcher.recv_timeout(Duration::from_secs(2)).unwrap();
        watcher.stop();
    }

    #[test]
    fn test_engine_is_reusable_across_cycles() {
        let (watcher, feeds) = start(Duration::from_millis(80), Delivery::Blocking);
        drain_initial(&watcher);

        for _ in 0..3 {
            feeds.notify(tracked());
            sleep(Duration::from_millis(20));
            feeds.notify(tracked());

            watcher.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(
                watcher.recv_timeout(Duration::from_millis(200)),
                Err(RecvTimeoutError::Timeout)
            );
        }

        watcher.stop();
    }

    #[test]
    fn test_runtime_error_does_not_disturb_pending_timer() {
        let (reports_tx, reports_rx) = unbounded();
        let (subscription, feeds) = ChannelSubscription::new();
        let watcher = Watcher::builder(tracked())
            .dead_time(Duration::from_millis(300))
            .error_sink(move |error: &WatchError| {
                let _ = reports_tx.send(error.to_string());
            })
            .build_with(subscription)
            .unwrap();
        drain_initial(&watcher);

        feeds.notify(tracked());
        let armed = Instant::now();
        sleep(Duration::from_millis(150));
        feeds.fail("queue overflow");

        watcher.recv_timeout(Duration::from_secs(2)).unwrap();
        let elapsed = armed.elapsed();
        assert!(elapsed >= Duration::from_millis(280));
        assert!(elapsed < Duration::from_millis(420));

        let report = reports_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(report.contains("queue overflow"));

        watcher.stop();
    }

    #[test]
    fn test_equivalent_spelling_of_tracked_path_matches() {
        let (watcher, feeds) = start(Duration::from_millis(150), Delivery::Blocking);
        drain_initial(&watcher);

        let dir = tracked().parent().unwrap().to_path_buf();
        feeds.notify(dir.join(".").join("tracked.txt"));

        watcher.recv_timeout(Duration::from_secs(2)).unwrap();
        watcher.stop();
    }

    #[test]
    fn test_stop_while_blocked_on_delivery() {
        let (watcher, feeds) = start(Duration::from_millis(30), Delivery::Blocking);

        // Let the initial timer fire with nobody receiving
        sleep(Duration::from_millis(150));

        let started = Instant::now();
        watcher.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(feeds.is_closed());
    }

    #[test]
    fn test_stop_while_blocked_with_full_event_channel() {
        let (subscription, closed) = FloodingSubscription::new(other());
        let watcher = Watcher::builder(tracked())
            .dead_time(Duration::from_millis(30))
            .build_with(subscription)
            .unwrap();

        // Initial settle fires unobserved; the producer then fills the channel
        sleep(Duration::from_millis(150));

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        std::thread::spawn(move || {
            watcher.stop();
            let _ = done_tx.send(());
        });

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_stop_with_pending_timer_emits_nothing() {
        let (watcher, feeds) = start(Duration::from_millis(200), Delivery::Blocking);
        drain_initial(&watcher);

        feeds.notify(tracked());
        sleep(Duration::from_millis(50));

        let settled = watcher.settled().clone();
        watcher.stop();

        assert!(feeds.is_closed());
        assert_eq!(
            settled.recv_timeout(Duration::from_millis(400)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_best_effort_drops_unobserved_settle() {
        let (watcher, feeds) = start(Duration::from_millis(40), Delivery::BestEffort);

        // Initial settle fires with nobody waiting and is dropped
        sleep(Duration::from_millis(150));
        assert!(watcher.try_recv().is_err());

        feeds.notify(tracked());
        watcher.recv_timeout(Duration::from_secs(2)).unwrap();

        watcher.stop();
    }

    #[test]
    fn test_subscription_end_stops_the_loop() {
        let (watcher, feeds) = start(Duration::from_millis(500), Delivery::Blocking);
        let closed = feeds.closed_flag();

        drop(feeds);

        assert_eq!(
            watcher.recv_timeout(Duration::from_secs(2)),
            Err(RecvTimeoutError::Disconnected)
        );
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));

        watcher.stop();
    }
}
