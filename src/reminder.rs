//! Periodic save reminder on a background thread

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Calls `on_tick` every `interval` until stopped or dropped.
pub struct Reminder {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Reminder {
    pub fn start<F>(interval: Duration, on_tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (stop, stop_rx) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name("reminder".to_string())
            .spawn(move || {
                log::info!("Reminder thread started, interval {}s", interval.as_secs());
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => on_tick(),
                        // Stop request or the sender was dropped
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("Reminder thread exited");
            });

        let thread = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to start reminder thread: {}", e);
                None
            }
        };

        Self {
            stop: Some(stop),
            thread,
        }
    }

    /// Stop the ticker and wait for its thread.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Reminder thread panicked");
            }
        }
    }
}

impl Drop for Reminder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let mut reminder = Reminder::start(Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(150));
        reminder.stop();
        assert!(reminder.thread.is_none());

        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "only {} ticks", seen);

        thread::sleep(Duration::from_millis(60));
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_stop_before_first_tick() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let reminder = Reminder::start(Duration::from_secs(60), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(reminder);
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
