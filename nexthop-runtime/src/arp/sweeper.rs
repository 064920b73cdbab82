use crate::router::Router;
use crate::transmit::FrameTransmitter;
use crossbeam::crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often the cache sweep runs in production.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Handle to the background sweep thread. Dropping it (or calling `stop`)
/// shuts the thread down and joins it.
pub struct Sweeper {
    shutdown: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Sweeper {
    /// Spawns a thread driving `router.sweep` once per `SWEEP_PERIOD` for as
    /// long as the handle lives.
    pub fn spawn<T>(router: Arc<Router<T>>) -> Sweeper
    where
        T: FrameTransmitter + Send + Sync + 'static,
    {
        Sweeper::spawn_every(router, SWEEP_PERIOD)
    }

    pub fn spawn_every<T>(router: Arc<Router<T>>, period: Duration) -> Sweeper
    where
        T: FrameTransmitter + Send + Sync + 'static,
    {
        let (shutdown, signal) = bounded(1);
        let handle = thread::spawn(move || loop {
            match signal.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => router.sweep(Instant::now()),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Sweeper {
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
