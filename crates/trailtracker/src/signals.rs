//! Termination signals that end a `serve` run.

use std::io;
use tokio::signal;

/// Handlers for the signals that request a graceful shutdown.
///
/// Install them before the service starts so a signal arriving during
/// startup is still seen by [`ShutdownSignals::recv`].
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: signal::unix::Signal,
    #[cfg(unix)]
    terminate: signal::unix::Signal,
}

impl ShutdownSignals {
    /// Registers the handlers. Must be called inside the runtime.
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use signal::unix::{signal, SignalKind};

            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Waits for the next shutdown request.
    ///
    /// # Returns
    ///
    /// The name of the signal that arrived (`SIGINT`, `SIGTERM`, or
    /// `Ctrl+C` off Unix).
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        #[cfg(unix)]
        {
            let name = tokio::select! {
                _ = self.interrupt.recv() => "SIGINT",
                _ = self.terminate.recv() => "SIGTERM",
            };
            Ok(name)
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.map(|_| "Ctrl+C")
        }
    }
}
