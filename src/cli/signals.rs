//! Interactive session controls
//!
//! Ctrl-C (and SIGTERM on unix) stops the session, an Enter on stdin
//! toggles pause. Both feed one channel the run loop selects on.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Commands a running record/play session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    /// Pause when running, resume when paused
    TogglePause,
    /// Finish the session
    Stop,
}

/// Receives session controls until dropped; the feeder tasks are aborted then.
pub struct SessionControls {
    receiver: mpsc::Receiver<SessionControl>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionControls {
    /// Start listening for shutdown signals and, if `interactive`, stdin lines.
    pub fn new(interactive: bool) -> Result<Self, std::io::Error> {
        let (tx, rx) = mpsc::channel(8);
        let mut tasks = Vec::new();

        let tx_int = tx.clone();
        tasks.push(tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                debug!("Received Ctrl-C");
                if tx_int.send(SessionControl::Stop).await.is_err() {
                    break;
                }
            }
        }));

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let tx_term = tx.clone();
            let mut sigterm = signal(SignalKind::terminate())?;
            tasks.push(tokio::spawn(async move {
                if sigterm.recv().await.is_some() {
                    debug!("Received SIGTERM");
                    let _ = tx_term.send(SessionControl::Stop).await;
                }
            }));
        }

        if interactive {
            tasks.push(tokio::spawn(forward_stdin(tx)));
        }

        Ok(Self {
            receiver: rx,
            tasks,
        })
    }

    /// Wait for the next control
    pub async fn recv(&mut self) -> Option<SessionControl> {
        self.receiver.recv().await
    }

    #[cfg(test)]
    fn from_receiver(receiver: mpsc::Receiver<SessionControl>) -> Self {
        Self {
            receiver,
            tasks: Vec::new(),
        }
    }
}

impl Drop for SessionControls {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Map one stdin line to a control
pub fn parse_control(line: &str) -> Option<SessionControl> {
    match line.trim().to_lowercase().as_str() {
        "" | "p" | "pause" | "resume" => Some(SessionControl::TogglePause),
        "q" | "quit" | "s" | "stop" => Some(SessionControl::Stop),
        _ => None,
    }
}

async fn forward_stdin(tx: mpsc::Sender<SessionControl>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(control) = parse_control(&line) {
                    if tx.send(control).await.is_err() {
                        break;
                    }
                }
            }
            // EOF: piped or closed stdin, keep running until a signal.
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Stopped reading stdin");
                break;
            }
        }
    }
}
