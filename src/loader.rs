//! Background loading of IFC files.
//!
//! The registry is moved into a worker thread, files are added in the
//! given order, and the registry comes back in [`LoadEvent::Finished`]
//! together with the summary of the batch.
//! Owning the registry makes a second concurrent load impossible.

use crate::error::RegistryError;
use crate::model::{AddOutcome, ProjectRegistry};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum LoadEvent {
    Started(PathBuf),
    /// Percentage of the batch done.
    Progress(u8),
    /// Display text only; the typed error is kept in [`LoadSummary::failed`].
    Failed {
        path: PathBuf,
        error: String,
    },
    AlreadyOpen(PathBuf),
    Finished {
        registry: ProjectRegistry,
        summary: LoadSummary,
    },
}

/// What happened to each file of a batch.
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// File names, unique within the registry.
    pub added: Vec<String>,
    pub already_open: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, RegistryError)>,
    pub stopped: bool,
}

impl LoadSummary {
    /// One line for the status bar.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = format!("{} file(s) loaded", self.added.len());
        if !self.already_open.is_empty() {
            message.push_str(&format!(", {} already open", self.already_open.len()));
        }
        if !self.failed.is_empty() {
            let names: Vec<String> = self
                .failed
                .iter()
                .map(|(path, _)| path.display().to_string())
                .collect();
            message.push_str(&format!(", ignored: {}", names.join(", ")));
        }
        if self.stopped {
            message.push_str(" (stopped)");
        }
        message
    }
}

/// Adds `paths` to `registry` one by one.
///
/// Failures are collected and never abort the batch. `stop` is checked
/// before each file; files added before a stop stay in the registry.
pub fn load_files(
    registry: &mut ProjectRegistry,
    paths: &[PathBuf],
    stop: &AtomicBool,
    events: Option<&Sender<LoadEvent>>,
) -> LoadSummary {
    let send = |event: LoadEvent| {
        if let Some(tx) = events {
            // Receiver gone means nobody listens anymore
            let _ = tx.send(event);
        }
    };
    let mut summary = LoadSummary::default();

    for (index, path) in paths.iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            info!(remaining = paths.len() - index, "load stopped");
            summary.stopped = true;
            break;
        }
        send(LoadEvent::Started(path.clone()));
        debug!(path = %path.display(), "loading file");

        match registry.add_file(path) {
            Ok(AddOutcome::Added(file)) => summary.added.push(file.filename().to_string()),
            Ok(AddOutcome::AlreadyOpen) => {
                summary.already_open.push(path.clone());
                send(LoadEvent::AlreadyOpen(path.clone()));
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "file ignored");
                send(LoadEvent::Failed {
                    path: path.clone(),
                    error: error.to_string(),
                });
                summary.failed.push((path.clone(), error));
            }
        }

        let percent = ((index + 1) * 100 / paths.len()) as u8;
        send(LoadEvent::Progress(percent));
    }
    summary
}

/// A running background load.
#[derive(Debug)]
pub struct LoadHandle {
    receiver: Receiver<LoadEvent>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl LoadHandle {
    /// Asks the worker to stop before the next file.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Next event without blocking. `None` when nothing is pending or the
    /// worker is gone.
    pub fn try_next(&self) -> Option<LoadEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks for the next event. `None` once the worker finished.
    pub fn recv(&self) -> Option<LoadEvent> {
        self.receiver.recv().ok()
    }

    #[must_use]
    pub fn receiver(&self) -> &Receiver<LoadEvent> {
        &self.receiver
    }
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Starts loading `paths` into `registry` on a worker thread.
#[must_use]
pub fn spawn_load(registry: ProjectRegistry, paths: Vec<PathBuf>) -> LoadHandle {
    let (tx, rx) = unbounded();
    let stop = Arc::new(AtomicBool::new(false));

    let thread = thread::spawn({
        let stop = Arc::clone(&stop);
        move || {
            let mut registry = registry;
            let summary = load_files(&mut registry, &paths, &stop, Some(&tx));
            let _ = tx.send(LoadEvent::Finished { registry, summary });
        }
    });

    LoadHandle {
        receiver: rx,
        stop,
        thread: Some(thread),
    }
}
