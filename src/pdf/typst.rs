//! Out-of-process print pipeline driving the Typst CLI.
//!
//! Each print request owns a private `RenderSurface` (a temporary directory
//! plus the compiler process). The surface is released on whichever comes
//! first: the compiler's completion signal or the fallback timer.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tempfile::TempDir;

use super::document::PrintDocument;
use crate::config::PrintSettings;
use crate::error::{ReportError, Result};

const DOCUMENT_FILE: &str = "report.typ";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum ChildState {
    Running,
    Exited(ExitStatus),
    Released,
}

#[derive(Default)]
struct SurfaceState {
    dir: Option<TempDir>,
    child: Option<Child>,
}

/// Scratch space and compiler process for a single print request.
pub struct RenderSurface {
    root: PathBuf,
    state: Mutex<SurfaceState>,
}

impl RenderSurface {
    /// Create a fresh surface under the system temp directory.
    pub fn acquire() -> Result<Self> {
        Self::acquire_in(&std::env::temp_dir())
    }

    pub fn acquire_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("opsreport-print-")
            .tempdir_in(parent)
            .map_err(|e| {
                ReportError::RenderSurfaceUnavailable(format!("{}: {e}", parent.display()))
            })?;
        Ok(Self {
            root: dir.path().to_path_buf(),
            state: Mutex::new(SurfaceState {
                dir: Some(dir),
                child: None,
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join(DOCUMENT_FILE)
    }

    pub fn is_released(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.dir.is_none(),
            Err(_) => true,
        }
    }

    fn write_document(&self, doc: &PrintDocument) -> Result<()> {
        fs::write(self.document_path(), &doc.source)?;
        Ok(())
    }

    /// Hand the compiler to the surface so a release can stop it.
    fn track(&self, mut child: Child) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ReportError::PrintFailed("print surface lock poisoned".to_string()))?;
        if state.dir.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReportError::PrintFailed(
                "print surface released before the compiler started".to_string(),
            ));
        }
        state.child = Some(child);
        Ok(())
    }

    fn poll(&self) -> Result<ChildState> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ReportError::PrintFailed("print surface lock poisoned".to_string()))?;
        let Some(child) = state.child.as_mut() else {
            return Ok(ChildState::Released);
        };
        match child.try_wait()? {
            None => Ok(ChildState::Running),
            Some(status) => {
                state.child = None;
                Ok(ChildState::Exited(status))
            }
        }
    }

    /// Stop any running compiler and delete the scratch directory.
    ///
    /// Idempotent; returns true only for the call that performed the release.
    pub fn release(&self) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut child) = state.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        match state.dir.take() {
            Some(dir) => {
                if let Err(e) = dir.close() {
                    log::warn!("failed to remove print surface {}: {e}", self.root.display());
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        self.release();
    }
}

/// Release `surface` on the completion signal or after `timeout`, whichever fires first.
pub fn arm_cleanup<T: Send + 'static>(
    surface: Arc<RenderSurface>,
    done: Receiver<T>,
    timeout: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let trigger = match done.recv_timeout(timeout) {
            Ok(_) | Err(RecvTimeoutError::Disconnected) => "completion",
            Err(RecvTimeoutError::Timeout) => "timeout",
        };
        if surface.release() {
            log::debug!(
                "print surface {} released on {trigger}",
                surface.root().display()
            );
        }
    })
}

/// Drives `typst compile` for print exports.
pub struct Printer {
    typst_bin: String,
    cleanup_timeout: Duration,
    jobs: Mutex<Vec<JoinHandle<()>>>,
}

impl Printer {
    pub fn new(typst_bin: impl Into<String>, cleanup_timeout: Duration) -> Self {
        Self {
            typst_bin: typst_bin.into(),
            cleanup_timeout,
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn from_settings(settings: &PrintSettings) -> Self {
        Self::new(
            settings.typst_bin.clone(),
            Duration::from_secs(settings.cleanup_timeout_secs),
        )
    }

    /// Check the compiler can be launched at all.
    pub fn check_available(&self) -> Result<()> {
        Command::new(&self.typst_bin)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|_| ReportError::TypstNotFound)
    }

    /// Render `doc` to `output` in the background.
    ///
    /// Fire-and-forget: failures are logged and never reach the caller.
    pub fn print(&self, doc: PrintDocument, output: PathBuf) {
        let surface = match RenderSurface::acquire() {
            Ok(surface) => Arc::new(surface),
            Err(e) => {
                log::warn!("{e}; print export of '{}' abandoned", doc.title);
                return;
            }
        };
        if let Err(e) = surface.write_document(&doc) {
            log::warn!("failed to stage '{}' for printing: {e}", doc.title);
            surface.release();
            return;
        }

        let (done_tx, done_rx) = mpsc::channel::<()>();
        let watchdog = arm_cleanup(Arc::clone(&surface), done_rx, self.cleanup_timeout);

        let bin = self.typst_bin.clone();
        let title = doc.title;
        let worker = thread::spawn(move || {
            match compile(&bin, &surface, &output) {
                Ok(()) => log::info!("printed '{title}' to {}", output.display()),
                Err(e) => log::warn!("print export of '{title}' failed: {e}"),
            }
            let _ = done_tx.send(());
        });

        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.retain(|job| !job.is_finished());
            jobs.push(worker);
            jobs.push(watchdog);
        }
    }

    /// Block until every print started so far has finished and been cleaned up.
    pub fn wait_all(&self) {
        let jobs: Vec<JoinHandle<()>> = match self.jobs.lock() {
            Ok(mut jobs) => jobs.drain(..).collect(),
            Err(_) => return,
        };
        for job in jobs {
            let _ = job.join();
        }
    }
}

fn compile(bin: &str, surface: &RenderSurface, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut child = Command::new(bin)
        .arg("compile")
        .arg("--root")
        .arg(surface.root())
        .arg(surface.document_path())
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReportError::TypstNotFound,
            _ => ReportError::Io(e),
        })?;

    // Drained from spawn onwards so verbose diagnostics never fill the pipe
    let diagnostics = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = pipe.read_to_string(&mut text);
            text
        })
    });
    surface.track(child)?;

    loop {
        match surface.poll()? {
            ChildState::Running => thread::sleep(POLL_INTERVAL),
            ChildState::Exited(status) if status.success() => return Ok(()),
            ChildState::Exited(_) => {
                let stderr = diagnostics
                    .and_then(|reader| reader.join().ok())
                    .unwrap_or_default();
                return Err(ReportError::PrintFailed(stderr.trim().to_string()));
            }
            ChildState::Released => {
                return Err(ReportError::PrintFailed(
                    "timed out; print surface released".to_string(),
                ))
            }
        }
    }
}
