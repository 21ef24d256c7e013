// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Console redirection into the build log
//!
//! The host writes its ambient output through an [`AmbientStreams`] pair of
//! switchable [`StreamHandle`]s. [`ConsoleRedirect`] points both handles at
//! one [`LazyFileSink`] for the duration of a session and puts the original
//! sinks back afterwards.
//!
//! The build log is only created on the first byte written to it. If opening
//! or writing it ever fails, the original sinks are restored once, a single
//! `PASSTHROUGH` line explains why, and the build carries on with console
//! output.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tracing::{debug, warn};

use crate::error::RedirectError;
use crate::formatter::Reporter;
use crate::lock;

/// Appended to the redirect-failure notice
pub const REDIRECT_FAILURE_HINT: &str = "Continuing with console output. \
Set --active=off (or HUSHBUILD_ACTIVE=off) to disable hushbuild.";

/// Destination for ambient output bytes
pub trait Sink: Send + Sync {
    /// # Errors
    ///
    /// Returns the underlying write error.
    fn write_all(&self, buf: &[u8]) -> io::Result<()>;

    /// # Errors
    ///
    /// Returns the underlying flush error.
    fn flush(&self) -> io::Result<()>;
}

/// [`Sink`] over any [`Write`] implementation
pub struct WriterSink<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        lock(&self.inner).write_all(buf)
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.inner).flush()
    }
}

/// A shared, switchable output stream
///
/// Clones refer to the same slot, so swapping the sink is seen by every
/// writer at its next write.
#[derive(Clone)]
pub struct StreamHandle {
    slot: Arc<RwLock<Arc<dyn Sink>>>,
}

impl StreamHandle {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(sink)),
        }
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self::new(Arc::new(WriterSink::new(writer)))
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    #[must_use]
    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    /// The sink writes currently go to
    #[must_use]
    pub fn current(&self) -> Arc<dyn Sink> {
        Arc::clone(&self.slot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Install `sink`, returning the previous one
    pub fn swap(&self, sink: Arc<dyn Sink>) -> Arc<dyn Sink> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, sink)
    }
}

// The slot lock is only held long enough to clone the sink, so a sink that
// swaps handles from inside a failing write cannot deadlock.
impl Write for StreamHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.current().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.current().flush()
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// The host's ambient output and error streams
#[derive(Debug, Clone)]
pub struct AmbientStreams {
    pub out: StreamHandle,
    pub err: StreamHandle,
}

impl AmbientStreams {
    #[must_use]
    pub fn new(out: StreamHandle, err: StreamHandle) -> Self {
        Self { out, err }
    }

    /// Handles over the process's standard output and error
    #[must_use]
    pub fn process() -> Self {
        Self::new(StreamHandle::stdout(), StreamHandle::stderr())
    }
}

type FailureCallback = Box<dyn Fn(&RedirectError) + Send + Sync>;

/// File sink that creates its file, and parent directories, on first write
pub struct LazyFileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
    closed: AtomicBool,
    on_failure: FailureCallback,
}

impl LazyFileSink {
    /// `on_failure` runs, without any sink lock held, for every failed write or flush
    pub fn new(path: PathBuf, on_failure: impl Fn(&RedirectError) + Send + Sync + 'static) -> Self {
        Self {
            path,
            file: Mutex::new(None),
            closed: AtomicBool::new(false),
            on_failure: Box::new(on_failure),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been created
    #[must_use]
    pub fn is_open(&self) -> bool {
        lock(&self.file).is_some()
    }

    /// Close the file; later writes are discarded
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        lock(&self.file).take();
    }

    fn open(&self) -> Result<File, RedirectError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RedirectError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        debug!(path = %self.path.display(), "Opening build log");
        File::create(&self.path).map_err(|source| RedirectError::Open {
            path: self.path.clone(),
            source,
        })
    }

    fn write_locked(&self, buf: &[u8]) -> Result<(), RedirectError> {
        let mut file = lock(&self.file);
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        if file.is_none() {
            *file = Some(self.open()?);
        }
        match file.as_mut() {
            Some(file) => file.write_all(buf).map_err(RedirectError::Write),
            None => Ok(()),
        }
    }

    fn flush_locked(&self) -> Result<(), RedirectError> {
        match lock(&self.file).as_mut() {
            Some(file) => file.flush().map_err(RedirectError::Write),
            None => Ok(()),
        }
    }

    fn fail(&self, err: RedirectError) -> io::Error {
        (self.on_failure)(&err);
        io::Error::other(err)
    }
}

impl Sink for LazyFileSink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.write_locked(buf).map_err(|e| self.fail(e))
    }

    fn flush(&self) -> io::Result<()> {
        self.flush_locked().map_err(|e| self.fail(e))
    }
}

impl fmt::Debug for LazyFileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFileSink")
            .field("path", &self.path)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RedirectState {
    originals: Option<(Arc<dyn Sink>, Arc<dyn Sink>)>,
    sink: Option<Arc<LazyFileSink>>,
}

struct RedirectInner {
    streams: AmbientStreams,
    reporter: Reporter,
    state: Mutex<RedirectState>,
    failed: AtomicBool,
}

impl RedirectInner {
    fn restore(&self) {
        let mut state = lock(&self.state);
        if let Some((out, err)) = state.originals.take() {
            self.streams.out.swap(out);
            self.streams.err.swap(err);
        }
        if let Some(sink) = state.sink.take() {
            sink.close();
            debug!(path = %sink.path().display(), "Console restored");
        }
    }

    fn on_failure(&self, err: &RedirectError) {
        if self
            .failed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        warn!(error = %err, "Build-log redirect failed");
        self.restore();
        self.reporter.passthrough(&format!(
            "build-log redirect failed: {err}. {REDIRECT_FAILURE_HINT}"
        ));
    }
}

/// Captures the ambient streams into a build log and restores them
pub struct ConsoleRedirect {
    inner: Arc<RedirectInner>,
}

impl ConsoleRedirect {
    /// `reporter` receives the redirect-failure notice
    #[must_use]
    pub fn new(streams: AmbientStreams, reporter: Reporter) -> Self {
        Self {
            inner: Arc::new(RedirectInner {
                streams,
                reporter,
                state: Mutex::new(RedirectState::default()),
                failed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn streams(&self) -> &AmbientStreams {
        &self.inner.streams
    }

    /// Send both ambient streams to the file at `path`
    ///
    /// The file is not touched until something is written. Redirecting
    /// again replaces the previous build log but keeps the original sinks.
    pub fn redirect_to_file(&self, path: PathBuf) {
        let weak: Weak<RedirectInner> = Arc::downgrade(&self.inner);
        let sink = Arc::new(LazyFileSink::new(path, move |err| {
            if let Some(inner) = weak.upgrade() {
                inner.on_failure(err);
            }
        }));

        let mut state = lock(&self.inner.state);
        if let Some(previous) = state.sink.take() {
            previous.close();
        }
        let out = self.inner.streams.out.swap(sink.clone());
        let err = self.inner.streams.err.swap(sink.clone());
        if state.originals.is_none() {
            state.originals = Some((out, err));
        }
        debug!(path = %sink.path().display(), "Console redirected to build log");
        state.sink = Some(sink);
    }

    /// Put the original sinks back and close the build log; a no-op if not redirected
    pub fn restore(&self) {
        self.inner.restore();
    }

    /// Path of the active build log
    #[must_use]
    pub fn log_path(&self) -> Option<PathBuf> {
        lock(&self.inner.state)
            .sink
            .as_ref()
            .map(|sink| sink.path().to_path_buf())
    }

    #[must_use]
    pub fn is_redirected(&self) -> bool {
        lock(&self.inner.state).sink.is_some()
    }

    /// Whether a redirect failure has been handled since the last reset
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.inner.failed.load(Ordering::Acquire)
    }

    /// Allow the next redirect failure to be reported again
    pub fn reset_failure_latch(&self) {
        self.inner.failed.store(false, Ordering::Release);
    }
}

impl fmt::Debug for ConsoleRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleRedirect")
            .field("log_path", &self.log_path())
            .field("failed", &self.has_failed())
            .finish()
    }
}
