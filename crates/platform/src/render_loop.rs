//! Job queue for the rendering-capable thread.
//!
//! The thread that creates a [`RenderLoop`] becomes the render thread and
//! must pump it. Other threads reach it through a [`RenderHandle`].

use std::{
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct RenderLoop {
    jobs: Receiver<Job>,
    handle: RenderHandle,
}

/// Cloneable, thread-safe access to a [`RenderLoop`].
#[derive(Clone)]
pub struct RenderHandle {
    jobs: Sender<Job>,
    thread: ThreadId,
}

impl RenderLoop {
    /// Bind a new loop to the calling thread.
    pub fn new() -> Self {
        let (sender, jobs) = crossbeam_channel::unbounded();
        Self {
            jobs,
            handle: RenderHandle {
                jobs: sender,
                thread: thread::current().id(),
            },
        }
    }

    pub fn handle(&self) -> RenderHandle {
        self.handle.clone()
    }

    /// Run every job queued so far without blocking. Returns how many ran.
    pub fn pump(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.jobs.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs as they arrive until `done` returns true or `timeout`
    /// elapses. Returns whether `done` was reached.
    pub fn pump_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done() {
                return true;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            match self.jobs.recv_timeout(left.min(Duration::from_millis(10))) {
                Ok(job) => job(),
                Err(RecvTimeoutError::Timeout) if left.is_zero() => return done(),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderHandle {
    #[inline]
    pub fn is_render_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Queue a job. Returns `false` when the loop is gone.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.jobs.send(Box::new(job)).is_ok()
    }

    /// Run `f` on the render thread and wait for its result.
    ///
    /// Called on the render thread itself, `f` runs inline. There is no
    /// timeout: a render thread that stops pumping blocks the caller. `None`
    /// means the loop was dropped before `f` could run.
    pub fn run_blocking<R: Send + 'static>(
        &self,
        f: impl FnOnce() -> R + Send + 'static,
    ) -> Option<R> {
        if self.is_render_thread() {
            return Some(f());
        }
        let (done, result) = crossbeam_channel::bounded(1);
        if !self.submit(move || {
            let _ = done.send(f());
        }) {
            log::warn!("Render loop is gone, dropping blocking job");
            return None;
        }
        result.recv().ok()
    }
}
