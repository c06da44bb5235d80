#![forbid(unsafe_code)]

//! Background task sets with an owner-teardown policy.
//!
//! A [`TaskSet`] belongs to an owner (a client, the app). Tasks are spawned
//! on the current `tokio::task::LocalSet`. When the owner shuts the set down,
//! tasks with [`CancelPolicy::Cancel`] are aborted and tasks with
//! [`CancelPolicy::Finish`] are left to run to completion.
//!
//! # Panics
//!
//! Spawning outside a `LocalSet` panics, as `tokio::task::spawn_local` does.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use fweb_core::BoxError;
use tokio::task::AbortHandle;

/// What happens to a task when its owner is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    #[default]
    Cancel,
    /// Keep running until the future completes (e.g. backup on shutdown).
    Finish,
}

/// Handle of one spawned task.
#[derive(Clone)]
pub struct TaskHandle {
    name: Rc<str>,
    policy: CancelPolicy,
    abort: AbortHandle,
}

impl TaskHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn policy(&self) -> CancelPolicy {
        self.policy
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Result of [`TaskSet::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    pub cancelled: usize,
    pub left_running: usize,
}

/// Tasks owned by one owner.
#[derive(Default)]
pub struct TaskSet {
    tasks: RefCell<Vec<TaskHandle>>,
}

impl fmt::Debug for TaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSet")
            .field("running", &self.running())
            .finish()
    }
}

impl TaskSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` on the current `LocalSet`.
    pub fn spawn<F>(&self, name: &str, policy: CancelPolicy, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + 'static,
    {
        self.prune();
        let join = tokio::task::spawn_local(future);
        let handle = TaskHandle {
            name: Rc::from(name),
            policy,
            abort: join.abort_handle(),
        };
        tracing::debug!(task = name, ?policy, "task.spawn");
        self.tasks.borrow_mut().push(handle.clone());
        handle
    }

    /// Spawn a fallible future; an error is reported through the exception
    /// hook with the task name as origin.
    pub fn spawn_fallible<F>(&self, name: &str, policy: CancelPolicy, future: F) -> TaskHandle
    where
        F: Future<Output = Result<(), BoxError>> + 'static,
    {
        let origin = format!("task `{name}`");
        self.spawn(name, policy, async move {
            if let Err(err) = future.await {
                fweb_core::exception::report(&origin, err.as_ref());
            }
        })
    }

    /// Spawn unless a task with the same name is still running.
    pub fn spawn_lazy<F>(&self, name: &str, future: F) -> Option<TaskHandle>
    where
        F: Future<Output = ()> + 'static,
    {
        self.prune();
        let running = self.tasks.borrow().iter().any(|t| &*t.name == name);
        if running {
            tracing::trace!(task = name, "task.spawn_lazy.skipped");
            return None;
        }
        Some(self.spawn(name, CancelPolicy::Cancel, future))
    }

    /// Number of tasks that have not finished.
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks
            .borrow()
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    /// Abort `Cancel` tasks and forget the rest.
    pub fn shutdown(&self) -> ShutdownReport {
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        let mut report = ShutdownReport::default();
        for task in tasks.into_iter().filter(|t| !t.is_finished()) {
            match task.policy {
                CancelPolicy::Cancel => {
                    task.abort();
                    report.cancelled += 1;
                }
                CancelPolicy::Finish => report.left_running += 1,
            }
        }
        if report != ShutdownReport::default() {
            tracing::debug!(
                cancelled = report.cancelled,
                left_running = report.left_running,
                "task.shutdown"
            );
        }
        report
    }

    fn prune(&self) {
        self.tasks.borrow_mut().retain(|t| !t.is_finished());
    }
}
