//! Handles shared by the recorder, the stats engine and the reconciler.

use crate::clock::{Clock, SystemClock};
use crate::connectivity::ConnectivityMonitor;
use crate::remote::RemoteStore;
use crate::session::Session;
use quizsync_engine::{error::Result, Error, LocalStore, Timestamp};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SyncContext {
    pub remote: Arc<dyn RemoteStore>,
    pub local: Arc<Mutex<LocalStore>>,
    pub monitor: ConnectivityMonitor,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("online", &self.monitor.is_online())
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: LocalStore,
        monitor: ConnectivityMonitor,
    ) -> Self {
        Self {
            remote,
            local: Arc::new(Mutex::new(local)),
            monitor,
            clock: Arc::new(SystemClock::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run `f` with the local store locked. A poisoned lock is recovered.
    pub fn with_local<R>(&self, f: impl FnOnce(&mut LocalStore) -> R) -> R {
        let mut guard = self
            .local
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Refuse a session for an exam other than the one the local store
    /// is scoped to.
    pub fn check_session(&self, session: &Session) -> Result<()> {
        self.with_local(|local| {
            if local.exam_id() == &session.exam.id {
                Ok(())
            } else {
                Err(Error::InvalidExam(format!(
                    "session exam '{}' does not match local store exam '{}'",
                    session.exam.id,
                    local.exam_id()
                )))
            }
        })
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
