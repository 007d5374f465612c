//! At-most-one in-flight tailoring request per UI session.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

/// Session ids that currently have a tailoring request running.
#[derive(Debug, Clone, Default)]
pub struct InFlightSessions {
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSessions {
    /// Claims `session_id`, or returns `None` if a request for it is already running.
    /// The claim is released when the returned guard drops.
    pub fn try_acquire(&self, session_id: &str) -> Option<SessionGuard> {
        if !lock(&self.active).insert(session_id.to_string()) {
            return None;
        }
        debug!("Session {session_id} acquired tailoring slot");
        Some(SessionGuard {
            active: Arc::clone(&self.active),
            session_id: session_id.to_string(),
        })
    }

    #[cfg(test)]
    pub fn is_active(&self, session_id: &str) -> bool {
        lock(&self.active).contains(session_id)
    }
}

#[derive(Debug)]
pub struct SessionGuard {
    active: Arc<Mutex<HashSet<String>>>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.session_id);
        debug!("Session {} released tailoring slot", self.session_id);
    }
}

/// A poisoned set is still structurally valid, so keep using it.
fn lock(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
