//! Connectivity state and transition events.
//!
//! The platform layer reports network changes through
//! [`ConnectivityMonitor::set_online`]. Subscribers see only real
//! transitions: reporting "online" twice yields one event. Every transition
//! bumps a counter, so a flap that completes between two polls still wakes
//! subscribers.

use std::sync::Arc;
use tokio::sync::watch;

/// A change in connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    BecameOnline,
    BecameOffline,
}

impl ConnectivityEvent {
    fn from_state(online: bool) -> Self {
        if online {
            ConnectivityEvent::BecameOnline
        } else {
            ConnectivityEvent::BecameOffline
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinkState {
    online: bool,
    transitions: u64,
}

/// Shared online/offline flag.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<LinkState>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(LinkState {
            online: initially_online,
            transitions: 0,
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        self.tx.borrow().online
    }

    /// Record the current state. Returns the event if the state changed.
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEvent> {
        let changed = self.tx.send_if_modified(|state| {
            if state.online == online {
                false
            } else {
                state.online = online;
                state.transitions += 1;
                true
            }
        });

        if changed {
            let event = ConnectivityEvent::from_state(online);
            tracing::info!(?event, "Connectivity changed");
            Some(event)
        } else {
            None
        }
    }

    /// Stream of transitions after this point.
    pub fn subscribe(&self) -> ConnectivityEvents {
        let rx = self.tx.subscribe();
        let last = *rx.borrow();
        ConnectivityEvents { rx, last }
    }
}

/// Receiver half of a [`ConnectivityMonitor`].
#[derive(Debug)]
pub struct ConnectivityEvents {
    rx: watch::Receiver<LinkState>,
    last: LinkState,
}

impl ConnectivityEvents {
    /// Wait for the next transition. Returns `None` once every monitor
    /// handle is gone.
    ///
    /// Several transitions between two polls are reported as one event for
    /// the latest of them. An offline/online flap therefore still yields
    /// `BecameOnline`.
    pub async fn next(&mut self) -> Option<ConnectivityEvent> {
        loop {
            self.rx.changed().await.ok()?;
            let current = *self.rx.borrow_and_update();
            if current.transitions != self.last.transitions {
                self.last = current;
                return Some(ConnectivityEvent::from_state(current.online));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_reports_are_not_events() {
        let monitor = ConnectivityMonitor::new(false);
        assert_eq!(monitor.set_online(false), None);
        assert_eq!(
            monitor.set_online(true),
            Some(ConnectivityEvent::BecameOnline)
        );
        assert_eq!(monitor.set_online(true), None);
        assert!(monitor.is_online());
        assert_eq!(
            monitor.set_online(false),
            Some(ConnectivityEvent::BecameOffline)
        );
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let monitor = ConnectivityMonitor::new(false);
        let mut events = monitor.subscribe();

        monitor.set_online(true);
        assert_eq!(events.next().await, Some(ConnectivityEvent::BecameOnline));

        monitor.set_online(false);
        assert_eq!(events.next().await, Some(ConnectivityEvent::BecameOffline));
    }

    #[tokio::test]
    async fn flap_between_polls_is_reported() {
        let monitor = ConnectivityMonitor::new(true);
        let mut events = monitor.subscribe();

        monitor.set_online(false);
        monitor.set_online(true);
        assert_eq!(events.next().await, Some(ConnectivityEvent::BecameOnline));

        monitor.set_online(true);
        let idle = tokio::time::timeout(std::time::Duration::from_millis(50), events.next()).await;
        assert!(idle.is_err());
    }

    #[tokio::test]
    async fn closed_when_monitor_dropped() {
        let monitor = ConnectivityMonitor::new(true);
        let mut events = monitor.subscribe();
        drop(monitor);
        assert_eq!(events.next().await, None);
    }
}
