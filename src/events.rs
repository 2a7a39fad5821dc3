use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;
use serde::Serialize;

const MAX_EVENTS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    GameOver,
    KeycardAcquired,
    ExitedLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<(ListenerId, LifecycleEvent, Listener)>,
    recent: VecDeque<LifecycleEvent>,
}

/// Observer lists for the level lifecycle. Delivery is synchronous on the
/// emitting task; listeners run outside the bus lock, so a listener may
/// subscribe or unsubscribe.
#[derive(Default)]
pub struct LifecycleBus {
    inner: Mutex<BusInner>,
}

impl LifecycleBus {
    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(
        &self,
        event: LifecycleEvent,
        listener: impl Fn(LifecycleEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, event, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(lid, _, _)| *lid != id);
        inner.listeners.len() != before
    }

    pub fn listener_count(&self, event: LifecycleEvent) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|(_, e, _)| *e == event)
            .count()
    }

    pub fn emit(&self, event: LifecycleEvent) {
        let targets: Vec<Listener> = {
            let mut inner = self.lock();
            inner.recent.push_back(event);
            if inner.recent.len() > MAX_EVENTS {
                inner.recent.pop_front();
            }
            inner
                .listeners
                .iter()
                .filter(|(_, e, _)| *e == event)
                .map(|(_, _, l)| Arc::clone(l))
                .collect()
        };
        info!(
            "[Crawler events] {:?} -> {} listener(s)",
            event,
            targets.len()
        );
        for listener in targets {
            listener(event);
        }
    }

    pub fn recent(&self) -> Vec<LifecycleEvent> {
        self.lock().recent.iter().copied().collect()
    }

    pub fn count(&self, event: LifecycleEvent) -> usize {
        self.lock().recent.iter().filter(|e| **e == event).count()
    }
}
