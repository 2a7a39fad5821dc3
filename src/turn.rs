use std::sync::atomic::{AtomicBool, Ordering};

/// Single-slot busy flag for one actor. A second command while the slot is
/// held is dropped, not queued.
#[derive(Debug, Default)]
pub struct TurnToken {
    busy: AtomicBool,
}

impl TurnToken {
    pub fn try_acquire(&self) -> Option<TurnGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TurnGuard { token: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the slot on drop.
pub struct TurnGuard<'a> {
    token: &'a TurnToken,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.token.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let token = TurnToken::default();
        let guard = token.try_acquire();
        assert!(guard.is_some());
        assert!(token.is_busy());
        assert!(token.try_acquire().is_none());
        drop(guard);
        assert!(!token.is_busy());
        assert!(token.try_acquire().is_some());
    }
}
