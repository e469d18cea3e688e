//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a cheap, clonable flag that long-running work polls
//! or awaits. Tokens form a tree: cancelling a token cancels every child
//! derived from it, never its parent.
//!
//! A [`BreakScope`] tracks which token the user's break key (Ctrl+C) should
//! cancel right now. The input loop opens a scope around each key read and
//! around each key handler; the break listener cancels whatever scope is
//! active.
//!
//! # Examples
//!
//! ```
//! use command_shell::CancelToken;
//!
//! let parent = CancelToken::new();
//! let child = parent.child();
//! parent.cancel();
//! assert!(child.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
    children: Mutex<Vec<Arc<TokenState>>>,
}

impl TokenState {
    fn children(&self) -> MutexGuard<'_, Vec<Arc<TokenState>>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.notify.notify_waiters();

        let children = std::mem::take(&mut *self.children());
        for child in children {
            child.cancel();
        }
    }

    /// Drops children that can no longer observe a cancellation: already
    /// cancelled, or without handles and without live descendants.
    fn prune(&self) {
        self.children().retain(|child| {
            if child.cancelled.load(Ordering::SeqCst) {
                return false;
            }
            child.prune();
            Arc::strong_count(child) > 1 || !child.children().is_empty()
        });
    }
}

/// Cancellation signal shared between the shell and running work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<TokenState>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a token that is cancelled together with `self`.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        self.state.prune();
        self.state.children().push(Arc::clone(&child.state));
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Whether both handles refer to the same token.
    pub fn same_token(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// Slot holding the token the break key currently cancels.
#[derive(Debug, Clone, Default)]
pub struct BreakScope {
    active: Arc<Mutex<Option<CancelToken>>>,
}

impl BreakScope {
    /// Creates an empty scope slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh scope. The scope is torn down when the guard drops.
    pub fn begin(&self) -> ScopeGuard {
        let token = CancelToken::new();
        *self.slot() = Some(token.clone());
        ScopeGuard {
            scope: self.clone(),
            token,
        }
    }

    /// Cancels the active scope. Returns `false` when no scope is active.
    pub fn trigger(&self) -> bool {
        match self.slot().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a scope is currently open.
    pub fn is_active(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An open [`BreakScope`].
#[derive(Debug)]
pub struct ScopeGuard {
    scope: BreakScope,
    token: CancelToken,
}

impl ScopeGuard {
    /// Token cancelled by the break key while this scope is active.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let mut slot = self.scope.slot();
        if slot
            .as_ref()
            .is_some_and(|active| active.same_token(&self.token))
        {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelling_child_leaves_parent() {
        let parent = CancelToken::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_child_of_cancelled_parent_starts_cancelled() {
        let parent = CancelToken::new();
        parent.cancel();
        assert!(parent.child().is_cancelled());
    }

    #[test]
    fn test_grandchildren_are_cancelled() {
        let root = CancelToken::new();
        let grandchild = root.child().child();

        root.cancel();
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_descendants_of_dropped_tokens_are_cancelled() {
        let root = CancelToken::new();
        let leaf = {
            let middle = root.child();
            let leaf = middle.child();
            drop(middle);
            leaf
        };
        // Deriving another child prunes the tree; the leaf must survive it.
        let _sibling = root.child();

        root.cancel();
        assert!(leaf.is_cancelled());
    }

    #[test]
    fn test_dropped_children_are_released() {
        let root = CancelToken::new();
        for _ in 0..10 {
            let _ = root.child();
        }
        let _kept = root.child();

        assert_eq!(root.state.children().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::task::yield_now().await;
        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }

    #[test]
    fn test_break_scope_cancels_only_active_scope() {
        let scope = BreakScope::new();
        assert!(!scope.trigger());

        let first = scope.begin();
        let first_token = first.token().clone();
        drop(first);
        assert!(!scope.is_active());

        let second = scope.begin();
        assert!(scope.trigger());
        assert!(second.token().is_cancelled());
        assert!(!first_token.is_cancelled());
        assert!(!scope.is_active());
    }

    #[test]
    fn test_stale_guard_does_not_clear_newer_scope() {
        let scope = BreakScope::new();
        let outer = scope.begin();
        let inner = scope.begin();

        drop(outer);
        assert!(scope.is_active());
        drop(inner);
        assert!(!scope.is_active());
    }
}
