//! # Transitions
//!
//! A [`Transition`] wraps one [`Animation`] with the bookkeeping navigation
//! needs on top of it:
//!
//! ```text
//! Transition
//! ├── transition_id: Option<TransitionId>   // assigned after hydration
//! ├── animation: Box<dyn Animation>         // owned, played by the root
//! ├── entering / leaving: Option<ViewId>
//! ├── parent: Option<TransitionKey>         // root this one was appended to
//! ├── children: Vec<TransitionKey>
//! ├── start_fn: deferred start callback     // cleared once fired
//! └── done: completion signal
//! ```
//!
//! `start()` fires the deferred callback and hands back the parent so the
//! registry can keep walking up: a child always starts before its parent.
//!
//! `destroy()` tears the animation down once and drops every reference the
//! transition holds. It is safe to call any number of times; later calls
//! report `false` and do nothing.

use futures::future::BoxFuture;
use log::trace;
use std::fmt;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::core::animation::{AnimationOptions, Animation};
use crate::core::ids::{TransitionId, ViewId};
use crate::core::view::{RenderError, ViewController};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// An element failed to become ready before the transition could build.
    Render(RenderError),
    /// The builder refused to produce a transition.
    Build(String),
    /// The animation engine reported a playback failure.
    Animation(String),
    /// The transition was torn down before it finished.
    Destroyed,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::Render(e) => write!(f, "render error: {e}"),
            TransitionError::Build(msg) => write!(f, "transition build error: {msg}"),
            TransitionError::Animation(msg) => write!(f, "animation error: {msg}"),
            TransitionError::Destroyed => write!(f, "transition destroyed before completion"),
        }
    }
}

impl std::error::Error for TransitionError {}

impl From<RenderError> for TransitionError {
    fn from(e: RenderError) -> Self {
        TransitionError::Render(e)
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Turns an empty transition into a hydrated one for a pair of views.
pub trait TransitionBuilder: Send + Sync {
    fn build(
        &self,
        empty: Transition,
        entering: Option<&ViewController>,
        leaving: Option<&ViewController>,
        opts: &AnimationOptions,
    ) -> Result<Transition, TransitionError>;
}

impl<F> TransitionBuilder for F
where
    F: Fn(
            Transition,
            Option<&ViewController>,
            Option<&ViewController>,
            &AnimationOptions,
        ) -> Result<Transition, TransitionError>
        + Send
        + Sync,
{
    fn build(
        &self,
        empty: Transition,
        entering: Option<&ViewController>,
        leaving: Option<&ViewController>,
        opts: &AnimationOptions,
    ) -> Result<Transition, TransitionError> {
        self(empty, entering, leaving, opts)
    }
}

// ============================================================================
// Transition
// ============================================================================

/// Arena handle of a transition inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionKey(pub(crate) u32);

pub type TransitionStartFn = Box<dyn FnOnce() + Send>;

pub type CompletionSender = oneshot::Sender<Result<(), TransitionError>>;

pub struct Transition {
    transition_id: Option<TransitionId>,
    animation: Box<dyn Animation>,
    entering: Option<ViewId>,
    leaving: Option<ViewId>,
    pub(crate) parent: Option<TransitionKey>,
    pub(crate) children: Vec<TransitionKey>,
    start_fn: Option<TransitionStartFn>,
    done: Option<CompletionSender>,
    started: bool,
    destroyed: bool,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("transition_id", &self.transition_id)
            .field("animation", &self.animation.name())
            .field("entering", &self.entering)
            .field("leaving", &self.leaving)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("started", &self.started)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

/// Wraps an engine animation into a transition.
pub fn transition_factory(animation: Box<dyn Animation>) -> Transition {
    Transition {
        transition_id: None,
        animation,
        entering: None,
        leaving: None,
        parent: None,
        children: Vec::new(),
        start_fn: None,
        done: None,
        started: false,
        destroyed: false,
    }
}

impl Transition {
    /// Swaps in the animation a builder produced.
    pub fn with_animation(mut self, animation: Box<dyn Animation>) -> Self {
        self.animation.destroy();
        self.animation = animation;
        self
    }

    pub fn transition_id(&self) -> Option<TransitionId> {
        self.transition_id
    }

    pub fn set_transition_id(&mut self, id: TransitionId) {
        self.transition_id = Some(id);
    }

    pub fn entering(&self) -> Option<ViewId> {
        self.entering
    }

    pub fn leaving(&self) -> Option<ViewId> {
        self.leaving
    }

    pub fn set_views(&mut self, entering: Option<ViewId>, leaving: Option<ViewId>) {
        self.entering = entering;
        self.leaving = leaving;
    }

    pub fn parent(&self) -> Option<TransitionKey> {
        self.parent
    }

    pub fn children(&self) -> &[TransitionKey] {
        &self.children
    }

    pub fn animation_name(&self) -> Option<&str> {
        (!self.destroyed).then(|| self.animation.name())
    }

    pub fn duration(&self) -> Option<Duration> {
        (!self.destroyed).then(|| self.animation.duration())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Stores a callback that runs the first time `start()` is called.
    pub fn register_transition_start(&mut self, callback: TransitionStartFn) {
        self.start_fn = Some(callback);
    }

    pub fn has_start_callback(&self) -> bool {
        self.start_fn.is_some()
    }

    /// Stores the sender resolved when the (composite) transition finishes.
    pub fn on_complete(&mut self, sender: CompletionSender) {
        self.done = Some(sender);
    }

    /// Fires the deferred start callback and returns the parent to start next.
    pub fn start(&mut self) -> Option<TransitionKey> {
        if self.destroyed {
            return None;
        }
        self.started = true;
        if let Some(callback) = self.start_fn.take() {
            callback();
        }
        self.parent
    }

    pub fn play(&mut self) -> BoxFuture<'static, Result<(), TransitionError>> {
        if self.destroyed {
            return Box::pin(async { Err(TransitionError::Destroyed) });
        }
        self.animation.play()
    }

    /// Resolves the completion signal, if anyone is still waiting on it.
    pub fn complete(&mut self, result: Result<(), TransitionError>) {
        if let Some(done) = self.done.take() {
            let _ = done.send(result);
        }
    }

    /// Destroys the animation and drops every reference.
    ///
    /// Pending waiters are failed with [`TransitionError::Destroyed`].
    /// Returns `false` when the transition was already destroyed.
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        trace!("Destroying transition {:?}", self.transition_id);
        self.animation.destroy();
        self.complete(Err(TransitionError::Destroyed));
        self.destroyed = true;
        self.parent = None;
        self.entering = None;
        self.leaving = None;
        self.start_fn = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::animation::{KeyframeAnimation, NoopAnimation, md_transition};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transition() -> Transition {
        transition_factory(Box::new(NoopAnimation::default()))
    }

    #[test]
    fn test_start_fires_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut t = transition();
        let counter = calls.clone();
        t.register_transition_start(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(t.has_start_callback());

        t.start();
        t.start();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!t.has_start_callback());
        assert!(t.is_started());
    }

    #[test]
    fn test_start_returns_parent() {
        let mut t = transition();
        assert_eq!(t.start(), None);
        t.parent = Some(TransitionKey(4));
        assert_eq!(t.start(), Some(TransitionKey(4)));
    }

    #[test]
    fn test_destroy_is_idempotent_and_clears_references() {
        let mut t = transition_factory(Box::new(KeyframeAnimation::new("slide", Duration::ZERO)));
        t.set_views(Some(ViewId(2001)), Some(ViewId(2000)));
        t.parent = Some(TransitionKey(1));
        t.register_transition_start(Box::new(|| {}));

        assert!(t.destroy());
        assert!(!t.destroy());
        assert_eq!(t.entering(), None);
        assert_eq!(t.leaving(), None);
        assert_eq!(t.parent(), None);
        assert!(!t.has_start_callback());
        assert_eq!(t.animation_name(), None);
        // Starting a destroyed transition neither panics nor walks up
        assert_eq!(t.start(), None);
    }

    #[tokio::test]
    async fn test_destroy_fails_pending_waiter() {
        let (tx, rx) = oneshot::channel();
        let mut t = transition();
        t.on_complete(tx);
        t.destroy();
        assert_eq!(rx.await.unwrap(), Err(TransitionError::Destroyed));
    }

    #[tokio::test]
    async fn test_play_after_destroy_is_rejected() {
        let mut t = transition();
        t.destroy();
        assert_eq!(t.play().await, Err(TransitionError::Destroyed));
    }

    #[test]
    fn test_closure_and_fn_builders() {
        let builder: Arc<dyn TransitionBuilder> = Arc::new(md_transition);
        let built = builder
            .build(transition(), None, None, &AnimationOptions::default())
            .unwrap();
        assert_eq!(built.animation_name(), Some("md-fade"));

        let failing = |_: Transition,
                       _: Option<&ViewController>,
                       _: Option<&ViewController>,
                       _: &AnimationOptions|
         -> Result<Transition, TransitionError> {
            Err(TransitionError::Build("nope".to_string()))
        };
        let builder: Arc<dyn TransitionBuilder> = Arc::new(failing);
        let result = builder.build(transition(), None, None, &AnimationOptions::default());
        assert!(matches!(result, Err(TransitionError::Build(_))));
    }
}
