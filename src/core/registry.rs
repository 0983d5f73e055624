//! # Transition Registry
//!
//! Tracks every in-flight transition of a [`NavHost`](crate::core::nav::NavHost).
//!
//! ```text
//! active: TransitionId → root TransitionKey     (one entry per id)
//! transitions: TransitionKey → Transition       (roots, children, detached)
//! claims: TransitionId → navigators still hydrating under that id
//! ```
//!
//! The first transition registered under an id becomes the root entry.
//! Later ones with the same id (a nested navigator navigating inside its
//! ancestor's transition window) are appended as children of that root, so
//! the entry count does not grow. A transition arriving after its root has
//! already started is kept detached and played on its own.
//!
//! Unknown ids are never an error: destroying one is a no-op.

use futures::future::BoxFuture;
use log::{debug, trace};
use std::collections::HashMap;

use crate::core::ids::TransitionId;
use crate::core::transition::{Transition, TransitionError, TransitionKey};

/// Where a hydrated transition ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First under its id; the owner plays the composite.
    Root(TransitionKey),
    /// Appended to a running root.
    Child { key: TransitionKey, root: TransitionKey },
    /// The root had already started; the owner plays this one alone.
    Detached(TransitionKey),
}

impl Registration {
    pub fn key(&self) -> TransitionKey {
        match self {
            Registration::Root(key) | Registration::Detached(key) => *key,
            Registration::Child { key, .. } => *key,
        }
    }

    /// Whether the owning navigator is responsible for playing and destroying it.
    pub fn plays(&self) -> bool {
        !matches!(self, Registration::Child { .. })
    }
}

#[derive(Debug, Default)]
pub struct TransitionRegistry {
    active: HashMap<TransitionId, TransitionKey>,
    transitions: HashMap<TransitionKey, Transition>,
    claims: HashMap<TransitionId, usize>,
    next_key: u32,
}

impl TransitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registry entries (one per active transition id).
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, id: TransitionId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn root_of(&self, id: TransitionId) -> Option<TransitionKey> {
        self.active.get(&id).copied()
    }

    pub fn get(&self, key: TransitionKey) -> Option<&Transition> {
        self.transitions.get(&key)
    }

    pub fn get_mut(&mut self, key: TransitionKey) -> Option<&mut Transition> {
        self.transitions.get_mut(&key)
    }

    pub fn children_of(&self, id: TransitionId) -> Vec<TransitionKey> {
        self.root_of(id)
            .and_then(|root| self.transitions.get(&root))
            .map(|t| t.children().to_vec())
            .unwrap_or_default()
    }

    // ── Claims ─────────────────────────────────────────────────────────────

    /// Announces a navigator that will register a transition under `id`.
    pub fn claim(&mut self, id: TransitionId) {
        *self.claims.entry(id).or_insert(0) += 1;
    }

    pub fn pending_claims(&self, id: TransitionId) -> usize {
        self.claims.get(&id).copied().unwrap_or(0)
    }

    /// Withdraws a claim without registering (the navigator failed).
    ///
    /// A root that was holding back for this claimant is started.
    pub fn release_claim(&mut self, id: TransitionId) {
        if !self.consume_claim(id) {
            return;
        }
        if self.pending_claims(id) > 0 {
            return;
        }
        if let Some(root) = self.root_of(id) {
            let waiting = self
                .transitions
                .get(&root)
                .is_some_and(|t| !t.is_started());
            if waiting {
                debug!("Last claimant of {} withdrew, starting root", id);
                self.start(root);
            }
        }
    }

    fn consume_claim(&mut self, id: TransitionId) -> bool {
        match self.claims.get_mut(&id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.claims.remove(&id);
                true
            }
            None => false,
        }
    }

    // ── Registration ───────────────────────────────────────────────────────

    /// Registers a hydrated transition under `id`, consuming one claim.
    pub fn register(&mut self, id: TransitionId, mut transition: Transition) -> Registration {
        transition.set_transition_id(id);
        self.consume_claim(id);

        let key = TransitionKey(self.next_key);
        self.next_key += 1;

        let registration = match self.root_of(id) {
            None => {
                self.active.insert(id, key);
                Registration::Root(key)
            }
            Some(root) => match self.transitions.get_mut(&root) {
                Some(root_transition) if !root_transition.is_started() => {
                    root_transition.children.push(key);
                    transition.parent = Some(root);
                    Registration::Child { key, root }
                }
                _ => Registration::Detached(key),
            },
        };

        trace!("Registered {} as {:?}", id, registration);
        self.transitions.insert(key, transition);
        registration
    }

    // ── Driving ────────────────────────────────────────────────────────────

    /// Starts `key`, then each parent up the chain.
    pub fn start(&mut self, key: TransitionKey) {
        let mut next = Some(key);
        while let Some(current) = next {
            next = self.transitions.get_mut(&current).and_then(Transition::start);
        }
    }

    /// Playback futures for a transition and everything appended to it.
    pub fn play_composite(
        &mut self,
        key: TransitionKey,
    ) -> Vec<BoxFuture<'static, Result<(), TransitionError>>> {
        let children = match self.transitions.get(&key) {
            Some(t) => t.children().to_vec(),
            None => return Vec::new(),
        };
        std::iter::once(key)
            .chain(children)
            .filter_map(|k| self.transitions.get_mut(&k).map(Transition::play))
            .collect()
    }

    /// Resolves the completion signal of a transition and its children.
    pub fn complete(&mut self, key: TransitionKey, result: Result<(), TransitionError>) {
        let children = self
            .transitions
            .get(&key)
            .map(|t| t.children().to_vec())
            .unwrap_or_default();
        for k in std::iter::once(key).chain(children) {
            if let Some(t) = self.transitions.get_mut(&k) {
                t.complete(result.clone());
            }
        }
    }

    // ── Teardown ───────────────────────────────────────────────────────────

    /// Destroys the entry for `id` and everything appended to it.
    ///
    /// Returns `false` (and does nothing) when there is no such entry.
    pub fn destroy_transition(&mut self, id: TransitionId) -> bool {
        let Some(root) = self.active.remove(&id) else {
            return false;
        };
        debug!("Destroying transition {}", id);
        self.destroy_key(root);
        true
    }

    /// Destroys a single transition (and its children) by arena key.
    pub fn destroy_key(&mut self, key: TransitionKey) -> bool {
        let Some(mut transition) = self.transitions.remove(&key) else {
            return false;
        };
        let children = std::mem::take(&mut transition.children);
        transition.destroy();
        for child in children {
            if let Some(mut child) = self.transitions.remove(&child) {
                child.destroy();
            }
        }
        true
    }

    /// Destroys everything. Used at host shutdown and test teardown.
    pub fn clear(&mut self) {
        for (_, mut transition) in self.transitions.drain() {
            transition.destroy();
        }
        self.active.clear();
        self.claims.clear();
    }
}
