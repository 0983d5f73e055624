//! # Navigator Controller
//!
//! [`NavHost`] owns every navigator, view and in-flight transition of one
//! application and drives navigation requests end to end.
//!
//! ```text
//! NavHost (Clone, shared)
//! ├── inner: Arc<Mutex<NavTree>>
//! │   ├── ids: IdAllocator
//! │   ├── navs: NavId → Navigator        (parent/children are handles)
//! │   ├── views: ViewId → ViewController (nav back-reference is a handle)
//! │   ├── registry: TransitionRegistry
//! │   └── listeners: NavEvent subscribers
//! ├── delegate: Arc<dyn FrameworkDelegate>
//! └── config: Arc<Config>
//! ```
//!
//! Every request moves through the same states:
//!
//! ```text
//! Requested ──► TransitionHydrating ──► Animating ──► Committed
//!     │                 │                   │
//!     └─────────────────┴───────────────────┴──► Aborted (rolled back, Err)
//! ```
//!
//! The stack is only mutated in `Committed`, after the whole (possibly
//! composite) transition reported completion. The tree lock is never held
//! across an await.
//!
//! A request future dropped before it finishes (a caller timeout, an aborted
//! task) is rolled back as well: its navigator is freed, its claim on a
//! shared transition withdrawn and the view it created removed.

use futures::future::try_join_all;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

use crate::core::animation::{AnimationOptions, NoopAnimation, default_builder};
use crate::core::config::Config;
use crate::core::ids::{IdAllocator, NavId, TransitionId, ViewId};
use crate::core::registry::{Registration, TransitionRegistry};
use crate::core::stack::ViewStack;
use crate::core::transition::{
    CompletionSender, Transition, TransitionBuilder, TransitionError, TransitionKey,
    TransitionStartFn, transition_factory,
};
use crate::core::view::{
    ComponentRef, FrameworkDelegate, NavParams, RenderError, ViewController, ViewElement, ViewMap,
    toggle_hidden,
};
use crate::core::zindex::{Direction, set_z_index};

/// Config key of the page transition override.
pub const NAV_TRANSITION: &str = "navTransition";

/// CSS class handed to the delegate for every page element.
pub const PAGE_CSS_CLASS: &str = "nav-page";

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum NavError {
    NavNotFound(NavId),
    ViewNotFound(ViewId),
    /// The navigator is already running a request.
    TransitionInProgress(NavId),
    Render(RenderError),
    Transition(TransitionError),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::NavNotFound(id) => write!(f, "navigator {id} does not exist"),
            NavError::ViewNotFound(id) => write!(f, "view {id} is not on the stack"),
            NavError::TransitionInProgress(id) => {
                write!(f, "navigator {id} is already transitioning")
            }
            NavError::Render(e) => write!(f, "{e}"),
            NavError::Transition(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for NavError {}

impl From<RenderError> for NavError {
    fn from(e: RenderError) -> Self {
        NavError::Render(e)
    }
}

impl From<TransitionError> for NavError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Render(e) => NavError::Render(e),
            other => NavError::Transition(other),
        }
    }
}

// ============================================================================
// Navigator
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavKind {
    #[default]
    Nav,
    Tabs,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    pub id: NavId,
    pub kind: NavKind,
    pub parent: Option<NavId>,
    pub children: Vec<NavId>,
    pub stack: ViewStack,
    /// Set while a request runs; nested navigators inherit it.
    pub transition_id: Option<TransitionId>,
    pub z_index_offset: i32,
    pub animated: bool,
    pub swipe_gesture: bool,
    pub transitioning: bool,
}

impl Navigator {
    pub fn new(id: NavId, parent: Option<NavId>) -> Self {
        Self {
            id,
            kind: NavKind::Nav,
            parent,
            children: Vec::new(),
            stack: ViewStack::new(),
            transition_id: None,
            z_index_offset: 0,
            animated: true,
            swipe_gesture: true,
            transitioning: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Settings for a new navigator. Unset fields fall back to the config.
#[derive(Debug, Clone, Default)]
pub struct NavOptions {
    pub kind: NavKind,
    pub parent: Option<NavId>,
    pub z_index_offset: Option<i32>,
    pub animated: Option<bool>,
    pub swipe_gesture: Option<bool>,
}

impl NavOptions {
    pub fn child_of(parent: NavId) -> Self {
        Self {
            parent: Some(parent),
            ..Default::default()
        }
    }
}

// ============================================================================
// Results & Events
// ============================================================================

/// Outcome of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NavResult {
    pub has_completed: bool,
    pub requires_transition: bool,
    pub entering: Option<ViewId>,
    pub leaving: Option<ViewId>,
    pub direction: Option<Direction>,
    pub transition_id: Option<TransitionId>,
}

impl NavResult {
    /// Nothing to do (e.g. popping the last view).
    pub fn not_completed() -> Self {
        Self {
            has_completed: false,
            requires_transition: false,
            entering: None,
            leaving: None,
            direction: None,
            transition_id: None,
        }
    }

    fn without_transition(entering: Option<ViewId>, leaving: Option<ViewId>) -> Self {
        Self {
            has_completed: true,
            entering,
            leaving,
            ..Self::not_completed()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    WillChange { nav: NavId, direction: Direction },
    DidChange { nav: NavId, direction: Direction },
    WillEnter { nav: NavId, view: ViewId },
    DidEnter { nav: NavId, view: ViewId },
    WillLeave { nav: NavId, view: ViewId },
    DidLeave { nav: NavId, view: ViewId },
}

// ============================================================================
// Shared Tree
// ============================================================================

#[derive(Default)]
struct NavTree {
    ids: IdAllocator,
    navs: HashMap<NavId, Navigator>,
    views: ViewMap,
    registry: TransitionRegistry,
    listeners: Vec<mpsc::UnboundedSender<NavEvent>>,
}

impl NavTree {
    fn nav(&self, id: NavId) -> Result<&Navigator, NavError> {
        self.navs.get(&id).ok_or(NavError::NavNotFound(id))
    }

    fn nav_mut(&mut self, id: NavId) -> Result<&mut Navigator, NavError> {
        self.navs.get_mut(&id).ok_or(NavError::NavNotFound(id))
    }

    fn emit(&mut self, event: NavEvent) {
        trace!("{:?}", event);
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn parent_transition_id(&self, nav: NavId) -> Option<TransitionId> {
        let mut current = self.navs.get(&nav).and_then(|n| n.parent);
        while let Some(id) = current {
            let ancestor = self.navs.get(&id)?;
            if ancestor.transition_id.is_some() {
                return ancestor.transition_id;
            }
            current = ancestor.parent;
        }
        None
    }

    /// Destroys and unregisters views, handing back their live elements.
    fn drop_views(&mut self, ids: &[ViewId]) -> Vec<Arc<dyn ViewElement>> {
        let mut elements = Vec::new();
        for id in ids {
            if let Some(mut view) = self.views.remove(id) {
                view.destroy();
                elements.extend(view.element());
            }
        }
        elements
    }
}

// ============================================================================
// Request Plans
// ============================================================================

/// Stack mutation applied once the transition completed.
#[derive(Debug, Clone, Copy)]
enum Commit {
    Push(ViewId),
    /// Keep the first `n` views.
    PopTo(usize),
    SetRoot(ViewId),
    Remove(ViewId),
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    nav: NavId,
    direction: Direction,
    entering: Option<ViewId>,
    leaving: Option<ViewId>,
    commit: Commit,
}

struct Hooks {
    start: TransitionStartFn,
    done: CompletionSender,
}

/// Everything a running request holds on the tree.
///
/// Created when the navigator is marked busy. Unless the request commits
/// (`disarm`) or is rolled back (`release`), dropping the guard undoes it,
/// so a request future dropped mid-flight (e.g. by a timeout) never leaves
/// its navigator busy or a shared transition waiting on its claim.
struct RequestGuard {
    host: NavHost,
    nav: NavId,
    created: Option<ViewId>,
    entering: Option<ViewId>,
    claimed: Option<TransitionId>,
    registration: Option<Registration>,
    armed: bool,
}

impl RequestGuard {
    fn new(host: &NavHost, nav: NavId) -> Self {
        Self {
            host: host.clone(),
            nav,
            created: None,
            entering: None,
            claimed: None,
            registration: None,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    /// Undoes the request and hands back elements to remove.
    fn release(&mut self) -> Vec<Arc<dyn ViewElement>> {
        if !self.armed {
            return Vec::new();
        }
        self.armed = false;

        let mut guard = self.host.tree();
        let tree = &mut *guard;
        match (self.claimed, self.registration) {
            (Some(id), None) => tree.registry.release_claim(id),
            (Some(id), Some(Registration::Root(_))) => {
                tree.registry.destroy_transition(id);
            }
            (_, Some(Registration::Detached(key))) => {
                tree.registry.destroy_key(key);
            }
            _ => {}
        }

        if let Some(nav) = tree.navs.get_mut(&self.nav) {
            nav.transitioning = false;
            if nav.transition_id == self.claimed {
                nav.transition_id = None;
            }
        }
        if let Some(view) = self.entering.filter(|id| Some(*id) != self.created) {
            if let Some(view) = tree.views.get(&view) {
                toggle_hidden(view, true);
            }
        }
        debug!("Released request on {}", self.nav);
        match self.created {
            Some(created) => tree.drop_views(&[created]),
            None => Vec::new(),
        }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Request on {} dropped before finishing", self.nav);
        let elements = self.release();
        if elements.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let host = self.host.clone();
                let _ = handle.spawn(async move { host.remove_elements(elements).await });
            }
            Err(_) => warn!("No runtime to remove {} elements", elements.len()),
        }
    }
}

// ============================================================================
// NavHost
// ============================================================================

#[derive(Clone)]
pub struct NavHost {
    inner: Arc<Mutex<NavTree>>,
    delegate: Arc<dyn FrameworkDelegate>,
    config: Arc<Config>,
}

impl fmt::Debug for NavHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree();
        f.debug_struct("NavHost")
            .field("navs", &tree.navs.len())
            .field("views", &tree.views.len())
            .field("transitions", &tree.registry.len())
            .finish()
    }
}

impl NavHost {
    pub fn new(delegate: Arc<dyn FrameworkDelegate>, config: Arc<Config>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(NavTree::default())),
            delegate,
            config,
        }
    }

    fn tree(&self) -> MutexGuard<'_, NavTree> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn delegate(&self) -> &Arc<dyn FrameworkDelegate> {
        &self.delegate
    }

    /// Receives every [`NavEvent`] emitted from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<NavEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tree().listeners.push(tx);
        rx
    }

    // ── Tree ───────────────────────────────────────────────────────────────

    pub fn create_nav(&self, options: NavOptions) -> Result<NavId, NavError> {
        let mut tree = self.tree();
        if let Some(parent) = options.parent {
            tree.nav(parent)?;
        }

        let id = tree.ids.next_navigator_id();
        let mut nav = Navigator::new(id, options.parent);
        nav.kind = options.kind;
        nav.z_index_offset = options
            .z_index_offset
            .unwrap_or(self.config.z_index_offset());
        nav.animated = options.animated.unwrap_or(true);
        nav.swipe_gesture = options
            .swipe_gesture
            .unwrap_or(self.config.swipe_back_enabled());

        if let Some(parent) = options.parent.and_then(|p| tree.navs.get_mut(&p)) {
            parent.children.push(id);
        }
        tree.navs.insert(id, nav);
        info!("Created navigator {} (parent: {:?})", id, options.parent);
        Ok(id)
    }

    /// Removes a navigator with all its descendants and their views.
    pub async fn remove_nav(&self, id: NavId) -> Result<(), NavError> {
        let elements = {
            let mut guard = self.tree();
            let tree = &mut *guard;
            let parent = tree.nav(id)?.parent;
            if let Some(parent) = parent.and_then(|p| tree.navs.get_mut(&p)) {
                parent.children.retain(|c| *c != id);
            }

            let mut pending = vec![id];
            let mut removed = Vec::new();
            let mut transitions = Vec::new();
            while let Some(current) = pending.pop() {
                if let Some(nav) = tree.navs.remove(&current) {
                    pending.extend(nav.children.iter().copied());
                    transitions.extend(nav.transition_id);
                    removed.push(current);
                }
            }

            // A transition inherited from a surviving ancestor keeps running
            for transition_id in transitions {
                let shared = tree
                    .navs
                    .values()
                    .any(|n| n.transition_id == Some(transition_id));
                if !shared {
                    tree.registry.destroy_transition(transition_id);
                }
            }

            let doomed: Vec<ViewId> = tree
                .views
                .values()
                .filter(|v| v.nav.is_some_and(|n| removed.contains(&n)))
                .map(|v| v.id)
                .collect();
            info!(
                "Removed navigator {} ({} navigators, {} views)",
                id,
                removed.len(),
                doomed.len()
            );
            tree.drop_views(&doomed)
        };

        self.remove_elements(elements).await;
        Ok(())
    }

    pub fn parent_of(&self, nav: NavId) -> Option<NavId> {
        self.tree().navs.get(&nav).and_then(|n| n.parent)
    }

    pub fn get_active_child_navs(&self, nav: NavId) -> Vec<NavId> {
        self.tree()
            .navs
            .get(&nav)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// The navigator whose stack holds `view`.
    pub fn closest_nav(&self, view: ViewId) -> Option<NavId> {
        self.tree().views.get(&view).and_then(|v| v.nav)
    }

    pub fn navigator(&self, nav: NavId) -> Option<Navigator> {
        self.tree().navs.get(&nav).cloned()
    }

    // ── Queries ────────────────────────────────────────────────────────────

    fn with_nav<R>(&self, nav: NavId, f: impl FnOnce(&Navigator) -> R) -> Option<R> {
        self.tree().navs.get(&nav).map(f)
    }

    pub fn get_active(&self, nav: NavId) -> Option<ViewId> {
        self.with_nav(nav, |n| n.stack.get_active()).flatten()
    }

    pub fn get_previous(&self, nav: NavId, view: Option<ViewId>) -> Option<ViewId> {
        self.with_nav(nav, |n| n.stack.get_previous(view)).flatten()
    }

    pub fn get_first(&self, nav: NavId) -> Option<ViewId> {
        self.with_nav(nav, |n| n.stack.get_first()).flatten()
    }

    pub fn get_last(&self, nav: NavId) -> Option<ViewId> {
        self.with_nav(nav, |n| n.stack.get_last()).flatten()
    }

    pub fn get_views(&self, nav: NavId) -> Vec<ViewId> {
        self.with_nav(nav, |n| n.stack.views().to_vec())
            .unwrap_or_default()
    }

    pub fn len(&self, nav: NavId) -> usize {
        self.with_nav(nav, |n| n.stack.len()).unwrap_or(0)
    }

    /// Snapshot of a view controller.
    pub fn view(&self, id: ViewId) -> Option<ViewController> {
        self.tree().views.get(&id).cloned()
    }

    pub fn can_go_back(&self, nav: NavId, view: Option<ViewId>) -> bool {
        self.with_nav(nav, |n| n.stack.can_go_back(view))
            .unwrap_or(false)
    }

    pub fn can_swipe_back(&self, nav: NavId) -> bool {
        self.with_nav(nav, |n| {
            n.swipe_gesture && !n.transitioning && n.stack.can_go_back(None)
        })
        .unwrap_or(false)
    }

    pub fn transition_id(&self, nav: NavId) -> Option<TransitionId> {
        self.with_nav(nav, |n| n.transition_id).flatten()
    }

    pub fn is_transitioning(&self, nav: NavId) -> bool {
        self.with_nav(nav, |n| n.transitioning).unwrap_or(false)
    }

    /// Number of registry entries (one per active transition id).
    pub fn registry_len(&self) -> usize {
        self.tree().registry.len()
    }

    /// Number of transitions appended to the entry for `id`.
    pub fn registry_children(&self, id: TransitionId) -> usize {
        self.tree().registry.children_of(id).len()
    }

    // ── Transitions ────────────────────────────────────────────────────────

    /// First transition id set on an ancestor of `nav`, starting at its parent.
    ///
    /// `None` when no ancestor is transitioning (including root navigators).
    pub fn get_parent_transition_id(&self, nav: NavId) -> Option<TransitionId> {
        self.tree().parent_transition_id(nav)
    }

    /// Destroys the registry entry for `id`. Unknown ids are ignored.
    pub fn destroy_transition(&self, id: TransitionId) -> bool {
        self.tree().registry.destroy_transition(id)
    }

    /// Waits for both elements, builds the transition and registers it.
    ///
    /// The builder is the config override registered as `name`, else
    /// `default_builder`. There is no internal timeout; an element that never
    /// becomes ready stalls the call.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_hydrated_transition(
        &self,
        name: &str,
        transition_id: TransitionId,
        empty: Transition,
        entering: Option<&ViewController>,
        leaving: Option<&ViewController>,
        opts: &AnimationOptions,
        default_builder: Arc<dyn TransitionBuilder>,
    ) -> Result<Registration, TransitionError> {
        self.hydrate(
            name,
            transition_id,
            empty,
            entering,
            leaving,
            opts,
            default_builder,
            None,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn hydrate(
        &self,
        name: &str,
        transition_id: TransitionId,
        empty: Transition,
        entering: Option<&ViewController>,
        leaving: Option<&ViewController>,
        opts: &AnimationOptions,
        default_builder: Arc<dyn TransitionBuilder>,
        hooks: Option<Hooks>,
    ) -> Result<Registration, TransitionError> {
        let elements: Vec<Arc<dyn ViewElement>> = [entering, leaving]
            .into_iter()
            .flatten()
            .filter_map(ViewController::element)
            .collect();
        try_join_all(elements.iter().map(|e| e.component_on_ready())).await?;

        let builder = self.config.get(name).unwrap_or(default_builder);
        let mut transition = builder.build(empty, entering, leaving, opts)?;
        transition.set_views(entering.map(|v| v.id), leaving.map(|v| v.id));
        if let Some(hooks) = hooks {
            transition.register_transition_start(hooks.start);
            transition.on_complete(hooks.done);
        }

        let registration = self.tree().registry.register(transition_id, transition);
        debug!("Hydrated {} as {:?}", transition_id, registration);
        Ok(registration)
    }

    // ── Navigation ─────────────────────────────────────────────────────────

    pub async fn push(
        &self,
        nav: NavId,
        component: ComponentRef,
        params: NavParams,
    ) -> Result<NavResult, NavError> {
        let mut request = self.begin(nav)?;
        let view = self.create_view_or_abort(&mut request, &component, &params).await?;
        let leaving = self.get_active(nav);
        self.run_transition(
            Plan {
                nav,
                direction: Direction::Forward,
                entering: Some(view),
                leaving,
                commit: Commit::Push(view),
            },
            request,
        )
        .await
    }

    /// Pops the active view. A stack with one view is left alone.
    pub async fn pop(&self, nav: NavId) -> Result<NavResult, NavError> {
        let mut request = self.begin(nav)?;
        let plan = {
            let tree = self.tree();
            let stack = &tree.nav(nav)?.stack;
            (stack.len() > 1).then(|| Plan {
                nav,
                direction: Direction::Back,
                entering: stack.get_previous(None),
                leaving: stack.get_active(),
                commit: Commit::PopTo(stack.len() - 1),
            })
        };
        match plan {
            Some(plan) => self.run_transition(plan, request).await,
            None => {
                request.release();
                Ok(NavResult::not_completed())
            }
        }
    }

    pub async fn pop_to_root(&self, nav: NavId) -> Result<NavResult, NavError> {
        let mut request = self.begin(nav)?;
        let plan = {
            let tree = self.tree();
            let stack = &tree.nav(nav)?.stack;
            (stack.len() > 1).then(|| Plan {
                nav,
                direction: Direction::Back,
                entering: stack.get_first(),
                leaving: stack.get_active(),
                commit: Commit::PopTo(1),
            })
        };
        match plan {
            Some(plan) => self.run_transition(plan, request).await,
            None => {
                request.release();
                Ok(NavResult::not_completed())
            }
        }
    }

    /// Replaces the whole stack with a single new view.
    pub async fn set_root(
        &self,
        nav: NavId,
        component: ComponentRef,
        params: NavParams,
    ) -> Result<NavResult, NavError> {
        let mut request = self.begin(nav)?;
        let view = self.create_view_or_abort(&mut request, &component, &params).await?;
        let leaving = self.get_active(nav);
        self.run_transition(
            Plan {
                nav,
                direction: Direction::Switch,
                entering: Some(view),
                leaving,
                commit: Commit::SetRoot(view),
            },
            request,
        )
        .await
    }

    /// Inserts a view at `index`. Inserting at or past the top is a push.
    pub async fn insert(
        &self,
        nav: NavId,
        index: usize,
        component: ComponentRef,
        params: NavParams,
    ) -> Result<NavResult, NavError> {
        let mut request = self.begin(nav)?;
        let view = self.create_view_or_abort(&mut request, &component, &params).await?;

        let below_top = {
            let mut guard = self.tree();
            let tree = &mut *guard;
            match tree.navs.get_mut(&nav) {
                Some(navigator) if index < navigator.stack.len() => {
                    navigator.stack.insert(index, view);
                    navigator.transitioning = false;
                    if let Some(vc) = tree.views.get_mut(&view) {
                        vc.mark_attached();
                    }
                    request.disarm();
                    true
                }
                _ => false,
            }
        };
        if below_top {
            debug!("Inserted {} into {} at {}", view, nav, index);
            return Ok(NavResult::without_transition(Some(view), None));
        }

        let leaving = self.get_active(nav);
        self.run_transition(
            Plan {
                nav,
                direction: Direction::Forward,
                entering: Some(view),
                leaving,
                commit: Commit::Push(view),
            },
            request,
        )
        .await
    }

    /// Removes `view` from the stack, transitioning back when it is active.
    pub async fn remove(&self, nav: NavId, view: ViewId) -> Result<NavResult, NavError> {
        let mut request = self.begin(nav)?;
        let plan = {
            let mut guard = self.tree();
            let tree = &mut *guard;
            let nav_ref = tree.nav_mut(nav)?;
            if !nav_ref.stack.contains(view) {
                Err(NavError::ViewNotFound(view))
            } else if nav_ref.stack.get_active() == Some(view) {
                Ok(Some(Plan {
                    nav,
                    direction: Direction::Back,
                    entering: nav_ref.stack.get_previous(None),
                    leaving: Some(view),
                    commit: Commit::Remove(view),
                }))
            } else {
                nav_ref.stack.remove(view);
                nav_ref.transitioning = false;
                request.disarm();
                Ok(None)
            }
        };

        match plan {
            Ok(Some(plan)) => self.run_transition(plan, request).await,
            Ok(None) => {
                let elements = self.tree().drop_views(&[view]);
                self.remove_elements(elements).await;
                debug!("Removed inactive {} from {}", view, nav);
                Ok(NavResult::without_transition(None, Some(view)))
            }
            Err(e) => {
                request.release();
                Err(e)
            }
        }
    }

    // ── Request Internals ──────────────────────────────────────────────────

    /// Marks `nav` busy, rejecting concurrent requests.
    fn begin(&self, nav: NavId) -> Result<RequestGuard, NavError> {
        let mut tree = self.tree();
        let navigator = tree.nav_mut(nav)?;
        if navigator.transitioning {
            warn!("Rejected request on {}: already transitioning", nav);
            return Err(NavError::TransitionInProgress(nav));
        }
        navigator.transitioning = true;
        Ok(RequestGuard::new(self, nav))
    }

    async fn create_view_or_abort(
        &self,
        request: &mut RequestGuard,
        component: &ComponentRef,
        params: &NavParams,
    ) -> Result<ViewId, NavError> {
        match self.create_view(request.nav, component, params).await {
            Ok(view) => {
                request.created = Some(view);
                Ok(view)
            }
            Err(e) => {
                warn!("Could not create {} in {}: {}", component, request.nav, e);
                request.release();
                Err(e)
            }
        }
    }

    /// Attaches a new element and registers its (hidden) view controller.
    async fn create_view(
        &self,
        nav: NavId,
        component: &ComponentRef,
        params: &NavParams,
    ) -> Result<ViewId, NavError> {
        let element = self
            .delegate
            .attach_view(component, params, &[PAGE_CSS_CLASS.to_string()])
            .await?;

        let mut tree = self.tree();
        let id = tree.ids.next_view_id();
        let mut view = ViewController::new(id, component.clone(), params.clone());
        view.nav = Some(nav);
        view.init(&element);
        toggle_hidden(&view, true);
        tree.views.insert(id, view);
        debug!("Created {} for {} in {}", id, component, nav);
        Ok(id)
    }

    async fn run_transition(
        &self,
        plan: Plan,
        mut request: RequestGuard,
    ) -> Result<NavResult, NavError> {
        request.entering = plan.entering;
        let (start_tx, start_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();
        let hooks = Hooks {
            start: Box::new(move || {
                let _ = start_tx.send(());
            }),
            done: done_tx,
        };

        // Requested → TransitionHydrating
        let prepared = {
            let mut guard = self.tree();
            let tree = &mut *guard;
            let transition_id = match tree.parent_transition_id(plan.nav) {
                Some(inherited) => {
                    debug!("{} joins parent transition {}", plan.nav, inherited);
                    inherited
                }
                None => tree.ids.next_transition_id(),
            };
            match tree.navs.get_mut(&plan.nav) {
                Some(nav) => {
                    nav.transition_id = Some(transition_id);
                    tree.registry.claim(transition_id);
                    request.claimed = Some(transition_id);
                    let mut opts = self.config.animation_options(plan.direction);
                    opts.animate &= nav.animated;
                    let entering = plan.entering.and_then(|id| tree.views.get(&id).cloned());
                    let leaving = plan.leaving.and_then(|id| tree.views.get(&id).cloned());
                    tree.emit(NavEvent::WillChange {
                        nav: plan.nav,
                        direction: plan.direction,
                    });
                    Some((transition_id, entering, leaving, opts))
                }
                None => None,
            }
        };
        let Some((transition_id, entering, leaving, opts)) = prepared else {
            self.rollback(&mut request).await;
            return Err(NavError::NavNotFound(plan.nav));
        };

        let empty = transition_factory(Box::new(NoopAnimation::default()));
        let hydrated = self
            .hydrate(
                NAV_TRANSITION,
                transition_id,
                empty,
                entering.as_ref(),
                leaving.as_ref(),
                &opts,
                default_builder(self.config.mode()),
                Some(hooks),
            )
            .await;
        let registration = match hydrated {
            Ok(registration) => registration,
            Err(e) => {
                warn!("Hydrating {} failed: {}", transition_id, e);
                self.rollback(&mut request).await;
                return Err(e.into());
            }
        };
        request.registration = Some(registration);

        // TransitionHydrating → Animating
        {
            let mut guard = self.tree();
            let tree = &mut *guard;
            if let Some(nav) = tree.navs.get(&plan.nav) {
                set_z_index(nav, &mut tree.views, plan.entering, plan.leaving, plan.direction);
            }
            if let Some(view) = plan.entering.and_then(|id| tree.views.get(&id)) {
                toggle_hidden(view, false);
            }
            if let Some(view) = plan.entering {
                tree.emit(NavEvent::WillEnter { nav: plan.nav, view });
            }
            if let Some(view) = plan.leaving {
                tree.emit(NavEvent::WillLeave { nav: plan.nav, view });
            }

            match registration {
                Registration::Root(_) if tree.registry.pending_claims(transition_id) > 0 => {
                    debug!("{} waits for nested navigators", transition_id);
                }
                other => tree.registry.start(other.key()),
            }
        }

        if registration.plays() {
            self.play(registration.key(), start_rx).await;
        }
        let result = done_rx.await.unwrap_or(Err(TransitionError::Destroyed));

        match result {
            Ok(()) => self.commit(plan, transition_id, registration, request).await,
            Err(e) => {
                warn!("Transition {} failed: {}", transition_id, e);
                self.rollback(&mut request).await;
                Err(e.into())
            }
        }
    }

    /// Waits for the start signal, plays the composite and broadcasts the result.
    async fn play(&self, key: TransitionKey, start_rx: oneshot::Receiver<()>) {
        let result = match start_rx.await {
            Ok(()) => {
                let plays = self.tree().registry.play_composite(key);
                trace!("Playing {} animations", plays.len());
                try_join_all(plays).await.map(|_| ())
            }
            Err(_) => Err(TransitionError::Destroyed),
        };
        self.tree().registry.complete(key, result);
    }

    async fn commit(
        &self,
        plan: Plan,
        transition_id: TransitionId,
        registration: Registration,
        mut request: RequestGuard,
    ) -> Result<NavResult, NavError> {
        let committed = {
            let mut guard = self.tree();
            let tree = &mut *guard;
            match tree.navs.get_mut(&plan.nav) {
                None => None,
                Some(nav) => {
                    request.disarm();
                    let dropped: Vec<ViewId> = match plan.commit {
                        Commit::Push(view) => {
                            nav.stack.push(view);
                            Vec::new()
                        }
                        Commit::PopTo(len) => nav.stack.truncate(len),
                        Commit::SetRoot(view) => {
                            let old = nav.stack.clear();
                            nav.stack.push(view);
                            old
                        }
                        Commit::Remove(view) => {
                            nav.stack.remove(view);
                            vec![view]
                        }
                    };
                    nav.transitioning = false;
                    if nav.transition_id == Some(transition_id) {
                        nav.transition_id = None;
                    }

                    match registration {
                        Registration::Root(_) => {
                            tree.registry.destroy_transition(transition_id);
                        }
                        Registration::Detached(key) => {
                            tree.registry.destroy_key(key);
                        }
                        Registration::Child { .. } => {}
                    }

                    if let Some(view) = plan.entering.and_then(|id| tree.views.get_mut(&id)) {
                        view.mark_attached();
                    }
                    if let Some(view) = plan.leaving.and_then(|id| tree.views.get(&id)) {
                        toggle_hidden(view, true);
                    }
                    let elements = tree.drop_views(&dropped);

                    if let Some(view) = plan.entering {
                        tree.emit(NavEvent::DidEnter { nav: plan.nav, view });
                    }
                    if let Some(view) = plan.leaving {
                        tree.emit(NavEvent::DidLeave { nav: plan.nav, view });
                    }
                    tree.emit(NavEvent::DidChange {
                        nav: plan.nav,
                        direction: plan.direction,
                    });
                    info!(
                        "{} committed {:?} ({} dropped)",
                        plan.nav,
                        plan.commit,
                        dropped.len()
                    );
                    Some(elements)
                }
            }
        };

        let Some(elements) = committed else {
            self.rollback(&mut request).await;
            return Err(NavError::NavNotFound(plan.nav));
        };
        self.remove_elements(elements).await;
        Ok(NavResult {
            has_completed: true,
            requires_transition: true,
            entering: plan.entering,
            leaving: plan.leaving,
            direction: Some(plan.direction),
            transition_id: Some(transition_id),
        })
    }

    /// Undoes a request that did not reach `Committed`.
    async fn rollback(&self, request: &mut RequestGuard) {
        let elements = request.release();
        self.remove_elements(elements).await;
    }

    async fn remove_elements(&self, elements: Vec<Arc<dyn ViewElement>>) {
        for element in elements {
            if let Err(e) = self.delegate.remove_view(element).await {
                warn!("Failed to remove element: {}", e);
            }
        }
    }
}
