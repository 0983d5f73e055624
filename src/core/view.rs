//! # Views
//!
//! A [`ViewController`] is one entry in a navigator's stack. It does not own
//! anything visual: the rendering layer creates the element through a
//! [`FrameworkDelegate`] and keeps it alive, the controller only holds a weak
//! handle to push z-index and visibility changes into it.
//!
//! ```text
//! ViewController
//! ├── id: ViewId
//! ├── nav: Option<NavId>          // owning navigator (handle, not ownership)
//! ├── component: ComponentRef     // what was pushed
//! ├── params: NavParams           // payload it was pushed with
//! ├── state: ViewState            // New → Initialized → Attached → Destroyed
//! ├── z_index: Option<i32>
//! └── element: Weak<dyn ViewElement>
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::core::ids::{NavId, ViewId};

// ============================================================================
// Error Type
// ============================================================================

/// Failures reported by the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The delegate could not create or mount the element.
    Attach(String),
    /// The element's readiness signal rejected.
    Hydration(String),
    /// The delegate could not unmount the element.
    Detach(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Attach(msg) => write!(f, "attach failed: {msg}"),
            RenderError::Hydration(msg) => write!(f, "element never became ready: {msg}"),
            RenderError::Detach(msg) => write!(f, "detach failed: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

// ============================================================================
// Component References & Payloads
// ============================================================================

/// What to put on a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentRef {
    /// A registered component by tag name, e.g. `"page-detail"`.
    Named(String),
    /// A route the delegate resolves to a component.
    Url(String),
    /// An opaque handle the delegate handed out earlier.
    Handle(u64),
}

impl ComponentRef {
    pub fn named(name: impl Into<String>) -> Self {
        ComponentRef::Named(name.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        ComponentRef::Url(url.into())
    }

    /// Short label used in logs and the terminal host.
    pub fn label(&self) -> String {
        match self {
            ComponentRef::Named(name) => name.clone(),
            ComponentRef::Url(url) => url.clone(),
            ComponentRef::Handle(handle) => format!("<component {handle}>"),
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Data passed along with a pushed component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavParams(BTreeMap<String, Value>);

impl NavParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ============================================================================
// Rendering Collaborators
// ============================================================================

/// The visual element backing a view or an overlay.
///
/// Implementations live in the rendering layer; the core only writes style
/// values through this trait and waits for readiness.
#[async_trait]
pub trait ViewElement: Send + Sync {
    /// Resolves once the element has rendered for the first time.
    ///
    /// Elements without a readiness signal keep the default, which is ready
    /// immediately.
    async fn component_on_ready(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn set_z_index(&self, z_index: i32);

    fn set_hidden(&self, hidden: bool);
}

/// Creates and removes elements on behalf of navigators and overlays.
///
/// The delegate (or the tree behind it) keeps every element it returns alive
/// until `remove_view` is called for it. Views only hold weak handles.
#[async_trait]
pub trait FrameworkDelegate: Send + Sync {
    async fn attach_view(
        &self,
        component: &ComponentRef,
        params: &NavParams,
        css_classes: &[String],
    ) -> Result<Arc<dyn ViewElement>, RenderError>;

    async fn remove_view(&self, element: Arc<dyn ViewElement>) -> Result<(), RenderError>;
}

// ============================================================================
// ViewController
// ============================================================================

/// Arena of view controllers keyed by id.
pub type ViewMap = HashMap<ViewId, ViewController>;

/// Lifecycle of a view. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViewState {
    New,
    Initialized,
    Attached,
    Destroyed,
}

#[derive(Clone)]
pub struct ViewController {
    pub id: ViewId,
    pub nav: Option<NavId>,
    pub component: ComponentRef,
    pub params: NavParams,
    state: ViewState,
    z_index: Option<i32>,
    element: Option<Weak<dyn ViewElement>>,
}

impl fmt::Debug for ViewController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewController")
            .field("id", &self.id)
            .field("nav", &self.nav)
            .field("component", &self.component)
            .field("state", &self.state)
            .field("z_index", &self.z_index)
            .finish_non_exhaustive()
    }
}

impl ViewController {
    pub fn new(id: ViewId, component: ComponentRef, params: NavParams) -> Self {
        Self {
            id,
            nav: None,
            component,
            params,
            state: ViewState::New,
            z_index: None,
            element: None,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn z_index(&self) -> Option<i32> {
        self.z_index
    }

    /// The live element, if the rendering layer still holds it.
    pub fn element(&self) -> Option<Arc<dyn ViewElement>> {
        self.element.as_ref().and_then(Weak::upgrade)
    }

    /// Binds the element created by the delegate and moves to `Initialized`.
    pub fn init(&mut self, element: &Arc<dyn ViewElement>) {
        self.element = Some(Arc::downgrade(element));
        self.advance(ViewState::Initialized);
    }

    pub fn mark_attached(&mut self) {
        self.advance(ViewState::Attached);
    }

    /// Moves to `Destroyed` and detaches from the navigator.
    ///
    /// Returns `false` if the view was already destroyed.
    pub fn destroy(&mut self) -> bool {
        if self.state == ViewState::Destroyed {
            return false;
        }
        self.state = ViewState::Destroyed;
        self.nav = None;
        true
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == ViewState::Destroyed
    }

    pub(crate) fn set_z_index_value(&mut self, z_index: i32) {
        self.z_index = Some(z_index);
    }

    fn advance(&mut self, next: ViewState) {
        if next > self.state {
            self.state = next;
        }
    }
}

/// Shows or hides a view's element. A released element is ignored.
pub fn toggle_hidden(view: &ViewController, should_be_hidden: bool) {
    if let Some(element) = view.element() {
        element.set_hidden(should_be_hidden);
    }
}
