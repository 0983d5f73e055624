//! # Navigation Core
//!
//! Navigators, their view stacks and the transitions between views.
//! It knows nothing about any specific UI technology: elements, delegates
//! and animations are traits the rendering layer implements.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • NavHost (navigators) │
//!                    │  • Transition registry  │
//!                    │  • Z-index rules        │
//!                    │  • Overlays             │
//!                    └───────────┬─────────────┘
//!                                │ ViewElement / FrameworkDelegate / Animation
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │    TUI     │      │    Web     │      │   Tests    │
//!     │  Adapter   │      │  Adapter   │      │ (recording │
//!     │ (ratatui)  │      │  (future)  │      │  delegate) │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ids`]: id allocation for navigators, views and transitions
//! - [`view`]: `ViewController` and the rendering collaborator traits
//! - [`stack`]: the ordered view stack of one navigator
//! - [`zindex`]: stacking order of entering views
//! - [`animation`]: the animation trait and the built-in animations
//! - [`transition`]: `Transition`, the wrapper navigation drives
//! - [`registry`]: in-flight transitions grouped by transition id
//! - [`config`]: TOML config and the runtime `Config` provider
//! - [`nav`]: `NavHost`, which runs push/pop/set-root requests
//! - [`set_root`]: the `NavSetRoot` trigger
//! - [`overlay`]: present/dismiss for popovers, modals and action sheets

pub mod animation;
pub mod config;
pub mod ids;
pub mod nav;
pub mod overlay;
pub mod registry;
pub mod set_root;
pub mod stack;
pub mod transition;
pub mod view;
pub mod zindex;

// Re-export commonly used types for convenience
pub use ids::{NavId, TransitionId, ViewId};
pub use nav::{NavError, NavEvent, NavHost, NavOptions, NavResult};
pub use view::{ComponentRef, FrameworkDelegate, NavParams, ViewElement};
