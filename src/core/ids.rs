//! # Identifier Allocation
//!
//! Navigators, views and transitions are addressed by small integer handles.
//! Each kind has its own counter with a fixed base so ids are easy to tell
//! apart in logs:
//!
//! ```text
//! navigators   1000, 1001, 1002, ...
//! views        2000, 2001, 2002, ...
//! transitions     0,    1,    2, ...
//! ```
//!
//! Counters only ever move forward. An id is never handed out twice, even
//! after the thing it named has been destroyed.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const NAV_ID_START: u32 = 1000;
pub const VIEW_ID_START: u32 = 2000;
pub const TRANSITION_ID_START: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NavId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u32);

/// Groups one or more nested transitions that are driven together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(pub u32);

impl fmt::Display for NavId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nav#{}", self.0)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trns#{}", self.0)
    }
}

/// Monotonic id source owned by a [`NavHost`](crate::core::nav::NavHost).
#[derive(Debug)]
pub struct IdAllocator {
    next_nav: u32,
    next_view: u32,
    next_transition: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_nav: NAV_ID_START,
            next_view: VIEW_ID_START,
            next_transition: TRANSITION_ID_START,
        }
    }

    pub fn next_navigator_id(&mut self) -> NavId {
        let id = NavId(self.next_nav);
        self.next_nav += 1;
        id
    }

    pub fn next_view_id(&mut self) -> ViewId {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        id
    }

    pub fn next_transition_id(&mut self) -> TransitionId {
        let id = TransitionId(self.next_transition);
        self.next_transition += 1;
        id
    }
}
