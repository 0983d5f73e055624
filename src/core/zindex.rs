//! # Z-Index Coordination
//!
//! Decides the stacking order of an entering view relative to the view it
//! replaces:
//!
//! ```text
//! forward / switch   entering = leaving + 1   (slides over)
//! back               entering = leaving - 1   (revealed underneath)
//! first view         entering = 100 + nav.z_index_offset
//! ```
//!
//! Nested and portal navigators get an offset band so they never collide
//! with their ancestors. The model value and the element's style are always
//! written together.

use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ids::ViewId;
use crate::core::nav::Navigator;
use crate::core::view::{ViewController, ViewMap};

pub const INIT_ZINDEX: i32 = 100;
pub const PORTAL_Z_INDEX_OFFSET: i32 = 0;

/// Which way a navigation moves through the stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Back,
    Switch,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Back => "back",
            Direction::Switch => "switch",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies the stacking rules above to `entering`.
///
/// Without an explicit `leaving` view the view right before `entering` in
/// the navigator's stack is used.
pub fn set_z_index(
    nav: &Navigator,
    views: &mut ViewMap,
    entering: Option<ViewId>,
    leaving: Option<ViewId>,
    direction: Direction,
) {
    let Some(entering) = entering else {
        return;
    };

    let leaving = leaving.or_else(|| nav.stack.get_previous(Some(entering)));
    let leaving_z = leaving
        .and_then(|id| views.get(&id))
        .and_then(ViewController::z_index);

    let new_z_index = match leaving_z {
        Some(z) if direction == Direction::Back => z - 1,
        Some(z) => z + 1,
        None => INIT_ZINDEX + nav.z_index_offset,
    };

    if let Some(view) = views.get_mut(&entering) {
        update_z_index(view, new_z_index);
    }
}

/// Writes `new_z_index` to the view and its element when it changed.
///
/// Returns whether anything was written.
pub fn update_z_index(view: &mut ViewController, new_z_index: i32) -> bool {
    if view.z_index() == Some(new_z_index) {
        return false;
    }
    trace!("{} z-index {:?} -> {}", view.id, view.z_index(), new_z_index);
    view.set_z_index_value(new_z_index);
    if let Some(element) = view.element() {
        element.set_z_index(new_z_index);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::NavId;
    use crate::core::view::{ComponentRef, NavParams, ViewElement};
    use crate::test_support::TestElement;
    use std::sync::Arc;

    struct Fixture {
        nav: Navigator,
        views: ViewMap,
        elements: Vec<Arc<TestElement>>,
    }

    impl Fixture {
        fn new(offset: i32) -> Self {
            let mut nav = Navigator::new(NavId(1000), None);
            nav.z_index_offset = offset;
            Self {
                nav,
                views: ViewMap::new(),
                elements: Vec::new(),
            }
        }

        fn add_view(&mut self, id: u32, z_index: Option<i32>, on_stack: bool) -> ViewId {
            let id = ViewId(id);
            let mut vc = ViewController::new(id, ComponentRef::named("page"), NavParams::new());
            let element = TestElement::ready();
            let dyn_element: Arc<dyn ViewElement> = element.clone();
            vc.init(&dyn_element);
            if let Some(z) = z_index {
                update_z_index(&mut vc, z);
            }
            self.elements.push(element);
            self.views.insert(id, vc);
            if on_stack {
                self.nav.stack.push(id);
            }
            id
        }

        fn z(&self, id: ViewId) -> Option<i32> {
            self.views[&id].z_index()
        }
    }

    #[test]
    fn test_no_entering_view_is_noop() {
        let mut fx = Fixture::new(0);
        let leaving = fx.add_view(2000, Some(100), true);
        set_z_index(&fx.nav, &mut fx.views, None, Some(leaving), Direction::Forward);
        assert_eq!(fx.z(leaving), Some(100));
    }

    #[test]
    fn test_forward_and_switch_go_above_leaving() {
        for direction in [Direction::Forward, Direction::Switch] {
            let mut fx = Fixture::new(0);
            let leaving = fx.add_view(2000, Some(140), true);
            let entering = fx.add_view(2001, None, false);
            set_z_index(&fx.nav, &mut fx.views, Some(entering), Some(leaving), direction);
            assert_eq!(fx.z(entering), Some(141));
        }
    }

    #[test]
    fn test_back_goes_below_leaving() {
        let mut fx = Fixture::new(0);
        let entering = fx.add_view(2000, None, true);
        let leaving = fx.add_view(2001, Some(101), true);
        set_z_index(&fx.nav, &mut fx.views, Some(entering), Some(leaving), Direction::Back);
        assert_eq!(fx.z(entering), Some(100));
    }

    #[test]
    fn test_leaving_resolved_from_stack() {
        let mut fx = Fixture::new(0);
        fx.add_view(2000, Some(120), true);
        let entering = fx.add_view(2001, None, true);
        set_z_index(&fx.nav, &mut fx.views, Some(entering), None, Direction::Forward);
        assert_eq!(fx.z(entering), Some(121));
    }

    #[test]
    fn test_first_view_uses_base_plus_offset() {
        let mut fx = Fixture::new(50);
        let entering = fx.add_view(2000, None, true);
        set_z_index(&fx.nav, &mut fx.views, Some(entering), None, Direction::Forward);
        assert_eq!(fx.z(entering), Some(INIT_ZINDEX + 50));
    }

    #[test]
    fn test_leaving_without_z_index_uses_base() {
        let mut fx = Fixture::new(0);
        let leaving = fx.add_view(2000, None, true);
        let entering = fx.add_view(2001, None, false);
        set_z_index(&fx.nav, &mut fx.views, Some(entering), Some(leaving), Direction::Back);
        assert_eq!(fx.z(entering), Some(INIT_ZINDEX));
    }

    #[test]
    fn test_update_z_index_writes_style_once() {
        let mut fx = Fixture::new(0);
        let id = fx.add_view(2000, None, true);
        let element = fx.elements[0].clone();
        let view = fx.views.get_mut(&id).unwrap();

        assert!(update_z_index(view, 105));
        assert!(!update_z_index(view, 105));
        assert_eq!(element.z_index_writes(), 1);
        assert_eq!(element.z_index(), Some(105));
        assert_eq!(view.z_index(), Some(105));
    }
}
