//! # View Stack
//!
//! The ordered list of views a navigator shows. Insertion order is
//! navigation order and the last element is the active (topmost) view.
//!
//! The stack only stores [`ViewId`]s; the controllers themselves live in the
//! host's view arena. Every query signals absence with `None` and never
//! panics on an empty stack.
//!
//! Mutations are applied by the navigator after a transition completes, so
//! observers never see a half-finished navigation.

use crate::core::ids::ViewId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStack {
    views: Vec<ViewId>,
}

impl ViewStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_active(&self) -> Option<ViewId> {
        self.views.last().copied()
    }

    /// The view right before `view`, or before the active view when `view`
    /// is `None`.
    pub fn get_previous(&self, view: Option<ViewId>) -> Option<ViewId> {
        let reference = match view {
            Some(view) => view,
            None => self.get_active()?,
        };
        let index = self.index_of(reference)?;
        index.checked_sub(1).map(|i| self.views[i])
    }

    pub fn get_first(&self) -> Option<ViewId> {
        self.views.first().copied()
    }

    pub fn get_last(&self) -> Option<ViewId> {
        self.views.last().copied()
    }

    pub fn get_by_index(&self, index: usize) -> Option<ViewId> {
        self.views.get(index).copied()
    }

    pub fn index_of(&self, view: ViewId) -> Option<usize> {
        self.views.iter().position(|v| *v == view)
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains(&view)
    }

    pub fn can_go_back(&self, view: Option<ViewId>) -> bool {
        self.get_previous(view).is_some()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.views.iter().copied()
    }

    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    // ── Mutations ──────────────────────────────────────────────────────────

    pub fn push(&mut self, view: ViewId) {
        self.views.push(view);
    }

    /// Inserts at `index`, or appends when `index` is past the end.
    pub fn insert(&mut self, index: usize, view: ViewId) {
        let index = index.min(self.views.len());
        self.views.insert(index, view);
    }

    pub fn pop(&mut self) -> Option<ViewId> {
        self.views.pop()
    }

    /// Removes `view`, returning whether it was present.
    pub fn remove(&mut self, view: ViewId) -> bool {
        match self.index_of(view) {
            Some(index) => {
                self.views.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops everything after the first `len` views and returns what was dropped.
    pub fn truncate(&mut self, len: usize) -> Vec<ViewId> {
        if len >= self.views.len() {
            return Vec::new();
        }
        self.views.split_off(len)
    }

    pub fn clear(&mut self) -> Vec<ViewId> {
        std::mem::take(&mut self.views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(ids: &[u32]) -> ViewStack {
        let mut stack = ViewStack::new();
        for id in ids {
            stack.push(ViewId(*id));
        }
        stack
    }

    #[test]
    fn test_empty_stack_queries_return_none() {
        let stack = ViewStack::new();
        assert_eq!(stack.get_active(), None);
        assert_eq!(stack.get_previous(None), None);
        assert_eq!(stack.get_previous(Some(ViewId(2000))), None);
        assert_eq!(stack.get_first(), None);
        assert_eq!(stack.get_last(), None);
        assert!(!stack.can_go_back(None));
    }

    #[test]
    fn test_active_is_last_pushed_not_popped() {
        let mut stack = stack_of(&[2000, 2001, 2002]);
        assert_eq!(stack.get_active(), Some(ViewId(2002)));

        assert_eq!(stack.pop(), Some(ViewId(2002)));
        assert_eq!(stack.get_active(), Some(ViewId(2001)));

        stack.push(ViewId(2003));
        assert_eq!(stack.get_active(), Some(ViewId(2003)));
    }

    #[test]
    fn test_previous_of_first_or_unknown_is_none() {
        let stack = stack_of(&[2000, 2001, 2002]);
        assert_eq!(stack.get_previous(Some(ViewId(2000))), None);
        assert_eq!(stack.get_previous(Some(ViewId(9999))), None);
        assert_eq!(stack.get_previous(Some(ViewId(2002))), Some(ViewId(2001)));
        assert_eq!(stack.get_previous(None), Some(ViewId(2001)));
    }

    #[test]
    fn test_can_go_back() {
        assert!(stack_of(&[2000, 2001]).can_go_back(None));
        assert!(!stack_of(&[2000]).can_go_back(None));
        assert!(!stack_of(&[2000, 2001]).can_go_back(Some(ViewId(2000))));
    }

    #[test]
    fn test_insert_clamps_and_preserves_order() {
        let mut stack = stack_of(&[2000, 2002]);
        stack.insert(1, ViewId(2001));
        stack.insert(99, ViewId(2003));
        assert_eq!(
            stack.views(),
            &[ViewId(2000), ViewId(2001), ViewId(2002), ViewId(2003)]
        );
    }

    #[test]
    fn test_remove_and_truncate() {
        let mut stack = stack_of(&[2000, 2001, 2002, 2003]);
        assert!(stack.remove(ViewId(2001)));
        assert!(!stack.remove(ViewId(2001)));

        let dropped = stack.truncate(1);
        assert_eq!(dropped, vec![ViewId(2002), ViewId(2003)]);
        assert_eq!(stack.views(), &[ViewId(2000)]);
        assert!(stack.truncate(5).is_empty());

        assert_eq!(stack.clear(), vec![ViewId(2000)]);
        assert!(stack.is_empty());
    }
}
