//! # Terminal Elements
//!
//! The TUI's implementation of the core's rendering collaborators. A
//! [`TermElement`] is a plain record of the style values the core wrote; the
//! draw pass reads them back to lay out the stack.
//!
//! [`TermDelegate`] owns every element it attached until the core asks for it
//! to be removed, which is what keeps the core's weak handles alive.

use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::view::{ComponentRef, FrameworkDelegate, NavParams, RenderError, ViewElement};

pub struct TermElement {
    pub id: u64,
    pub label: String,
    pub classes: Vec<String>,
    z_index: Mutex<Option<i32>>,
    hidden: AtomicBool,
}

impl TermElement {
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            classes: Vec::new(),
            z_index: Mutex::new(None),
            hidden: AtomicBool::new(false),
        }
    }

    pub fn z_index(&self) -> Option<i32> {
        *self.z_index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ViewElement for TermElement {
    /// The first paint happens on the next tick of the event loop.
    async fn component_on_ready(&self) -> Result<(), RenderError> {
        tokio::task::yield_now().await;
        Ok(())
    }

    fn set_z_index(&self, z_index: i32) {
        *self.z_index.lock().unwrap_or_else(PoisonError::into_inner) = Some(z_index);
    }

    fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::Relaxed);
    }
}

#[derive(Default)]
pub struct TermDelegate {
    elements: Mutex<Vec<Arc<TermElement>>>,
    next_id: AtomicU64,
}

impl TermDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The terminal element behind a core handle, if it is still attached.
    pub fn find(&self, element: &Arc<dyn ViewElement>) -> Option<Arc<TermElement>> {
        let target = Arc::as_ptr(element) as *const ();
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| Arc::as_ptr(*e) as *const () == target)
            .cloned()
    }

    pub fn attached(&self) -> usize {
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl FrameworkDelegate for TermDelegate {
    async fn attach_view(
        &self,
        component: &ComponentRef,
        params: &NavParams,
        css_classes: &[String],
    ) -> Result<Arc<dyn ViewElement>, RenderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut element = TermElement::new(id, component.label());
        element.classes = css_classes.to_vec();
        debug!(
            "Attached {} as element {} ({} params)",
            component,
            id,
            params.len()
        );

        let element = Arc::new(element);
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(element.clone());
        Ok(element)
    }

    async fn remove_view(&self, element: Arc<dyn ViewElement>) -> Result<(), RenderError> {
        let target = Arc::as_ptr(&element) as *const ();
        let mut elements = self.elements.lock().unwrap_or_else(PoisonError::into_inner);
        let before = elements.len();
        elements.retain(|e| Arc::as_ptr(e) as *const () != target);
        if elements.len() == before {
            return Err(RenderError::Detach("element is not attached".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delegate_keeps_elements_until_removed() {
        let delegate = TermDelegate::new();
        let element = delegate
            .attach_view(
                &ComponentRef::named("page-1"),
                &NavParams::new(),
                &["nav-page".to_string()],
            )
            .await
            .unwrap();

        let weak = Arc::downgrade(&element);
        let found = delegate.find(&element).unwrap();
        assert_eq!(found.label, "page-1");
        assert_eq!(found.classes, vec!["nav-page".to_string()]);
        drop(found);

        tokio_test::assert_ok!(delegate.remove_view(element).await);
        assert_eq!(delegate.attached(), 0);
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_removing_unknown_element_fails() {
        let delegate = TermDelegate::new();
        let stranger: Arc<dyn ViewElement> = Arc::new(TermElement::new(99, "stranger"));
        tokio_test::assert_err!(delegate.remove_view(stranger).await);
    }

    #[test]
    fn test_element_records_style_writes() {
        let element = TermElement::new(0, "page");
        element.set_z_index(101);
        element.set_hidden(true);
        assert_eq!(element.z_index(), Some(101));
        assert!(element.is_hidden());
    }
}
