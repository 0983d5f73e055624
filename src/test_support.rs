//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::core::config::{Config, ResolvedConfig};
use crate::core::nav::NavHost;
use crate::core::view::{ComponentRef, FrameworkDelegate, NavParams, RenderError, ViewElement};

/// Opens a readiness gate created by [`TestElement::gated`] or [`TestDelegate::gate`].
pub struct Gate(watch::Sender<bool>);

impl Gate {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self(tx), rx)
    }

    pub fn open(&self) {
        let _ = self.0.send(true);
    }
}

/// An element that records the style writes it receives.
#[derive(Default)]
pub struct TestElement {
    label: String,
    z_index: Mutex<Option<i32>>,
    z_index_writes: AtomicUsize,
    hidden: AtomicBool,
    gate: Option<watch::Receiver<bool>>,
    failure: Option<String>,
}

impl TestElement {
    pub fn ready() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An element whose readiness waits for the returned gate.
    pub fn gated() -> (Arc<Self>, Gate) {
        let (gate, rx) = Gate::new();
        let element = Self {
            gate: Some(rx),
            ..Default::default()
        };
        (Arc::new(element), gate)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn z_index(&self) -> Option<i32> {
        *self.z_index.lock().unwrap()
    }

    pub fn z_index_writes(&self) -> usize {
        self.z_index_writes.load(Ordering::SeqCst)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ViewElement for TestElement {
    async fn component_on_ready(&self) -> Result<(), RenderError> {
        if let Some(reason) = &self.failure {
            return Err(RenderError::Hydration(reason.clone()));
        }
        if let Some(gate) = &self.gate {
            let mut gate = gate.clone();
            gate.wait_for(|open| *open)
                .await
                .map_err(|_| RenderError::Hydration("gate dropped".to_string()))?;
        }
        Ok(())
    }

    fn set_z_index(&self, z_index: i32) {
        *self.z_index.lock().unwrap() = Some(z_index);
        self.z_index_writes.fetch_add(1, Ordering::SeqCst);
    }

    fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }
}

/// A delegate that keeps every element it creates alive in attach order.
#[derive(Default)]
pub struct TestDelegate {
    elements: Mutex<Vec<Arc<TestElement>>>,
    removed: AtomicUsize,
    gates: Mutex<HashMap<String, watch::Receiver<bool>>>,
    failing_attach: Mutex<HashSet<String>>,
    failing_ready: Mutex<HashSet<String>>,
}

impl TestDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Elements created for `component` wait for the returned gate.
    pub fn gate(&self, component: &str) -> Gate {
        let (gate, rx) = Gate::new();
        self.gates.lock().unwrap().insert(component.to_string(), rx);
        gate
    }

    pub fn fail_attach(&self, component: &str) {
        self.failing_attach.lock().unwrap().insert(component.to_string());
    }

    pub fn fail_ready(&self, component: &str) {
        self.failing_ready.lock().unwrap().insert(component.to_string());
    }

    /// The `index`-th element ever attached.
    pub fn element(&self, index: usize) -> Arc<TestElement> {
        self.elements.lock().unwrap()[index].clone()
    }

    pub fn attached(&self) -> usize {
        self.elements.lock().unwrap().len()
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameworkDelegate for TestDelegate {
    async fn attach_view(
        &self,
        component: &ComponentRef,
        _params: &NavParams,
        _css_classes: &[String],
    ) -> Result<Arc<dyn ViewElement>, RenderError> {
        let label = component.label();
        if self.failing_attach.lock().unwrap().contains(&label) {
            return Err(RenderError::Attach(label));
        }
        let failure = self
            .failing_ready
            .lock()
            .unwrap()
            .contains(&label)
            .then(|| format!("{label} failed to render"));
        let element = Arc::new(TestElement {
            gate: self.gates.lock().unwrap().get(&label).cloned(),
            failure,
            label,
            ..Default::default()
        });
        self.elements.lock().unwrap().push(element.clone());
        Ok(element)
    }

    async fn remove_view(&self, _element: Arc<dyn ViewElement>) -> Result<(), RenderError> {
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Creates a host with animations disabled and a recording delegate.
pub fn test_host() -> (NavHost, Arc<TestDelegate>) {
    let delegate = TestDelegate::new();
    let config = Config::from_resolved(ResolvedConfig {
        animated: false,
        ..Default::default()
    });
    (NavHost::new(delegate.clone(), Arc::new(config)), delegate)
}
