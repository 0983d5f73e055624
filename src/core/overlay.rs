//! # Overlays
//!
//! Present/dismiss controller shared by popovers, modals and action sheets.
//!
//! ```text
//! present()   WillPresent → z-index 10000+id → attach component → enter animation → DidPresent
//! dismiss()   destroy running animation → WillDismiss → leave animation → DidDismiss → remove component
//! ```
//!
//! Presenting twice or dismissing something that is not presented is a
//! caller bug and is rejected with an [`OverlayError`].

use log::{debug, info, warn};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::animation::{NoopAnimation, default_builder};
use crate::core::config::Config;
use crate::core::transition::{Transition, TransitionBuilder, TransitionError, transition_factory};
use crate::core::view::{ComponentRef, FrameworkDelegate, NavParams, RenderError, ViewElement};
use crate::core::zindex::Direction;

pub const OVERLAY_Z_INDEX_BASE: i32 = 10000;

/// Dismiss role used when the backdrop was tapped.
pub const BACKDROP: &str = "backdrop";

/// Key under which the overlay id is added to the component's data.
pub const OVERLAY_ID_PARAM: &str = "overlay_id";

/// Stacking slot of overlay `id`, clamped at the top of the range.
pub fn overlay_z_index(id: u32) -> i32 {
    i32::try_from(id)
        .map_or(i32::MAX, |id| OVERLAY_Z_INDEX_BASE.saturating_add(id))
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayError {
    AlreadyPresented(u32),
    NotPresented(u32),
    Render(RenderError),
    Animation(TransitionError),
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayError::AlreadyPresented(id) => write!(f, "overlay {id} already presented"),
            OverlayError::NotPresented(id) => write!(f, "overlay {id} is not presented"),
            OverlayError::Render(e) => write!(f, "{e}"),
            OverlayError::Animation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for OverlayError {}

impl From<RenderError> for OverlayError {
    fn from(e: RenderError) -> Self {
        OverlayError::Render(e)
    }
}

impl From<TransitionError> for OverlayError {
    fn from(e: TransitionError) -> Self {
        OverlayError::Animation(e)
    }
}

// ============================================================================
// Kinds, Options, Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Popover,
    Modal,
    ActionSheet,
}

impl OverlayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayKind::Popover => "popover",
            OverlayKind::Modal => "modal",
            OverlayKind::ActionSheet => "actionSheet",
        }
    }

    /// Config key of the enter animation override.
    pub fn enter_key(&self) -> &'static str {
        match self {
            OverlayKind::Popover => "popoverEnter",
            OverlayKind::Modal => "modalEnter",
            OverlayKind::ActionSheet => "actionSheetEnter",
        }
    }

    /// Config key of the leave animation override.
    pub fn leave_key(&self) -> &'static str {
        match self {
            OverlayKind::Popover => "popoverLeave",
            OverlayKind::Modal => "modalLeave",
            OverlayKind::ActionSheet => "actionSheetLeave",
        }
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct OverlayOptions {
    pub component: ComponentRef,
    pub data: NavParams,
    pub css_class: Option<String>,
    pub show_backdrop: bool,
    pub enable_backdrop_dismiss: bool,
    pub translucent: bool,
    pub will_animate: bool,
    pub enter_animation: Option<Arc<dyn TransitionBuilder>>,
    pub leave_animation: Option<Arc<dyn TransitionBuilder>>,
}

impl fmt::Debug for OverlayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayOptions")
            .field("component", &self.component)
            .field("data", &self.data)
            .field("css_class", &self.css_class)
            .field("show_backdrop", &self.show_backdrop)
            .field("enable_backdrop_dismiss", &self.enable_backdrop_dismiss)
            .field("translucent", &self.translucent)
            .field("will_animate", &self.will_animate)
            .finish_non_exhaustive()
    }
}

impl OverlayOptions {
    pub fn new(component: ComponentRef) -> Self {
        Self {
            component,
            data: NavParams::new(),
            css_class: None,
            show_backdrop: true,
            enable_backdrop_dismiss: true,
            translucent: false,
            will_animate: true,
            enter_animation: None,
            leave_animation: None,
        }
    }

    pub fn data(mut self, data: NavParams) -> Self {
        self.data = data;
        self
    }

    pub fn css_class(mut self, class: impl Into<String>) -> Self {
        self.css_class = Some(class.into());
        self
    }

    pub fn backdrop_dismiss(mut self, enabled: bool) -> Self {
        self.enable_backdrop_dismiss = enabled;
        self
    }

    pub fn will_animate(mut self, animate: bool) -> Self {
        self.will_animate = animate;
        self
    }

    pub fn enter_animation(mut self, builder: Arc<dyn TransitionBuilder>) -> Self {
        self.enter_animation = Some(builder);
        self
    }

    pub fn leave_animation(mut self, builder: Arc<dyn TransitionBuilder>) -> Self {
        self.leave_animation = Some(builder);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DismissDetail {
    pub data: Option<Value>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    WillPresent,
    DidPresent,
    WillDismiss(DismissDetail),
    DidDismiss(DismissDetail),
}

// ============================================================================
// Overlay
// ============================================================================

pub struct Overlay {
    id: u32,
    kind: OverlayKind,
    host: Arc<dyn ViewElement>,
    options: OverlayOptions,
    delegate: Arc<dyn FrameworkDelegate>,
    config: Arc<Config>,
    presented: bool,
    animation: Option<Transition>,
    user_element: Option<Arc<dyn ViewElement>>,
    listeners: Vec<mpsc::UnboundedSender<OverlayEvent>>,
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("presented", &self.presented)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Overlay {
    /// `host` is the overlay's own element; the user component is attached
    /// inside it on present.
    pub fn new(
        id: u32,
        kind: OverlayKind,
        host: Arc<dyn ViewElement>,
        options: OverlayOptions,
        delegate: Arc<dyn FrameworkDelegate>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            id,
            kind,
            host,
            options,
            delegate,
            config,
            presented: false,
            animation: None,
            user_element: None,
            listeners: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    pub fn is_presented(&self) -> bool {
        self.presented
    }

    pub fn user_element(&self) -> Option<&Arc<dyn ViewElement>> {
        self.user_element.as_ref()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<OverlayEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    fn emit(&mut self, event: OverlayEvent) {
        debug!("{} {}: {:?}", self.kind, self.id, event);
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub async fn present(&mut self) -> Result<(), OverlayError> {
        if self.presented {
            return Err(OverlayError::AlreadyPresented(self.id));
        }
        self.presented = true;
        self.emit(OverlayEvent::WillPresent);
        self.host.set_z_index(overlay_z_index(self.id));

        let builder = self.builder(self.options.enter_animation.clone(), self.kind.enter_key());
        let css_classes: Vec<String> = self
            .options
            .css_class
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect();
        self.options.data.insert(OVERLAY_ID_PARAM, self.id);

        let attached = self
            .delegate
            .attach_view(&self.options.component, &self.options.data, &css_classes)
            .await;
        match attached {
            Ok(element) => self.user_element = Some(element),
            Err(e) => {
                self.presented = false;
                return Err(e.into());
            }
        }

        if let Err(e) = self.play_animation(builder, Direction::Forward).await {
            warn!("Enter animation of {} {} failed: {}", self.kind, self.id, e);
            self.presented = false;
            if let Err(removal) = self.remove_user_element().await {
                warn!("Failed to remove {} {}: {}", self.kind, self.id, removal);
            }
            return Err(e);
        }
        self.emit(OverlayEvent::DidPresent);
        info!("Presented {} {}", self.kind, self.id);
        Ok(())
    }

    pub async fn dismiss(
        &mut self,
        data: Option<Value>,
        role: Option<&str>,
    ) -> Result<(), OverlayError> {
        if !self.presented {
            return Err(OverlayError::NotPresented(self.id));
        }
        self.presented = false;
        if let Some(mut running) = self.animation.take() {
            running.destroy();
        }

        let detail = DismissDetail {
            data,
            role: role.map(str::to_string),
        };
        self.emit(OverlayEvent::WillDismiss(detail.clone()));

        let builder = self.builder(self.options.leave_animation.clone(), self.kind.leave_key());
        // A failed leave animation still tears the overlay down
        let played = self.play_animation(builder, Direction::Back).await;
        if let Err(e) = &played {
            warn!("Leave animation of {} {} failed: {}", self.kind, self.id, e);
        }
        self.emit(OverlayEvent::DidDismiss(detail));

        let removed = self.remove_user_element().await;
        info!("Dismissed {} {}", self.kind, self.id);
        played.and(removed)
    }

    /// Dismisses with the backdrop role. Returns whether a dismiss happened.
    pub async fn on_backdrop_tap(&mut self) -> Result<bool, OverlayError> {
        if !self.options.enable_backdrop_dismiss {
            return Ok(false);
        }
        self.dismiss(None, Some(BACKDROP)).await.map(|_| true)
    }

    async fn remove_user_element(&mut self) -> Result<(), OverlayError> {
        if let Some(mut running) = self.animation.take() {
            running.destroy();
        }
        match self.user_element.take() {
            Some(element) => Ok(self.delegate.remove_view(element).await?),
            None => Ok(()),
        }
    }

    fn builder(
        &self,
        explicit: Option<Arc<dyn TransitionBuilder>>,
        key: &str,
    ) -> Arc<dyn TransitionBuilder> {
        explicit
            .or_else(|| self.config.get(key))
            .unwrap_or_else(|| default_builder(self.config.mode()))
    }

    async fn play_animation(
        &mut self,
        builder: Arc<dyn TransitionBuilder>,
        direction: Direction,
    ) -> Result<(), OverlayError> {
        let mut opts = self.config.animation_options(direction);
        opts.animate &= self.options.will_animate;

        let empty = transition_factory(Box::new(NoopAnimation::default()));
        let mut transition = builder.build(empty, None, None, &opts)?;
        let playback = transition.play();
        self.animation = Some(transition);
        playback.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::animation::AnimationOptions;
    use crate::core::config::ResolvedConfig;
    use crate::core::view::ViewController;
    use crate::test_support::{TestDelegate, TestElement};

    fn overlay(id: u32, options: OverlayOptions) -> (Overlay, Arc<TestElement>, Arc<TestDelegate>) {
        let host = TestElement::ready();
        let delegate = TestDelegate::new();
        let config = Config::from_resolved(ResolvedConfig {
            animated: false,
            ..Default::default()
        });
        let overlay = Overlay::new(
            id,
            OverlayKind::Popover,
            host.clone(),
            options,
            delegate.clone(),
            Arc::new(config),
        );
        (overlay, host, delegate)
    }

    fn popover() -> OverlayOptions {
        OverlayOptions::new(ComponentRef::named("popover-menu"))
    }

    #[tokio::test]
    async fn test_present_twice_is_rejected() {
        let (mut overlay, host, delegate) = overlay(3, popover());
        tokio_test::assert_ok!(overlay.present().await);
        assert!(overlay.is_presented());
        assert_eq!(host.z_index(), Some(10003));
        assert_eq!(delegate.attached(), 1);

        let again = overlay.present().await;
        assert_eq!(again, Err(OverlayError::AlreadyPresented(3)));
        assert_eq!(delegate.attached(), 1);
    }

    #[tokio::test]
    async fn test_dismiss_when_not_presented_is_rejected() {
        let (mut overlay, _, _) = overlay(1, popover());
        let result = overlay.dismiss(None, None).await;
        assert_eq!(result, Err(OverlayError::NotPresented(1)));
        assert_eq!(result.unwrap_err().to_string(), "overlay 1 is not presented");
    }

    #[tokio::test]
    async fn test_events_and_cleanup_order() {
        let (mut overlay, _, delegate) = overlay(0, popover());
        let mut events = overlay.subscribe();

        overlay.present().await.unwrap();
        overlay
            .dismiss(Some(Value::from("picked")), Some("confirm"))
            .await
            .unwrap();

        let detail = DismissDetail {
            data: Some(Value::from("picked")),
            role: Some("confirm".to_string()),
        };
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                OverlayEvent::WillPresent,
                OverlayEvent::DidPresent,
                OverlayEvent::WillDismiss(detail.clone()),
                OverlayEvent::DidDismiss(detail),
            ]
        );
        assert_eq!(delegate.removed(), 1);
        assert!(overlay.user_element().is_none());
        // Can be presented again after a dismiss
        tokio_test::assert_ok!(overlay.present().await);
    }

    #[tokio::test]
    async fn test_component_receives_overlay_id() {
        let (mut overlay, _, _) = overlay(7, popover().data(NavParams::new().with("x", 1)));
        overlay.present().await.unwrap();
        let data = &overlay.options().data;
        assert_eq!(data.get(OVERLAY_ID_PARAM), Some(&Value::from(7)));
        assert_eq!(data.get("x"), Some(&Value::from(1)));
    }

    #[tokio::test]
    async fn test_backdrop_tap() {
        let (mut overlay, _, _) = overlay(2, popover());
        overlay.present().await.unwrap();
        assert_eq!(overlay.on_backdrop_tap().await, Ok(true));
        assert!(!overlay.is_presented());

        let (mut locked, _, _) = overlay_locked();
        locked.present().await.unwrap();
        assert_eq!(locked.on_backdrop_tap().await, Ok(false));
        assert!(locked.is_presented());
    }

    fn overlay_locked() -> (Overlay, Arc<TestElement>, Arc<TestDelegate>) {
        overlay(4, popover().backdrop_dismiss(false))
    }

    #[tokio::test]
    async fn test_failed_attach_allows_retry() {
        let (mut overlay, _, delegate) = overlay(5, popover());
        delegate.fail_attach("popover-menu");
        assert!(matches!(overlay.present().await, Err(OverlayError::Render(_))));
        assert!(!overlay.is_presented());
    }

    fn stalled_engine(
        _: Transition,
        _: Option<&ViewController>,
        _: Option<&ViewController>,
        _: &AnimationOptions,
    ) -> Result<Transition, TransitionError> {
        Err(TransitionError::Animation("engine offline".to_string()))
    }

    #[tokio::test]
    async fn test_failed_enter_animation_removes_component() {
        let options = popover().enter_animation(Arc::new(stalled_engine));
        let (mut overlay, _, delegate) = overlay(6, options);
        let mut events = overlay.subscribe();

        let result = overlay.present().await;
        assert!(matches!(result, Err(OverlayError::Animation(_))));
        assert!(!overlay.is_presented());
        assert!(overlay.user_element().is_none());
        assert_eq!(delegate.attached(), 1);
        assert_eq!(delegate.removed(), 1);
        assert_eq!(events.try_recv(), Ok(OverlayEvent::WillPresent));
        assert!(events.try_recv().is_err());

        // Dismissing the half-presented overlay is still a caller bug
        assert_eq!(
            overlay.dismiss(None, None).await,
            Err(OverlayError::NotPresented(6))
        );
    }

    #[tokio::test]
    async fn test_failed_leave_animation_still_dismisses() {
        let options = popover().leave_animation(Arc::new(stalled_engine));
        let (mut overlay, _, delegate) = overlay(8, options);
        overlay.present().await.unwrap();
        let mut events = overlay.subscribe();

        let result = overlay.dismiss(None, Some("cancel")).await;
        assert!(matches!(result, Err(OverlayError::Animation(_))));
        assert!(!overlay.is_presented());
        assert!(overlay.user_element().is_none());
        assert_eq!(delegate.removed(), 1);

        let detail = DismissDetail {
            data: None,
            role: Some("cancel".to_string()),
        };
        assert_eq!(events.try_recv(), Ok(OverlayEvent::WillDismiss(detail.clone())));
        assert_eq!(events.try_recv(), Ok(OverlayEvent::DidDismiss(detail)));

        // Presentable again once torn down
        tokio_test::assert_ok!(overlay.present().await);
        assert_eq!(delegate.attached(), 2);
    }

    #[test]
    fn test_overlay_z_index_clamps_large_ids() {
        assert_eq!(overlay_z_index(0), 10000);
        assert_eq!(overlay_z_index(42), 10042);
        assert_eq!(overlay_z_index(i32::MAX as u32), i32::MAX);
        assert_eq!(overlay_z_index(u32::MAX), i32::MAX);
    }
}
