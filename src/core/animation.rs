//! # Animations
//!
//! The core never tweens anything itself. It talks to the animation engine
//! through the [`Animation`] trait: start playing, get told when playback is
//! over, tear down.
//!
//! This module also ships the stock animations the host falls back to when
//! the config does not override a transition:
//!
//! | name            | mode | duration | effect            |
//! |-----------------|------|----------|-------------------|
//! | `slide` / `ios` | ios  | 500ms    | horizontal slide  |
//! | `fade` / `md`   | md   | 280ms    | fade in, rise up  |
//! | `none`          | any  | 0ms      | cut               |
//!
//! [`KeyframeAnimation`] only keeps time (via `tokio::time::sleep`); the
//! rendering layer is free to interpolate styles against its schedule.

use futures::future::BoxFuture;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

use crate::Mode;
use crate::core::transition::{Transition, TransitionBuilder, TransitionError};
use crate::core::view::ViewController;
use crate::core::zindex::Direction;

pub const IOS_TRANSITION_DURATION: Duration = Duration::from_millis(500);
pub const MD_TRANSITION_DURATION: Duration = Duration::from_millis(280);
pub const IOS_EASING: &str = "cubic-bezier(0.36,0.66,0.04,1)";
pub const MD_EASING: &str = "cubic-bezier(0.4,0.0,0.2,1)";

/// Options a transition builder receives.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationOptions {
    pub animate: bool,
    pub direction: Direction,
    /// Overrides the builder's default duration.
    pub duration: Option<Duration>,
    pub easing: Option<String>,
    pub mode: Mode,
    pub is_rtl: bool,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            animate: true,
            direction: Direction::Forward,
            duration: None,
            easing: None,
            mode: Mode::default(),
            is_rtl: false,
        }
    }
}

impl AnimationOptions {
    /// Resolves the duration to play for a builder default.
    pub fn duration_or(&self, default: Duration) -> Duration {
        if !self.animate {
            return Duration::ZERO;
        }
        self.duration.unwrap_or(default)
    }
}

/// A playable animation supplied by the animation engine.
pub trait Animation: Send {
    fn name(&self) -> &str;

    fn duration(&self) -> Duration;

    fn set_duration(&mut self, duration: Duration);

    /// Begins playback. The returned future resolves when playback is over.
    fn play(&mut self) -> BoxFuture<'static, Result<(), TransitionError>>;

    /// Releases engine resources. Calling it more than once is allowed.
    fn destroy(&mut self);

    fn is_destroyed(&self) -> bool;
}

// ============================================================================
// Built-in Animations
// ============================================================================

/// Plays nothing and finishes immediately.
#[derive(Debug, Default)]
pub struct NoopAnimation {
    destroyed: bool,
}

impl Animation for NoopAnimation {
    fn name(&self) -> &str {
        "none"
    }

    fn duration(&self) -> Duration {
        Duration::ZERO
    }

    fn set_duration(&mut self, _duration: Duration) {}

    fn play(&mut self) -> BoxFuture<'static, Result<(), TransitionError>> {
        let destroyed = self.destroyed;
        Box::pin(async move {
            if destroyed {
                return Err(TransitionError::Animation("played after destroy".to_string()));
            }
            Ok(())
        })
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

/// A timed animation described by a name, a duration and an easing curve.
#[derive(Debug, Clone)]
pub struct KeyframeAnimation {
    name: String,
    duration: Duration,
    easing: String,
    direction: Direction,
    destroyed: bool,
}

impl KeyframeAnimation {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
            easing: "linear".to_string(),
            direction: Direction::Forward,
            destroyed: false,
        }
    }

    pub fn easing(mut self, easing: impl Into<String>) -> Self {
        self.easing = easing.into();
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn easing_curve(&self) -> &str {
        &self.easing
    }
}

impl Animation for KeyframeAnimation {
    fn name(&self) -> &str {
        &self.name
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    fn play(&mut self) -> BoxFuture<'static, Result<(), TransitionError>> {
        let duration = self.duration;
        let destroyed = self.destroyed;
        let name = self.name.clone();
        debug!(
            "Playing {} ({}, {:?}, {})",
            name, self.direction, duration, self.easing
        );
        Box::pin(async move {
            if destroyed {
                return Err(TransitionError::Animation(format!("{name} played after destroy")));
            }
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
            Ok(())
        })
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

// ============================================================================
// Built-in Builders
// ============================================================================

fn keyframes(
    empty: Transition,
    name: &str,
    default_duration: Duration,
    default_easing: &str,
    opts: &AnimationOptions,
) -> Transition {
    let easing = opts.easing.clone().unwrap_or_else(|| default_easing.to_string());
    let animation = KeyframeAnimation::new(name, opts.duration_or(default_duration))
        .easing(easing)
        .direction(opts.direction);
    empty.with_animation(Box::new(animation))
}

/// iOS style: the entering page slides in over the leaving one.
pub fn ios_transition(
    empty: Transition,
    _entering: Option<&ViewController>,
    _leaving: Option<&ViewController>,
    opts: &AnimationOptions,
) -> Result<Transition, TransitionError> {
    Ok(keyframes(empty, "ios-slide", IOS_TRANSITION_DURATION, IOS_EASING, opts))
}

/// Material style: the entering page fades in while rising.
pub fn md_transition(
    empty: Transition,
    _entering: Option<&ViewController>,
    _leaving: Option<&ViewController>,
    opts: &AnimationOptions,
) -> Result<Transition, TransitionError> {
    Ok(keyframes(empty, "md-fade", MD_TRANSITION_DURATION, MD_EASING, opts))
}

/// Swaps pages without animating.
pub fn no_transition(
    empty: Transition,
    _entering: Option<&ViewController>,
    _leaving: Option<&ViewController>,
    _opts: &AnimationOptions,
) -> Result<Transition, TransitionError> {
    Ok(empty.with_animation(Box::new(NoopAnimation::default())))
}

/// Looks up a stock builder by the name used in config overrides.
pub fn builtin_builder(name: &str) -> Option<Arc<dyn TransitionBuilder>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "slide" | "ios" => Some(Arc::new(ios_transition)),
        "fade" | "md" => Some(Arc::new(md_transition)),
        "none" => Some(Arc::new(no_transition)),
        _ => None,
    }
}

/// The builder used when nothing overrides a transition.
pub fn default_builder(mode: Mode) -> Arc<dyn TransitionBuilder> {
    match mode {
        Mode::Ios => Arc::new(ios_transition),
        Mode::Md => Arc::new(md_transition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transition::transition_factory;

    fn empty() -> Transition {
        transition_factory(Box::new(NoopAnimation::default()))
    }

    #[test]
    fn test_duration_or_respects_animate_flag() {
        let opts = AnimationOptions {
            animate: false,
            duration: Some(Duration::from_millis(900)),
            ..Default::default()
        };
        assert_eq!(opts.duration_or(IOS_TRANSITION_DURATION), Duration::ZERO);

        let opts = AnimationOptions::default();
        assert_eq!(opts.duration_or(MD_TRANSITION_DURATION), MD_TRANSITION_DURATION);
    }

    #[test]
    fn test_builtin_builder_names() {
        for name in ["slide", "ios", "fade", "md", "none", " Fade "] {
            assert!(builtin_builder(name).is_some(), "{name} should resolve");
        }
        assert!(builtin_builder("spin").is_none());
    }

    #[test]
    fn test_ios_builder_uses_mode_defaults() {
        let built = ios_transition(empty(), None, None, &AnimationOptions::default()).unwrap();
        assert_eq!(built.animation_name(), Some("ios-slide"));
        assert_eq!(built.duration(), Some(IOS_TRANSITION_DURATION));
    }

    #[tokio::test]
    async fn test_zero_duration_keyframes_finish_immediately() {
        let mut animation = KeyframeAnimation::new("cut", Duration::ZERO);
        tokio_test::assert_ok!(animation.play().await);
    }

    #[tokio::test]
    async fn test_destroyed_animation_refuses_to_play() {
        let mut animation = KeyframeAnimation::new("late", Duration::ZERO);
        animation.destroy();
        animation.destroy();
        assert!(animation.is_destroyed());
        tokio_test::assert_err!(animation.play().await);
    }
}
