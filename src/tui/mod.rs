//! # TUI Adapter
//!
//! A terminal host for the navigation core. It implements the rendering
//! collaborators ([`TermElement`], [`TermDelegate`]), drives a root
//! navigator plus one nested navigator and a popover from the keyboard, and
//! draws the stacks the way the core sees them.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Keys
//!
//! ```text
//! p / →        push on the root navigator      n   push on the nested navigator
//! b / ← / ⌫    pop the root navigator          m   pop the nested navigator
//! h / Home     pop to root                     x   push on both in one transition
//! r            set root (via a NavSetRoot)     o   present / dismiss the popover
//! Esc          tap the popover backdrop        q   quit
//! ```
//!
//! ## Threading
//!
//! Navigation requests run as tokio tasks so animations never block the
//! draw loop. Each task reports back over an `mpsc` channel that the loop
//! drains before every frame.
//!
//! ## Redraw Strategy
//!
//! - **Busy** (requests or popover in flight): redraws every ~50ms.
//! - **Idle**: sleeps up to 250ms and only redraws on events.

mod component;
mod components;
mod event;
mod host;
mod ui;

pub use host::{TermDelegate, TermElement};

use log::{info, warn};
use std::io::stdout;
use std::sync::{Arc, mpsc};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;

use crate::Mode;
use crate::core::config::{Config, ResolvedConfig};
use crate::core::ids::NavId;
use crate::core::nav::{NavError, NavHost, NavOptions, NavResult};
use crate::core::overlay::{Overlay, OverlayError, OverlayKind, OverlayOptions};
use crate::core::set_root::NavSetRoot;
use crate::core::view::{ComponentRef, NavParams};
use crate::core::zindex::PORTAL_Z_INDEX_OFFSET;
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

/// Stacking band of the nested navigator, above the root's pages.
const NESTED_Z_INDEX_OFFSET: i32 = PORTAL_Z_INDEX_OFFSET + 50;

const POPOVER_ID: u32 = 1;

/// A navigation request run in the background.
#[derive(Debug, Clone)]
enum NavRequest {
    Push(NavId, ComponentRef),
    Pop(NavId),
    PopToRoot(NavId),
    SetRoot(NavId, ComponentRef),
}

impl NavRequest {
    fn describe(&self) -> String {
        match self {
            NavRequest::Push(nav, page) => format!("push {page} on {nav}"),
            NavRequest::Pop(nav) => format!("pop {nav}"),
            NavRequest::PopToRoot(nav) => format!("pop {nav} to root"),
            NavRequest::SetRoot(nav, page) => format!("set root {page} on {nav}"),
        }
    }
}

/// Results reported back by background tasks.
enum HostAction {
    Navigated {
        request: NavRequest,
        result: Result<NavResult, NavError>,
    },
    Linked(Result<NavResult, NavError>, Result<NavResult, NavError>),
    SetRootClicked(Result<Option<NavResult>, NavError>),
    OverlayFinished {
        overlay: Overlay,
        result: Result<(), OverlayError>,
    },
}

enum PopoverSlot {
    Idle(Overlay),
    /// Moved into a task presenting or dismissing it.
    Busy,
}

/// TUI-specific presentation state (the navigation state lives in the host)
pub struct TuiState {
    pub mode: Mode,
    pub root_nav: NavId,
    pub nested_nav: NavId,
    pub status_message: String,
    pub in_flight: usize,
    pub popover_presented: bool,
    pub popover_host: Arc<TermElement>,
    popover: PopoverSlot,
    pages: u32,
}

impl TuiState {
    fn next_page(&mut self, prefix: &str) -> ComponentRef {
        self.pages += 1;
        ComponentRef::named(format!("{prefix}-{}", self.pages))
    }

    fn popover_busy(&self) -> bool {
        matches!(self.popover, PopoverSlot::Busy)
    }

    fn apply(&mut self, action: HostAction) {
        match action {
            HostAction::Navigated { request, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.status_message = describe_result(&request.describe(), &result);
            }
            HostAction::Linked(outer, inner) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.status_message = match (&outer, &inner) {
                    (Ok(o), Ok(i)) if o.transition_id == i.transition_id => format!(
                        "linked push shared {}",
                        o.transition_id
                            .map(|t| t.to_string())
                            .unwrap_or_default()
                    ),
                    (Ok(_), Ok(_)) => "linked push ran as two transitions".to_string(),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Linked push failed: {}", e);
                        format!("linked push failed: {e}")
                    }
                };
            }
            HostAction::SetRootClicked(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.status_message = match result {
                    Ok(Some(result)) => describe_result("set root", &Ok(result)),
                    Ok(None) => "set root: no enclosing navigator".to_string(),
                    Err(e) => describe_result("set root", &Err(e)),
                };
            }
            HostAction::OverlayFinished { overlay, result } => {
                self.popover_presented = overlay.is_presented();
                self.status_message = match result {
                    Ok(()) if overlay.is_presented() => format!("presented {}", overlay.kind()),
                    Ok(()) => format!("dismissed {}", overlay.kind()),
                    Err(e) => {
                        warn!("Popover failed: {}", e);
                        e.to_string()
                    }
                };
                self.popover = PopoverSlot::Idle(overlay);
            }
        }
    }
}

fn describe_result(what: &str, result: &Result<NavResult, NavError>) -> String {
    match result {
        Ok(r) if !r.has_completed => format!("{what}: nothing to do"),
        Ok(r) => match r.transition_id {
            Some(t) => format!("{what} ({t})"),
            None => what.to_string(),
        },
        Err(e) => {
            warn!("{} failed: {}", what, e);
            format!("{what} failed: {e}")
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(stdout(), Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), Show);
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let mode = config.mode;
    let config = Arc::new(Config::from_resolved(config));
    let delegate = Arc::new(TermDelegate::new());
    let host = NavHost::new(delegate.clone(), config.clone());

    let root_nav = host
        .create_nav(NavOptions::default())
        .map_err(std::io::Error::other)?;
    let nested_nav = host
        .create_nav(NavOptions {
            z_index_offset: Some(NESTED_Z_INDEX_OFFSET),
            ..NavOptions::child_of(root_nav)
        })
        .map_err(std::io::Error::other)?;

    let popover_host = Arc::new(TermElement::new(u64::MAX, "popover"));
    let popover = Overlay::new(
        POPOVER_ID,
        OverlayKind::Popover,
        popover_host.clone(),
        OverlayOptions::new(ComponentRef::named("popover-menu")).css_class("menu"),
        delegate.clone(),
        config.clone(),
    );

    let mut tui = TuiState {
        mode,
        root_nav,
        nested_nav,
        status_message: String::new(),
        in_flight: 0,
        popover_presented: false,
        popover_host,
        popover: PopoverSlot::Idle(popover),
        pages: 0,
    };

    // Channel for results from background tasks
    let (tx, rx) = mpsc::channel();

    let first_page = tui.next_page("page");
    let first_tab = tui.next_page("tab");
    spawn_request(&host, NavRequest::SetRoot(root_nav, first_page), &mut tui, tx.clone());
    spawn_request(&host, NavRequest::SetRoot(nested_nav, first_tab), &mut tui, tx.clone());

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new().ok();
    info!("Navkit host running (root {}, nested {})", root_nav, nested_nav);

    let mut needs_redraw = true;
    loop {
        while let Ok(action) = rx.try_recv() {
            tui.apply(action);
            needs_redraw = true;
        }

        let busy = tui.in_flight > 0 || tui.popover_busy();
        if busy {
            needs_redraw = true;
        }

        if needs_redraw {
            terminal.draw(|f| ui::draw_ui(f, &host, &delegate, &tui))?;
            needs_redraw = false;
        }

        let timeout = if busy {
            std::time::Duration::from_millis(50)
        } else {
            std::time::Duration::from_millis(250)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            match event {
                TuiEvent::Quit | TuiEvent::ForceQuit => should_quit = true,
                TuiEvent::Resize => {}
                TuiEvent::Push => {
                    let page = tui.next_page("page");
                    spawn_request(&host, NavRequest::Push(root_nav, page), &mut tui, tx.clone());
                }
                TuiEvent::Pop => {
                    spawn_request(&host, NavRequest::Pop(root_nav), &mut tui, tx.clone());
                }
                TuiEvent::PopToRoot => {
                    spawn_request(&host, NavRequest::PopToRoot(root_nav), &mut tui, tx.clone());
                }
                TuiEvent::PushNested => {
                    let tab = tui.next_page("tab");
                    spawn_request(&host, NavRequest::Push(nested_nav, tab), &mut tui, tx.clone());
                }
                TuiEvent::PopNested => {
                    spawn_request(&host, NavRequest::Pop(nested_nav), &mut tui, tx.clone());
                }
                TuiEvent::LinkedPush => spawn_linked_push(&host, &mut tui, tx.clone()),
                TuiEvent::SetRoot => spawn_set_root(&host, &mut tui, tx.clone()),
                TuiEvent::TogglePopover => toggle_popover(&mut tui, tx.clone(), false),
                TuiEvent::BackdropTap => {
                    if tui.popover_presented {
                        toggle_popover(&mut tui, tx.clone(), true);
                    }
                }
            }
        }

        if should_quit {
            info!("Quit requested");
            break;
        }
    }

    ratatui::restore();
    Ok(())
}

fn spawn_request(
    host: &NavHost,
    request: NavRequest,
    tui: &mut TuiState,
    tx: mpsc::Sender<HostAction>,
) {
    info!("Spawning {}", request.describe());
    tui.in_flight += 1;
    let host = host.clone();
    tokio::spawn(async move {
        let result = match &request {
            NavRequest::Push(nav, page) => host.push(*nav, page.clone(), NavParams::new()).await,
            NavRequest::Pop(nav) => host.pop(*nav).await,
            NavRequest::PopToRoot(nav) => host.pop_to_root(*nav).await,
            NavRequest::SetRoot(nav, page) => {
                host.set_root(*nav, page.clone(), NavParams::new()).await
            }
        };
        if tx.send(HostAction::Navigated { request, result }).is_err() {
            warn!("Failed to report navigation result: receiver dropped");
        }
    });
}

/// Pushes on the root and the nested navigator concurrently. The nested push
/// starts while the root one is hydrating, so it joins the root's transition.
fn spawn_linked_push(host: &NavHost, tui: &mut TuiState, tx: mpsc::Sender<HostAction>) {
    let outer = tui.next_page("page");
    let inner = tui.next_page("tab");
    let (root_nav, nested_nav) = (tui.root_nav, tui.nested_nav);
    info!("Spawning linked push ({} + {})", outer, inner);
    tui.in_flight += 1;

    let host = host.clone();
    tokio::spawn(async move {
        let (outer, inner) = tokio::join!(
            host.push(root_nav, outer, NavParams::new()),
            host.push(nested_nav, inner, NavParams::new()),
        );
        if tx.send(HostAction::Linked(outer, inner)).is_err() {
            warn!("Failed to report linked push: receiver dropped");
        }
    });
}

/// Simulates a click on a set-root trigger rendered in the active root page.
fn spawn_set_root(host: &NavHost, tui: &mut TuiState, tx: mpsc::Sender<HostAction>) {
    let Some(active) = host.get_active(tui.root_nav) else {
        tui.status_message = "set root: no page to click in".to_string();
        return;
    };
    let trigger = NavSetRoot::new()
        .component(tui.next_page("home"))
        .data(NavParams::new().with("source", "set-root"))
        .mounted_in(active);
    tui.in_flight += 1;

    let host = host.clone();
    tokio::spawn(async move {
        let result = trigger.on_child_click(&host).await;
        if tx.send(HostAction::SetRootClicked(result)).is_err() {
            warn!("Failed to report set root: receiver dropped");
        }
    });
}

fn toggle_popover(tui: &mut TuiState, tx: mpsc::Sender<HostAction>, backdrop: bool) {
    let PopoverSlot::Idle(mut overlay) = std::mem::replace(&mut tui.popover, PopoverSlot::Busy)
    else {
        tui.status_message = "popover busy".to_string();
        return;
    };

    tokio::spawn(async move {
        let result = if backdrop {
            overlay.on_backdrop_tap().await.map(|_| ())
        } else if overlay.is_presented() {
            overlay.dismiss(None, Some("toggle")).await
        } else {
            overlay.present().await
        };
        if tx
            .send(HostAction::OverlayFinished { overlay, result })
            .is_err()
        {
            warn!("Failed to report popover result: receiver dropped");
        }
    });
}
