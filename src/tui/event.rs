use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

/// TUI-specific input events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiEvent {
    Quit,
    ForceQuit,
    Resize,

    // Root navigator
    Push,
    Pop,
    PopToRoot,
    SetRoot,

    // Nested navigator
    PushNested,
    PopNested,
    /// Push on both navigators inside one transition
    LinkedPush,

    // Popover
    TogglePopover,
    BackdropTap,
}

/// Poll for an event, blocking up to `timeout`
pub fn poll_event_timeout(timeout: std::time::Duration) -> Option<TuiEvent> {
    if !event::poll(timeout).unwrap_or(false) {
        return None;
    }
    match event::read().ok()? {
        Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
            log::debug!(
                "Key event: {:?} with modifiers {:?}",
                key_event.code,
                key_event.modifiers
            );
            match (key_event.modifiers, key_event.code) {
                (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(TuiEvent::ForceQuit),
                (_, KeyCode::Char('q')) => Some(TuiEvent::Quit),
                (_, KeyCode::Char('p')) | (_, KeyCode::Right) => Some(TuiEvent::Push),
                (_, KeyCode::Char('b')) | (_, KeyCode::Left) | (_, KeyCode::Backspace) => {
                    Some(TuiEvent::Pop)
                }
                (_, KeyCode::Char('h')) | (_, KeyCode::Home) => Some(TuiEvent::PopToRoot),
                (_, KeyCode::Char('r')) => Some(TuiEvent::SetRoot),
                (_, KeyCode::Char('n')) => Some(TuiEvent::PushNested),
                (_, KeyCode::Char('m')) => Some(TuiEvent::PopNested),
                (_, KeyCode::Char('x')) => Some(TuiEvent::LinkedPush),
                (_, KeyCode::Char('o')) => Some(TuiEvent::TogglePopover),
                (_, KeyCode::Esc) => Some(TuiEvent::BackdropTap),
                _ => None,
            }
        }
        Event::Resize(_, _) => Some(TuiEvent::Resize),
        _ => None,
    }
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(std::time::Duration::ZERO)
}
