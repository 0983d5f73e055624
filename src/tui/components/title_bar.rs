//! # TitleBar Component
//!
//! Top status bar showing the platform mode and the outcome of the last
//! navigation request.
//!
//! TitleBar is purely presentational: it receives all data as props and has
//! no internal state.
//!
//! ```rust,ignore
//! let mut title_bar = TitleBar::new(Mode::Ios, "pushed page-3".to_string(), 1);
//! title_bar.render(frame, title_area);
//! ```
//!
//! The text changes with state:
//!
//! 1. **Requests in flight**: `"Navkit (ios) | pushed page-3 | ⟳ 1"`
//! 2. **Status message**: `"Navkit (ios) | pushed page-3"`
//! 3. **Default**: `"Navkit (ios)"`

use crate::Mode;
use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Span;

/// Top status bar component.
pub struct TitleBar {
    pub mode: Mode,
    /// Result of the last request (e.g. "pushed page-3", "rejected: busy")
    pub status_message: String,
    /// Navigation requests still running
    pub in_flight: usize,
}

impl TitleBar {
    pub fn new(mode: Mode, status_message: String, in_flight: usize) -> Self {
        Self {
            mode,
            status_message,
            in_flight,
        }
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let title_text = if self.in_flight > 0 {
            format!(
                "Navkit ({}) | {} | ⟳ {}",
                self.mode, self.status_message, self.in_flight
            )
        } else if self.status_message.is_empty() {
            format!("Navkit ({})", self.mode)
        } else {
            format!("Navkit ({}) | {}", self.mode, self.status_message)
        };

        frame.render_widget(Span::raw(title_text), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn rendered(title_bar: &mut TitleBar) -> String {
        let backend = TestBackend::new(80, 1);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                title_bar.render(f, f.area());
            })
            .unwrap();

        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_title_bar_with_requests_in_flight() {
        let text = rendered(&mut TitleBar::new(Mode::Md, "pushed page-2".to_string(), 2));
        assert!(text.contains("Navkit (md)"));
        assert!(text.contains("pushed page-2"));
        assert!(text.contains("⟳ 2"));
    }

    #[test]
    fn test_title_bar_with_status_message() {
        let text = rendered(&mut TitleBar::new(Mode::Ios, "popped".to_string(), 0));
        assert!(text.contains("Navkit (ios)"));
        assert!(text.contains("popped"));
        assert!(!text.contains('⟳'));
    }

    #[test]
    fn test_title_bar_default_no_status() {
        let text = rendered(&mut TitleBar::new(Mode::Ios, String::new(), 0));
        assert!(text.contains("Navkit (ios)"));
        assert!(!text.contains('|'));
    }
}
