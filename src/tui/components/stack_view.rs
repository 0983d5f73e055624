//! # StackView Component
//!
//! Draws one navigator's stack, topmost view first, the way the core sees
//! it: id, z-index, lifecycle state and whether the element is hidden.
//!
//! ```text
//! ┌ Root nav#1000 ── trns#4 ──────────┐
//! │ ▶ page-3    view#2004  z=102       │
//! │   page-2    view#2002  z=101  ◌    │
//! │   page-1    view#2000  z=100  ◌    │
//! └────────────────────────────────────┘
//! ```

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::core::ids::{NavId, TransitionId, ViewId};
use crate::core::view::ViewState;
use crate::tui::component::Component;

/// One stack entry as the draw pass needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct StackRow {
    pub view: ViewId,
    pub label: String,
    pub z_index: Option<i32>,
    pub state: ViewState,
    pub hidden: bool,
}

pub struct StackView {
    pub title: String,
    pub nav: Option<NavId>,
    /// Bottom of the stack first, as the navigator stores it.
    pub rows: Vec<StackRow>,
    pub transition_id: Option<TransitionId>,
}

impl StackView {
    pub fn new(title: impl Into<String>, nav: Option<NavId>, rows: Vec<StackRow>) -> Self {
        Self {
            title: title.into(),
            nav,
            rows,
            transition_id: None,
        }
    }

    pub fn transition(mut self, transition_id: Option<TransitionId>) -> Self {
        self.transition_id = transition_id;
        self
    }

    fn line(row: &StackRow, active: bool) -> Line<'static> {
        let marker = if active { "▶ " } else { "  " };
        let z_index = row
            .z_index
            .map(|z| format!("z={z}"))
            .unwrap_or_else(|| "z=-".to_string());
        let mut style = match row.state {
            ViewState::Attached => Style::default(),
            ViewState::New | ViewState::Initialized => Style::default().fg(Color::Yellow),
            ViewState::Destroyed => Style::default().fg(Color::Red),
        };
        if active {
            style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
        }
        if row.hidden {
            style = style.add_modifier(Modifier::DIM);
        }

        let mut spans = vec![
            Span::styled(format!("{marker}{:<12}", row.label), style),
            Span::styled(format!(" {:<10}", row.view.to_string()), style),
            Span::styled(format!(" {z_index:<6}"), style),
        ];
        if row.hidden {
            spans.push(Span::styled(" ◌", style));
        }
        Line::from(spans)
    }
}

impl Component for StackView {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut title = match self.nav {
            Some(nav) => format!("{} {}", self.title, nav),
            None => self.title.clone(),
        };
        if let Some(transition_id) = self.transition_id {
            title.push_str(&format!(" ── {transition_id}"));
        }

        let lines: Vec<Line> = if self.rows.is_empty() {
            vec![Line::styled(
                "  (empty)",
                Style::default().add_modifier(Modifier::DIM),
            )]
        } else {
            let top = self.rows.len() - 1;
            self.rows
                .iter()
                .enumerate()
                .rev()
                .map(|(i, row)| Self::line(row, i == top))
                .collect()
        };

        let paragraph = Paragraph::new(lines).block(Block::bordered().title(title));
        frame.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn row(id: u32, label: &str, z: i32, hidden: bool) -> StackRow {
        StackRow {
            view: ViewId(id),
            label: label.to_string(),
            z_index: Some(z),
            state: ViewState::Attached,
            hidden,
        }
    }

    fn rendered(view: &mut StackView, height: u16) -> Vec<String> {
        let backend = TestBackend::new(50, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                view.render(f, f.area());
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..50u16)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn test_top_of_stack_is_drawn_first() {
        let mut view = StackView::new(
            "Root",
            Some(NavId(1000)),
            vec![row(2000, "page-1", 100, true), row(2001, "page-2", 101, false)],
        );
        let lines = rendered(&mut view, 4);

        assert!(lines[0].contains("Root nav#1000"));
        assert!(lines[1].contains("▶ page-2"));
        assert!(lines[1].contains("z=101"));
        assert!(lines[2].contains("page-1"));
        assert!(lines[2].contains('◌'));
    }

    #[test]
    fn test_running_transition_in_title() {
        let mut view = StackView::new("Nested", Some(NavId(1001)), vec![row(2002, "tab-1", 100, false)])
            .transition(Some(TransitionId(3)));
        let lines = rendered(&mut view, 3);
        assert!(lines[0].contains("trns#3"));
    }

    #[test]
    fn test_empty_stack() {
        let mut view = StackView::new("Root", None, Vec::new());
        let lines = rendered(&mut view, 3);
        assert!(lines[1].contains("(empty)"));
    }
}
