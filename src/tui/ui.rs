use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Clear, Paragraph};

use crate::core::ids::NavId;
use crate::core::nav::NavHost;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{StackRow, StackView, TitleBar};
use crate::tui::host::TermDelegate;

const HELP: &str = "p push  b pop  h root  r set-root  n/m nested  x linked  o popover  q quit";

/// Snapshot of one navigator's stack, bottom first.
pub fn stack_rows(host: &NavHost, delegate: &TermDelegate, nav: NavId) -> Vec<StackRow> {
    host.get_views(nav)
        .into_iter()
        .filter_map(|id| host.view(id))
        .map(|view| {
            let hidden = view
                .element()
                .and_then(|element| delegate.find(&element))
                .is_some_and(|element| element.is_hidden());
            StackRow {
                view: view.id,
                label: view.component.label(),
                z_index: view.z_index(),
                state: view.state(),
                hidden,
            }
        })
        .collect()
}

pub fn draw_ui(frame: &mut Frame, host: &NavHost, delegate: &TermDelegate, tui: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let mut title_bar = TitleBar::new(tui.mode, tui.status_message.clone(), tui.in_flight);
    title_bar.render(frame, chunks[0]);

    let stacks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    for (title, nav, area) in [
        ("Root", tui.root_nav, stacks[0]),
        ("Nested", tui.nested_nav, stacks[1]),
    ] {
        StackView::new(title, Some(nav), stack_rows(host, delegate, nav))
            .transition(host.transition_id(nav))
            .render(frame, area);
    }

    frame.render_widget(
        Line::styled(HELP, Style::default().add_modifier(Modifier::DIM)),
        chunks[2],
    );

    if tui.popover_presented {
        draw_popover(frame, tui, chunks[1]);
    }
}

fn draw_popover(frame: &mut Frame, tui: &TuiState, area: Rect) {
    let popup = centered(area, 36, 5);
    let z_index = tui
        .popover_host
        .z_index()
        .map(|z| format!("z={z}"))
        .unwrap_or_default();

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(format!("  popover-menu {z_index}")),
            Line::styled(
                "  o dismiss   Esc backdrop",
                Style::default().add_modifier(Modifier::DIM),
            ),
        ])
        .block(Block::bordered().title("Popover")),
        popup,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
