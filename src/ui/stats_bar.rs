use tui::{
    Frame,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
};

use crate::stats::{DashboardStats, format_amount};

fn tile(label: &str, value: String, color: Color) -> Paragraph<'static> {
    Paragraph::new(vec![Spans::from(Span::styled(
        value,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))])
    .block(Block::default().title(label.to_string()).borders(Borders::ALL))
}

pub fn render_stats<B: Backend>(frame: &mut Frame<B>, area: Rect, stats: &DashboardStats) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4].as_ref())
        .split(area);

    let tiles = [
        tile("Active projects", stats.active_projects.to_string(), Color::Cyan),
        tile("Clients", stats.total_clients.to_string(), Color::Magenta),
        tile(
            "Revenue",
            format_amount(stats.total_revenue, &stats.currency),
            Color::Green,
        ),
        tile(
            "Profit",
            format_amount(stats.total_profit, &stats.currency),
            Color::Yellow,
        ),
    ];

    for (tile, chunk) in tiles.into_iter().zip(chunks) {
        frame.render_widget(tile, chunk);
    }
}
