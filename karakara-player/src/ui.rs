use karakara_core::queue::QueueItemStatus;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
};
use tui_logger::TuiLoggerWidget;

use crate::state::AppState;

/// Draw the TUI interface
pub fn draw(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title / connection
            Constraint::Length(5), // Up next
            Constraint::Length(3), // Autoplay countdown
            Constraint::Min(5),    // Queue
            Constraint::Length(8), // Log
            Constraint::Length(3), // Controls
        ])
        .split(f.area());

    draw_header(f, chunks[0], state);
    draw_up_next(f, chunks[1], state);
    draw_countdown(f, chunks[2], state);
    draw_queue_panel(f, chunks[3], state);
    draw_log_panel(f, chunks[4]);
    draw_controls(f, chunks[5], state);
}

fn status_style(status: QueueItemStatus) -> Style {
    match status {
        QueueItemStatus::Playing => Style::default().fg(Color::Green),
        QueueItemStatus::Paused => Style::default().fg(Color::Yellow),
        QueueItemStatus::Pending => Style::default().fg(Color::White),
        _ => Style::default().fg(Color::DarkGray),
    }
}

fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let snapshot = &state.snapshot;
    let (link, link_style) = if snapshot.connected {
        ("● connected", Style::default().fg(Color::Green))
    } else {
        ("○ disconnected", Style::default().fg(Color::Red))
    };

    let line = Line::from(vec![
        Span::styled(
            snapshot.settings.title().to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  queue {}  ", state.queue_id)),
        Span::styled(link, link_style),
        Span::styled(
            format!("  {} images", snapshot.images.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn draw_up_next(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(" 🎤 Up Next ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some(head) = state.head() else {
        let text = Paragraph::new("Queue is empty")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(text, area);
        return;
    };

    let duration = head
        .track
        .duration
        .map(AppState::format_time)
        .unwrap_or_else(|| "-:--".to_string());
    let lyrics = match &head.lyrics {
        Some(lines) => lines
            .first()
            .map(|l| l.text.clone())
            .unwrap_or_else(|| "(empty subtitles)".to_string()),
        None => "(no subtitles)".to_string(),
    };

    let text = vec![
        Line::from(vec![
            Span::styled(
                AppState::item_title(head),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(head.status.to_string(), status_style(head.status)),
        ]),
        Line::from(Span::styled(
            format!("{}  {}", head.track.tag("artist"), duration),
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(lyrics, Style::default().fg(Color::DarkGray))),
    ];

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_countdown(f: &mut Frame, area: Rect, state: &AppState) {
    let (ratio, label) = match state.countdown() {
        Some((waited, threshold)) => (
            (waited / threshold).clamp(0.0, 1.0),
            format!(
                "{} / {}",
                AppState::format_time(waited),
                AppState::format_time(threshold)
            ),
        ),
        None if !state.snapshot.audio_allowed => (0.0, "autoplay waiting for audio".to_string()),
        None => (0.0, "autoplay off".to_string()),
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Autoplay "))
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
        .ratio(ratio)
        .label(label);

    f.render_widget(gauge, area);
}

fn draw_queue_panel(f: &mut Frame, area: Rect, state: &AppState) {
    let queue = &state.snapshot.queue;
    let block = Block::default()
        .title(format!(" Queue ({} tracks) ", queue.len()))
        .borders(Borders::ALL);

    let items: Vec<ListItem> = queue
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let prefix = if i == 0 { "▶ " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(format!("{:<8} ", item.status), status_style(item.status)),
                Span::raw(AppState::item_title(item)),
            ]))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn draw_log_panel(f: &mut Frame, area: Rect) {
    let log_widget = TuiLoggerWidget::default()
        .block(
            Block::default()
                .title(" 📋 Log ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(log_widget, area);
}

fn draw_controls(f: &mut Frame, area: Rect, state: &AppState) {
    let help = "s skip | Enter play | Esc pending | Space pause | q quit";
    let line = Line::from(vec![
        Span::styled(help, Style::default().fg(Color::DarkGray)),
        Span::raw("   "),
        Span::styled(state.status_message.as_str(), Style::default().fg(Color::Yellow)),
    ]);

    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(" Controls "));
    f.render_widget(paragraph, area);
}
