use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use vdemo_core::{CommandSink, Record, RecordLine};

use crate::app::{App, InputMode, CONSUMER_CHOICES, PUBLISH_CHOICES};
use crate::theme;

pub fn render<S: CommandSink>(frame: &mut Frame, app: &App<S>) {
    let size = frame.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(size);

    frame.render_widget(render_header(app), layout[0]);
    render_consumer_panel(frame, app, layout[1]);
    frame.render_widget(render_producer_controls(app), layout[2]);
    render_topic_panels(frame, app, layout[3]);
    frame.render_widget(render_status(app), layout[4]);

    if app.help_open {
        render_help_overlay(frame, app);
    }
}

fn render_header<S: CommandSink>(app: &App<S>) -> Paragraph<'static> {
    let state = app.link_state;
    let selection = app.dispatcher.selection();
    let last = app
        .last_routed
        .as_ref()
        .map(|routed| {
            format!(
                "  last {} {} +{}",
                routed.sink.label(),
                routed.key,
                routed.appended
            )
        })
        .unwrap_or_default();
    let line = Line::from(vec![
        Span::styled("Schema version demo ", theme::HEADER_STYLE),
        Span::styled(
            format!("[{}]", state.label()),
            theme::TEXT_STYLE
                .fg(theme::link_state_color(state))
                .add_modifier(ratatui::style::Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "  batch {}  consumer {}  produced {}  interpreted {}  skipped {}",
                selection.batch_count(),
                selection.bucket(),
                app.feeds.producer.total(),
                app.feeds.consumer.total(),
                app.decode_failures
            ),
            theme::MUTED_STYLE,
        ),
        Span::styled(last, theme::TEXT_STYLE),
    ]);
    Paragraph::new(line).block(panel_block(" Overview "))
}

fn render_consumer_panel<S: CommandSink>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let bucket = app.dispatcher.selection().bucket();
    let mut title = vec![Span::styled(" Consumer expects: ", theme::HEADER_STYLE)];
    for choice in &CONSUMER_CHOICES {
        let key = format!("{}.{}", choice.topic, choice.version);
        let style = if key == bucket {
            theme::SELECTED_BUTTON_STYLE
        } else {
            theme::BUTTON_STYLE
        };
        title.push(Span::styled(format!(" {} {} ", choice.key, choice.label), style));
        title.push(Span::raw(" "));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::BORDER_STYLE)
        .title(Line::from(title));
    let snapshot = app.feeds.consumer.snapshot();
    frame.render_widget(record_list(snapshot.get(bucket), block, area), area);
}

fn render_producer_controls<S: CommandSink>(app: &App<S>) -> Paragraph<'static> {
    let mut spans = vec![Span::styled("Batch size: ", theme::HEADER_STYLE)];
    match &app.input {
        InputMode::EditBatch(buffer) => {
            spans.push(Span::styled(format!(" {buffer}_ "), theme::EDITOR_STYLE));
            spans.push(Span::styled(
                "  enter to apply, esc to cancel",
                theme::MUTED_STYLE,
            ));
        }
        InputMode::Normal => {
            spans.push(Span::styled(
                format!(" {} ", app.dispatcher.selection().batch_count()),
                theme::TEXT_STYLE,
            ));
            spans.push(Span::styled(" (b edit, +/-)", theme::MUTED_STYLE));
        }
    }
    spans.push(Span::styled("   Publish version: ", theme::HEADER_STYLE));
    for choice in &PUBLISH_CHOICES {
        spans.push(Span::styled(
            format!(" {} {} ", choice.key, choice.label),
            theme::BUTTON_STYLE,
        ));
        spans.push(Span::raw(" "));
    }
    Paragraph::new(Line::from(spans)).block(panel_block(" Producer "))
}

fn render_topic_panels<S: CommandSink>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let snapshot = app.feeds.producer.snapshot();
    let topics: Vec<_> = snapshot.iter().collect();
    if topics.is_empty() {
        return;
    }
    let constraints: Vec<Constraint> = topics
        .iter()
        .map(|_| Constraint::Ratio(1, topics.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    for ((topic, records), column) in topics.into_iter().zip(columns.iter()) {
        let block = panel_block(&format!(" Topic {topic} "));
        frame.render_widget(record_list(records, block, *column), *column);
    }
}

fn render_status<S: CommandSink>(app: &App<S>) -> Paragraph<'static> {
    let note = app
        .status_note
        .clone()
        .unwrap_or_else(|| "? help  q quit".to_string());
    Paragraph::new(Line::from(Span::styled(note, theme::MUTED_STYLE)))
}

fn render_help_overlay<S: CommandSink>(frame: &mut Frame, app: &App<S>) {
    let area = centered_rect(60, 60, frame.size());
    let mut lines = vec![
        Line::from(Span::styled("Keys", theme::HEADER_STYLE)),
        Line::from(""),
    ];
    for choice in &CONSUMER_CHOICES {
        lines.push(Line::from(format!(
            "  {}  consumer expects {} ({}.{})",
            choice.key, choice.label, choice.topic, choice.version
        )));
    }
    for choice in &PUBLISH_CHOICES {
        lines.push(Line::from(format!(
            "  {}  publish {} ({} version {})",
            choice.key, choice.label, choice.topic, choice.version
        )));
    }
    lines.push(Line::from("  b  edit batch size    +/-  adjust batch size"));
    lines.push(Line::from("  ?  toggle help        q    quit"));
    if let Some(path) = &app.log_path {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("log: {path}"),
            theme::MUTED_STYLE,
        )));
    }
    let help = Paragraph::new(lines)
        .block(panel_block(" Help "))
        .wrap(Wrap { trim: false });
    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

fn panel_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme::BORDER_STYLE)
        .title(Span::styled(title.to_string(), theme::HEADER_STYLE))
}

/// Tail of the log that fits inside the block.
fn record_list<'a>(records: &[Record], block: Block<'a>, area: Rect) -> List<'a> {
    let start = tail_start(records.len(), area);
    let items: Vec<ListItem> = records[start..]
        .iter()
        .map(|record| ListItem::new(record_spans(&RecordLine::from_record(record))))
        .collect();
    List::new(items).block(block)
}

fn tail_start(len: usize, area: Rect) -> usize {
    let visible = usize::from(area.height.saturating_sub(2));
    len.saturating_sub(visible)
}

fn record_spans(line: &RecordLine) -> Line<'static> {
    let version_style = if line.warning {
        theme::WARNING_VERSION_STYLE
    } else {
        theme::VERSION_STYLE
    };
    Line::from(vec![
        Span::styled(line.timestamp.clone(), theme::MUTED_STYLE),
        Span::raw(" "),
        Span::styled(line.version.clone(), version_style),
        Span::styled(line.body.clone(), theme::TEXT_STYLE),
    ])
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
