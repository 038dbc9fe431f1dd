//! Dashboard rendering

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};

use pisensors_core::DashboardSnapshot;
use pisensors_core::config::DashboardSettings;
use pisensors_core::metrics::ThrottleCondition;

use super::app::App;
use crate::format;

/// Column where temperature bars start
const LABEL_WIDTH: u16 = 11;

/// Room kept right of a bar for the value
const VALUE_WIDTH: u16 = 10;

/// Rows of the throttling panel including its border
const THROTTLE_PANEL_HEIGHT: u16 = ThrottleCondition::ALL.len() as u16 + 3;

const BAR_SYMBOL: &str = "█";

/// Render the complete dashboard
pub fn draw(f: &mut Frame, app: &App, snapshot: &DashboardSnapshot) {
    let disk_rows = snapshot.disks.as_ref().map_or(1, Vec::len) as u16;
    let top_height = (disk_rows + 3).max(THROTTLE_PANEL_HEIGHT);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),          // header
            Constraint::Length(top_height), // disks + throttling
            Constraint::Length(2),          // temperature bars
            Constraint::Min(1),             // info lines
            Constraint::Length(1),          // status
            Constraint::Length(1),          // key menu
        ])
        .split(f.area());

    draw_header(f, app, snapshot, chunks[0]);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    draw_disks(f, snapshot, top[0]);
    draw_throttling(f, snapshot, top[1]);

    draw_temperatures(f, &app.settings, snapshot, chunks[2]);
    draw_info(f, snapshot, chunks[3]);
    draw_status(f, app, snapshot, chunks[4]);
    draw_menu(f, app, chunks[5]);
}

fn draw_header(f: &mut Frame, app: &App, snapshot: &DashboardSnapshot, area: Rect) {
    let kernel = format!(
        "Kernel: {} ",
        snapshot.kernel.as_deref().unwrap_or(format::PLACEHOLDER)
    );
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(kernel.chars().count() as u16),
        ])
        .split(area);

    let hostname = snapshot.hostname.as_deref().unwrap_or(format::PLACEHOLDER);
    let left = Line::from(vec![
        Span::raw(" Connected to "),
        Span::styled(
            app.destination.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" ({hostname})")),
    ]);
    f.render_widget(Paragraph::new(left), columns[0]);
    f.render_widget(
        Paragraph::new(kernel).alignment(Alignment::Right),
        columns[1],
    );
}

fn draw_disks(f: &mut Frame, snapshot: &DashboardSnapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Disks ({}) ", format::units(snapshot.disk_units)));

    let rows: Vec<Row> = match snapshot.disks {
        Some(ref disks) => disks
            .iter()
            .map(|d| {
                Row::new(vec![
                    d.mount.clone(),
                    d.total.clone(),
                    d.used.clone(),
                    d.free.clone(),
                    format!("{}%", d.percent_used),
                ])
            })
            .collect(),
        None => vec![Row::new(vec![format::PLACEHOLDER.to_string()])],
    };

    let header = Row::new(vec!["Mount", "Total", "Used", "Free", "% Used"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(block);
    f.render_widget(table, area);
}

fn draw_throttling(f: &mut Frame, snapshot: &DashboardSnapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Throttling status ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let (current, since_boot) = match snapshot.throttle {
        Some(status) => (
            condition_lines(&status.active(), Color::Red),
            condition_lines(&status.occurred(), Color::Yellow),
        ),
        None => (placeholder_lines(), placeholder_lines()),
    };

    let heading = Style::default().add_modifier(Modifier::BOLD);
    let mut left = vec![Line::styled("Current", heading)];
    left.extend(current);
    let mut right = vec![Line::styled("Since last boot", heading)];
    right.extend(since_boot);

    f.render_widget(Paragraph::new(left), columns[0]);
    f.render_widget(Paragraph::new(right), columns[1]);
}

fn condition_lines(conditions: &[ThrottleCondition], color: Color) -> Vec<Line<'static>> {
    if conditions.is_empty() {
        return vec![Line::styled("none", Style::default().fg(Color::Green))];
    }
    conditions
        .iter()
        .map(|c| Line::styled(c.label(), Style::default().fg(color)))
        .collect()
}

fn placeholder_lines() -> Vec<Line<'static>> {
    vec![Line::raw(format::PLACEHOLDER)]
}

fn draw_temperatures(
    f: &mut Frame,
    settings: &DashboardSettings,
    snapshot: &DashboardSnapshot,
    area: Rect,
) {
    let width = settings
        .bar_width
        .min(area.width.saturating_sub(LABEL_WIDTH + VALUE_WIDTH));
    let lines = vec![
        temperature_line("GPU Temp:", snapshot.gpu_temp, settings, width),
        temperature_line("CPU Temp:", snapshot.cpu_temp, settings, width),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

fn temperature_line(
    label: &str,
    celsius: Option<f64>,
    settings: &DashboardSettings,
    width: u16,
) -> Line<'static> {
    let label = Span::raw(format!(" {label:<w$}", w = usize::from(LABEL_WIDTH - 1)));
    match celsius {
        Some(t) => {
            let fill = usize::from(bar_fill(t, settings.max_temp, width));
            let bar = format!(
                "{}{}",
                BAR_SYMBOL.repeat(fill),
                " ".repeat(usize::from(width).saturating_sub(fill))
            );
            Line::from(vec![
                label,
                Span::styled(bar, Style::default().fg(temperature_color(t, settings))),
                Span::raw(format!("  {}", format::temperature(t))),
            ])
        }
        None => Line::from(vec![label, Span::raw(format::PLACEHOLDER)]),
    }
}

fn draw_info(f: &mut Frame, snapshot: &DashboardSnapshot, area: Rect) {
    let cpu_usage = match snapshot.cpu_usage {
        Some(usage) if !usage.is_live() => Span::styled(
            format::cpu_usage(usage),
            Style::default().fg(Color::DarkGray),
        ),
        usage => Span::raw(format::or_placeholder(usage, format::cpu_usage)),
    };

    let mut lines = vec![
        Line::raw(""),
        info_line("CPU usage", cpu_usage),
        info_text("RAM usage", format::or_placeholder(snapshot.memory, format::memory)),
        info_text(
            "Processes",
            format::or_placeholder(snapshot.load, format::processes),
        ),
        info_text(
            "Avg load",
            format::or_placeholder(snapshot.load, format::load_average),
        ),
        info_text(
            "CPU freq",
            format::or_placeholder(snapshot.cpu_frequency_mhz, format::frequency),
        ),
        info_text("Uptime", format::or_placeholder(snapshot.uptime.clone(), |u| u)),
        info_text(
            "Governor",
            format::or_placeholder(snapshot.governors.as_ref(), format::governors),
        ),
        info_text(
            "GPU memory",
            format::or_placeholder(snapshot.gpu_memory.clone(), |m| m),
        ),
        info_text(
            "HW codecs",
            format::or_placeholder(snapshot.codecs.as_ref(), format::codecs),
        ),
    ];

    if let Some(problem) = snapshot.problems.first() {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format!(" ! {problem}"),
            Style::default().fg(Color::Yellow),
        ));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn info_line(label: &str, value: Span<'static>) -> Line<'static> {
    Line::from(vec![Span::raw(format!(" {label:<12}")), value])
}

fn info_text(label: &str, value: String) -> Line<'static> {
    info_line(label, Span::raw(value))
}

fn draw_status(f: &mut Frame, app: &App, snapshot: &DashboardSnapshot, area: Rect) {
    let size = f.area();
    let updated = snapshot
        .collected_at
        .map_or_else(|| "never".to_string(), |t| t.format("%H:%M:%S").to_string());
    let mut spans = vec![Span::raw(format!(
        " Refresh: {:.1}s | Units: {} | Terminal: {}x{} | Updated: {updated}",
        app.config.refresh_secs(),
        format::units(app.config.disk_units()),
        size.width,
        size.height,
    ))];
    if !snapshot.problems.is_empty() {
        spans.push(Span::styled(
            format!(" | {} unavailable", snapshot.problems.len()),
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::Gray)),
        area,
    );
}

fn draw_menu(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for entry in app.keymap.menu() {
        spans.push(Span::styled(
            format!(" {} ", entry.keys),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {}  ", entry.label)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Cells of a `width` wide bar filled for `celsius`, where `max_temp`
/// fills it completely
pub fn bar_fill(celsius: f64, max_temp: f64, width: u16) -> u16 {
    if !celsius.is_finite() || celsius <= 0.0 || max_temp <= 0.0 {
        return 0;
    }
    let cells = (celsius * f64::from(width) / max_temp).floor();
    cells.min(f64::from(width)) as u16
}

/// Green below the warning threshold, yellow below the critical one, red
/// otherwise
pub fn temperature_color(celsius: f64, settings: &DashboardSettings) -> Color {
    if celsius < settings.warn_temp {
        Color::Green
    } else if celsius < settings.critical_temp {
        Color::Yellow
    } else {
        Color::Red
    }
}
