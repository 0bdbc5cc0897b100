pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthChar;

use tapline::{
    engine::Snapshot,
    metrics::{format_time, words_typed},
    session::SessionStatus,
    shell::Submission,
};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const PROMPT_LINES: usize = 4;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snap = self.shell.snapshot();
        match (snap.status, self.state) {
            (SessionStatus::Idle, _) => render_idle(self, area, buf),
            (SessionStatus::Completed, AppState::Results) => render_results(self, &snap, area, buf),
            _ => render_typing(&snap, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn render_idle(app: &App, area: Rect, buf: &mut Buffer) {
    Paragraph::new(vec![
        Line::from(Span::styled(
            "IDLE - press (tab) for a new text or (esc)ape",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        )),
        Line::from(Span::styled(next_settings(app), dim_bold())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(area, buf);
}

/// Settings the next test will start with; these change with (m)/(d)/(l).
fn next_settings(app: &App) -> String {
    let cfg = app.shell.engine().config();
    format!("next: {} / {} / {}", cfg.mode, cfg.difficulty, cfg.language)
}

fn render_typing(snap: &Snapshot, area: Rect, buf: &mut Buffer) {
    let line_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1) as usize;
    let reference: Vec<char> = snap.reference.chars().collect();
    let typed: Vec<char> = snap.typed.chars().collect();

    let starts = line_starts(&reference, line_width);
    let single_line = starts.len() <= 1;
    let prompt_lines = PROMPT_LINES.min(starts.len()).max(1);

    let used = prompt_lines as u16 + 4;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(area.height.saturating_sub(used) / 2),
            Constraint::Length(1), // timer
            Constraint::Length(1),
            Constraint::Length(prompt_lines as u16),
            Constraint::Length(1),
            Constraint::Length(1), // live stats
            Constraint::Min(0),
        ])
        .split(area);

    let clock = match snap.seconds_remaining {
        Some(remaining) => format_time(remaining),
        None => format_time(snap.elapsed_secs),
    };
    Paragraph::new(Span::styled(
        format!("{}   {}", snap.mode, clock),
        dim_bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    // scroll so the cursor stays on the second visible line
    let cursor_line = starts.partition_point(|&s| s <= snap.cursor_pos).saturating_sub(1);
    let first_line = cursor_line
        .saturating_sub(1)
        .min(starts.len().saturating_sub(prompt_lines));
    let lines: Vec<Line> = starts
        .iter()
        .enumerate()
        .skip(first_line)
        .take(prompt_lines)
        .map(|(line, &start)| {
            let end = starts.get(line + 1).copied().unwrap_or(reference.len());
            (start..end)
                .map(|idx| char_span(idx, &reference, &typed, snap.cursor_pos))
                .collect::<Vec<Span>>()
                .into()
        })
        .collect();

    Paragraph::new(lines)
        .alignment(if single_line {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .render(chunks[3], buf);

    let last_key = snap
        .last_key
        .as_ref()
        .map(|k| k.label())
        .unwrap_or_default();
    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} errors   {}",
            snap.wpm, snap.accuracy, snap.errors, last_key
        ),
        Style::default().fg(Color::Gray),
    ))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);
}

/// Char index at which each rendered line starts, breaking whenever the next
/// char would push the line past `width` display columns.
fn line_starts(reference: &[char], width: usize) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut used = 0;
    for (idx, c) in reference.iter().enumerate() {
        let w = c.width().unwrap_or(0);
        if starts.is_empty() || (used > 0 && used + w > width) {
            starts.push(idx);
            used = 0;
        }
        used += w;
    }
    starts
}

fn char_span(idx: usize, reference: &[char], typed: &[char], cursor: usize) -> Span<'static> {
    let expected = reference[idx];
    if idx < cursor {
        let actual = typed.get(idx).copied().unwrap_or(expected);
        if actual == expected {
            Span::styled(expected.to_string(), bold().fg(Color::Green))
        } else {
            let shown = match actual {
                ' ' => '·',
                c => c,
            };
            Span::styled(shown.to_string(), bold().fg(Color::Red))
        }
    } else if idx == cursor {
        Span::styled(
            expected.to_string(),
            dim_bold().add_modifier(Modifier::UNDERLINED),
        )
    } else {
        Span::styled(expected.to_string(), dim_bold())
    }
}

fn render_results(app: &App, snap: &Snapshot, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // settings + submission
            Constraint::Length(1), // next settings
            Constraint::Length(1), // legend
        ])
        .split(area);

    let series = app.shell.wpm_series();
    let (overall_duration, highest_wpm) =
        charting::compute_chart_params(series.points(), snap.elapsed_secs);
    let tuples: Vec<(f64, f64)> = series.points().iter().copied().map(Into::into).collect();
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&tuples)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold()),
                    Span::styled(charting::format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(highest_wpm), bold()),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} errors   {} words   {}",
            snap.wpm,
            snap.accuracy,
            snap.errors,
            words_typed(snap.cursor_pos),
            format_time(snap.elapsed_secs)
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let saved = match app.shell.submission() {
        Some(Submission::Saved(_)) => "result saved".to_string(),
        Some(Submission::Failed(e)) => format!("result not saved: {e}"),
        None => String::new(),
    };
    Paragraph::new(Span::styled(
        format!(
            "{} / {} / {}   {}",
            snap.mode, snap.difficulty, snap.language, saved
        ),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled(next_settings(app), dim_bold()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(←) retry / (tab) new / (m)ode (d)ifficulty (l)anguage / (r)eset / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[4], buf);
}
