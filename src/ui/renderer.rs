use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::constants::INDICATOR_SPACE;
use crate::core::message::{Originator, Turn};
use crate::core::topics::TOPICS;
use crate::ui::markdown::{render_markdown, render_plain};
use crate::ui::shell::{Focus, ShellState};
use crate::ui::theme::Theme;

const TOPIC_PANEL_WIDTH: u16 = 34;

/// What the renderer needs from the session for one frame.
pub struct ChatView<'a> {
    pub transcript: &'a [Turn],
    pub streaming: Option<&'a str>,
    pub in_flight: bool,
    pub model: &'a str,
}

pub fn ui(f: &mut Frame, view: &ChatView<'_>, shell: &mut ShellState, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let transcript_area = if shell.topics_open {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(TOPIC_PANEL_WIDTH), Constraint::Min(0)])
            .split(rows[0]);
        render_topics(f, columns[0], shell, theme);
        columns[1]
    } else {
        rows[0]
    };

    render_transcript(f, transcript_area, view, shell, theme);
    render_input(f, rows[1], view, shell, theme);
}

fn render_transcript(
    f: &mut Frame,
    area: Rect,
    view: &ChatView<'_>,
    shell: &mut ShellState,
    theme: &Theme,
) {
    let title = format!(
        "DSA Tutor v{} - {} • Ctrl+B topics • Ctrl+R reset • Ctrl+C quit",
        env!("CARGO_PKG_VERSION"),
        view.model
    );
    let block = Block::default()
        .title(Span::styled(title, theme.title_style))
        .borders(Borders::TOP)
        .border_style(theme.title_style);
    let inner = block.inner(area);

    let lines = wrap_lines(
        build_display_lines(view, shell.markdown, theme),
        inner.width as usize,
    );
    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    shell.update_max_scroll(total.saturating_sub(inner.height));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((shell.scroll_offset, 0));
    f.render_widget(paragraph, area);
}

fn render_topics(f: &mut Frame, area: Rect, shell: &ShellState, theme: &Theme) {
    let border_style = if shell.focus == Focus::Topics {
        theme.focused_border_style
    } else {
        theme.input_border_style
    };
    let items: Vec<ListItem> = TOPICS
        .iter()
        .map(|topic| {
            ListItem::new(vec![
                Line::from(format!("{} {}", topic.icon, topic.title)),
                Line::from(Span::styled(
                    format!("   {}", topic.description),
                    theme.topic_description_style,
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled("Topics (Enter to ask)", theme.topic_title_style)),
        )
        .highlight_style(theme.topic_selected_style);

    let mut state = ListState::default();
    state.select(Some(shell.selected_topic));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_input(
    f: &mut Frame,
    area: Rect,
    view: &ChatView<'_>,
    shell: &ShellState,
    theme: &Theme,
) {
    let border_style = if shell.focus == Focus::Input {
        theme.focused_border_style
    } else {
        theme.input_border_style
    };
    let title = if view.in_flight {
        "Tutor is thinking..."
    } else {
        "Ask a DSA question (Enter to send)"
    };

    let inner_width = area.width.saturating_sub(2 + INDICATOR_SPACE) as usize;
    let (visible, cursor_col) = visible_input(shell.input(), shell.cursor(), inner_width);

    let mut spans = Vec::new();
    if view.in_flight {
        spans.push(Span::styled(
            format!("{} ", pulse_symbol(shell)),
            theme.streaming_indicator_style,
        ));
        spans.push(Span::raw(" ".repeat(INDICATOR_SPACE as usize - 2)));
    } else {
        spans.push(Span::raw(" ".repeat(INDICATOR_SPACE as usize)));
    }
    spans.push(Span::styled(visible, theme.input_text_style));

    let input = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(title, theme.input_title_style)),
    );
    f.render_widget(input, area);

    if shell.focus == Focus::Input {
        let x = area.x + 1 + INDICATOR_SPACE + cursor_col as u16;
        f.set_cursor_position(Position::new(x, area.y + 1));
    }
}

/// Cycles through three symbols twice per second while a reply streams.
fn pulse_symbol(shell: &ShellState) -> &'static str {
    let elapsed = shell.pulse_start.elapsed().as_millis() as f32 / 1000.0;
    let pulse_phase = (elapsed * 2.0) % 2.0;
    let pulse_intensity = if pulse_phase < 1.0 {
        pulse_phase
    } else {
        2.0 - pulse_phase
    };
    if pulse_intensity < 0.33 {
        "○"
    } else if pulse_intensity < 0.66 {
        "◐"
    } else {
        "●"
    }
}

/// The tail of `input` that keeps the cursor visible within `width` columns,
/// and the cursor's column inside it.
fn visible_input(input: &str, cursor: usize, width: usize) -> (String, usize) {
    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let width = width.max(1);

    let mut start = 0;
    let mut used: usize = chars[..cursor].iter().map(|c| c.width().unwrap_or(0)).sum();
    while used >= width && start < cursor {
        used -= chars[start].width().unwrap_or(0);
        start += 1;
    }

    let mut visible = String::new();
    let mut shown = 0;
    for c in &chars[start..] {
        let w = c.width().unwrap_or(0);
        if shown + w > width {
            break;
        }
        visible.push(*c);
        shown += w;
    }
    (visible, used)
}

pub fn build_display_lines(view: &ChatView<'_>, markdown: bool, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for turn in view.transcript {
        push_turn_lines(
            &mut lines,
            turn.originator,
            &turn.body,
            Some(turn.created_at.with_timezone(&chrono::Local).format("%H:%M").to_string()),
            markdown,
            theme,
        );
    }
    if let Some(partial) = view.streaming {
        if partial.is_empty() {
            lines.push(prefix_line(Originator::Assistant, None, theme));
            lines.push(Line::from(Span::styled(
                "…",
                theme.streaming_indicator_style,
            )));
        } else {
            push_turn_lines(&mut lines, Originator::Assistant, partial, None, markdown, theme);
        }
    }
    lines
}

fn push_turn_lines(
    lines: &mut Vec<Line<'static>>,
    originator: Originator,
    body: &str,
    timestamp: Option<String>,
    markdown: bool,
    theme: &Theme,
) {
    lines.push(prefix_line(originator, timestamp, theme));
    let body_lines = match originator {
        Originator::User => render_plain(body, theme.user_text_style),
        Originator::Assistant if markdown => {
            render_markdown(body, theme, theme.assistant_text_style)
        }
        Originator::Assistant => render_plain(body, theme.assistant_text_style),
    };
    lines.extend(body_lines);
    lines.push(Line::default());
}

fn prefix_line(originator: Originator, timestamp: Option<String>, theme: &Theme) -> Line<'static> {
    let (label, style) = match originator {
        Originator::User => ("You", theme.user_prefix_style),
        Originator::Assistant => ("Tutor", theme.assistant_prefix_style),
    };
    let mut spans = vec![Span::styled(label, style)];
    if let Some(ts) = timestamp {
        spans.push(Span::styled(format!("  {ts}"), theme.timestamp_style));
    }
    Line::from(spans)
}

/// Word-wraps styled lines to `width` columns. Words wider than a whole row
/// are split by character.
pub fn wrap_lines(lines: Vec<Line<'static>>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return lines;
    }
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        if line.width() <= width {
            out.push(line);
            continue;
        }
        wrap_line(line, width, &mut out);
    }
    out
}

fn wrap_line(line: Line<'static>, width: usize, out: &mut Vec<Line<'static>>) {
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut row_width = 0;

    for span in line.spans {
        for token in split_words(&span.content) {
            let token_width = token.width();
            let is_space = token.trim().is_empty();

            if row_width + token_width > width && row_width > 0 {
                push_row(out, &mut row);
                row_width = 0;
                if is_space {
                    continue;
                }
            }

            if token_width <= width {
                row.push(Span::styled(token.to_string(), span.style));
                row_width += token_width;
                continue;
            }

            let mut piece = String::new();
            for c in token.chars() {
                let w = c.width().unwrap_or(0);
                if row_width + w > width {
                    row.push(Span::styled(std::mem::take(&mut piece), span.style));
                    push_row(out, &mut row);
                    row_width = 0;
                }
                piece.push(c);
                row_width += w;
            }
            if !piece.is_empty() {
                row.push(Span::styled(piece, span.style));
            }
        }
    }
    if !row.is_empty() {
        push_row(out, &mut row);
    }
}

/// Emits `row` as a line without its trailing whitespace spans.
fn push_row(out: &mut Vec<Line<'static>>, row: &mut Vec<Span<'static>>) {
    while row.last().is_some_and(|span| span.content.trim().is_empty()) {
        row.pop();
    }
    out.push(Line::from(std::mem::take(row)));
}

/// Splits on word boundaries, keeping whitespace runs as their own tokens.
fn split_words(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            tokens.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Rows `lines` occupy at `width` once wrapped.
pub fn wrapped_line_count(lines: &[Line<'static>], width: usize) -> usize {
    wrap_lines(lines.to_vec(), width).len()
}
