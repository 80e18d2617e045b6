//! Markdown to styled terminal lines.
//!
//! Tutor replies lean heavily on headings, bullet lists and fenced code, so
//! those are rendered with their own styles. Tables and footnotes are not
//! enabled; their source text passes through as plain paragraphs.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::ui::theme::Theme;

const CODE_INDENT: &str = "  ";
const QUOTE_PREFIX: &str = "│ ";

/// Splits `text` on newlines without interpreting any markup.
pub fn render_plain(text: &str, style: Style) -> Vec<Line<'static>> {
    text.split('\n')
        .map(|line| Line::from(Span::styled(line.to_string(), style)))
        .collect()
}

pub fn render_markdown(text: &str, theme: &Theme, base: Style) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let mut renderer = MarkdownRenderer::new(theme, base);
    for event in Parser::new_ext(text, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(u64),
}

struct MarkdownRenderer<'t> {
    theme: &'t Theme,
    base: Style,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    lists: Vec<ListKind>,
    quote_depth: usize,
    in_code_block: bool,
    code_language: Option<String>,
    link_targets: Vec<String>,
}

impl<'t> MarkdownRenderer<'t> {
    fn new(theme: &'t Theme, base: Style) -> Self {
        Self {
            theme,
            base,
            lines: Vec::new(),
            current: Vec::new(),
            style_stack: vec![base],
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            code_language: None,
            link_targets: Vec::new(),
        }
    }

    fn style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, patch: Style) {
        let next = self.style().patch(patch);
        self.style_stack.push(next);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.ensure_line_prefix();
                let style = self.style().patch(self.theme.md_inline_code_style);
                self.current.push(Span::styled(code.to_string(), style));
            }
            Event::SoftBreak => {
                self.ensure_line_prefix();
                self.current.push(Span::styled(" ", self.style()));
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.block_gap();
                self.lines
                    .push(Line::from(Span::styled("─".repeat(24), self.theme.title_style)));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
            }
            Tag::Heading { level, .. } => {
                self.block_gap();
                self.push_style(self.theme.md_heading_style);
                let marker = match level {
                    HeadingLevel::H1 => "",
                    HeadingLevel::H2 => "",
                    _ => "» ",
                };
                if !marker.is_empty() {
                    self.current.push(Span::styled(marker, self.style()));
                }
            }
            Tag::BlockQuote(_) => {
                self.block_gap();
                self.quote_depth += 1;
                self.push_style(self.theme.md_blockquote_style);
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                } else {
                    self.flush_line();
                }
                self.lists.push(match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Bullet,
                });
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.ensure_line_prefix();
                self.current.push(Span::raw("  ".repeat(depth)));
                self.current
                    .push(Span::styled(marker, self.theme.md_list_marker_style));
            }
            Tag::CodeBlock(kind) => {
                self.block_gap();
                self.in_code_block = true;
                self.code_language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                        Some(lang.trim().to_string())
                    }
                    _ => None,
                };
                if let Some(lang) = &self.code_language {
                    self.lines.push(Line::from(Span::styled(
                        format!("{CODE_INDENT}[{lang}]"),
                        self.theme.timestamp_style,
                    )));
                }
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.push_style(self.theme.md_link_style);
                self.link_targets.push(dest_url.to_string());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_line(),
            TagEnd::Heading(_) => {
                self.flush_line();
                self.pop_style();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.code_language = None;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_targets.pop() {
                    let shown = self.current.iter().any(|span| span.content == url.as_str());
                    if !shown && !url.is_empty() {
                        self.current
                            .push(Span::styled(format!(" <{url}>"), self.theme.timestamp_style));
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            for line in text.trim_end_matches('\n').split('\n') {
                self.lines.push(Line::from(Span::styled(
                    format!("{CODE_INDENT}{line}"),
                    self.theme.md_code_block_style,
                )));
            }
            return;
        }
        self.ensure_line_prefix();
        self.current.push(Span::styled(text.to_string(), self.style()));
    }

    fn ensure_line_prefix(&mut self) {
        if self.current.is_empty() && self.quote_depth > 0 {
            self.current.push(Span::styled(
                QUOTE_PREFIX.repeat(self.quote_depth),
                self.theme.md_blockquote_style,
            ));
        }
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    /// Separates blocks with one empty line, never at the very top.
    fn block_gap(&mut self) {
        self.flush_line();
        let last_is_blank = self
            .lines
            .last()
            .is_none_or(|line| line.spans.iter().all(|s| s.content.trim().is_empty()));
        if !last_is_blank {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        while self
            .lines
            .last()
            .is_some_and(|line| line.spans.iter().all(|s| s.content.trim().is_empty()))
        {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.lines
    }
}
