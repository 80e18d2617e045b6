//! Interactive state of the chat screen and the mapping from key presses to
//! session actions. Nothing here touches the session directly; the event
//! loop applies the returned [`ShellAction`].

use std::time::Instant;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::topics::{Topic, TOPICS};

pub const PAGE_SCROLL_LINES: u16 = 10;
pub const WHEEL_SCROLL_LINES: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Topics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
    None,
    Redraw,
    Send(String),
    SendTopic(&'static Topic),
    Reset,
    Quit,
}

/// Wraps to the previous index of a list of `total` entries.
pub fn wrap_previous_index(current: usize, total: usize) -> Option<usize> {
    if total == 0 {
        None
    } else if current == 0 {
        Some(total - 1)
    } else {
        Some(current - 1)
    }
}

/// Wraps to the next index of a list of `total` entries.
pub fn wrap_next_index(current: usize, total: usize) -> Option<usize> {
    if total == 0 {
        None
    } else {
        Some((current + 1) % total)
    }
}

#[derive(Debug)]
pub struct ShellState {
    input: String,
    /// Cursor position in chars, not bytes.
    cursor: usize,
    pub topics_open: bool,
    pub focus: Focus,
    pub selected_topic: usize,
    pub scroll_offset: u16,
    /// Keep the newest transcript line in view.
    pub auto_scroll: bool,
    /// Largest valid scroll offset, as of the last frame.
    pub last_max_scroll: u16,
    pub markdown: bool,
    pub pulse_start: Instant,
}

impl ShellState {
    pub fn new(markdown: bool) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            topics_open: false,
            focus: Focus::Input,
            selected_topic: 0,
            scroll_offset: 0,
            auto_scroll: true,
            last_max_scroll: 0,
            markdown,
            pulse_start: Instant::now(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.cursor = self.input.chars().count();
    }

    pub fn selected(&self) -> Option<&'static Topic> {
        TOPICS.get(self.selected_topic)
    }

    pub fn handle_key(&mut self, key: KeyEvent, in_flight: bool) -> ShellAction {
        if key.kind == KeyEventKind::Release {
            return ShellAction::None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => return ShellAction::Quit,
            KeyCode::Char('r') if ctrl => {
                self.auto_scroll = true;
                return ShellAction::Reset;
            }
            KeyCode::Char('b') if ctrl => {
                self.toggle_topics();
                return ShellAction::Redraw;
            }
            KeyCode::Tab => {
                if self.topics_open {
                    self.focus = match self.focus {
                        Focus::Input => Focus::Topics,
                        Focus::Topics => Focus::Input,
                    };
                }
                return ShellAction::Redraw;
            }
            KeyCode::Esc => {
                if self.topics_open {
                    self.close_topics();
                    return ShellAction::Redraw;
                }
                return ShellAction::None;
            }
            KeyCode::PageUp => {
                self.scroll_up(PAGE_SCROLL_LINES);
                return ShellAction::Redraw;
            }
            KeyCode::PageDown => {
                self.scroll_down(PAGE_SCROLL_LINES);
                return ShellAction::Redraw;
            }
            _ => {}
        }

        match self.focus {
            Focus::Topics => self.handle_topics_key(key, in_flight),
            Focus::Input => self.handle_input_key(key, in_flight),
        }
    }

    fn handle_topics_key(&mut self, key: KeyEvent, in_flight: bool) -> ShellAction {
        match key.code {
            KeyCode::Up => {
                if let Some(index) = wrap_previous_index(self.selected_topic, TOPICS.len()) {
                    self.selected_topic = index;
                }
                ShellAction::Redraw
            }
            KeyCode::Down => {
                if let Some(index) = wrap_next_index(self.selected_topic, TOPICS.len()) {
                    self.selected_topic = index;
                }
                ShellAction::Redraw
            }
            KeyCode::Enter => {
                if in_flight {
                    return ShellAction::None;
                }
                match self.selected() {
                    Some(topic) => {
                        self.close_topics();
                        self.auto_scroll = true;
                        ShellAction::SendTopic(topic)
                    }
                    None => ShellAction::None,
                }
            }
            _ => ShellAction::None,
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent, in_flight: bool) -> ShellAction {
        match key.code {
            KeyCode::Enter => {
                if in_flight || self.input.trim().is_empty() {
                    return ShellAction::None;
                }
                let text = std::mem::take(&mut self.input);
                self.cursor = 0;
                self.auto_scroll = true;
                ShellAction::Send(text)
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let at = self.byte_index(self.cursor);
                self.input.insert(at, c);
                self.cursor += 1;
                ShellAction::Redraw
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = self.byte_index(self.cursor - 1);
                    self.input.remove(at);
                    self.cursor -= 1;
                }
                ShellAction::Redraw
            }
            KeyCode::Delete => {
                if self.cursor < self.input.chars().count() {
                    let at = self.byte_index(self.cursor);
                    self.input.remove(at);
                }
                ShellAction::Redraw
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                ShellAction::Redraw
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.input.chars().count());
                ShellAction::Redraw
            }
            KeyCode::Home => {
                self.cursor = 0;
                ShellAction::Redraw
            }
            KeyCode::End => {
                self.cursor = self.input.chars().count();
                ShellAction::Redraw
            }
            KeyCode::Up => {
                self.scroll_up(1);
                ShellAction::Redraw
            }
            KeyCode::Down => {
                self.scroll_down(1);
                ShellAction::Redraw
            }
            _ => ShellAction::None,
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    pub fn toggle_topics(&mut self) {
        if self.topics_open {
            self.close_topics();
        } else {
            self.topics_open = true;
            self.focus = Focus::Topics;
        }
    }

    fn close_topics(&mut self) {
        self.topics_open = false;
        self.focus = Focus::Input;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        if self.auto_scroll {
            self.scroll_offset = self.last_max_scroll;
            self.auto_scroll = false;
        }
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        if self.auto_scroll {
            return;
        }
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
        if self.scroll_offset >= self.last_max_scroll {
            self.scroll_offset = self.last_max_scroll;
            self.auto_scroll = true;
        }
    }

    /// Called by the renderer once the transcript height is known.
    pub fn update_max_scroll(&mut self, max_scroll: u16) {
        self.last_max_scroll = max_scroll;
        if self.auto_scroll || self.scroll_offset > max_scroll {
            self.scroll_offset = max_scroll;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(shell: &mut ShellState, text: &str) {
        for c in text.chars() {
            shell.handle_key(press(KeyCode::Char(c)), false);
        }
    }

    #[test]
    fn enter_sends_and_clears_input() {
        let mut shell = ShellState::new(true);
        type_text(&mut shell, "What is a heap?");
        assert_eq!(
            shell.handle_key(press(KeyCode::Enter), false),
            ShellAction::Send("What is a heap?".to_string())
        );
        assert_eq!(shell.input(), "");
        assert_eq!(shell.cursor(), 0);
    }

    #[test]
    fn enter_is_ignored_for_blank_input_or_while_in_flight() {
        let mut shell = ShellState::new(true);
        type_text(&mut shell, "   ");
        assert_eq!(shell.handle_key(press(KeyCode::Enter), false), ShellAction::None);

        shell.set_input("queue");
        assert_eq!(shell.handle_key(press(KeyCode::Enter), true), ShellAction::None);
        assert_eq!(shell.input(), "queue");
    }

    #[test]
    fn editing_respects_multibyte_cursor() {
        let mut shell = ShellState::new(true);
        type_text(&mut shell, "héap");
        shell.handle_key(press(KeyCode::Left), false);
        shell.handle_key(press(KeyCode::Left), false);
        shell.handle_key(press(KeyCode::Backspace), false);
        assert_eq!(shell.input(), "hap");
        shell.handle_key(press(KeyCode::Home), false);
        shell.handle_key(press(KeyCode::Delete), false);
        assert_eq!(shell.input(), "ap");
        shell.handle_key(press(KeyCode::End), false);
        type_text(&mut shell, "!");
        assert_eq!(shell.input(), "ap!");
    }

    #[test]
    fn global_shortcuts() {
        let mut shell = ShellState::new(true);
        assert_eq!(shell.handle_key(ctrl('c'), false), ShellAction::Quit);
        assert_eq!(shell.handle_key(ctrl('r'), true), ShellAction::Reset);
        assert_eq!(shell.input(), "");
    }

    #[test]
    fn topic_panel_focus_and_selection() {
        let mut shell = ShellState::new(true);
        shell.handle_key(ctrl('b'), false);
        assert!(shell.topics_open);
        assert_eq!(shell.focus, Focus::Topics);

        shell.handle_key(press(KeyCode::Up), false);
        assert_eq!(shell.selected_topic, TOPICS.len() - 1);
        shell.handle_key(press(KeyCode::Down), false);
        assert_eq!(shell.selected_topic, 0);

        shell.handle_key(press(KeyCode::Tab), false);
        assert_eq!(shell.focus, Focus::Input);
        shell.handle_key(press(KeyCode::Tab), false);
        assert_eq!(shell.focus, Focus::Topics);

        shell.handle_key(press(KeyCode::Esc), false);
        assert!(!shell.topics_open);
        assert_eq!(shell.focus, Focus::Input);
    }

    #[test]
    fn picking_a_topic_sends_its_prompt_and_closes_the_panel() {
        let mut shell = ShellState::new(true);
        shell.toggle_topics();
        shell.handle_key(press(KeyCode::Down), false);

        assert_eq!(shell.handle_key(press(KeyCode::Enter), true), ShellAction::None);
        assert!(shell.topics_open);

        match shell.handle_key(press(KeyCode::Enter), false) {
            ShellAction::SendTopic(topic) => assert_eq!(topic.id, TOPICS[1].id),
            other => panic!("expected topic send, got {other:?}"),
        }
        assert!(!shell.topics_open);
        assert_eq!(shell.focus, Focus::Input);
    }

    #[test]
    fn scrolling_leaves_and_regains_auto_scroll() {
        let mut shell = ShellState::new(true);
        shell.update_max_scroll(20);
        assert_eq!(shell.scroll_offset, 20);

        shell.handle_key(press(KeyCode::PageUp), false);
        assert!(!shell.auto_scroll);
        assert_eq!(shell.scroll_offset, 10);

        shell.update_max_scroll(25);
        assert_eq!(shell.scroll_offset, 10);

        shell.scroll_down(WHEEL_SCROLL_LINES);
        assert_eq!(shell.scroll_offset, 13);
        shell.handle_key(press(KeyCode::PageDown), false);
        shell.handle_key(press(KeyCode::PageDown), false);
        assert!(shell.auto_scroll);
        assert_eq!(shell.scroll_offset, 25);
    }

    #[test]
    fn wrap_indices() {
        assert_eq!(wrap_previous_index(0, 3), Some(2));
        assert_eq!(wrap_next_index(2, 3), Some(0));
        assert_eq!(wrap_next_index(0, 0), None);
    }
}
