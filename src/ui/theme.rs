use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Transcript
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_prefix_style: Style,
    pub assistant_text_style: Style,
    pub timestamp_style: Style,

    // Chrome
    pub title_style: Style,
    pub streaming_indicator_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,
    pub input_text_style: Style,
    pub focused_border_style: Style,

    // Topic panel
    pub topic_title_style: Style,
    pub topic_description_style: Style,
    pub topic_selected_style: Style,

    // Markdown
    pub md_heading_style: Style,
    pub md_code_block_style: Style,
    pub md_inline_code_style: Style,
    pub md_list_marker_style: Style,
    pub md_blockquote_style: Style,
    pub md_link_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_prefix_style: Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(Color::White),
            timestamp_style: Style::default().fg(Color::DarkGray),

            title_style: Style::default().fg(Color::Gray),
            streaming_indicator_style: Style::default().fg(Color::LightMagenta),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),
            input_text_style: Style::default().fg(Color::White),
            focused_border_style: Style::default().fg(Color::LightBlue),

            topic_title_style: Style::default().fg(Color::Gray),
            topic_description_style: Style::default().fg(Color::DarkGray),
            topic_selected_style: Style::default()
                .fg(Color::White)
                .bg(Color::Indexed(60))
                .add_modifier(Modifier::BOLD),

            md_heading_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            md_code_block_style: Style::default().fg(Color::LightYellow),
            md_inline_code_style: Style::default().fg(Color::LightBlue),
            md_list_marker_style: Style::default().fg(Color::LightMagenta),
            md_blockquote_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            md_link_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark_default()
    }
}
