//! The interactive event loop: terminal lifecycle, input events, background
//! reply streams and throttled redraws.

use std::error::Error;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::endpoint::{ChatConfig, ModelEndpoint};
use crate::core::session::{ConversationSession, StreamUpdate};
use crate::core::topics::Topic;
use crate::ui::renderer::{ui, ChatView};
use crate::ui::shell::{ShellAction, ShellState, WHEEL_SCROLL_LINES};
use crate::ui::theme::Theme;

type ChatTerminal = Terminal<CrosstermBackend<Stdout>>;

const MAX_FPS: u64 = 60;

pub enum UiEvent {
    Crossterm(Event),
}

/// Startup choices for the interactive chat.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub markdown: bool,
    /// Topic asked about as soon as the screen is up.
    pub startup_topic: Option<&'static Topic>,
}

pub fn setup_terminal() -> Result<ChatTerminal, Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let terminal = Terminal::new(CrosstermBackend::new(stdout)).inspect_err(|_| {
        let _ = disable_raw_mode();
    })?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut ChatTerminal) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

/// Applies one shell action to the session, starting a background stream
/// when a send is accepted. Returns `true` when the user asked to quit.
pub fn apply_shell_action<E: ModelEndpoint>(
    action: ShellAction,
    session: &mut ConversationSession<E>,
    service: &ChatStreamService<E>,
) -> bool {
    match action {
        ShellAction::Quit => return true,
        ShellAction::Reset => session.reset(),
        ShellAction::Send(text) => start_send(session, service, &text),
        ShellAction::SendTopic(topic) => {
            info!(topic = topic.id, "topic selected");
            start_send(session, service, &topic.prompt());
        }
        ShellAction::Redraw | ShellAction::None => {}
    }
    false
}

fn start_send<E: ModelEndpoint>(
    session: &mut ConversationSession<E>,
    service: &ChatStreamService<E>,
    text: &str,
) {
    if let Some(request) = session.begin_send(text) {
        debug!(stream_id = request.stream_id, "starting reply stream");
        service.spawn_stream(request);
    }
}

/// Feeds every pending stream message into the session. Returns whether any
/// message changed what is on screen.
pub fn process_stream_updates<E: ModelEndpoint>(
    session: &mut ConversationSession<E>,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
) -> bool {
    let mut changed = false;
    while let Ok((message, stream_id)) = rx.try_recv() {
        match session.apply_stream_message(message, stream_id) {
            StreamUpdate::Stale => debug!(stream_id, "dropping message from stale stream"),
            StreamUpdate::Progress => changed = true,
            StreamUpdate::Finished(outcome) => {
                debug!(stream_id, ?outcome, "reply stream finished");
                changed = true;
            }
        }
    }
    changed
}

fn draw<E: ModelEndpoint>(
    terminal: &mut ChatTerminal,
    session: &ConversationSession<E>,
    shell: &mut ShellState,
    theme: &Theme,
) -> io::Result<()> {
    let view = ChatView {
        transcript: session.transcript(),
        streaming: session.streaming_text(),
        in_flight: session.is_in_flight(),
        model: &session.config().model,
    };
    terminal.draw(|f| ui(f, &view, shell, theme))?;
    Ok(())
}

pub async fn run_chat<E: ModelEndpoint>(
    endpoint: Arc<E>,
    chat_config: ChatConfig,
    options: ChatOptions,
) -> Result<(), Box<dyn Error>> {
    let mut session = ConversationSession::new(Arc::clone(&endpoint), chat_config);
    session.start();

    let (service, mut rx) = ChatStreamService::new(endpoint);
    let theme = Theme::dark_default();
    let mut shell = ShellState::new(options.markdown);

    if let Some(topic) = options.startup_topic {
        apply_shell_action(ShellAction::SendTopic(topic), &mut session, &service);
    }

    let mut terminal = setup_terminal()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);

    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;

    let result: Result<(), Box<dyn Error>> = 'main_loop: loop {
        if request_redraw && last_draw.elapsed() >= frame_duration {
            if let Err(err) = draw(&mut terminal, &session, &mut shell, &theme) {
                break 'main_loop Err(err.into());
            }
            last_draw = Instant::now();
            request_redraw = false;
        }

        let mut events_processed = false;
        while let Ok(UiEvent::Crossterm(ev)) = event_rx.try_recv() {
            events_processed = true;
            let action = match ev {
                Event::Key(key) => shell.handle_key(key, session.is_in_flight()),
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        shell.scroll_up(WHEEL_SCROLL_LINES);
                        ShellAction::Redraw
                    }
                    MouseEventKind::ScrollDown => {
                        shell.scroll_down(WHEEL_SCROLL_LINES);
                        ShellAction::Redraw
                    }
                    _ => ShellAction::None,
                },
                Event::Resize(_, _) => ShellAction::Redraw,
                _ => ShellAction::None,
            };
            if matches!(action, ShellAction::None) {
                continue;
            }
            request_redraw = true;
            if apply_shell_action(action, &mut session, &service) {
                break 'main_loop Ok(());
            }
        }

        let received_any = process_stream_updates(&mut session, &mut rx);
        if received_any {
            request_redraw = true;
        }

        // Keep the pulse indicator animating while a reply streams.
        if session.is_in_flight() {
            request_redraw = true;
        }

        let idle = !events_processed && !received_any && !request_redraw;
        if idle || session.is_in_flight() {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    };

    event_reader_handle.abort();
    session.dispose();
    restore_terminal(&mut terminal)?;
    result
}
