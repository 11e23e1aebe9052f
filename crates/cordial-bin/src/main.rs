//! Cordial entrypoint: terminal bootstrap, event sources, and the single
//! cooperative event loop that owns all state mutation.

mod app;
mod theme;

use anyhow::Result;
use app::App;
use clap::Parser;
use core_events::{
    BlinkEventSource, EVENT_CHANNEL_CAP, Event, EventSourceRegistry, InputEvent, MouseButton,
    MouseEventKind, TickEventSource,
};
use core_input::{
    AssistTriggers, EscapeResolver, InputDispatcher, Keymap, spawn_input_task,
};
use core_render::{ColorRegistry, Damage, RedrawScheduler, Renderer, WindowId};
use core_terminal::{CrosstermBackend, TerminalBackend, TerminalGuard};
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Once;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "cordial", version, about = "Cordial chat client")]
struct Args {
    /// Configuration file path (overrides discovery of `cordial.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(".", "cordial.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        // Subscriber already installed (tests); drop the guard.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    let args = Args::parse();
    let cfg = core_config::load(&args.config.unwrap_or_else(core_config::discover))?;

    let mut registry = ColorRegistry::new();
    let theme = theme::build(&mut registry, &cfg.theme);

    let mut backend = CrosstermBackend::new();
    backend.set_title("cordial")?;
    let term = backend.enter_guard()?;
    let (cols, rows) = term.dimensions()?;

    let mut renderer = Renderer::new(registry, theme.render, cols, rows);
    renderer.set_members_visible(cfg.display.members);

    let mut app = App::new(theme.palette, &cfg);
    let triggers = AssistTriggers {
        channel: cfg.assist.channel,
        user: cfg.assist.user,
        emoji: cfg.assist.emoji,
        sticker: cfg.assist.sticker,
        command: cfg.assist.command,
    };
    let mut dispatcher = InputDispatcher::new(
        Keymap::standard(),
        triggers,
        Duration::from_millis(cfg.timing.chord_timeout_ms),
    );
    let mut esc = EscapeResolver::new(Duration::from_millis(cfg.timing.escape_timeout_ms));
    let mut scheduler = RedrawScheduler::new(Duration::from_millis(cfg.timing.coalesce_ms));

    let (tx, rx) = tokio::sync::mpsc::channel(EVENT_CHANNEL_CAP);
    let mut sources = EventSourceRegistry::new();
    sources.register(TickEventSource::new(Duration::from_secs(cfg.timing.tick_secs)));
    sources.register(BlinkEventSource::new(Duration::from_millis(cfg.timing.blink_ms)));
    let mut handles = sources.spawn_all(&tx);
    let (input_handle, input_shutdown) = spawn_input_task(tx.clone());
    handles.push(input_handle);

    info!(target: "runtime", cols, rows, "startup complete");
    scheduler.mark_full();
    schedule_flush(&mut scheduler, &tx);

    run_loop(
        rx,
        &tx,
        &mut app,
        &mut dispatcher,
        &mut esc,
        &mut scheduler,
        &mut renderer,
        &term,
    )
    .await;

    input_shutdown.signal();
    drop(tx);
    for h in handles {
        let _ = h.await;
    }
    info!(target: "runtime", "shutdown complete");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    mut rx: Receiver<Event>,
    tx: &Sender<Event>,
    app: &mut App,
    dispatcher: &mut InputDispatcher,
    esc: &mut EscapeResolver,
    scheduler: &mut RedrawScheduler,
    renderer: &mut Renderer,
    term: &TerminalGuard<'_>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::Input(input) => {
                handle_input(input, tx, app, dispatcher, esc, scheduler, renderer);
                schedule_flush(scheduler, tx);
            }
            Event::BlinkTick => {
                app.cursor_visible = !app.cursor_visible;
                scheduler.mark_cursor();
                schedule_flush(scheduler, tx);
            }
            Event::EscapeTimeout => {
                if let Some(press) = esc.poll(Instant::now()) {
                    dispatch_press(press, app, dispatcher, scheduler, renderer);
                    schedule_flush(scheduler, tx);
                }
            }
            Event::Tick => {
                // Relative timestamps drift; refresh the chat window.
                scheduler.mark_window(WindowId::Chat);
                schedule_flush(scheduler, tx);
            }
            Event::RedrawRequested => schedule_flush(scheduler, tx),
            Event::RedrawDue => flush_frame(app, dispatcher, scheduler, renderer, term),
            Event::Shutdown => break,
        }
        if app.quit {
            break;
        }
    }
}

/// Arms the coalescing timer; the spawned task delivers `RedrawDue` at the
/// deadline so bursts collapse into one flush.
fn schedule_flush(scheduler: &mut RedrawScheduler, tx: &Sender<Event>) {
    if let Some(deadline) = scheduler.request(Instant::now()) {
        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline.into()).await;
            let _ = tx.send(Event::RedrawDue).await;
        });
    }
}

fn handle_input(
    input: InputEvent,
    tx: &Sender<Event>,
    app: &mut App,
    dispatcher: &mut InputDispatcher,
    esc: &mut EscapeResolver,
    scheduler: &mut RedrawScheduler,
    renderer: &mut Renderer,
) {
    match input {
        InputEvent::Key(raw) => {
            let now = Instant::now();
            for press in esc.feed(raw, now) {
                dispatch_press(press, app, dispatcher, scheduler, renderer);
            }
            if let Some(deadline) = esc.deadline() {
                let tx = tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep_until(deadline.into()).await;
                    let _ = tx.send(Event::EscapeTimeout).await;
                });
            }
        }
        InputEvent::Mouse(ev) => handle_mouse(ev, app, dispatcher, scheduler, renderer),
        InputEvent::Resize(w, h) => {
            renderer.resize(w, h);
            scheduler.mark_full();
        }
        InputEvent::PasteStart => dispatcher.paste_start(),
        InputEvent::PasteChunk(data) => {
            dispatcher.paste_chunk(&data);
            scheduler.mark_window(WindowId::Input);
        }
        InputEvent::PasteEnd => {
            dispatcher.paste_end();
            app.refresh_assist(dispatcher);
            scheduler.mark_window(WindowId::Input);
        }
        InputEvent::FocusGained => {
            app.cursor_visible = true;
            scheduler.mark_cursor();
        }
        InputEvent::FocusLost => {
            app.cursor_visible = false;
            scheduler.mark_cursor();
        }
    }
}

fn dispatch_press(
    press: core_events::KeyPress,
    app: &mut App,
    dispatcher: &mut InputDispatcher,
    scheduler: &mut RedrawScheduler,
    renderer: &mut Renderer,
) {
    match dispatcher.handle_key(press, Instant::now()) {
        Some(action) => {
            app.apply_action(action, dispatcher, renderer);
            // Actions can touch any window; repaint everything.
            scheduler.mark_full();
        }
        None => scheduler.mark_window(WindowId::Input),
    }
    app.refresh_assist(dispatcher);
}

fn handle_mouse(
    ev: core_events::MouseEvent,
    app: &mut App,
    dispatcher: &mut InputDispatcher,
    scheduler: &mut RedrawScheduler,
    renderer: &mut Renderer,
) {
    let Some(window) = renderer.layout.window_at(ev.column, ev.row) else {
        return;
    };
    let chat_height = renderer.layout.chat.height as usize;
    match (window, ev.kind) {
        (WindowId::Chat, MouseEventKind::ScrollUp) => {
            app.chat_scroll.scroll_up(3, app.chat.lines.len(), chat_height);
            scheduler.mark_window(WindowId::Chat);
        }
        (WindowId::Chat, MouseEventKind::ScrollDown) => {
            app.chat_scroll.scroll_down(3);
            scheduler.mark_window(WindowId::Chat);
        }
        (WindowId::Chat, MouseEventKind::Down(MouseButton::Left)) => {
            if let Some(line) = app.chat_line_at_row(renderer, ev.row) {
                app.reveal_spoilers_at(line);
                scheduler.mark_window(WindowId::Chat);
            }
        }
        (WindowId::Tree, MouseEventKind::ScrollUp) => {
            app.tree_cursor.move_up(1);
            scheduler.mark_window(WindowId::Tree);
        }
        (WindowId::Tree, MouseEventKind::ScrollDown) => {
            app.tree_cursor.move_down(1, app.tree.visible_len());
            scheduler.mark_window(WindowId::Tree);
        }
        (WindowId::Tree, MouseEventKind::Down(MouseButton::Left)) => {
            let row = (ev.row - renderer.layout.tree.y) as usize;
            let idx = app.tree_cursor.scroll + row;
            if idx < app.tree.visible_len() {
                app.tree_cursor.selected = idx;
                app.apply_action(core_input::Action::OpenSelected, dispatcher, renderer);
                scheduler.mark_full();
            }
        }
        _ => {}
    }
}

/// Rebuilds whatever the merged damage says is stale and paints one frame.
/// A paint failure (window shrank mid-draw) recovers by re-reading the
/// terminal size and repainting once.
fn flush_frame(
    app: &mut App,
    dispatcher: &InputDispatcher,
    scheduler: &mut RedrawScheduler,
    renderer: &mut Renderer,
    term: &TerminalGuard<'_>,
) {
    let damage = scheduler.consume();
    let (rebuild_chat, rebuild_tree) = match &damage {
        Damage::Full => (true, true),
        Damage::Windows(ws) => (
            ws.contains(&WindowId::Chat),
            ws.contains(&WindowId::Tree),
        ),
        Damage::CursorOnly => (false, false),
    };
    if rebuild_chat {
        app.rebuild_chat(renderer.layout.chat.width as usize);
    }
    if rebuild_tree {
        app.rebuild_tree(renderer.layout.tree.width as usize);
        app.tree_cursor
            .ensure_visible(app.tree.visible_len(), renderer.layout.tree.height as usize);
    }

    if paint(app, dispatcher, renderer).is_err() {
        // Shrinking window mid-draw: re-read dimensions and repaint.
        warn!(target: "render.flush", "paint failed, forcing resize recovery");
        if let Ok((w, h)) = term.dimensions() {
            renderer.resize(w, h);
        }
        app.rebuild_chat(renderer.layout.chat.width as usize);
        app.rebuild_tree(renderer.layout.tree.width as usize);
        if let Err(e) = paint(app, dispatcher, renderer) {
            error!(target: "render.flush", error = %e, "recovery paint failed");
        }
    }
}

fn paint(app: &App, dispatcher: &InputDispatcher, renderer: &mut Renderer) -> Result<()> {
    let members = renderer.members_visible().then(|| app.member_names());
    let title = app.title_line();
    let status = app.status_line();
    let frame = app.frame(dispatcher, members.as_deref(), &title, &status);
    renderer.draw_to(&mut stdout(), &frame)?;
    Ok(())
}
