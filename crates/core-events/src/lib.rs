//! Core event types and channel helpers shared by the Cordial runtime.
//!
//! The runtime is a single cooperative event loop: every producer (input
//! task, tick source, cursor blink source, redraw scheduler) pushes into one
//! bounded mpsc channel and the loop in `cordial-bin` drains it. Bounded
//! capacity gives natural backpressure from the single consumer; producers
//! stop promptly when the channel closes.

use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Capacity of the main event channel. Input bursts (key auto-repeat, mouse
/// drag, paste chunks) stay far below this; the bound exists to cap memory if
/// the consumer stalls mid-draw.
pub const EVENT_CHANNEL_CAP: usize = 4096;

// Telemetry counters (relaxed atomics, inspected by tests and periodic logs).
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static KEYPRESS_TOTAL: AtomicU64 = AtomicU64::new(0);
pub static REDRAW_REQUESTS: AtomicU64 = AtomicU64::new(0);
pub static REDRAW_FLUSHES: AtomicU64 = AtomicU64::new(0);

/// Top-level event consumed by the central loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    /// A component invalidated state; the redraw scheduler decides when the
    /// physical flush happens.
    RedrawRequested,
    /// Coalescing delay elapsed; perform the physical flush now.
    RedrawDue,
    /// Cursor blink phase toggle.
    BlinkTick,
    /// A pending bare-Escape press outlived its ALT-fold window and must be
    /// flushed to the dispatcher.
    EscapeTimeout,
    /// Periodic monotonic tick driving relative-timestamp refresh and other
    /// low-rate maintenance.
    Tick,
    Shutdown,
}

/// Normalized input events produced by the async input task.
#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(KeyPress),
    Mouse(MouseEvent),
    /// Terminal resize (columns, rows). Applied on the next lock acquisition
    /// by the renderer, never dropped.
    Resize(u16, u16),
    PasteStart,
    /// Chunk of a bracketed paste. Never logged verbatim; instrument with
    /// lengths only.
    PasteChunk(String),
    PasteEnd,
    FocusGained,
    FocusLost,
}

/// A logical key press after escape-sequence resolution. ALT-prefixed
/// sequences arrive as a single press with `mods.ALT` set; partial escape
/// bytes never surface here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub token: KeyToken,
    pub mods: ModMask,
}

impl KeyPress {
    pub fn new(token: KeyToken, mods: ModMask) -> Self {
        Self { token, mods }
    }

    pub fn plain(token: KeyToken) -> Self {
        Self::new(token, ModMask::empty())
    }
}

/// Canonical logical key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ModMask: u8 {
        const CTRL  = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const SHIFT = 0b0000_0100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub column: u16,
    pub row: u16,
    pub mods: ModMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    Drag(MouseButton),
    ScrollUp,
    ScrollDown,
    Moved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Trait implemented by async event producers. Each source spawns one
/// background task that pushes `Event`s into the shared channel and exits
/// when the channel closes.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources spawned once at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn all registered sources, returning their JoinHandles. Sources are
    /// drained so a second call spawns nothing. During shutdown the caller
    /// drops its last `Sender` clone before awaiting the handles so sources
    /// observe the closed channel and exit cooperatively.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            tracing::info!(target: "runtime.events", source = src.name(), "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Emits `Event::Tick` on a fixed interval.
pub struct TickEventSource {
    interval: Duration,
}

impl TickEventSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Emits `Event::BlinkTick` on the cursor blink period.
pub struct BlinkEventSource {
    period: Duration,
}

impl BlinkEventSource {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl AsyncEventSource for BlinkEventSource {
    fn name(&self) -> &'static str {
        "cursor-blink"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.period;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::BlinkTick).await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn mod_mask_combines() {
        let m = ModMask::CTRL | ModMask::ALT;
        assert!(m.contains(ModMask::CTRL));
        assert!(m.contains(ModMask::ALT));
        assert!(!m.contains(ModMask::SHIFT));
    }

    #[tokio::test]
    async fn tick_source_emits_and_exits_on_close() {
        let (tx, mut rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        reg.register(TickEventSource::new(Duration::from_millis(5)));
        let handles = reg.spawn_all(&tx);

        let ev = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("tick within deadline")
            .expect("channel open");
        assert!(matches!(ev, Event::Tick));

        drop(tx);
        drop(rx);
        for h in handles {
            let _ = tokio::time::timeout(Duration::from_millis(100), h).await;
        }
    }

    #[tokio::test]
    async fn blink_source_emits_blink_ticks() {
        let (tx, mut rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        reg.register(BlinkEventSource::new(Duration::from_millis(5)));
        let _handles = reg.spawn_all(&tx);
        let ev = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("blink within deadline")
            .expect("channel open");
        assert!(matches!(ev, Event::BlinkTick));
    }

    #[test]
    fn registry_spawn_all_drains() {
        let mut reg = EventSourceRegistry::new();
        reg.register(TickEventSource::new(Duration::from_secs(1)));
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let (tx, _rx) = mpsc::channel::<Event>(1);
            let first = reg.spawn_all(&tx);
            assert_eq!(first.len(), 1);
            let second = reg.spawn_all(&tx);
            assert!(second.is_empty(), "second spawn must be a no-op");
        });
    }
}
