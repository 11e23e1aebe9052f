use crate::translate::{map_key_event, map_mouse_event};
use core_events::{CHANNEL_SEND_FAILURES, Event, InputEvent, KEYPRESS_TOTAL};
use crossterm::event::{Event as CEvent, EventStream};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, trace, warn};

/// Handle used to stop the input task before tearing down the terminal.
#[derive(Clone, Debug)]
pub struct InputShutdown {
    notify: Arc<Notify>,
}

impl InputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

/// Spawns the async input task reading crossterm's `EventStream` and
/// forwarding normalized events into the main channel. The task exits on
/// shutdown signal, channel close, or stream end.
pub fn spawn_input_task(tx: Sender<Event>) -> (JoinHandle<()>, InputShutdown) {
    let notify = Arc::new(Notify::new());
    let shutdown = InputShutdown {
        notify: notify.clone(),
    };
    let handle = tokio::spawn(async move {
        info!(target: "input.task", "input task started");
        let mut stream = EventStream::new();
        let reason = loop {
            let maybe = tokio::select! {
                biased;
                _ = notify.notified() => break "shutdown_signal",
                ev = stream.next() => ev,
            };
            let Some(result) = maybe else {
                break "stream_ended";
            };
            let event = match result {
                Ok(ev) => ev,
                Err(e) => {
                    warn!(target: "input.task", error = %e, "event stream error");
                    break "stream_error";
                }
            };
            if !forward(&tx, event).await {
                break "channel_closed";
            }
        };
        info!(target: "input.task", reason, "input task stopped");
    });
    (handle, shutdown)
}

/// Returns false when the channel has closed.
async fn forward(tx: &Sender<Event>, event: CEvent) -> bool {
    let mapped = match event {
        CEvent::Key(key) => {
            let Some(press) = map_key_event(&key) else {
                return true;
            };
            KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed);
            vec![InputEvent::Key(press)]
        }
        CEvent::Mouse(m) => {
            let Some(ev) = map_mouse_event(&m) else {
                return true;
            };
            vec![InputEvent::Mouse(ev)]
        }
        CEvent::Resize(w, h) => {
            trace!(target: "input.task", w, h, "resize");
            vec![InputEvent::Resize(w, h)]
        }
        CEvent::Paste(data) => {
            debug!(target: "input.paste", bytes = data.len(), "paste received");
            vec![
                InputEvent::PasteStart,
                InputEvent::PasteChunk(data),
                InputEvent::PasteEnd,
            ]
        }
        CEvent::FocusGained => vec![InputEvent::FocusGained],
        CEvent::FocusLost => vec![InputEvent::FocusLost],
    };
    for ev in mapped {
        if tx.send(Event::Input(ev)).await.is_err() {
            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            return false;
        }
    }
    true
}
