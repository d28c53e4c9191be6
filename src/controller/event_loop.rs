//! The single consumer of inbound events.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Controller;
use crate::config::defaults::EVENT_QUEUE_CAPACITY;
use crate::types::ControlEvent;

/// Producer side of the event queue, cloned into every HTTP handler.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ControlEvent>,
}

impl EventSender {
    /// Queue `event`, waiting for room. Returns false once the loop has gone.
    pub async fn send(&self, event: ControlEvent) -> bool {
        match self.tx.send(event).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                warn!(kind = event.kind(), "Event loop stopped, event dropped");
                false
            }
        }
    }
}

pub fn event_channel() -> (EventSender, mpsc::Receiver<ControlEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    (EventSender { tx }, rx)
}

/// Drain `events` in arrival order until cancelled or every sender is gone,
/// then cancel all pending timers.
pub async fn run_event_loop(
    controller: Controller,
    mut events: mpsc::Receiver<ControlEvent>,
    cancel: CancellationToken,
) {
    info!("[EventLoop] Task starting");
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("[EventLoop] Received shutdown signal");
                break;
            }
            event = events.recv() => match event {
                Some(event) => {
                    debug!(kind = event.kind(), "Dispatching event");
                    controller.dispatch(event);
                }
                None => {
                    info!("[EventLoop] All senders dropped");
                    break;
                }
            },
        }
    }
    controller.shutdown();
}
