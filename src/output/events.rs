// Observer that forwards progress as events over a channel

use tokio::sync::mpsc;

use crate::observer::Observer;

/// Progress events, one per observer hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    ActionStarted,
    ActionFinished,
    CommandStarted { command: String },
    Output { chunk: String },
    CommandFinished,
}

/// Sends every hook call as an [`ExecutionEvent`].
///
/// Once the receiver is gone, start hooks fail, so a consumer that stops
/// listening also stops new work from being started.
#[derive(Clone)]
pub struct EventObserver {
    tx: mpsc::UnboundedSender<ExecutionEvent>,
}

impl EventObserver {
    pub fn new(tx: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
        EventObserver { tx }
    }

    fn send(&self, event: ExecutionEvent) -> anyhow::Result<()> {
        self.tx
            .send(event)
            .map_err(|_| anyhow::anyhow!("event receiver dropped"))
    }
}

impl Observer for EventObserver {
    fn on_action_start(&self) -> anyhow::Result<()> {
        self.send(ExecutionEvent::ActionStarted)
    }

    fn on_action_end(&self) -> anyhow::Result<()> {
        self.send(ExecutionEvent::ActionFinished)
    }

    fn on_execution_start(&self, command: &str) -> anyhow::Result<()> {
        self.send(ExecutionEvent::CommandStarted {
            command: command.to_string(),
        })
    }

    fn on_execution_output(&self, chunk: &str) -> anyhow::Result<()> {
        self.send(ExecutionEvent::Output {
            chunk: chunk.to_string(),
        })
    }

    fn on_execution_end(&self) -> anyhow::Result<()> {
        self.send(ExecutionEvent::CommandFinished)
    }
}

/// Create a new event channel
pub fn create_event_channel() -> (EventObserver, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventObserver::new(tx), rx)
}
