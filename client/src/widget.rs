//! Chat widget runtime: one task that owns the controller.
//!
//! DESIGN
//! ======
//! User commands and transport events are funneled into a single
//! `tokio::select!` loop, so the controller sees exactly one input at a
//! time. After an input that changed what is shown, the task publishes a
//! fresh [`ChatView`] on a `watch` channel; front-ends render from that
//! snapshot and never touch the controller directly. Dropping or shutting
//! down the handle closes the widget and tears down its transport.

#[cfg(test)]
#[path = "widget_test.rs"]
mod widget_test;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::controller::{ChatController, ChatView};
use crate::error::{ChatError, ValidationError};
use crate::net::transport::Transport;

type Reply = oneshot::Sender<Result<(), ValidationError>>;

enum WidgetCommand {
    Open,
    Close,
    Join { room: String, display_name: String, reply: Reply },
    Send { body: String, reply: Reply },
    RequestSignalUpdate { asset: String, timeframe: String, reply: Reply },
}

/// Handle to a running chat widget.
pub struct ChatWidget {
    commands: mpsc::UnboundedSender<WidgetCommand>,
    view: watch::Receiver<ChatView>,
    task: JoinHandle<()>,
}

impl ChatWidget {
    /// Move `controller` into a new runtime task. Must be called from within
    /// a tokio runtime.
    pub fn spawn<T>(controller: ChatController<T>) -> Self
    where
        T: Transport + Send + 'static,
    {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(controller.view());
        let task = tokio::spawn(run_widget(controller, commands_rx, view_tx));
        Self { commands, view, task }
    }

    /// Open the widget and start connecting.
    ///
    /// # Errors
    ///
    /// [`ChatError::Stopped`] when the runtime task is gone.
    pub fn open(&self) -> Result<(), ChatError> {
        self.command(WidgetCommand::Open)
    }

    /// Close the widget and clear its log.
    ///
    /// # Errors
    ///
    /// [`ChatError::Stopped`] when the runtime task is gone.
    pub fn close(&self) -> Result<(), ChatError> {
        self.command(WidgetCommand::Close)
    }

    /// # Errors
    ///
    /// The controller's validation error, or [`ChatError::Stopped`].
    pub async fn join(&self, room: &str, display_name: &str) -> Result<(), ChatError> {
        let (reply, rx) = oneshot::channel();
        self.command(WidgetCommand::Join {
            room: room.to_owned(),
            display_name: display_name.to_owned(),
            reply,
        })?;
        Self::await_reply(rx).await
    }

    /// # Errors
    ///
    /// The controller's validation error, or [`ChatError::Stopped`].
    pub async fn send(&self, body: &str) -> Result<(), ChatError> {
        let (reply, rx) = oneshot::channel();
        self.command(WidgetCommand::Send { body: body.to_owned(), reply })?;
        Self::await_reply(rx).await
    }

    /// # Errors
    ///
    /// The controller's validation error, or [`ChatError::Stopped`].
    pub async fn request_signal_update(&self, asset: &str, timeframe: &str) -> Result<(), ChatError> {
        let (reply, rx) = oneshot::channel();
        self.command(WidgetCommand::RequestSignalUpdate {
            asset: asset.to_owned(),
            timeframe: timeframe.to_owned(),
            reply,
        })?;
        Self::await_reply(rx).await
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn view(&self) -> ChatView {
        self.view.borrow().clone()
    }

    /// A receiver that is notified whenever the snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatView> {
        self.view.clone()
    }

    /// Close the widget and wait for the runtime task to finish.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            debug!(error = %e, "chat: widget task ended abnormally");
        }
    }

    fn command(&self, command: WidgetCommand) -> Result<(), ChatError> {
        self.commands.send(command).map_err(|_| ChatError::Stopped)
    }

    async fn await_reply(rx: oneshot::Receiver<Result<(), ValidationError>>) -> Result<(), ChatError> {
        rx.await.map_err(|_| ChatError::Stopped)?.map_err(ChatError::from)
    }
}

async fn run_widget<T: Transport>(
    mut controller: ChatController<T>,
    mut commands: mpsc::UnboundedReceiver<WidgetCommand>,
    view: watch::Sender<ChatView>,
) {
    let mut published = controller.view_key();
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                apply(&mut controller, command);
            }
            event = controller.next_event() => controller.handle_event(event),
        }

        let key = controller.view_key();
        if key != published {
            published = key;
            view.send_replace(controller.view());
        }
    }

    controller.close();
    view.send_replace(controller.view());
    debug!("chat: widget task stopped");
}

fn apply<T: Transport>(controller: &mut ChatController<T>, command: WidgetCommand) {
    match command {
        WidgetCommand::Open => controller.open(),
        WidgetCommand::Close => controller.close(),
        WidgetCommand::Join { room, display_name, reply } => {
            let _ = reply.send(controller.join(&room, &display_name));
        }
        WidgetCommand::Send { body, reply } => {
            let _ = reply.send(controller.send(&body));
        }
        WidgetCommand::RequestSignalUpdate { asset, timeframe, reply } => {
            let _ = reply.send(controller.request_signal_update(&asset, &timeframe));
        }
    }
}
