use tokio::sync::mpsc;

use crate::client::event::ClientEvent;
use crate::client::message::Command;
use crate::client::session::Session;
use crate::config::ClientConfig;
use crate::error::RequestError;

/// Owns the session and processes queued requests one at a time
pub(crate) struct ClientTask {
    config: ClientConfig,
    rx: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl ClientTask {
    pub(crate) fn new(
        config: ClientConfig,
        rx: mpsc::Receiver<Command>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        Self { config, rx, events }
    }

    /// Connect once, then serve requests until every channel handle is dropped
    pub(crate) async fn run(self) {
        let session = match Session::connect(self.config).await {
            Ok(session) => {
                self.notify(ClientEvent::Connected(self.config.target));
                Some(session)
            }
            Err(err) => {
                tracing::warn!("failed to connect to {}: {}", self.config.target, err);
                self.notify(ClientEvent::Error(format!(
                    "failed to connect to {}: {}",
                    self.config.target, err
                )));
                None
            }
        };

        self.run_with(session).await
    }

    pub(crate) async fn run_with(mut self, mut session: Option<Session>) {
        while let Some(cmd) = self.rx.recv().await {
            let result = match session.as_mut() {
                Some(session) => session.execute(&cmd.request).await,
                None => Err(RequestError::NoConnection),
            };

            // a write may succeed even though its echo read broke the stream
            if let Some(err) = session.as_ref().and_then(Session::fault) {
                tracing::warn!("ending session: {}", err);
                session = None;
            }

            match &result {
                Ok(update) => self.notify(ClientEvent::Update(update.clone())),
                Err(err) => self.notify(ClientEvent::Error(err.to_string())),
            }

            cmd.promise.complete(result);
        }

        tracing::info!("client task shut down");
    }

    fn notify(&self, event: ClientEvent) {
        // nobody listening for events is not an error
        self.events.send(event).ok();
    }
}
