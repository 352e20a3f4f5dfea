use crate::client::channel::Channel;
use crate::client::event::EventReceiver;
use crate::config::ClientConfig;

/// handle for queuing requests on a client task
pub mod channel;
/// notifications emitted by the client task
pub mod event;
/// requests for each supported function code
pub mod request;
/// a single connection driven directly by the caller
pub mod session;

pub(crate) mod decoder;
pub(crate) mod guard;
pub(crate) mod message;
pub(crate) mod task;
pub(crate) mod validator;

/// Spawns a client task onto the runtime that connects to `config.target` and
/// processes requests from a queue of at most `max_queued_requests` entries.
///
/// Every request produces exactly one [`event::ClientEvent`], in the order the
/// requests were queued. The task completes when the returned [`Channel`] and
/// all of its clones are dropped.
pub fn spawn_client_task(
    config: ClientConfig,
    max_queued_requests: usize,
) -> (Channel, EventReceiver) {
    let (channel, events, task) = create_handle_and_task(config, max_queued_requests);
    tokio::spawn(task);
    (channel, events)
}

/// Creates a client task, but does not spawn it. Most users will prefer
/// [`spawn_client_task`], unless they need to spawn the task using a
/// `Runtime` handle instead of the `tokio::spawn` function.
pub fn create_handle_and_task(
    config: ClientConfig,
    max_queued_requests: usize,
) -> (Channel, EventReceiver, impl std::future::Future<Output = ()>) {
    Channel::create_handle_and_task(config, max_queued_requests)
}
