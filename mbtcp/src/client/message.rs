use tokio::sync::oneshot;

use crate::client::request::Request;
use crate::error::RequestError;
use crate::types::Update;

/// Completes the caller's future once the request has been processed
pub(crate) struct Promise {
    tx: oneshot::Sender<Result<Update, RequestError>>,
}

impl Promise {
    pub(crate) fn new(tx: oneshot::Sender<Result<Update, RequestError>>) -> Self {
        Self { tx }
    }

    pub(crate) fn complete(self, result: Result<Update, RequestError>) {
        // the caller may have stopped waiting
        self.tx.send(result).ok();
    }
}

/// Everything the client task needs to process one request
pub(crate) struct Command {
    pub(crate) request: Request,
    pub(crate) promise: Promise,
}

impl Command {
    pub(crate) fn new(request: Request, promise: Promise) -> Self {
        Self { request, promise }
    }
}
