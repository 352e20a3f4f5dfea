use tokio::sync::{mpsc, oneshot};

use crate::client::event::{ClientEvent, EventReceiver};
use crate::client::message::{Command, Promise};
use crate::client::request::Request;
use crate::client::task::ClientTask;
use crate::config::ClientConfig;
use crate::error::RequestError;
use crate::types::{MaskWrite, Update};

/// Handle used to queue requests on a client task
///
/// Handles are cheap to clone. The task shuts down once every handle is dropped.
#[derive(Clone, Debug)]
pub struct Channel {
    tx: mpsc::Sender<Command>,
}

impl Channel {
    pub(crate) fn create_handle_and_task(
        config: ClientConfig,
        max_queued_requests: usize,
    ) -> (Self, EventReceiver, impl std::future::Future<Output = ()>) {
        let (tx, rx) = mpsc::channel(max_queued_requests);
        let (events_tx, events_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let task = ClientTask::new(config, rx, events_tx);
        (Channel { tx }, events_rx, task.run())
    }

    /// Queue a request and wait for its result
    ///
    /// The same result is also delivered as an event on the [`EventReceiver`].
    pub async fn execute(&self, request: Request) -> Result<Update, RequestError> {
        let (tx, rx) = oneshot::channel::<Result<Update, RequestError>>();
        self.tx.send(Command::new(request, Promise::new(tx))).await?;
        rx.await?
    }

    /// read coils
    pub async fn read_coils(&self, start: u16, quantity: u16) -> Result<Update, RequestError> {
        self.execute(Request::ReadCoils { start, quantity }).await
    }

    /// read discrete inputs
    pub async fn read_discrete_inputs(
        &self,
        start: u16,
        quantity: u16,
    ) -> Result<Update, RequestError> {
        self.execute(Request::ReadDiscreteInputs { start, quantity })
            .await
    }

    /// read holding registers
    pub async fn read_holding_registers(
        &self,
        start: u16,
        quantity: u16,
    ) -> Result<Update, RequestError> {
        self.execute(Request::ReadHoldingRegisters { start, quantity })
            .await
    }

    /// read input registers
    pub async fn read_input_registers(
        &self,
        start: u16,
        quantity: u16,
    ) -> Result<Update, RequestError> {
        self.execute(Request::ReadInputRegisters { start, quantity })
            .await
    }

    /// write a single coil
    pub async fn write_single_coil(&self, address: u16, value: bool) -> Result<Update, RequestError> {
        self.execute(Request::WriteSingleCoil { address, value })
            .await
    }

    /// write a single register
    pub async fn write_single_register(
        &self,
        address: u16,
        value: u16,
    ) -> Result<Update, RequestError> {
        self.execute(Request::WriteSingleRegister { address, value })
            .await
    }

    /// write multiple contiguous coils
    pub async fn write_multiple_coils(
        &self,
        start: u16,
        values: Vec<bool>,
    ) -> Result<Update, RequestError> {
        self.execute(Request::WriteMultipleCoils { start, values })
            .await
    }

    /// write multiple contiguous registers
    pub async fn write_multiple_registers(
        &self,
        start: u16,
        values: Vec<u16>,
    ) -> Result<Update, RequestError> {
        self.execute(Request::WriteMultipleRegisters { start, values })
            .await
    }

    /// apply an AND/OR mask to a holding register
    pub async fn mask_write_register(
        &self,
        address: u16,
        mask: MaskWrite,
    ) -> Result<Update, RequestError> {
        self.execute(Request::MaskWriteRegister { address, mask })
            .await
    }
}
