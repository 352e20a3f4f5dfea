use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::client::decoder::{decode, Decoded};
use crate::client::request::{Request, RequestContext, RequestDisplay};
use crate::client::validator::validate;
use crate::common::frame::{FrameWriter, FramedReader, TxId, TxIdSource};
use crate::common::pdu::Pdu;
use crate::common::phys::PhysLayer;
use crate::config::ClientConfig;
use crate::constants::DEFAULT_UNIT_ID;
use crate::error::RequestError;
use crate::types::{MaskWrite, Update};

/// Conditions that leave the stream unable to carry further exchanges
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SessionError {
    /// the stream errors
    IoError(std::io::ErrorKind),
    /// unrecoverable framing issue
    BadFrame,
    /// a reply may still arrive for an abandoned transaction
    ResponseTimeout,
}

impl SessionError {
    pub(crate) fn from_request_err(err: RequestError) -> Option<Self> {
        match err {
            RequestError::Io(x) => Some(SessionError::IoError(x)),
            RequestError::BadFrame(_) => Some(SessionError::BadFrame),
            RequestError::ResponseTimeout => Some(SessionError::ResponseTimeout),
            // the reply was read in full, so the stream is still aligned
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionError::IoError(err) => write!(f, "I/O error: {err}"),
            SessionError::BadFrame => f.write_str("parser encountered a bad frame"),
            SessionError::ResponseTimeout => {
                f.write_str("response timeout, a late reply would be taken for the next one")
            }
        }
    }
}

/// A single connection to a Modbus server
///
/// Every exchange takes `&mut self`, so at most one request is ever in flight.
/// Transaction ids are drawn from a generator owned by the session.
///
/// An I/O error, an unparseable header or a response timeout leaves the stream
/// in an unknown position. After any of these the session refuses further
/// requests with [`RequestError::NoConnection`].
pub struct Session {
    phys: PhysLayer,
    writer: FrameWriter,
    reader: FramedReader,
    tx_ids: TxIdSource,
    config: ClientConfig,
    fault: Option<SessionError>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish()
    }
}

impl Session {
    /// Connect to `config.target`, giving up after `config.response_timeout`
    pub async fn connect(config: ClientConfig) -> Result<Self, RequestError> {
        let stream =
            tokio::time::timeout(config.response_timeout, TcpStream::connect(config.target))
                .await??;
        tracing::info!("connected to: {}", config.target);
        Ok(Self::from_stream(stream, config))
    }

    /// Run the protocol over an already established stream
    pub fn from_stream<T>(io: T, config: ClientConfig) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            phys: PhysLayer::new(io),
            writer: FrameWriter::new(),
            reader: FramedReader::new(),
            tx_ids: TxIdSource::new(),
            config,
            fault: None,
        }
    }

    /// configuration this session was created with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// false once a failure has left the stream unusable
    pub fn is_connected(&self) -> bool {
        self.fault.is_none()
    }

    pub(crate) fn fault(&self) -> Option<SessionError> {
        self.fault
    }

    /// Perform one request and return the decoded update
    ///
    /// Multiple and mask writes report [`crate::Payload::Acknowledged`] unless
    /// `echo_writes` is enabled, in which case the written range is read back
    /// and those values are returned. If the read-back fails, the write is
    /// still reported as acknowledged, but a stream failure during the
    /// read-back still disconnects the session.
    pub async fn execute(&mut self, request: &Request) -> Result<Update, RequestError> {
        let result = self.execute_with_echo(request).await;
        if let Err(err) = &result {
            tracing::warn!("request error: {}", err);
        }
        result
    }

    async fn execute_with_echo(&mut self, request: &Request) -> Result<Update, RequestError> {
        let range = match self.exchange(request).await? {
            Decoded::Update(update) => return Ok(update),
            Decoded::Written(range) => range,
        };

        if self.config.echo_writes {
            if let Some(read) = request.echo_read() {
                match self.exchange(&read).await {
                    Ok(Decoded::Update(update)) => return Ok(update),
                    Ok(Decoded::Written(_)) => {}
                    Err(err) => {
                        tracing::warn!(
                            "echo read after {} failed, reporting write only: {}",
                            request.function(),
                            err
                        );
                    }
                }
            }
        }

        Ok(Update::acknowledged(
            request.function().data_type(),
            range.start,
        ))
    }

    async fn exchange(&mut self, request: &Request) -> Result<Decoded, RequestError> {
        if self.fault.is_some() {
            return Err(RequestError::NoConnection);
        }

        // the guard runs here, before a transaction id is drawn or anything is sent
        let (pdu, ctx) = request.encode()?;
        let tx_id = self.tx_ids.next();
        let result = self
            .transact(request, &pdu, &ctx, tx_id)
            .instrument(tracing::info_span!("Transaction", tx_id = %tx_id))
            .await;

        if let Err(err) = &result {
            if let Some(fault) = SessionError::from_request_err(*err) {
                tracing::warn!("stream no longer usable: {}", fault);
                self.fault = Some(fault);
            }
        }

        result
    }

    async fn transact(
        &mut self,
        request: &Request,
        pdu: &Pdu,
        ctx: &RequestContext,
        tx_id: TxId,
    ) -> Result<Decoded, RequestError> {
        let level = self.config.decode;

        if level.pdu.enabled() {
            tracing::info!("PDU TX - {}", RequestDisplay::new(level.pdu, request));
        }

        self.reader.reset();
        let adu = self
            .writer
            .format(tx_id, DEFAULT_UNIT_ID, pdu.as_slice(), level)?;
        self.phys.write(adu, level.physical).await?;

        let frame = tokio::time::timeout(
            self.config.response_timeout,
            self.reader.next_frame(&mut self.phys, level),
        )
        .await??;

        let response = validate(adu, &frame)?;
        decode(ctx, response, level.pdu)
    }

    /// read coils
    pub async fn read_coils(&mut self, start: u16, quantity: u16) -> Result<Update, RequestError> {
        self.execute(&Request::ReadCoils { start, quantity }).await
    }

    /// read discrete inputs
    pub async fn read_discrete_inputs(
        &mut self,
        start: u16,
        quantity: u16,
    ) -> Result<Update, RequestError> {
        self.execute(&Request::ReadDiscreteInputs { start, quantity })
            .await
    }

    /// read holding registers
    pub async fn read_holding_registers(
        &mut self,
        start: u16,
        quantity: u16,
    ) -> Result<Update, RequestError> {
        self.execute(&Request::ReadHoldingRegisters { start, quantity })
            .await
    }

    /// read input registers
    pub async fn read_input_registers(
        &mut self,
        start: u16,
        quantity: u16,
    ) -> Result<Update, RequestError> {
        self.execute(&Request::ReadInputRegisters { start, quantity })
            .await
    }

    /// write a single coil
    pub async fn write_single_coil(
        &mut self,
        address: u16,
        value: bool,
    ) -> Result<Update, RequestError> {
        self.execute(&Request::WriteSingleCoil { address, value })
            .await
    }

    /// write a single register
    pub async fn write_single_register(
        &mut self,
        address: u16,
        value: u16,
    ) -> Result<Update, RequestError> {
        self.execute(&Request::WriteSingleRegister { address, value })
            .await
    }

    /// write multiple contiguous coils
    pub async fn write_multiple_coils(
        &mut self,
        start: u16,
        values: Vec<bool>,
    ) -> Result<Update, RequestError> {
        self.execute(&Request::WriteMultipleCoils { start, values })
            .await
    }

    /// write multiple contiguous registers
    pub async fn write_multiple_registers(
        &mut self,
        start: u16,
        values: Vec<u16>,
    ) -> Result<Update, RequestError> {
        self.execute(&Request::WriteMultipleRegisters { start, values })
            .await
    }

    /// apply an AND/OR mask to a holding register
    pub async fn mask_write_register(
        &mut self,
        address: u16,
        mask: MaskWrite,
    ) -> Result<Update, RequestError> {
        self.execute(&Request::MaskWriteRegister { address, mask })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use super::*;
    use crate::error::{AduParseError, InvalidRequest};
    use crate::exception::ExceptionCode;
    use crate::types::{DataType, Payload};

    type Log = Arc<Mutex<Vec<Vec<u8>>>>;

    fn adu(tx_id: u16, pdu: &[u8]) -> Vec<u8> {
        let mut bytes = tx_id.to_be_bytes().to_vec();
        bytes.extend([0x00, 0x00]);
        bytes.extend((pdu.len() as u16 + 1).to_be_bytes());
        bytes.push(0xFF);
        bytes.extend(pdu);
        bytes
    }

    /// answers each request with whatever `respond` returns for (tx id, request PDU)
    async fn serve<F>(mut io: DuplexStream, log: Log, mut respond: F)
    where
        F: FnMut(u16, &[u8]) -> Option<Vec<u8>>,
    {
        loop {
            let mut header = [0u8; 7];
            if io.read_exact(&mut header).await.is_err() {
                return;
            }
            assert_eq!(&header[2..4], &[0x00, 0x00]);
            assert_eq!(header[6], 0xFF);
            let tx_id = u16::from_be_bytes([header[0], header[1]]);
            let length = u16::from_be_bytes([header[4], header[5]]) as usize;
            let mut pdu = vec![0; length - 1];
            if io.read_exact(&mut pdu).await.is_err() {
                return;
            }
            log.lock().unwrap().push(pdu.clone());
            if let Some(reply) = respond(tx_id, &pdu) {
                io.write_all(&reply).await.unwrap();
            }
        }
    }

    fn start<F>(config: ClientConfig, respond: F) -> (Session, Log)
    where
        F: FnMut(u16, &[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        let (client, server) = tokio::io::duplex(1024);
        let log = Log::default();
        tokio::spawn(serve(server, log.clone(), respond));
        (Session::from_stream(client, config), log)
    }

    fn fixed(pdu: &'static [u8]) -> impl FnMut(u16, &[u8]) -> Option<Vec<u8>> + Send {
        move |tx_id, _| Some(adu(tx_id, pdu))
    }

    #[tokio::test]
    async fn reads_holding_registers() {
        let (mut session, log) = start(
            ClientConfig::default(),
            fixed(&[0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B]),
        );
        let update = session.read_holding_registers(100, 2).await.unwrap();
        assert_eq!(update.data_type, DataType::HoldingRegister);
        assert_eq!(update.start, 100);
        assert_eq!(update.as_registers(), Some([10, 11].as_slice()));
        assert_eq!(log.lock().unwrap()[0], [0x03, 0x00, 0x64, 0x00, 0x02]);
    }

    #[tokio::test]
    async fn writes_single_coil() {
        let (mut session, log) = start(ClientConfig::default(), |tx_id, pdu| {
            Some(adu(tx_id, pdu))
        });
        let update = session.write_single_coil(5, true).await.unwrap();
        assert_eq!(update, Update::bits(DataType::Coil, 5, vec![true]));
        assert_eq!(log.lock().unwrap()[0], [0x05, 0x00, 0x05, 0xFF, 0x00]);
    }

    #[tokio::test]
    async fn rejects_mismatched_transaction_id() {
        let (mut session, _) = start(ClientConfig::default(), |tx_id, _| {
            Some(adu(tx_id.wrapping_add(1), &[0x03, 0x02, 0x00, 0x01]))
        });
        let err = session.read_holding_registers(0, 1).await.unwrap_err();
        assert!(matches!(err, RequestError::TransactionMismatch { .. }));
    }

    #[tokio::test]
    async fn surfaces_exception_responses() {
        let (mut session, _) = start(ClientConfig::default(), fixed(&[0x83, 0x02]));
        assert_eq!(
            session.read_holding_registers(0, 1).await,
            Err(RequestError::Exception(ExceptionCode::IllegalDataAddress))
        );
    }

    #[tokio::test]
    async fn acknowledges_multiple_write_without_echo() {
        let (mut session, log) = start(ClientConfig::default(), |tx_id, pdu| {
            Some(adu(tx_id, &pdu[0..5]))
        });
        let update = session
            .write_multiple_registers(10, vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(
            update,
            Update::acknowledged(DataType::HoldingRegister, 10)
        );
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn echo_reads_back_written_registers() {
        let config = ClientConfig::default().echo_writes(true);
        let (mut session, log) = start(config, |tx_id, pdu| match pdu[0] {
            0x10 => Some(adu(tx_id, &pdu[0..5])),
            0x03 => Some(adu(tx_id, &[0x03, 0x04, 0x00, 0x01, 0x00, 0x02])),
            _ => None,
        });
        let update = session.write_multiple_registers(10, vec![1, 2]).await.unwrap();
        assert_eq!(
            update,
            Update::registers(DataType::HoldingRegister, 10, vec![1, 2])
        );
        assert_eq!(log.lock().unwrap()[1], [0x03, 0x00, 0x0A, 0x00, 0x02]);
    }

    #[tokio::test]
    async fn echo_reads_back_written_coils() {
        let config = ClientConfig::default().echo_writes(true);
        let (mut session, _) = start(config, |tx_id, pdu| match pdu[0] {
            0x0F => Some(adu(tx_id, &pdu[0..5])),
            0x01 => Some(adu(tx_id, &[0x01, 0x01, 0x02])),
            _ => None,
        });
        let update = session
            .write_multiple_coils(0, vec![false, true])
            .await
            .unwrap();
        assert_eq!(update, Update::bits(DataType::Coil, 0, vec![false, true]));
    }

    #[tokio::test]
    async fn failed_echo_read_still_reports_the_write() {
        let config = ClientConfig::default().echo_writes(true);
        let (mut session, log) = start(config, |tx_id, pdu| match pdu[0] {
            0x16 => Some(adu(tx_id, pdu)),
            _ => Some(adu(tx_id, &[0x83, 0x04])),
        });
        let mask = MaskWrite {
            and_mask: 0xFF00,
            or_mask: 0x0001,
        };
        let update = session.mask_write_register(7, mask).await.unwrap();
        assert_eq!(update, Update::acknowledged(DataType::HoldingRegister, 7));
        assert_eq!(log.lock().unwrap()[1], [0x03, 0x00, 0x07, 0x00, 0x01]);
    }

    #[tokio::test]
    async fn guard_failure_performs_no_io() {
        // any write to this mock would panic
        let io = tokio_test::io::Builder::new().build();
        let mut session = Session::from_stream(io, ClientConfig::default());
        assert_eq!(
            session.read_coils(0xFFFF, 2).await,
            Err(RequestError::BadRequest(
                InvalidRequest::EndAddressOutOfRange {
                    start: 0xFFFF,
                    quantity: 2
                }
            ))
        );
        assert_eq!(
            session.write_multiple_coils(0, Vec::new()).await,
            Err(RequestError::BadRequest(InvalidRequest::LengthOutOfRange {
                quantity: 0,
                max: 1968
            }))
        );
    }

    #[tokio::test]
    async fn times_out_without_response() {
        let config = ClientConfig::default().response_timeout(Duration::from_millis(50));
        let (mut session, _) = start(config, |_, _| None);
        assert_eq!(
            session.read_input_registers(0, 1).await,
            Err(RequestError::ResponseTimeout)
        );
    }

    #[tokio::test]
    async fn late_reply_is_never_matched_to_the_next_request() {
        let config = ClientConfig::default().response_timeout(Duration::from_millis(100));
        let (client, mut server) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let mut delay = Some(Duration::from_millis(150));
            loop {
                let mut request = [0u8; 12];
                if server.read_exact(&mut request).await.is_err() {
                    return;
                }
                if let Some(delay) = delay.take() {
                    tokio::time::sleep(delay).await;
                }
                let reply = adu(
                    u16::from_be_bytes([request[0], request[1]]),
                    &[0x03, 0x02, 0x00, 0x01],
                );
                if server.write_all(&reply).await.is_err() {
                    return;
                }
            }
        });
        let mut session = Session::from_stream(client, config);

        assert_eq!(
            session.read_holding_registers(0, 1).await,
            Err(RequestError::ResponseTimeout)
        );
        assert!(!session.is_connected());
        tokio::time::sleep(Duration::from_millis(100)).await;
        for _ in 0..3 {
            assert_eq!(
                session.read_holding_registers(0, 1).await,
                Err(RequestError::NoConnection)
            );
        }
    }

    #[tokio::test]
    async fn echo_read_stream_failure_disconnects_after_the_ack() {
        let config = ClientConfig::default().echo_writes(true);
        let (client, mut server) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let mut request = [0u8; 17];
            server.read_exact(&mut request).await.unwrap();
            let tx_id = u16::from_be_bytes([request[0], request[1]]);
            server.write_all(&adu(tx_id, &request[7..12])).await.unwrap();
            // hang up instead of answering the read-back
            let mut read_back = [0u8; 12];
            server.read_exact(&mut read_back).await.ok();
        });
        let mut session = Session::from_stream(client, config);

        let update = session.write_multiple_registers(4, vec![1, 2]).await;
        assert_eq!(
            update,
            Ok(Update::acknowledged(DataType::HoldingRegister, 4))
        );
        assert!(!session.is_connected());
        assert_eq!(
            session.read_coils(0, 1).await,
            Err(RequestError::NoConnection)
        );
    }

    #[tokio::test]
    async fn exceptions_keep_the_session_connected() {
        let (mut session, log) = start(ClientConfig::default(), fixed(&[0x84, 0x03]));
        for _ in 0..2 {
            assert_eq!(
                session.read_input_registers(0, 1).await,
                Err(RequestError::Exception(ExceptionCode::IllegalDataValue))
            );
        }
        assert!(session.is_connected());
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn stream_failures_and_timeouts_end_the_session() {
        assert_eq!(
            SessionError::from_request_err(RequestError::Io(std::io::ErrorKind::BrokenPipe)),
            Some(SessionError::IoError(std::io::ErrorKind::BrokenPipe))
        );
        assert_eq!(
            SessionError::from_request_err(RequestError::ResponseTimeout),
            Some(SessionError::ResponseTimeout)
        );
        assert_eq!(
            SessionError::from_request_err(RequestError::TransactionMismatch {
                expected: 1,
                received: 2
            }),
            None
        );
        assert_eq!(
            SessionError::from_request_err(RequestError::Exception(ExceptionCode::Unknown(9))),
            None
        );
    }

    #[tokio::test]
    async fn reports_malformed_response() {
        let (mut session, _) = start(ClientConfig::default(), fixed(&[0x04, 0x04, 0x00, 0x01]));
        assert_eq!(
            session.read_input_registers(0, 2).await,
            Err(AduParseError::InsufficientBytes.into())
        );
    }

    #[tokio::test]
    async fn closed_stream_is_an_io_error() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut session = Session::from_stream(client, ClientConfig::default());
        assert!(matches!(
            session.read_coils(0, 1).await,
            Err(RequestError::Io(_))
        ));
    }

    #[tokio::test]
    async fn consecutive_requests_use_the_same_connection() {
        let (mut session, log) = start(ClientConfig::default(), |tx_id, pdu| match pdu[0] {
            0x06 => Some(adu(tx_id, pdu)),
            _ => Some(adu(tx_id, &[0x02, 0x01, 0x01])),
        });
        let first = session.write_single_register(3, 0xBEEF).await.unwrap();
        assert_eq!(first.payload, Payload::Registers(vec![0xBEEF]));
        let second = session.read_discrete_inputs(0, 1).await.unwrap();
        assert_eq!(second.as_bits(), Some([true].as_slice()));
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
