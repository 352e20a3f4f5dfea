use crate::exception::ExceptionCode;

/// Top level error type for the client API
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// request parameters failed validation before anything was sent
    #[error("{0}")]
    BadRequest(#[from] InvalidRequest),
    /// response header carried a transaction id other than the one sent
    #[error("response transaction id {received:#06X} does not match request id {expected:#06X}")]
    TransactionMismatch {
        /// transaction id of the request
        expected: u16,
        /// transaction id of the response
        received: u16,
    },
    /// response header carried a non-zero protocol id
    #[error("received frame with non-Modbus protocol id: {0}")]
    NotModbus(u16),
    /// response function code is neither the request code nor its exception form
    #[error("response function code {received:#04X} does not match request function code {expected:#04X}")]
    FunctionCodeMismatch {
        /// function code of the request
        expected: u8,
        /// function code of the response
        received: u8,
    },
    /// server replied with an exception response
    #[error("Modbus exception: {0}")]
    Exception(ExceptionCode),
    /// response PDU could not be decoded
    #[error("{0}")]
    BadResponse(#[from] AduParseError),
    /// MBAP header could not be parsed off the stream
    #[error("{0}")]
    BadFrame(#[from] FrameParseError),
    /// stream returned an error or was closed
    #[error("I/O error: {0}")]
    Io(std::io::ErrorKind),
    /// no complete response arrived before the configured timeout
    #[error("timeout occurred before receiving a response from the server")]
    ResponseTimeout,
    /// no connection exists to the Modbus server
    #[error("no connection exists to the Modbus server")]
    NoConnection,
    /// the task processing requests has been shut down
    #[error("the task processing requests has been shut down")]
    Shutdown,
    /// logic error inside the library
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<tokio::time::error::Elapsed> for RequestError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RequestError::ResponseTimeout
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RequestError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RequestError::Shutdown
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for RequestError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        RequestError::Shutdown
    }
}

/// Errors raised by the address/length guard before any I/O occurs
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequest {
    /// start address exceeds the highest allowed start address
    #[error("start address out of range: {start} > {max}")]
    AddressOutOfRange {
        /// requested start address
        start: u16,
        /// highest allowed start address
        max: u16,
    },
    /// quantity is zero or exceeds the per-function maximum
    #[error("length out of range: {quantity} is not within [1, {max}]")]
    LengthOutOfRange {
        /// requested quantity
        quantity: u16,
        /// maximum quantity for the function
        max: u16,
    },
    /// last addressed value lies beyond the address space
    #[error("end address out of range: start == {start} and quantity == {quantity}")]
    EndAddressOutOfRange {
        /// requested start address
        start: u16,
        /// requested quantity
        quantity: u16,
    },
    /// number of values to write cannot be represented as a u16 quantity
    #[error("the requested count of objects exceeds the maximum value of u16: {0}")]
    CountTooBigForU16(usize),
}

/// Errors that occur while parsing a response PDU
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AduParseError {
    /// response is too short to be valid
    #[error("response is too short to be valid")]
    InsufficientBytes,
    /// byte count doesn't match what is expected based on request
    #[error("byte count ({1}) doesn't match what is expected based on request ({0})")]
    RequestByteCountMismatch(usize, usize),
    /// response contains extra trailing bytes
    #[error("response contains {0} extra trailing bytes")]
    TrailingBytes(usize),
    /// a parameter expected to be echoed in the reply did not match
    #[error("a parameter expected to be echoed in the reply did not match")]
    ReplyEchoMismatch,
    /// bad value for the coil state
    #[error("received coil state with unspecified value: {0:#06X}")]
    UnknownCoilState(u16),
}

/// Errors that occur while parsing an MBAP header off the stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameParseError {
    /// received frame with the length field set to zero
    #[error("received TCP frame with the length field set to zero")]
    MbapLengthZero,
    /// received frame with a length that exceeds the maximum ADU size
    #[error("received TCP frame with length ({0}) that exceeds max allowed size ({1})")]
    MbapLengthTooBig(usize, usize),
}

/// Errors that indicate a bug in the library itself
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    /// attempted to write more bytes than allowed
    #[error("attempted to write {0} bytes with {1} bytes remaining")]
    InsufficientWriteSpace(usize, usize),
    /// the calculated PDU size exceeds what is allowed
    #[error("PDU length of {0} exceeds the maximum allowed length")]
    PduTooBig(usize),
    /// attempted to read more bytes than present
    #[error("attempted to read {0} bytes with only {1} remaining")]
    InsufficientBytesForRead(usize, usize),
    /// byte count would exceed the maximum value of u8
    #[error("byte count would exceed maximum size of u8: {0}")]
    BadByteCount(usize),
}
