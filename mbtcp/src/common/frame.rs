use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::common::buffer::ReadBuffer;
use crate::common::cursor::WriteCursor;
use crate::common::phys::PhysLayer;
use crate::decode::{format_bytes, AduDecodeLevel, DecodeLevel};
use crate::error::{FrameParseError, InternalError, RequestError};

pub(crate) mod constants {
    pub(crate) const HEADER_LENGTH: usize = 7;
    pub(crate) const MAX_PDU_LENGTH: usize = 253;
    pub(crate) const MAX_FRAME_LENGTH: usize = HEADER_LENGTH + MAX_PDU_LENGTH;
    // includes the 1 byte unit id
    pub(crate) const MAX_LENGTH_FIELD: usize = MAX_PDU_LENGTH + 1;
    pub(crate) const MODBUS_PROTOCOL_ID: u16 = 0;
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) struct TxId {
    value: u16,
}

impl TxId {
    pub(crate) fn new(value: u16) -> Self {
        TxId { value }
    }

    pub(crate) fn to_u16(self) -> u16 {
        self.value
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

/// Pseudo-random transaction ids, one generator per connection
pub(crate) struct TxIdSource {
    rng: SmallRng,
}

impl TxIdSource {
    pub(crate) fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub(crate) fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn next(&mut self) -> TxId {
        TxId::new(self.rng.gen())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct MbapHeader {
    pub(crate) tx_id: TxId,
    pub(crate) protocol_id: u16,
    /// unit id byte plus the PDU
    pub(crate) length: u16,
    pub(crate) unit_id: u8,
}

impl MbapHeader {
    pub(crate) fn pdu_length(&self) -> usize {
        (self.length as usize).saturating_sub(1)
    }
}

impl std::fmt::Display for MbapHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "tx_id: {} protocol: {} len: {} unit: {:#04X}",
            self.tx_id, self.protocol_id, self.length, self.unit_id
        )
    }
}

/// A complete frame received off the stream
pub(crate) struct Frame {
    pub(crate) header: MbapHeader,
    length: usize,
    pdu: [u8; constants::MAX_PDU_LENGTH],
}

impl Frame {
    pub(crate) fn new(header: MbapHeader) -> Frame {
        Frame {
            header,
            length: 0,
            pdu: [0; constants::MAX_PDU_LENGTH],
        }
    }

    pub(crate) fn set(&mut self, src: &[u8]) -> bool {
        if src.len() > self.pdu.len() {
            return false;
        }

        self.pdu[0..src.len()].copy_from_slice(src);
        self.length = src.len();
        true
    }

    pub(crate) fn payload(&self) -> &[u8] {
        &self.pdu[0..self.length]
    }
}

/// Parse a complete ADU held in memory into its header and PDU
///
/// The PDU is the `length - 1` bytes that follow the 7-byte header.
pub(crate) fn parse_frame(bytes: &[u8]) -> Result<(MbapHeader, &[u8]), RequestError> {
    let header_bytes = bytes
        .get(0..constants::HEADER_LENGTH)
        .ok_or(InternalError::InsufficientBytesForRead(
            constants::HEADER_LENGTH,
            bytes.len(),
        ))?;

    let header = MbapHeader {
        tx_id: TxId::new(u16::from_be_bytes([header_bytes[0], header_bytes[1]])),
        protocol_id: u16::from_be_bytes([header_bytes[2], header_bytes[3]]),
        length: u16::from_be_bytes([header_bytes[4], header_bytes[5]]),
        unit_id: header_bytes[6],
    };

    if header.length == 0 {
        return Err(FrameParseError::MbapLengthZero.into());
    }

    let end = constants::HEADER_LENGTH + header.pdu_length();
    let pdu = bytes
        .get(constants::HEADER_LENGTH..end)
        .ok_or(InternalError::InsufficientBytesForRead(end, bytes.len()))?;

    Ok((header, pdu))
}

/// Builds outgoing ADUs into a reusable buffer
pub(crate) struct FrameWriter {
    buffer: [u8; constants::MAX_FRAME_LENGTH],
}

impl FrameWriter {
    pub(crate) fn new() -> Self {
        Self {
            buffer: [0; constants::MAX_FRAME_LENGTH],
        }
    }

    /// Emit the MBAP header followed by the PDU, all fields big-endian
    pub(crate) fn format(
        &mut self,
        tx_id: TxId,
        unit_id: u8,
        pdu: &[u8],
        level: DecodeLevel,
    ) -> Result<&[u8], RequestError> {
        if pdu.len() > constants::MAX_PDU_LENGTH {
            return Err(InternalError::PduTooBig(pdu.len()).into());
        }

        let header = MbapHeader {
            tx_id,
            protocol_id: constants::MODBUS_PROTOCOL_ID,
            // cannot overflow b/c the PDU length was checked above
            length: (pdu.len() + 1) as u16,
            unit_id,
        };

        let total_length = {
            let mut cursor = WriteCursor::new(&mut self.buffer);
            cursor.write_u16_be(header.tx_id.to_u16())?;
            cursor.write_u16_be(header.protocol_id)?;
            cursor.write_u16_be(header.length)?;
            cursor.write_u8(header.unit_id)?;
            cursor.write_bytes(pdu)?;
            cursor.position()
        };

        if level.adu.enabled() {
            tracing::info!(
                "MBAP TX - {}",
                MbapDisplay::new(level.adu, header, pdu)
            );
        }

        Ok(&self.buffer[..total_length])
    }
}

#[derive(Clone, Copy)]
enum ParseState {
    Begin,
    Header(MbapHeader),
}

/// Incrementally parses MBAP frames out of a [`ReadBuffer`]
pub(crate) struct MbapParser {
    state: ParseState,
}

impl MbapParser {
    pub(crate) fn new() -> Self {
        Self {
            state: ParseState::Begin,
        }
    }

    fn parse_header(cursor: &mut ReadBuffer) -> Result<MbapHeader, RequestError> {
        let tx_id = TxId::new(cursor.read_u16_be()?);
        let protocol_id = cursor.read_u16_be()?;
        let length = cursor.read_u16_be()?;
        let unit_id = cursor.read_u8()?;

        if length as usize > constants::MAX_LENGTH_FIELD {
            return Err(FrameParseError::MbapLengthTooBig(
                length as usize,
                constants::MAX_LENGTH_FIELD,
            )
            .into());
        }

        // must be > 0 b/c the 1-byte unit identifier counts towards length
        if length == 0 {
            return Err(FrameParseError::MbapLengthZero.into());
        }

        Ok(MbapHeader {
            tx_id,
            protocol_id,
            length,
            unit_id,
        })
    }

    fn parse_body(header: &MbapHeader, cursor: &mut ReadBuffer) -> Result<Frame, RequestError> {
        let mut frame = Frame::new(*header);
        if !frame.set(cursor.read(header.pdu_length())?) {
            return Err(InternalError::PduTooBig(header.pdu_length()).into());
        }
        Ok(frame)
    }

    /// Err implies the input data is invalid,
    /// Ok(None) implies that more data is required to complete parsing,
    /// Ok(Some(..)) contains a fully parsed frame and consumes its bytes
    pub(crate) fn parse(&mut self, cursor: &mut ReadBuffer) -> Result<Option<Frame>, RequestError> {
        match self.state {
            ParseState::Header(header) => {
                if cursor.len() < header.pdu_length() {
                    return Ok(None);
                }

                let ret = Self::parse_body(&header, cursor)?;
                self.state = ParseState::Begin;
                Ok(Some(ret))
            }
            ParseState::Begin => {
                if cursor.len() < constants::HEADER_LENGTH {
                    return Ok(None);
                }

                self.state = ParseState::Header(Self::parse_header(cursor)?);
                self.parse(cursor)
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = ParseState::Begin;
    }
}

/// Reads until the header and then the declared PDU length are available
pub(crate) struct FramedReader {
    parser: MbapParser,
    buffer: ReadBuffer,
}

impl FramedReader {
    pub(crate) fn new() -> Self {
        Self {
            parser: MbapParser::new(),
            buffer: ReadBuffer::new(constants::MAX_FRAME_LENGTH),
        }
    }

    /// discard any partial or stale data left from a previous exchange
    pub(crate) fn reset(&mut self) {
        if !self.buffer.is_empty() {
            tracing::warn!("discarding {} stale bytes", self.buffer.len());
        }
        self.buffer.clear();
        self.parser.reset();
    }

    pub(crate) async fn next_frame(
        &mut self,
        io: &mut PhysLayer,
        level: DecodeLevel,
    ) -> Result<Frame, RequestError> {
        loop {
            match self.parser.parse(&mut self.buffer)? {
                Some(frame) => {
                    if level.adu.enabled() {
                        tracing::info!(
                            "MBAP RX - {}",
                            MbapDisplay::new(level.adu, frame.header, frame.payload())
                        );
                    }
                    return Ok(frame);
                }
                None => {
                    self.buffer.read_some(io, level.physical).await?;
                }
            }
        }
    }
}

struct MbapDisplay<'a> {
    level: AduDecodeLevel,
    header: MbapHeader,
    bytes: &'a [u8],
}

impl<'a> MbapDisplay<'a> {
    fn new(level: AduDecodeLevel, header: MbapHeader, bytes: &'a [u8]) -> Self {
        MbapDisplay {
            level,
            header,
            bytes,
        }
    }
}

impl std::fmt::Display for MbapDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.header)?;
        if self.level.payload_enabled() {
            format_bytes(f, self.bytes)?;
        }
        Ok(())
    }
}
