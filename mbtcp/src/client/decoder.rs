use crate::client::request::{Echo, RequestContext};
use crate::common::bits::{num_bytes_for_bits, unpack_bits};
use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::decode::PduDecodeLevel;
use crate::error::{AduParseError, RequestError};
use crate::types::{coil_from_u16, AddressRange, Update};

/// Result of decoding a validated response PDU
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Decoded {
    /// values read back, or the value written by a single write
    Update(Update),
    /// a multiple or mask write was acknowledged for this range
    Written(AddressRange),
}

/// Decode a validated PDU using the context of the request that produced it
pub(crate) fn decode(
    ctx: &RequestContext,
    pdu: &[u8],
    level: PduDecodeLevel,
) -> Result<Decoded, RequestError> {
    let mut cursor = ReadCursor::new(pdu);
    // the validator has already matched the function code
    cursor.read_u8()?;

    let decoded = match ctx.function {
        FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
            let values = read_bits(ctx.range, &mut cursor)?;
            Decoded::Update(Update::bits(
                ctx.function.data_type(),
                ctx.range.start,
                values,
            ))
        }
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
            let values = read_registers(ctx.range, &mut cursor)?;
            Decoded::Update(Update::registers(
                ctx.function.data_type(),
                ctx.range.start,
                values,
            ))
        }
        FunctionCode::WriteSingleCoil => {
            let (address, raw) = read_single(&mut cursor)?;
            let value = coil_from_u16(raw)?;
            check_single_echo(ctx, address, raw)?;
            Decoded::Update(Update::bits(
                ctx.function.data_type(),
                ctx.range.start,
                vec![value],
            ))
        }
        FunctionCode::WriteSingleRegister => {
            let (address, value) = read_single(&mut cursor)?;
            check_single_echo(ctx, address, value)?;
            Decoded::Update(Update::registers(
                ctx.function.data_type(),
                ctx.range.start,
                vec![value],
            ))
        }
        FunctionCode::WriteMultipleCoils
        | FunctionCode::WriteMultipleRegisters
        | FunctionCode::MaskWriteRegister => {
            read_write_echo(ctx, &mut cursor)?;
            Decoded::Written(ctx.range)
        }
    };

    cursor.expect_empty()?;

    if level.enabled() {
        tracing::info!("PDU RX - {}", DecodedDisplay::new(level, ctx.function, &decoded));
    }

    Ok(decoded)
}

fn read_byte_count(cursor: &mut ReadCursor, expected: usize) -> Result<(), AduParseError> {
    let count = cursor.read_u8()? as usize;
    if count != expected {
        return Err(AduParseError::RequestByteCountMismatch(expected, count));
    }
    Ok(())
}

fn read_bits(range: AddressRange, cursor: &mut ReadCursor) -> Result<Vec<bool>, AduParseError> {
    let byte_count = num_bytes_for_bits(range.count);
    read_byte_count(cursor, byte_count)?;
    let bytes = cursor.read_bytes(byte_count)?;
    Ok(unpack_bits(bytes, range.count))
}

fn read_registers(
    range: AddressRange,
    cursor: &mut ReadCursor,
) -> Result<Vec<u16>, AduParseError> {
    read_byte_count(cursor, 2 * range.count as usize)?;
    (0..range.count).map(|_| cursor.read_u16_be()).collect()
}

fn read_single(cursor: &mut ReadCursor) -> Result<(u16, u16), AduParseError> {
    Ok((cursor.read_u16_be()?, cursor.read_u16_be()?))
}

fn check_single_echo(ctx: &RequestContext, address: u16, value: u16) -> Result<(), AduParseError> {
    if address != ctx.range.start || Echo::Value(value) != ctx.echo {
        return Err(AduParseError::ReplyEchoMismatch);
    }
    Ok(())
}

fn read_write_echo(ctx: &RequestContext, cursor: &mut ReadCursor) -> Result<(), AduParseError> {
    let address = cursor.read_u16_be()?;
    if address != ctx.range.start {
        return Err(AduParseError::ReplyEchoMismatch);
    }

    let matches = match ctx.echo {
        Echo::Mask(mask) => {
            cursor.read_u16_be()? == mask.and_mask && cursor.read_u16_be()? == mask.or_mask
        }
        _ => cursor.read_u16_be()? == ctx.range.count,
    };

    if !matches {
        return Err(AduParseError::ReplyEchoMismatch);
    }
    Ok(())
}

struct DecodedDisplay<'a> {
    level: PduDecodeLevel,
    function: FunctionCode,
    decoded: &'a Decoded,
}

impl<'a> DecodedDisplay<'a> {
    fn new(level: PduDecodeLevel, function: FunctionCode, decoded: &'a Decoded) -> Self {
        Self {
            level,
            function,
            decoded,
        }
    }
}

impl std::fmt::Display for DecodedDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.function)?;
        if !self.level.data_headers() {
            return Ok(());
        }
        match self.decoded {
            Decoded::Written(range) => write!(f, " {range}"),
            Decoded::Update(update) => {
                if self.level.data_values() {
                    write!(f, " {update}")
                } else {
                    write!(f, " {}", update.data_type)
                }
            }
        }
    }
}
