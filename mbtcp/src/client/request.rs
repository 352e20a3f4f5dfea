use crate::client::guard::{validate, Limits};
use crate::common::bits::{num_bytes_for_bits, num_bytes_for_registers, pack_bits};
use crate::common::cursor::WriteCursor;
use crate::common::function::FunctionCode;
use crate::common::pdu::Pdu;
use crate::decode::PduDecodeLevel;
use crate::error::{InternalError, InvalidRequest, RequestError};
use crate::types::{coil_to_u16, AddressRange, MaskWrite};

/// A request for one of the supported function codes
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Request {
    /// read `quantity` coils starting at `start`
    ReadCoils {
        /// address of the first coil
        start: u16,
        /// number of coils to read
        quantity: u16,
    },
    /// read `quantity` discrete inputs starting at `start`
    ReadDiscreteInputs {
        /// address of the first input
        start: u16,
        /// number of inputs to read
        quantity: u16,
    },
    /// read `quantity` holding registers starting at `start`
    ReadHoldingRegisters {
        /// address of the first register
        start: u16,
        /// number of registers to read
        quantity: u16,
    },
    /// read `quantity` input registers starting at `start`
    ReadInputRegisters {
        /// address of the first register
        start: u16,
        /// number of registers to read
        quantity: u16,
    },
    /// write a single coil
    WriteSingleCoil {
        /// address of the coil
        address: u16,
        /// value to write
        value: bool,
    },
    /// write a single holding register
    WriteSingleRegister {
        /// address of the register
        address: u16,
        /// value to write
        value: u16,
    },
    /// write a contiguous block of coils
    WriteMultipleCoils {
        /// address of the first coil
        start: u16,
        /// one value per coil
        values: Vec<bool>,
    },
    /// write a contiguous block of holding registers
    WriteMultipleRegisters {
        /// address of the first register
        start: u16,
        /// one value per register
        values: Vec<u16>,
    },
    /// modify a holding register with an AND/OR mask
    MaskWriteRegister {
        /// address of the register
        address: u16,
        /// masks to apply
        mask: MaskWrite,
    },
}

/// What the server is expected to echo back in a write acknowledgement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Echo {
    /// reads carry data, not an echo
    None,
    /// single writes echo the address and the encoded value
    Value(u16),
    /// multiple writes echo the address and quantity
    Quantity,
    /// mask writes echo the address and both masks
    Mask(MaskWrite),
}

/// Per-request state handed from the encoder to the decoder of the same exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RequestContext {
    pub(crate) function: FunctionCode,
    pub(crate) range: AddressRange,
    pub(crate) echo: Echo,
}

impl RequestContext {
    fn new(function: FunctionCode, range: AddressRange, echo: Echo) -> Self {
        Self {
            function,
            range,
            echo,
        }
    }
}

fn quantity_of<T>(values: &[T]) -> Result<u16, InvalidRequest> {
    u16::try_from(values.len()).map_err(|_| InvalidRequest::CountTooBigForU16(values.len()))
}

fn write_range(cursor: &mut WriteCursor, range: AddressRange) -> Result<(), InternalError> {
    cursor.write_u16_be(range.start)?;
    cursor.write_u16_be(range.count)
}

impl Request {
    pub(crate) fn function(&self) -> FunctionCode {
        match self {
            Request::ReadCoils { .. } => FunctionCode::ReadCoils,
            Request::ReadDiscreteInputs { .. } => FunctionCode::ReadDiscreteInputs,
            Request::ReadHoldingRegisters { .. } => FunctionCode::ReadHoldingRegisters,
            Request::ReadInputRegisters { .. } => FunctionCode::ReadInputRegisters,
            Request::WriteSingleCoil { .. } => FunctionCode::WriteSingleCoil,
            Request::WriteSingleRegister { .. } => FunctionCode::WriteSingleRegister,
            Request::WriteMultipleCoils { .. } => FunctionCode::WriteMultipleCoils,
            Request::WriteMultipleRegisters { .. } => FunctionCode::WriteMultipleRegisters,
            Request::MaskWriteRegister { .. } => FunctionCode::MaskWriteRegister,
        }
    }

    /// Run the address/length guard, then build the PDU
    ///
    /// Nothing is encoded unless the guard passes.
    pub(crate) fn encode(&self) -> Result<(Pdu, RequestContext), RequestError> {
        let function = self.function();
        match self {
            Request::ReadCoils { start, quantity }
            | Request::ReadDiscreteInputs { start, quantity } => {
                let range = validate(*start, *quantity, Limits::READ_BITS)?;
                let pdu = Pdu::build(function, |cursor| Ok(write_range(cursor, range)?))?;
                Ok((pdu, RequestContext::new(function, range, Echo::None)))
            }
            Request::ReadHoldingRegisters { start, quantity }
            | Request::ReadInputRegisters { start, quantity } => {
                let range = validate(*start, *quantity, Limits::READ_REGISTERS)?;
                let pdu = Pdu::build(function, |cursor| Ok(write_range(cursor, range)?))?;
                Ok((pdu, RequestContext::new(function, range, Echo::None)))
            }
            Request::WriteSingleCoil { address, value } => {
                let range = validate(*address, 1, Limits::SINGLE)?;
                let encoded = coil_to_u16(*value);
                let pdu = Pdu::build(function, |cursor| {
                    cursor.write_u16_be(range.start)?;
                    cursor.write_u16_be(encoded)?;
                    Ok(())
                })?;
                Ok((pdu, RequestContext::new(function, range, Echo::Value(encoded))))
            }
            Request::WriteSingleRegister { address, value } => {
                let range = validate(*address, 1, Limits::SINGLE)?;
                let pdu = Pdu::build(function, |cursor| {
                    cursor.write_u16_be(range.start)?;
                    cursor.write_u16_be(*value)?;
                    Ok(())
                })?;
                Ok((pdu, RequestContext::new(function, range, Echo::Value(*value))))
            }
            Request::WriteMultipleCoils { start, values } => {
                let range = validate(*start, quantity_of(values)?, Limits::WRITE_COILS)?;
                let byte_count = num_bytes_for_bits(range.count);
                let byte_count =
                    u8::try_from(byte_count).map_err(|_| InternalError::BadByteCount(byte_count))?;
                let pdu = Pdu::build(function, |cursor| {
                    write_range(cursor, range)?;
                    cursor.write_u8(byte_count)?;
                    for byte in pack_bits(values) {
                        cursor.write_u8(byte)?;
                    }
                    Ok(())
                })?;
                Ok((pdu, RequestContext::new(function, range, Echo::Quantity)))
            }
            Request::WriteMultipleRegisters { start, values } => {
                let range = validate(*start, quantity_of(values)?, Limits::WRITE_REGISTERS)?;
                let byte_count = num_bytes_for_registers(range.count)?;
                let pdu = Pdu::build(function, |cursor| {
                    write_range(cursor, range)?;
                    cursor.write_u8(byte_count)?;
                    for value in values {
                        cursor.write_u16_be(*value)?;
                    }
                    Ok(())
                })?;
                Ok((pdu, RequestContext::new(function, range, Echo::Quantity)))
            }
            Request::MaskWriteRegister { address, mask } => {
                let range = validate(*address, 1, Limits::SINGLE)?;
                let pdu = Pdu::build(function, |cursor| {
                    cursor.write_u16_be(range.start)?;
                    cursor.write_u16_be(mask.and_mask)?;
                    cursor.write_u16_be(mask.or_mask)?;
                    Ok(())
                })?;
                Ok((pdu, RequestContext::new(function, range, Echo::Mask(*mask))))
            }
        }
    }

    /// The read that re-fetches what a multiple or mask write just changed
    pub(crate) fn echo_read(&self) -> Option<Request> {
        match self {
            Request::WriteMultipleCoils { start, values } => Some(Request::ReadCoils {
                start: *start,
                quantity: values.len() as u16,
            }),
            Request::WriteMultipleRegisters { start, values } => {
                Some(Request::ReadHoldingRegisters {
                    start: *start,
                    quantity: values.len() as u16,
                })
            }
            Request::MaskWriteRegister { address, .. } => Some(Request::ReadHoldingRegisters {
                start: *address,
                quantity: 1,
            }),
            _ => None,
        }
    }
}

pub(crate) struct RequestDisplay<'a> {
    level: PduDecodeLevel,
    request: &'a Request,
}

impl<'a> RequestDisplay<'a> {
    pub(crate) fn new(level: PduDecodeLevel, request: &'a Request) -> Self {
        Self { level, request }
    }
}

impl std::fmt::Display for RequestDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.request.function())?;

        if !self.level.data_headers() {
            return Ok(());
        }

        match self.request {
            Request::ReadCoils { start, quantity }
            | Request::ReadDiscreteInputs { start, quantity }
            | Request::ReadHoldingRegisters { start, quantity }
            | Request::ReadInputRegisters { start, quantity } => {
                write!(f, " start: {start:#06X} qty: {quantity}")
            }
            Request::WriteSingleCoil { address, value } => {
                write!(f, " idx: {address:#06X} value: {value}")
            }
            Request::WriteSingleRegister { address, value } => {
                write!(f, " idx: {address:#06X} value: {value:#06X}")
            }
            Request::WriteMultipleCoils { start, values } => {
                write!(f, " start: {start:#06X} qty: {}", values.len())?;
                if self.level.data_values() {
                    for (offset, value) in values.iter().enumerate() {
                        write!(f, "\nidx: {} value: {value}", *start as usize + offset)?;
                    }
                }
                Ok(())
            }
            Request::WriteMultipleRegisters { start, values } => {
                write!(f, " start: {start:#06X} qty: {}", values.len())?;
                if self.level.data_values() {
                    for (offset, value) in values.iter().enumerate() {
                        write!(f, "\nidx: {} value: {value:#06X}", *start as usize + offset)?;
                    }
                }
                Ok(())
            }
            Request::MaskWriteRegister { address, mask } => write!(
                f,
                " idx: {address:#06X} and: {:#06X} or: {:#06X}",
                mask.and_mask, mask.or_mask
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(request: Request) -> Vec<u8> {
        let (pdu, _) = request.encode().unwrap();
        pdu.as_slice().to_vec()
    }

    #[test]
    fn encodes_read_requests() {
        assert_eq!(
            encode(Request::ReadHoldingRegisters {
                start: 100,
                quantity: 2
            }),
            [0x03, 0x00, 0x64, 0x00, 0x02]
        );
        assert_eq!(
            encode(Request::ReadDiscreteInputs {
                start: 0x1234,
                quantity: 2000
            }),
            [0x02, 0x12, 0x34, 0x07, 0xD0]
        );
    }

    #[test]
    fn encodes_write_single_coil() {
        let (pdu, ctx) = Request::WriteSingleCoil {
            address: 5,
            value: true,
        }
        .encode()
        .unwrap();
        assert_eq!(pdu.as_slice(), [0x05, 0x00, 0x05, 0xFF, 0x00]);
        assert_eq!(ctx.range, AddressRange::new(5, 1));
        assert_eq!(ctx.echo, Echo::Value(0xFF00));

        assert_eq!(
            encode(Request::WriteSingleCoil {
                address: 5,
                value: false
            }),
            [0x05, 0x00, 0x05, 0x00, 0x00]
        );
    }

    #[test]
    fn encodes_write_single_register() {
        assert_eq!(
            encode(Request::WriteSingleRegister {
                address: 0x0102,
                value: 0xCAFE
            }),
            [0x06, 0x01, 0x02, 0xCA, 0xFE]
        );
    }

    #[test]
    fn encodes_write_multiple_coils_lsb_first_with_padding() {
        let values = vec![true, false, true, true, false, false, true, true, true, false];
        assert_eq!(
            encode(Request::WriteMultipleCoils { start: 19, values }),
            [0x0F, 0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01]
        );
    }

    #[test]
    fn encodes_write_multiple_registers() {
        assert_eq!(
            encode(Request::WriteMultipleRegisters {
                start: 1,
                values: vec![0x000A, 0x0102]
            }),
            [0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
    }

    #[test]
    fn encodes_mask_write_register() {
        let (pdu, ctx) = Request::MaskWriteRegister {
            address: 4,
            mask: MaskWrite {
                and_mask: 0x00F2,
                or_mask: 0x0025,
            },
        }
        .encode()
        .unwrap();
        assert_eq!(pdu.as_slice(), [0x16, 0x00, 0x04, 0x00, 0xF2, 0x00, 0x25]);
        assert_eq!(ctx.function, FunctionCode::MaskWriteRegister);
    }

    #[test]
    fn largest_write_requests_fit_in_a_pdu() {
        let coils = encode(Request::WriteMultipleCoils {
            start: 0,
            values: vec![true; 1968],
        });
        assert_eq!(coils.len(), 6 + 246);

        let registers = encode(Request::WriteMultipleRegisters {
            start: 0,
            values: vec![0xFFFF; 123],
        });
        assert_eq!(registers.len(), 6 + 246);
    }

    #[test]
    fn guard_failure_prevents_encoding() {
        assert_eq!(
            Request::ReadInputRegisters {
                start: 0,
                quantity: 126
            }
            .encode()
            .unwrap_err(),
            RequestError::BadRequest(InvalidRequest::LengthOutOfRange {
                quantity: 126,
                max: 125
            })
        );
        assert_eq!(
            Request::WriteMultipleRegisters {
                start: 0,
                values: vec![]
            }
            .encode()
            .unwrap_err(),
            RequestError::BadRequest(InvalidRequest::LengthOutOfRange {
                quantity: 0,
                max: 123
            })
        );
        assert_eq!(
            Request::WriteMultipleCoils {
                start: 0,
                values: vec![false; 70000]
            }
            .encode()
            .unwrap_err(),
            RequestError::BadRequest(InvalidRequest::CountTooBigForU16(70000))
        );
    }

    #[test]
    fn echo_reads_cover_the_written_range() {
        let write = Request::WriteMultipleRegisters {
            start: 7,
            values: vec![1, 2, 3],
        };
        assert_eq!(
            write.echo_read(),
            Some(Request::ReadHoldingRegisters {
                start: 7,
                quantity: 3
            })
        );
        let mask = Request::MaskWriteRegister {
            address: 9,
            mask: MaskWrite {
                and_mask: 0,
                or_mask: 1,
            },
        };
        assert_eq!(
            mask.echo_read(),
            Some(Request::ReadHoldingRegisters {
                start: 9,
                quantity: 1
            })
        );
        assert_eq!(
            Request::WriteSingleCoil {
                address: 1,
                value: true
            }
            .echo_read(),
            None
        );
    }
}
