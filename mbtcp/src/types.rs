use crate::error::AduParseError;

/// Start and count of a contiguous block of values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

/// Classification of the data carried by an [`Update`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// read-only bits
    DiscreteInput,
    /// read-write bits
    Coil,
    /// read-only 16-bit registers
    InputRegister,
    /// read-write 16-bit registers
    HoldingRegister,
}

/// Values carried by an [`Update`]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// one entry per bit, starting at [`Update::start`]
    Bits(Vec<bool>),
    /// one entry per register, starting at [`Update::start`]
    Registers(Vec<u16>),
    /// the server accepted a write and returned no values
    Acknowledged,
}

/// Decoded result of a successful request
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Update {
    /// what kind of data this is
    pub data_type: DataType,
    /// address of the first value
    pub start: u16,
    /// the values themselves
    pub payload: Payload,
}

/// AND/OR pair applied by a mask write register request
///
/// The server computes `(current & and_mask) | (or_mask & !and_mask)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskWrite {
    /// bits to keep from the current value
    pub and_mask: u16,
    /// bits to set where the AND mask is clear
    pub or_mask: u16,
}

impl AddressRange {
    pub(crate) fn new(start: u16, count: u16) -> Self {
        Self { start, count }
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DataType::DiscreteInput => f.write_str("discrete input"),
            DataType::Coil => f.write_str("coil"),
            DataType::InputRegister => f.write_str("input register"),
            DataType::HoldingRegister => f.write_str("holding register"),
        }
    }
}

impl Update {
    pub(crate) fn bits(data_type: DataType, start: u16, values: Vec<bool>) -> Self {
        Self {
            data_type,
            start,
            payload: Payload::Bits(values),
        }
    }

    pub(crate) fn registers(data_type: DataType, start: u16, values: Vec<u16>) -> Self {
        Self {
            data_type,
            start,
            payload: Payload::Registers(values),
        }
    }

    pub(crate) fn acknowledged(data_type: DataType, start: u16) -> Self {
        Self {
            data_type,
            start,
            payload: Payload::Acknowledged,
        }
    }

    /// bit values, if this update carries any
    pub fn as_bits(&self) -> Option<&[bool]> {
        match &self.payload {
            Payload::Bits(x) => Some(x.as_slice()),
            _ => None,
        }
    }

    /// register values, if this update carries any
    pub fn as_registers(&self) -> Option<&[u16]> {
        match &self.payload {
            Payload::Registers(x) => Some(x.as_slice()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.payload {
            Payload::Bits(values) => {
                write!(f, "{} ({} values)", self.data_type, values.len())?;
                for (offset, value) in values.iter().enumerate() {
                    write!(f, "\nindex: {} value: {value}", self.start as usize + offset)?;
                }
                Ok(())
            }
            Payload::Registers(values) => {
                write!(f, "{} ({} values)", self.data_type, values.len())?;
                for (offset, value) in values.iter().enumerate() {
                    write!(f, "\nindex: {} value: {value}", self.start as usize + offset)?;
                }
                Ok(())
            }
            Payload::Acknowledged => {
                write!(f, "{} write acknowledged at {}", self.data_type, self.start)
            }
        }
    }
}

pub(crate) fn coil_from_u16(value: u16) -> Result<bool, AduParseError> {
    match value {
        crate::constants::coil::ON => Ok(true),
        crate::constants::coil::OFF => Ok(false),
        _ => Err(AduParseError::UnknownCoilState(value)),
    }
}

pub(crate) fn coil_to_u16(value: bool) -> u16 {
    if value {
        crate::constants::coil::ON
    } else {
        crate::constants::coil::OFF
    }
}
