/// Controls the decoding of transmitted and received data at the PDU, ADU, and physical layer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeLevel {
    /// Controls the protocol data unit decoding
    pub pdu: PduDecodeLevel,
    /// Controls the MBAP header decoding
    pub adu: AduDecodeLevel,
    /// Controls the logging of physical layer read/write
    pub physical: PhysDecodeLevel,
}

/// Controls how transmitted and received Protocol Data Units (PDUs) are decoded at the INFO log level
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum PduDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the function code only
    FunctionCode,
    /// Decode the function code and the general description of the data
    DataHeaders,
    /// Decode the function code, the general description of the data and the actual data values
    DataValues,
}

/// Controls how the MBAP header and raw ADU bytes are decoded at the INFO log level
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum AduDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the header
    Header,
    /// Decode the header and the raw payload as hexadecimal
    Payload,
}

/// Controls how data transmitted on the stream is logged
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum PhysDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log only the length of data that is sent and received
    Length,
    /// Log the length and the actual data that is sent and received
    Data,
}

impl DecodeLevel {
    /// log nothing at any layer
    pub fn nothing() -> Self {
        Self::default()
    }

    /// choose a level for each layer
    pub fn new(pdu: PduDecodeLevel, adu: AduDecodeLevel, physical: PhysDecodeLevel) -> Self {
        DecodeLevel { pdu, adu, physical }
    }
}

impl From<PduDecodeLevel> for DecodeLevel {
    fn from(pdu: PduDecodeLevel) -> Self {
        Self {
            pdu,
            ..Self::default()
        }
    }
}

// variants are declared from least to most verbose, so ordering compares detail

impl PduDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        self > PduDecodeLevel::Nothing
    }

    pub(crate) fn data_headers(self) -> bool {
        self >= PduDecodeLevel::DataHeaders
    }

    pub(crate) fn data_values(self) -> bool {
        self == PduDecodeLevel::DataValues
    }
}

impl AduDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        self > AduDecodeLevel::Nothing
    }

    pub(crate) fn payload_enabled(self) -> bool {
        self == AduDecodeLevel::Payload
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        self > PhysDecodeLevel::Nothing
    }

    pub(crate) fn data_enabled(self) -> bool {
        self == PhysDecodeLevel::Data
    }
}

impl std::str::FromStr for PduDecodeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nothing" => Ok(PduDecodeLevel::Nothing),
            "function" => Ok(PduDecodeLevel::FunctionCode),
            "headers" => Ok(PduDecodeLevel::DataHeaders),
            "values" => Ok(PduDecodeLevel::DataValues),
            _ => Err(format!(
                "unknown decode level '{s}', expected one of: nothing, function, headers, values"
            )),
        }
    }
}

const BYTES_PER_DECODE_LINE: usize = 18;

pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    use std::fmt::Write;

    for chunk in bytes.chunks(BYTES_PER_DECODE_LINE) {
        writeln!(f)?;
        let mut first = true;
        for byte in chunk {
            if !first {
                f.write_char(' ')?;
            }
            first = false;
            write!(f, "{byte:02X?}")?;
        }
    }
    Ok(())
}
