use crate::common::cursor::WriteCursor;
use crate::common::frame::constants::MAX_PDU_LENGTH;
use crate::common::function::FunctionCode;
use crate::error::RequestError;

/// An encoded request PDU: the function code followed by its fields
pub(crate) struct Pdu {
    length: usize,
    data: [u8; MAX_PDU_LENGTH],
}

impl Pdu {
    pub(crate) fn build<F>(function: FunctionCode, body: F) -> Result<Self, RequestError>
    where
        F: FnOnce(&mut WriteCursor) -> Result<(), RequestError>,
    {
        let mut data = [0; MAX_PDU_LENGTH];
        let length = {
            let mut cursor = WriteCursor::new(&mut data);
            cursor.write_u8(function.get_value())?;
            body(&mut cursor)?;
            cursor.position()
        };
        Ok(Self { length, data })
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.data[0..self.length]
    }
}

impl std::fmt::Debug for Pdu {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:02X?}", self.as_slice())
    }
}
