use crate::common::phys::PhysLayer;
use crate::decode::PhysDecodeLevel;
use crate::error::InternalError;

/// Bytes read off the stream that no parser has consumed yet
///
/// Unconsumed bytes live in `buffer[begin..end]`.
pub(crate) struct ReadBuffer {
    buffer: Vec<u8>,
    begin: usize,
    end: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        ReadBuffer {
            buffer: vec![0; capacity],
            begin: 0,
            end: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.begin
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub(crate) fn clear(&mut self) {
        self.begin = 0;
        self.end = 0;
    }

    /// consume `count` bytes from the front
    pub(crate) fn read(&mut self, count: usize) -> Result<&[u8], InternalError> {
        let available = self.len();
        if available < count {
            return Err(InternalError::InsufficientBytesForRead(count, available));
        }

        let start = self.begin;
        self.begin += count;
        Ok(&self.buffer[start..self.begin])
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, InternalError> {
        Ok(self.read(1)?[0])
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, InternalError> {
        let bytes = self.read(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Append whatever the stream has available, failing on end of stream
    pub(crate) async fn read_some(
        &mut self,
        io: &mut PhysLayer,
        level: PhysDecodeLevel,
    ) -> Result<usize, std::io::Error> {
        if self.is_empty() {
            self.clear();
        } else if self.end == self.buffer.len() {
            // out of room at the back, move the partial frame to the front
            self.buffer.copy_within(self.begin..self.end, 0);
            self.end -= self.begin;
            self.begin = 0;
        }

        let count = io.read(&mut self.buffer[self.end..], level).await?;
        if count == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }

        self.end += count;
        Ok(count)
    }
}
