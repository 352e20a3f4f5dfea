use crate::error::{AduParseError, InternalError};

/// read-only cursor over a received PDU
pub(crate) struct ReadCursor<'a> {
    src: &'a [u8],
}

/// write cursor over a fixed-size buffer
pub(crate) struct WriteCursor<'a> {
    dest: &'a mut [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub(crate) fn new(src: &'a [u8]) -> ReadCursor<'a> {
        ReadCursor { src }
    }

    pub(crate) fn len(&self) -> usize {
        self.src.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    pub(crate) fn expect_empty(&self) -> Result<(), AduParseError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AduParseError::TrailingBytes(self.len()))
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, AduParseError> {
        match self.src.split_first() {
            Some((first, rest)) => {
                self.src = rest;
                Ok(*first)
            }
            None => Err(AduParseError::InsufficientBytes),
        }
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, AduParseError> {
        let high = self.read_u8()?;
        let low = self.read_u8()?;
        Ok((high as u16) << 8 | (low as u16))
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], AduParseError> {
        match (self.src.get(0..count), self.src.get(count..)) {
            (Some(first), Some(rest)) => {
                self.src = rest;
                Ok(first)
            }
            _ => Err(AduParseError::InsufficientBytes),
        }
    }
}

impl<'a> WriteCursor<'a> {
    pub(crate) fn new(dest: &'a mut [u8]) -> WriteCursor<'a> {
        WriteCursor { dest, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.dest.len() - self.pos
    }

    pub(crate) fn write_u8(&mut self, value: u8) -> Result<(), InternalError> {
        match self.dest.get_mut(self.pos) {
            Some(x) => {
                *x = value;
                self.pos += 1;
                Ok(())
            }
            None => Err(InternalError::InsufficientWriteSpace(1, 0)),
        }
    }

    pub(crate) fn write_u16_be(&mut self, value: u16) -> Result<(), InternalError> {
        if self.remaining() < 2 {
            // don't write any bytes if there's isn't space for the whole thing
            return Err(InternalError::InsufficientWriteSpace(2, self.remaining()));
        }
        let [upper, lower] = value.to_be_bytes();
        self.write_u8(upper)?;
        self.write_u8(lower)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), InternalError> {
        if self.remaining() < bytes.len() {
            return Err(InternalError::InsufficientWriteSpace(
                bytes.len(),
                self.remaining(),
            ));
        }
        for byte in bytes {
            self.write_u8(*byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_u16() {
        let mut cursor = ReadCursor::new(&[0xCA, 0xFE, 0x01]);
        assert_eq!(cursor.read_u16_be(), Ok(0xCAFE));
        assert_eq!(cursor.expect_empty(), Err(AduParseError::TrailingBytes(1)));
        assert_eq!(cursor.read_u16_be(), Err(AduParseError::InsufficientBytes));
    }

    #[test]
    fn writes_every_u16_big_endian() {
        for value in [0x0000, 0x0001, 0x00FF, 0x0100, 0x1234, 0xFF00, 0xFFFF] {
            let mut buffer = [0u8; 2];
            let mut cursor = WriteCursor::new(&mut buffer);
            cursor.write_u16_be(value).unwrap();
            assert_eq!(u16::from_be_bytes(buffer), value);
        }
    }

    #[test]
    fn partial_u16_write_is_refused() {
        let mut buffer = [0u8; 1];
        let mut cursor = WriteCursor::new(&mut buffer);
        assert_eq!(
            cursor.write_u16_be(0xCAFE),
            Err(InternalError::InsufficientWriteSpace(2, 1))
        );
        assert_eq!(cursor.position(), 0);
    }
}
