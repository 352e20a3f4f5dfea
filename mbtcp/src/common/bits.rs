use crate::error::InternalError;

pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (count as usize + 7) / 8
}

pub(crate) fn num_bytes_for_registers(count: u16) -> Result<u8, InternalError> {
    let bytes = 2 * count as usize;
    u8::try_from(bytes).map_err(|_| InternalError::BadByteCount(bytes))
}

/// pack bits LSB-first within each byte, zero-padding the final byte
pub(crate) fn pack_bits(values: &[bool]) -> impl Iterator<Item = u8> + '_ {
    values.chunks(8).map(|chunk| {
        let mut acc: u8 = 0;
        for (count, bit) in chunk.iter().enumerate() {
            if *bit {
                acc |= 1 << count as u8;
            }
        }
        acc
    })
}

/// unpack exactly `count` bits, ignoring any padding in the final byte
pub(crate) fn unpack_bits(bytes: &[u8], count: u16) -> Vec<bool> {
    (0..count as usize)
        .map_while(|pos| {
            bytes
                .get(pos / 8)
                .map(|byte| (*byte & (1 << (pos % 8) as u8)) != 0)
        })
        .collect()
}
