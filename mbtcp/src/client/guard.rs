use crate::constants::limits;
use crate::error::InvalidRequest;
use crate::types::AddressRange;

/// Addressing and quantity limits for one function code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Limits {
    pub(crate) max_start: u16,
    pub(crate) max_quantity: u16,
}

impl Limits {
    pub(crate) const READ_BITS: Limits = Limits::new(limits::MAX_READ_COILS_COUNT);
    pub(crate) const READ_REGISTERS: Limits = Limits::new(limits::MAX_READ_REGISTERS_COUNT);
    pub(crate) const WRITE_COILS: Limits = Limits::new(limits::MAX_WRITE_COILS_COUNT);
    pub(crate) const WRITE_REGISTERS: Limits = Limits::new(limits::MAX_WRITE_REGISTERS_COUNT);
    pub(crate) const SINGLE: Limits = Limits::new(limits::SINGLE_COUNT);

    const fn new(max_quantity: u16) -> Self {
        Self {
            max_start: limits::MAX_START_ADDRESS,
            max_quantity,
        }
    }
}

/// Check a start/quantity pair against the limits of a function
///
/// Checks run in order and stop at the first failure:
/// start address, then quantity, then the address of the last value.
pub(crate) fn validate(
    start: u16,
    quantity: u16,
    limits: Limits,
) -> Result<AddressRange, InvalidRequest> {
    if start > limits.max_start {
        return Err(InvalidRequest::AddressOutOfRange {
            start,
            max: limits.max_start,
        });
    }

    if quantity == 0 || quantity > limits.max_quantity {
        return Err(InvalidRequest::LengthOutOfRange {
            quantity,
            max: limits.max_quantity,
        });
    }

    // quantity >= 1 here, so this is the address of the last value
    let end = start as u32 + quantity as u32 - 1;
    if end > limits.max_start as u32 {
        return Err(InvalidRequest::EndAddressOutOfRange { start, quantity });
    }

    Ok(AddressRange::new(start, quantity))
}
