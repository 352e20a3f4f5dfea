use crate::common::frame::{parse_frame, Frame};
use crate::common::function::EXCEPTION_BIT;
use crate::error::{AduParseError, RequestError};
use crate::exception::ExceptionCode;

/// Check a received frame against the ADU that was sent and return its PDU
///
/// Gates run in order: transaction id, protocol id, then function code.
/// An exception response is returned as [`RequestError::Exception`] so that
/// no data decode happens.
pub(crate) fn validate<'a>(sent: &[u8], received: &'a Frame) -> Result<&'a [u8], RequestError> {
    let (sent_header, sent_pdu) = parse_frame(sent)?;
    let header = received.header;

    if header.tx_id != sent_header.tx_id {
        return Err(RequestError::TransactionMismatch {
            expected: sent_header.tx_id.to_u16(),
            received: header.tx_id.to_u16(),
        });
    }

    if header.protocol_id != sent_header.protocol_id {
        return Err(RequestError::NotModbus(header.protocol_id));
    }

    let expected = sent_pdu
        .first()
        .copied()
        .ok_or(AduParseError::InsufficientBytes)?;
    let pdu = received.payload();
    let function = pdu.first().copied().ok_or(AduParseError::InsufficientBytes)?;

    if function == expected {
        return Ok(pdu);
    }

    if function == expected | EXCEPTION_BIT {
        let code = pdu.get(1).copied().ok_or(AduParseError::InsufficientBytes)?;
        let exception = ExceptionCode::from(code);
        tracing::warn!("PDU RX - Modbus exception {} ({:#04X})", exception, code);
        return Err(RequestError::Exception(exception));
    }

    Err(RequestError::FunctionCodeMismatch {
        expected,
        received: function,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::frame::{MbapHeader, TxId};

    const SENT: &[u8] = &[0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x03, 0x00, 0x64, 0x00, 0x02];

    fn frame(tx_id: u16, protocol_id: u16, pdu: &[u8]) -> Frame {
        let mut frame = Frame::new(MbapHeader {
            tx_id: TxId::new(tx_id),
            protocol_id,
            length: pdu.len() as u16 + 1,
            unit_id: 0xFF,
        });
        assert!(frame.set(pdu));
        frame
    }

    #[test]
    fn matching_response_yields_pdu() {
        let received = frame(0x1234, 0, &[0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B]);
        assert_eq!(
            validate(SENT, &received),
            Ok([0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B].as_slice())
        );
    }

    #[test]
    fn transaction_id_is_checked_first() {
        let received = frame(0x1235, 7, &[0x83, 0x02]);
        assert_eq!(
            validate(SENT, &received),
            Err(RequestError::TransactionMismatch {
                expected: 0x1234,
                received: 0x1235
            })
        );
    }

    #[test]
    fn rejects_non_modbus_protocol() {
        let received = frame(0x1234, 1, &[0x03, 0x02, 0x00, 0x01]);
        assert_eq!(validate(SENT, &received), Err(RequestError::NotModbus(1)));
    }

    #[test]
    fn maps_exception_codes() {
        let cases = [
            (0x01, ExceptionCode::IllegalFunction),
            (0x02, ExceptionCode::IllegalDataAddress),
            (0x03, ExceptionCode::IllegalDataValue),
            (0x04, ExceptionCode::ServerDeviceFailure),
            (0x0B, ExceptionCode::Unknown(0x0B)),
        ];
        for (code, expected) in cases {
            let received = frame(0x1234, 0, &[0x83, code]);
            assert_eq!(
                validate(SENT, &received),
                Err(RequestError::Exception(expected))
            );
        }
    }

    #[test]
    fn exception_without_code_is_too_short() {
        let received = frame(0x1234, 0, &[0x83]);
        assert_eq!(
            validate(SENT, &received),
            Err(AduParseError::InsufficientBytes.into())
        );
    }

    #[test]
    fn rejects_other_function_codes() {
        let received = frame(0x1234, 0, &[0x04, 0x02, 0x00, 0x01]);
        assert_eq!(
            validate(SENT, &received),
            Err(RequestError::FunctionCodeMismatch {
                expected: 0x03,
                received: 0x04
            })
        );
    }

    #[test]
    fn empty_response_pdu_is_too_short() {
        let received = frame(0x1234, 0, &[]);
        assert_eq!(
            validate(SENT, &received),
            Err(AduParseError::InsufficientBytes.into())
        );
    }
}
