use crate::error::ModbusError;

use nom::{
    multi::many0,
    number::complete::{be_u16, be_u8},
    sequence::tuple,
    IResult,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Length of the transaction/protocol/length/unit header.
pub const HEADER_LEN: usize = 7;

/// Largest register count a single read may ask for.
pub const MAX_REGISTERS: u16 = 125;

/// Set on the function code of an exception response.
pub const EXCEPTION_BIT: u8 = 0x80;

// {{{ FunctionCode
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FunctionCode {
    ReadHoldingRegisters = 3,
}
// }}}

// {{{ Header
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub unit: u8,
}

impl Header {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (rest, (transaction_id, protocol_id, length, unit)) =
            tuple((be_u16, be_u16, be_u16, be_u8))(input)?;

        Ok((
            rest,
            Self {
                transaction_id,
                protocol_id,
                length,
                unit,
            },
        ))
    }
}
// }}}

// {{{ ReadHoldingRegisters
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadHoldingRegisters {
    pub address: u16,
    pub count: u16,
}

impl ReadHoldingRegisters {
    pub fn new(address: u16, count: u16) -> Result<Self, ModbusError> {
        if count == 0 || count > MAX_REGISTERS {
            return Err(ModbusError::InvalidCount(count));
        }

        Ok(Self { address, count })
    }

    /// `[0x03][address_hi][address_lo][count_hi][count_lo]`
    pub fn pdu(&self) -> Vec<u8> {
        let mut r = Vec::with_capacity(5);
        r.push(FunctionCode::ReadHoldingRegisters.into());
        r.extend_from_slice(&self.address.to_be_bytes());
        r.extend_from_slice(&self.count.to_be_bytes());
        r
    }
}
// }}}

pub struct TcpFrameFactory;
impl TcpFrameFactory {
    /// Wraps a PDU in the 7-byte header. The length field counts the unit
    /// byte plus the PDU.
    pub fn build(transaction_id: u16, unit: u8, pdu: &[u8]) -> Vec<u8> {
        let length = (pdu.len() + 1) as u16;

        let mut r = Vec::with_capacity(HEADER_LEN + pdu.len());
        r.extend_from_slice(&transaction_id.to_be_bytes());
        r.extend_from_slice(&0u16.to_be_bytes());
        r.extend_from_slice(&length.to_be_bytes());
        r.push(unit);
        r.extend_from_slice(pdu);

        r
    }
}

pub struct Parser;
impl Parser {
    /// Splits a raw response into its header and PDU.
    ///
    /// The header is not checked against the request; this device family
    /// is known to send headers that do not match, so only its length
    /// matters.
    pub fn split(input: &[u8]) -> Result<(Header, &[u8]), ModbusError> {
        if input.len() < HEADER_LEN {
            return Err(ModbusError::TruncatedHeader(input.len()));
        }

        let (pdu, header) = Header::parse(input)
            .map_err(|err| ModbusError::Malformed(format!("header: {}", err)))?;

        if pdu.is_empty() {
            return Err(ModbusError::EmptyResponse);
        }

        Ok((header, pdu))
    }

    /// Decodes a read-holding-registers response into at most `count`
    /// words. A dangling odd byte at the end is dropped, as is anything
    /// past `count` words.
    pub fn parse_read_holding(input: &[u8], count: u16) -> Result<Vec<u16>, ModbusError> {
        let (_header, pdu) = Self::split(input)?;

        let function = pdu[0];
        if function & EXCEPTION_BIT != 0 {
            return Err(ModbusError::Exception(pdu.to_vec()));
        }

        let byte_count = match pdu.get(1) {
            Some(b) => *b as usize,
            None => return Err(ModbusError::Malformed("missing byte count".to_string())),
        };

        let data = &pdu[2..];
        let data = &data[..byte_count.min(data.len())];

        let (_odd, mut words) = Self::words(data)
            .map_err(|err| ModbusError::Malformed(format!("register data: {}", err)))?;
        words.truncate(count as usize);

        Ok(words)
    }

    fn words(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
        many0(be_u16)(input)
    }
}
