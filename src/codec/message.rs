//! Fixed DHCPv4/BOOTP header plus a TLV options region.
//!
//! The fixed header is expressed as a `byte_struct`-derived packed struct
//! (big-endian), the same discipline the teacher uses for its own packet
//! headers (`IpV4Header`, `UdpHeader`, `DhcpFixedPayload`):
//! op(1) htype(1) hlen(1) hops(1) xid(4) secs(2) flags(2)
//! ciaddr(4) yiaddr(4) siaddr(4) giaddr(4) chaddr(16, only first 6 used)
//! sname(64) file(128) cookie(4) options...

use std::net::Ipv4Addr;

use byte_struct::{ByteStruct, ByteStructLen};
use thiserror::Error;

use crate::mac::MacAddr;

use super::options::{code, DhcpOptions, MessageType};

pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;
const COOKIE: u32 = 0x6382_5363;
const CHADDR_OFFSET: usize = 28;
const CHADDR_FULL_LEN: usize = 16;
const SNAME_LEN: usize = 64;
const FILE_LEN: usize = 128;

pub const BROADCAST_FLAG: u16 = 0x8000;

/// The fixed 240-byte BOOTP/DHCP header, packed big-endian. Private: callers
/// work with [`Message`], which holds `Ipv4Addr`/`MacAddr` rather than raw
/// bytes; this type exists only to pack and unpack the wire form.
#[derive(ByteStruct, Clone, Copy)]
#[byte_struct_be]
struct DhcpFixedPayload {
    op: u8,
    htype: u8,
    hlen: u8,
    hops: u8,
    xid: u32,
    secs: u16,
    flags: u16,
    ciaddr: [u8; 4],
    yiaddr: [u8; 4],
    siaddr: [u8; 4],
    giaddr: [u8; 4],
    chaddr: [u8; 6],
    pad_chaddr: [u8; 10],
    pad_sname: [u8; SNAME_LEN],
    pad_file: [u8; FILE_LEN],
    cookie: u32,
}

pub const OP_BOOTREQUEST: u8 = 1;
pub const OP_BOOTREPLY: u8 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("message too short or magic cookie missing/invalid")]
    MalformedMessage,
    #[error("unsupported hardware type/length (htype={htype}, hlen={hlen})")]
    UnsupportedHardware { htype: u8, hlen: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: MacAddr,
    pub options: DhcpOptions,
}

impl Message {
    /// Build the skeleton of a server reply (BOOTREPLY), echoing `xid`/`chaddr`/`flags`
    /// from the originating request as spec'd.
    pub fn new_reply(request: &Message, yiaddr: Ipv4Addr) -> Self {
        Message {
            op: OP_BOOTREPLY,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: request.xid,
            secs: 0,
            flags: request.flags,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: request.giaddr,
            chaddr: request.chaddr,
            options: DhcpOptions::new(),
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.flags & BROADCAST_FLAG != 0
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.options.message_type()
    }

    pub fn decode(buf: &[u8]) -> Result<Message, CodecError> {
        if buf.len() < DhcpFixedPayload::BYTE_LEN {
            return Err(CodecError::MalformedMessage);
        }
        let fixed = DhcpFixedPayload::read_bytes(&buf[..DhcpFixedPayload::BYTE_LEN]);
        if fixed.htype != 1 || fixed.hlen != 6 {
            return Err(CodecError::UnsupportedHardware {
                htype: fixed.htype,
                hlen: fixed.hlen,
            });
        }
        if fixed.cookie != COOKIE {
            return Err(CodecError::MalformedMessage);
        }

        let options = parse_options(&buf[DhcpFixedPayload::BYTE_LEN..])?;

        Ok(Message {
            op: fixed.op,
            htype: fixed.htype,
            hlen: fixed.hlen,
            hops: fixed.hops,
            xid: fixed.xid,
            secs: fixed.secs,
            flags: fixed.flags,
            ciaddr: Ipv4Addr::from(fixed.ciaddr),
            yiaddr: Ipv4Addr::from(fixed.yiaddr),
            siaddr: Ipv4Addr::from(fixed.siaddr),
            giaddr: Ipv4Addr::from(fixed.giaddr),
            chaddr: MacAddr::new(fixed.chaddr),
            options,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let fixed = DhcpFixedPayload {
            op: self.op,
            htype: self.htype,
            hlen: self.hlen,
            hops: self.hops,
            xid: self.xid,
            secs: self.secs,
            flags: self.flags,
            ciaddr: self.ciaddr.octets(),
            yiaddr: self.yiaddr.octets(),
            siaddr: self.siaddr.octets(),
            giaddr: self.giaddr.octets(),
            chaddr: *self.chaddr.as_bytes(),
            pad_chaddr: [0u8; 10],
            pad_sname: [0u8; SNAME_LEN],
            pad_file: [0u8; FILE_LEN],
            cookie: COOKIE,
        };
        let mut buf = vec![0u8; DhcpFixedPayload::BYTE_LEN + 64];
        fixed.write_bytes(&mut buf[..DhcpFixedPayload::BYTE_LEN]);
        buf.truncate(DhcpFixedPayload::BYTE_LEN);
        for (opt_code, value) in self.options.iter() {
            buf.push(opt_code);
            buf.push(value.len() as u8);
            buf.extend_from_slice(value);
        }
        buf.push(code::END);
        buf
    }
}

fn parse_options(buf: &[u8]) -> Result<DhcpOptions, CodecError> {
    let mut opts = DhcpOptions::new();
    let mut i = 0;
    while i < buf.len() {
        let opt_code = buf[i];
        if opt_code == code::PAD {
            i += 1;
            continue;
        }
        if opt_code == code::END {
            break;
        }
        if i + 1 >= buf.len() {
            return Err(CodecError::MalformedMessage);
        }
        let len = buf[i + 1] as usize;
        let start = i + 2;
        let end = start + len;
        if end > buf.len() {
            return Err(CodecError::MalformedMessage);
        }
        opts.insert_raw(opt_code, buf[start..end].to_vec());
        i = end;
    }
    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        let mut m = Message {
            op: OP_BOOTREQUEST,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 0x1234_5678,
            secs: 3,
            flags: BROADCAST_FLAG,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: MacAddr::new([0xaa, 0xbb, 0xcc, 0x00, 0x00, 0x01]),
            options: DhcpOptions::new(),
        };
        m.options.set_message_type(MessageType::Discover);
        m.options.set_requested_ip(Ipv4Addr::new(192, 168, 1, 100));
        m.options.set_lease_time(300);
        m
    }

    #[test]
    fn round_trips_interpreted_fields() {
        let msg = sample();
        let encoded = msg.encode();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(
            Message::decode(&[0u8; 100]).unwrap_err(),
            CodecError::MalformedMessage
        );
    }

    #[test]
    fn rejects_bad_cookie() {
        let mut buf = sample().encode();
        let cookie_off = CHADDR_OFFSET + CHADDR_FULL_LEN + SNAME_LEN + FILE_LEN;
        buf[cookie_off] = 0;
        assert_eq!(
            Message::decode(&buf).unwrap_err(),
            CodecError::MalformedMessage
        );
    }

    #[test]
    fn rejects_non_ethernet_hardware() {
        let mut buf = sample().encode();
        buf[1] = 6; // htype should be 1 (ethernet)
        assert!(matches!(
            Message::decode(&buf).unwrap_err(),
            CodecError::UnsupportedHardware { .. }
        ));
    }

    #[test]
    fn rejects_truncated_option() {
        let mut buf = sample().encode();
        // corrupt the length byte of the first option to overrun the buffer
        let opt_start = CHADDR_OFFSET + CHADDR_FULL_LEN + SNAME_LEN + FILE_LEN + 4;
        buf[opt_start + 1] = 0xFF;
        assert_eq!(
            Message::decode(&buf).unwrap_err(),
            CodecError::MalformedMessage
        );
    }
}
