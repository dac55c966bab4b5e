//! DHCP option TLV codes and a typed view over the raw option map.
//!
//! The decoder keeps every option it sees (`BTreeMap<u8, Vec<u8>>`, keyed by
//! code) regardless of whether the handler interprets it; only the codes
//! named below are ever read or written by the protocol logic.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

pub mod code {
    pub const PAD: u8 = 0;
    pub const SUBNET_MASK: u8 = 1;
    pub const ROUTER: u8 = 3;
    pub const DOMAIN_NAME_SERVER: u8 = 6;
    pub const DOMAIN_NAME: u8 = 15;
    pub const BROADCAST_ADDR: u8 = 28;
    pub const REQUESTED_IP_ADDRESS: u8 = 50;
    pub const ADDRESS_LEASE_TIME: u8 = 51;
    pub const OPTION_OVERLOAD: u8 = 52;
    pub const MESSAGE_TYPE: u8 = 53;
    pub const SERVER_IDENTIFIER: u8 = 54;
    pub const PARAMETER_REQUEST_LIST: u8 = 55;
    pub const MESSAGE: u8 = 56;
    pub const MAX_MESSAGE_SIZE: u8 = 57;
    pub const RENEWAL_TIME: u8 = 58;
    pub const REBINDING_TIME: u8 = 59;
    pub const END: u8 = 255;
}

/// Message type values carried in option 53.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl MessageType {
    pub fn from_u8(v: u8) -> Option<Self> {
        use MessageType::*;
        Some(match v {
            1 => Discover,
            2 => Offer,
            3 => Request,
            4 => Decline,
            5 => Ack,
            6 => Nak,
            7 => Release,
            8 => Inform,
            _ => return None,
        })
    }
}

/// Raw option map plus typed accessors for the codes this server interprets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DhcpOptions {
    raw: BTreeMap<u8, Vec<u8>>,
}

impl DhcpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: u8) -> Option<&[u8]> {
        self.raw.get(&code).map(Vec::as_slice)
    }

    pub fn insert_raw(&mut self, code: u8, value: Vec<u8>) {
        self.raw.insert(code, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.raw.iter().map(|(&c, v)| (c, v.as_slice()))
    }

    pub fn message_type(&self) -> Option<MessageType> {
        let b = self.get(code::MESSAGE_TYPE)?;
        MessageType::from_u8(*b.first()?)
    }

    pub fn set_message_type(&mut self, mt: MessageType) {
        self.insert_raw(code::MESSAGE_TYPE, vec![mt as u8]);
    }

    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        ipv4_from_bytes(self.get(code::REQUESTED_IP_ADDRESS)?)
    }

    pub fn set_requested_ip(&mut self, ip: Ipv4Addr) {
        self.insert_raw(code::REQUESTED_IP_ADDRESS, ip.octets().to_vec());
    }

    pub fn requested_lease_time(&self) -> Option<u32> {
        u32_from_bytes(self.get(code::ADDRESS_LEASE_TIME)?)
    }

    pub fn set_lease_time(&mut self, secs: u32) {
        self.insert_raw(code::ADDRESS_LEASE_TIME, secs.to_be_bytes().to_vec());
    }

    pub fn set_renewal_time(&mut self, secs: u32) {
        self.insert_raw(code::RENEWAL_TIME, secs.to_be_bytes().to_vec());
    }

    pub fn set_rebinding_time(&mut self, secs: u32) {
        self.insert_raw(code::REBINDING_TIME, secs.to_be_bytes().to_vec());
    }

    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        ipv4_from_bytes(self.get(code::SERVER_IDENTIFIER)?)
    }

    pub fn set_server_identifier(&mut self, ip: Ipv4Addr) {
        self.insert_raw(code::SERVER_IDENTIFIER, ip.octets().to_vec());
    }

    pub fn set_ipv4(&mut self, code: u8, ip: Ipv4Addr) {
        self.insert_raw(code, ip.octets().to_vec());
    }

    pub fn set_ipv4_list(&mut self, code: u8, ips: &[Ipv4Addr]) {
        let mut buf = Vec::with_capacity(ips.len() * 4);
        for ip in ips {
            buf.extend_from_slice(&ip.octets());
        }
        self.insert_raw(code, buf);
    }

    pub fn set_string(&mut self, code: u8, s: &str) {
        self.insert_raw(code, s.as_bytes().to_vec());
    }

    pub fn set_u16(&mut self, code: u8, v: u16) {
        self.insert_raw(code, v.to_be_bytes().to_vec());
    }

    pub fn set_message(&mut self, msg: &str) {
        self.set_string(code::MESSAGE, msg);
    }
}

fn ipv4_from_bytes(b: &[u8]) -> Option<Ipv4Addr> {
    if b.len() != 4 {
        return None;
    }
    Some(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
}

fn u32_from_bytes(b: &[u8]) -> Option<u32> {
    if b.len() != 4 {
        return None;
    }
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}
