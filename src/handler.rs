//! Handler (C5): per-datagram protocol logic. Pure function from a decoded
//! request to an optional reply, so it can be driven directly by tests
//! without a real socket (spec §8).

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::codec::{code, CodecError, Message, MessageType, CLIENT_PORT};
use crate::config::Config;
use crate::error::HandlerError;
use crate::store::Store;

/// Advertise the ambient configuration options the corpus's DHCP servers
/// always attach (subnet mask, router, DNS, domain name, broadcast, max
/// message size), independent of message type.
fn advertise_config(reply: &mut Message, config: &Config) {
    reply.options.set_ipv4(code::SUBNET_MASK, config.subnet_mask);
    reply.options.set_ipv4(code::ROUTER, config.router);
    reply.options.set_ipv4_list(code::DOMAIN_NAME_SERVER, &config.dns_servers);
    reply.options.set_string(code::DOMAIN_NAME, &config.domain_name);
    reply.options.set_ipv4(code::BROADCAST_ADDR, config.broadcast_address);
    reply.options.set_u16(code::MAX_MESSAGE_SIZE, 1500);
}

/// Spec §4.1: unicast to `ciaddr` when the client already has one, else
/// broadcast. The request's broadcast flag is preserved in the reply's
/// `flags` field (see `Message::new_reply`) but never gates the destination.
fn destination(request: &Message) -> SocketAddr {
    if request.ciaddr != Ipv4Addr::UNSPECIFIED {
        SocketAddr::V4(SocketAddrV4::new(request.ciaddr, CLIENT_PORT))
    } else {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, CLIENT_PORT))
    }
}

fn nak(request: &Message, config: &Config, message: Option<&str>) -> Message {
    let mut reply = Message::new_reply(request, Ipv4Addr::UNSPECIFIED);
    reply.options.set_message_type(MessageType::Nak);
    reply.options.set_server_identifier(config.server_ip);
    if let Some(msg) = message {
        reply.options.set_message(msg);
    }
    reply
}

/// Handle one request datagram. Returns the encoded reply and the address it
/// should be sent to, or `None` if the request warrants no reply.
pub fn handle(
    store: &Store,
    config: &Config,
    buf: &[u8],
    source: SocketAddr,
    now: Instant,
) -> Option<(Vec<u8>, SocketAddr)> {
    let request = match Message::decode(buf) {
        Ok(m) => m,
        Err(err) => {
            match err {
                CodecError::MalformedMessage => warn!(%source, "malformed"),
                CodecError::UnsupportedHardware { htype, hlen } => {
                    warn!(%source, htype, hlen, "malformed")
                }
            }
            return None;
        }
    };

    let ha = request.chaddr;

    let Some(message_type) = request.message_type() else {
        warn!(%ha, "invalid message type, no reply");
        return None;
    };

    if matches!(
        message_type,
        MessageType::Discover | MessageType::Request
    ) && store.is_blocked(ha)
    {
        warn!(%ha, "blocklist_hit");
        let reply = nak(&request, config, Some("hardware address is blocked"));
        return Some((reply.encode(), destination(&request)));
    }

    match message_type {
        MessageType::Discover => handle_discover(store, config, &request, now),
        MessageType::Request => handle_request(store, config, &request, now),
        MessageType::Decline => {
            store.decline(ha);
            info!(%ha, "decline");
            None
        }
        MessageType::Release => {
            store.release(ha);
            info!(%ha, "release");
            None
        }
        MessageType::Inform => Some(handle_inform(config, &request)),
        other => {
            warn!(%ha, ?other, "invalid message type, no reply");
            None
        }
    }
}

fn handle_discover(
    store: &Store,
    config: &Config,
    request: &Message,
    now: Instant,
) -> Option<(Vec<u8>, SocketAddr)> {
    let ha = request.chaddr;
    let requested_ip = request.options.requested_ip();
    let requested_lease = match request.options.requested_lease_time() {
        Some(0) | None => config.lease_duration(),
        Some(secs) => Duration::from_secs(secs as u64),
    };

    let outcome = store.discover(ha, requested_ip, requested_lease, request.xid, now);
    let (offered_ip, lease) = match outcome {
        Ok(pair) => pair,
        Err(HandlerError::PoolExhausted) => {
            warn!(%ha, "pool_empty");
            let reply = nak(request, config, Some("no assignable address remains"));
            return Some((reply.encode(), destination(request)));
        }
        Err(other) => {
            warn!(%ha, %other, "discover rejected");
            return None;
        }
    };

    let mut reply = Message::new_reply(request, offered_ip);
    reply.options.set_message_type(MessageType::Offer);
    reply.options.set_server_identifier(config.server_ip);
    reply.options.set_lease_time(lease.as_secs() as u32);
    reply.options.set_renewal_time((lease.as_secs() / 2) as u32);
    reply
        .options
        .set_rebinding_time((lease.as_secs() * 7 / 8) as u32);
    advertise_config(&mut reply, config);
    info!(%ha, %offered_ip, lease_secs = lease.as_secs(), "offer");
    Some((reply.encode(), destination(request)))
}

fn handle_request(
    store: &Store,
    config: &Config,
    request: &Message,
    now: Instant,
) -> Option<(Vec<u8>, SocketAddr)> {
    let ha = request.chaddr;
    let target_ip = request.options.requested_ip().unwrap_or(request.ciaddr);

    match store.request(ha, target_ip, request.xid, now) {
        Ok(lease) => {
            let mut reply = Message::new_reply(request, target_ip);
            reply.options.set_message_type(MessageType::Ack);
            reply.options.set_server_identifier(config.server_ip);
            reply.options.set_lease_time(lease.as_secs() as u32);
            reply.options.set_renewal_time((lease.as_secs() / 2) as u32);
            reply
                .options
                .set_rebinding_time((lease.as_secs() * 7 / 8) as u32);
            advertise_config(&mut reply, config);
            info!(%ha, %target_ip, lease_secs = lease.as_secs(), "ack");
            Some((reply.encode(), destination(request)))
        }
        Err(err) => {
            warn!(%ha, %target_ip, %err, "nak");
            let reply = nak(request, config, Some(&err.to_string()));
            Some((reply.encode(), destination(request)))
        }
    }
}

fn handle_inform(config: &Config, request: &Message) -> (Vec<u8>, SocketAddr) {
    let mut reply = Message::new_reply(request, Ipv4Addr::UNSPECIFIED);
    reply.options.set_message_type(MessageType::Ack);
    reply.options.set_server_identifier(config.server_ip);
    advertise_config(&mut reply, config);
    info!(ha = %request.chaddr, "inform");
    (reply.encode(), destination(request))
}
