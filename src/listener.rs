//! Listener (C6): a UDP socket loop. Binds with `SO_REUSEADDR`/`SO_BROADCAST`,
//! then spawns one handler task per datagram (spec §4.6/§5).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use socket2::{Domain, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{error, warn};

use crate::codec::SERVER_PORT;
use crate::config::Config;
use crate::handler;
use crate::store::Store;

const MAX_DATAGRAM: usize = 1024;

pub fn bind() -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    let addr: SocketAddr = ([0, 0, 0, 0], SERVER_PORT).into();
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

pub async fn run(socket: UdpSocket, store: Arc<Store>, config: Arc<Config>) {
    let socket = Arc::new(socket);
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, source) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(err) => {
                error!(%err, "socket recv failed");
                continue;
            }
        };
        if len == buf.len() {
            warn!(%source, "datagram truncated at {} bytes", MAX_DATAGRAM);
        }
        let datagram = buf[..len].to_vec();
        let store = Arc::clone(&store);
        let config = Arc::clone(&config);
        let socket = Arc::clone(&socket);
        tokio::spawn(async move {
            let reply = handler::handle(&store, &config, &datagram, source, Instant::now());
            if let Some((bytes, dest)) = reply {
                if let Err(err) = socket.send_to(&bytes, dest).await {
                    error!(%err, %dest, "socket send failed");
                }
            }
        });
    }
}
