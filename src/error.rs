//! Error taxonomy (spec §7). Protocol errors resolve to a NAK or a dropped
//! datagram, never a propagated `Err` past the handler; these types exist so
//! that each call site can log precisely and decide the right reply.

use thiserror::Error;

use crate::mac::MacAddr;

/// Errors the lease table / handler can hit while servicing a request.
/// None of these are fatal: the handler maps each to a NAK or silent drop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("no assignable address remains in the pool")]
    PoolExhausted,
    #[error("binding for {0} already exists with a different address")]
    ConflictingBinding(MacAddr),
    #[error("no matching pending offer for {0}")]
    NoMatchingOffer(MacAddr),
    #[error("hardware address {0} is blocked")]
    Blocked(MacAddr),
}

/// Best-effort persistence failures (pool file, blocklist file). Logged at
/// error level; the in-memory state remains authoritative and the protocol
/// action that triggered the write already completed.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
