//! Allocation view (C7): a read-only snapshot of address -> (holder, remaining)
//! for the operator UI collaborator. One row per address the pool was ever
//! configured with.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::lease::LeaseState;
use crate::mac::MacAddr;

#[derive(Debug, Clone, Copy)]
pub struct AllocationRow {
    pub ip: Ipv4Addr,
    pub holder: Option<MacAddr>,
    pub state: Option<LeaseState>,
    pub remaining: Duration,
}

pub type AllocationView = Vec<AllocationRow>;
