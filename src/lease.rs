//! Lease table (C3): in-memory bindings and pending offers, keyed by client
//! hardware address. See spec §3 for the invariants this type must uphold
//! and §4.3 for the operation contracts.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::error::HandlerError;
use crate::mac::MacAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    Offered,
    Bound,
}

#[derive(Debug, Clone)]
enum Entry {
    Pending {
        offered_ip: Ipv4Addr,
        requested_lease: Duration,
        xid: u32,
        created_at: Instant,
    },
    Bound {
        ip: Ipv4Addr,
        expires_at: Instant,
        xid: u32,
        lease: Duration,
    },
}

impl Entry {
    fn ip(&self) -> Ipv4Addr {
        match self {
            Entry::Pending { offered_ip, .. } => *offered_ip,
            Entry::Bound { ip, .. } => *ip,
        }
    }
}

/// One row of a [`LeaseTable::snapshot`]: what a client currently holds (or
/// is waiting to confirm) and when it will be reclaimed if untouched.
#[derive(Debug, Clone, Copy)]
pub struct Holding {
    pub ip: Ipv4Addr,
    pub state: LeaseState,
    pub remaining: Duration,
}

#[derive(Debug, Default)]
pub struct LeaseTable {
    entries: HashMap<MacAddr, Entry>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a DISCOVER's offer. Fails if `ha` already holds a confirmed
    /// binding for a *different* address (invariant 2/3): the caller should
    /// have already special-cased "re-offer the existing binding" before
    /// reaching here.
    pub fn record_offer(
        &mut self,
        ha: MacAddr,
        ip: Ipv4Addr,
        requested_lease: Duration,
        xid: u32,
        now: Instant,
    ) -> Result<(), HandlerError> {
        if let Some(Entry::Bound { ip: bound_ip, .. }) = self.entries.get(&ha) {
            if *bound_ip != ip {
                return Err(HandlerError::ConflictingBinding(ha));
            }
        }
        self.entries.insert(
            ha,
            Entry::Pending {
                offered_ip: ip,
                requested_lease,
                xid,
                created_at: now,
            },
        );
        Ok(())
    }

    /// Confirm (or renew) a binding for `ha` at `target_ip`. Succeeds if there
    /// is a matching `Pending` offer, or an existing `Bound` entry at the
    /// same address (renewal). Returns the lease duration now in effect.
    pub fn confirm_binding(
        &mut self,
        ha: MacAddr,
        target_ip: Ipv4Addr,
        xid: u32,
        now: Instant,
    ) -> Result<Duration, HandlerError> {
        match self.entries.get(&ha) {
            Some(Entry::Pending {
                offered_ip,
                requested_lease,
                ..
            }) if *offered_ip == target_ip => {
                let lease = *requested_lease;
                self.entries.insert(
                    ha,
                    Entry::Bound {
                        ip: target_ip,
                        expires_at: now + lease,
                        xid,
                        lease,
                    },
                );
                Ok(lease)
            }
            Some(Entry::Bound { ip, lease, .. }) if *ip == target_ip => {
                let lease = *lease;
                self.extend(ha, xid, now)
                    .expect("just matched a Bound entry above");
                Ok(lease)
            }
            _ => Err(HandlerError::NoMatchingOffer(ha)),
        }
    }

    /// Refresh `expires_at` on an existing `Bound` entry, reusing its stored
    /// lease duration. Returns the lease duration, or `None` if `ha` has no
    /// binding.
    pub fn extend(&mut self, ha: MacAddr, xid: u32, now: Instant) -> Option<Duration> {
        match self.entries.get_mut(&ha) {
            Some(Entry::Bound {
                expires_at,
                xid: stored_xid,
                lease,
                ..
            }) => {
                *expires_at = now + *lease;
                *stored_xid = xid;
                Some(*lease)
            }
            _ => None,
        }
    }

    /// Remove any entry for `ha` (Pending or Bound), returning its address.
    pub fn drop_any(&mut self, ha: MacAddr) -> Option<Ipv4Addr> {
        self.entries.remove(&ha).map(|e| e.ip())
    }

    /// RELEASE semantics: only drops a confirmed `Bound` entry; a bare
    /// `Pending` offer is left alone.
    pub fn release(&mut self, ha: MacAddr) -> Option<Ipv4Addr> {
        match self.entries.get(&ha) {
            Some(Entry::Bound { .. }) => self.entries.remove(&ha).map(|e| e.ip()),
            _ => None,
        }
    }

    /// The lease duration in effect for `ha`: the requested/default lease on
    /// a `Pending` offer, or the stored lease on a `Bound` entry.
    pub fn lease_duration(&self, ha: MacAddr) -> Option<Duration> {
        match self.entries.get(&ha) {
            Some(Entry::Pending { requested_lease, .. }) => Some(*requested_lease),
            Some(Entry::Bound { lease, .. }) => Some(*lease),
            None => None,
        }
    }

    pub fn pending_ip(&self, ha: MacAddr) -> Option<Ipv4Addr> {
        match self.entries.get(&ha) {
            Some(Entry::Pending { offered_ip, .. }) => Some(*offered_ip),
            _ => None,
        }
    }

    pub fn pending_xid(&self, ha: MacAddr) -> Option<u32> {
        match self.entries.get(&ha) {
            Some(Entry::Pending { xid, .. }) => Some(*xid),
            _ => None,
        }
    }

    pub fn bound_ip(&self, ha: MacAddr) -> Option<Ipv4Addr> {
        match self.entries.get(&ha) {
            Some(Entry::Bound { ip, .. }) => Some(*ip),
            _ => None,
        }
    }

    pub fn has_binding(&self, ha: MacAddr) -> bool {
        matches!(self.entries.get(&ha), Some(Entry::Bound { .. }))
    }

    pub fn has_pending(&self, ha: MacAddr) -> bool {
        matches!(self.entries.get(&ha), Some(Entry::Pending { .. }))
    }

    /// One sweep of the expiration scanner (C4). Returns the addresses
    /// reclaimed from expired bindings and from pending offers that were
    /// never confirmed within their grace period, tagged with the MAC that
    /// held each so the caller can log it.
    pub fn reclaim_expired(&mut self, now: Instant) -> Vec<(MacAddr, Ipv4Addr)> {
        let mut reclaimed = Vec::new();
        self.entries.retain(|ha, entry| match entry {
            Entry::Bound { ip, expires_at, .. } => {
                if *expires_at <= now {
                    reclaimed.push((*ha, *ip));
                    false
                } else {
                    true
                }
            }
            Entry::Pending {
                offered_ip,
                requested_lease,
                created_at,
                ..
            } => {
                if now.duration_since(*created_at) > *requested_lease {
                    reclaimed.push((*ha, *offered_ip));
                    false
                } else {
                    true
                }
            }
        });
        reclaimed
    }

    /// Consistent read of every current holding, for the allocation view (C7).
    pub fn snapshot(&self, now: Instant) -> HashMap<Ipv4Addr, (MacAddr, Holding)> {
        let mut out = HashMap::with_capacity(self.entries.len());
        for (ha, entry) in &self.entries {
            let (ip, state, remaining) = match entry {
                Entry::Bound { ip, expires_at, .. } => (
                    *ip,
                    LeaseState::Bound,
                    expires_at.saturating_duration_since(now),
                ),
                Entry::Pending {
                    offered_ip,
                    requested_lease,
                    created_at,
                    ..
                } => {
                    let grace_end = *created_at + *requested_lease;
                    (*offered_ip, LeaseState::Offered, grace_end.saturating_duration_since(now))
                }
            };
            out.insert(ip, (*ha, Holding { ip, state, remaining }));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(n: u8) -> MacAddr {
        MacAddr::new([0xaa, 0xbb, 0xcc, 0, 0, n])
    }

    fn ip(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 1, n)
    }

    #[test]
    fn offer_then_confirm_binds() {
        let mut table = LeaseTable::new();
        let now = Instant::now();
        table
            .record_offer(mac(1), ip(100), Duration::from_secs(60), 0xAAAA, now)
            .unwrap();
        let lease = table.confirm_binding(mac(1), ip(100), 0xAAAA, now).unwrap();
        assert_eq!(lease, Duration::from_secs(60));
        assert_eq!(table.bound_ip(mac(1)), Some(ip(100)));
    }

    #[test]
    fn confirm_mismatched_ip_fails() {
        let mut table = LeaseTable::new();
        let now = Instant::now();
        table
            .record_offer(mac(1), ip(100), Duration::from_secs(60), 1, now)
            .unwrap();
        let err = table.confirm_binding(mac(1), ip(101), 1, now).unwrap_err();
        assert_eq!(err, HandlerError::NoMatchingOffer(mac(1)));
    }

    #[test]
    fn renewal_extends_existing_binding() {
        let mut table = LeaseTable::new();
        let now = Instant::now();
        table
            .record_offer(mac(1), ip(100), Duration::from_secs(60), 1, now)
            .unwrap();
        table.confirm_binding(mac(1), ip(100), 1, now).unwrap();
        let later = now + Duration::from_secs(30);
        let lease = table.confirm_binding(mac(1), ip(100), 2, later).unwrap();
        assert_eq!(lease, Duration::from_secs(60));
    }

    #[test]
    fn release_only_drops_bound_entries() {
        let mut table = LeaseTable::new();
        let now = Instant::now();
        table
            .record_offer(mac(1), ip(100), Duration::from_secs(60), 1, now)
            .unwrap();
        assert_eq!(table.release(mac(1)), None);
        table.confirm_binding(mac(1), ip(100), 1, now).unwrap();
        assert_eq!(table.release(mac(1)), Some(ip(100)));
    }

    #[test]
    fn reclaim_expired_bindings_and_stale_offers() {
        let mut table = LeaseTable::new();
        let now = Instant::now();
        table
            .record_offer(mac(1), ip(100), Duration::from_secs(2), 1, now)
            .unwrap();
        table.confirm_binding(mac(1), ip(100), 1, now).unwrap();
        table
            .record_offer(mac(2), ip(101), Duration::from_secs(2), 2, now)
            .unwrap();

        let future = now + Duration::from_secs(3);
        let mut reclaimed = table.reclaim_expired(future);
        reclaimed.sort_by_key(|(_, ip)| *ip);
        assert_eq!(reclaimed, vec![(mac(1), ip(100)), (mac(2), ip(101))]);
        assert!(!table.has_binding(mac(1)));
        assert!(!table.has_pending(mac(2)));
    }
}
