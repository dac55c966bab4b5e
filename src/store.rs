//! Coordinates the pool (C2), lease table (C3), and allocation view (C7)
//! behind a fixed lock order (lease-table, then pool) so that compound
//! actions -- take-from-pool plus record-offer, or reclaim plus return-to-pool --
//! are atomic, per spec §4.3/§5.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{error, warn};

use crate::blocklist;
use crate::error::HandlerError;
use crate::lease::LeaseTable;
use crate::mac::MacAddr;
use crate::pool::Pool;
use crate::view::{AllocationRow, AllocationView};

pub struct Store {
    leases: Mutex<LeaseTable>,
    pool: Mutex<Pool>,
    view: Mutex<AllocationView>,
    all_addresses: Vec<Ipv4Addr>,
    pool_file: PathBuf,
    blocklist_file: PathBuf,
}

impl Store {
    pub fn new(initial_pool: Vec<Ipv4Addr>, pool_file: PathBuf, blocklist_file: PathBuf) -> Self {
        Store {
            all_addresses: initial_pool.clone(),
            leases: Mutex::new(LeaseTable::new()),
            pool: Mutex::new(Pool::new(initial_pool)),
            view: Mutex::new(Vec::new()),
            pool_file,
            blocklist_file,
        }
    }

    pub fn is_blocked(&self, ha: MacAddr) -> bool {
        match blocklist::load_from_file(&self.blocklist_file) {
            Ok(set) => set.contains(&ha),
            Err(err) => {
                warn!(%err, "failed to read blocklist file; treating as empty");
                false
            }
        }
    }

    fn persist_pool(&self, pool: &Pool) {
        if let Err(err) = pool.persist_to_file(&self.pool_file) {
            error!(%err, "failed to persist pool file");
        }
    }

    /// DISCOVER: returns the `(ip, lease)` to offer, or `Err(PoolExhausted)`.
    /// Reoffers an existing Bound/Pending entry verbatim when one exists
    /// (idempotence, spec §4.5); otherwise takes from the pool and records a
    /// fresh Pending offer atomically under the lease-table lock then the
    /// pool lock, in that fixed order (spec §4.4/§5).
    pub fn discover(
        &self,
        ha: MacAddr,
        requested_ip: Option<Ipv4Addr>,
        requested_lease: Duration,
        xid: u32,
        now: Instant,
    ) -> Result<(Ipv4Addr, Duration), HandlerError> {
        let mut leases = self.leases.lock().unwrap();

        if let Some(ip) = leases.bound_ip(ha) {
            let lease = leases.lease_duration(ha).unwrap_or(requested_lease);
            return Ok((ip, lease));
        }

        if let Some(pending_ip) = leases.pending_ip(ha) {
            if requested_ip.is_none() || requested_ip == Some(pending_ip) {
                let lease = leases.lease_duration(ha).unwrap_or(requested_lease);
                return Ok((pending_ip, lease));
            }
            // Requested IP disagrees with the outstanding offer: drop the
            // stale offer and fall through to take a fresh address.
            let stale_ip = leases.drop_any(ha).expect("pending entry observed above");
            let mut pool = self.pool.lock().unwrap();
            pool.return_addr(stale_ip);
            self.persist_pool(&pool);
        }

        let mut pool = self.pool.lock().unwrap();
        let ip = pool.try_take(requested_ip).ok_or(HandlerError::PoolExhausted)?;
        if let Err(err) = leases.record_offer(ha, ip, requested_lease, xid, now) {
            pool.return_addr(ip);
            return Err(err);
        }
        self.persist_pool(&pool);
        Ok((ip, requested_lease))
    }

    /// REQUEST: confirm a pending offer or renew an existing binding.
    pub fn request(
        &self,
        ha: MacAddr,
        target_ip: Ipv4Addr,
        xid: u32,
        now: Instant,
    ) -> Result<Duration, HandlerError> {
        let mut leases = self.leases.lock().unwrap();
        leases.confirm_binding(ha, target_ip, xid, now)
    }

    /// DECLINE: drop whatever entry `ha` holds and return its address to the pool.
    pub fn decline(&self, ha: MacAddr) {
        let mut leases = self.leases.lock().unwrap();
        if let Some(ip) = leases.drop_any(ha) {
            let mut pool = self.pool.lock().unwrap();
            pool.return_addr(ip);
            self.persist_pool(&pool);
        }
    }

    /// RELEASE: drop a confirmed binding (a bare pending offer is untouched)
    /// and return its address to the pool.
    pub fn release(&self, ha: MacAddr) {
        let mut leases = self.leases.lock().unwrap();
        if let Some(ip) = leases.release(ha) {
            let mut pool = self.pool.lock().unwrap();
            pool.return_addr(ip);
            self.persist_pool(&pool);
        }
    }

    /// One sweep of the expiration scanner (C4): reclaim expired bindings and
    /// stale pending offers, then refresh the allocation view.
    pub fn reclaim_expired(&self, now: Instant) -> Vec<(MacAddr, Ipv4Addr)> {
        let mut leases = self.leases.lock().unwrap();
        let mut pool = self.pool.lock().unwrap();
        let reclaimed = leases.reclaim_expired(now);
        for (_, ip) in &reclaimed {
            pool.return_addr(*ip);
        }
        if !reclaimed.is_empty() {
            self.persist_pool(&pool);
        }
        self.refresh_view_locked(&leases, &pool, now);
        reclaimed
    }

    fn refresh_view_locked(&self, leases: &LeaseTable, pool: &Pool, now: Instant) {
        let holdings = leases.snapshot(now);
        let mut rows = Vec::with_capacity(self.all_addresses.len());
        for ip in &self.all_addresses {
            if let Some((ha, holding)) = holdings.get(ip) {
                rows.push(AllocationRow {
                    ip: *ip,
                    holder: Some(*ha),
                    state: Some(holding.state),
                    remaining: holding.remaining,
                });
            } else {
                debug_assert!(pool.contains(*ip), "address neither pooled nor held: {ip}");
                rows.push(AllocationRow {
                    ip: *ip,
                    holder: None,
                    state: None,
                    remaining: Duration::ZERO,
                });
            }
        }
        *self.view.lock().unwrap() = rows;
    }

    /// Operator UI query (§6): the current allocation view.
    pub fn allocation_view(&self) -> AllocationView {
        self.view.lock().unwrap().clone()
    }

    /// Operator UI query (§6): the current free-pool contents, in order.
    pub fn pool_contents(&self) -> Vec<Ipv4Addr> {
        self.pool.lock().unwrap().snapshot()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.lock().unwrap().len()
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

    fn test_store(addrs: Vec<Ipv4Addr>) -> (Store, PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "dhcpd-store-test-{}-{:p}",
            std::process::id(),
            &addrs
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let pool_file = dir.join("pool.txt");
        let blocklist_file = dir.join("blocklist.txt");
        std::fs::write(&blocklist_file, "").unwrap();
        (Store::new(addrs, pool_file.clone(), blocklist_file.clone()), pool_file, blocklist_file)
    }

    #[test]
    fn discover_then_request_consumes_pool_head() {
        let (store, _pf, _bf) = test_store(vec![ip(100), ip(101)]);
        let now = Instant::now();
        let (offered, lease) = store
            .discover(mac(1), None, Duration::from_secs(60), 1, now)
            .unwrap();
        assert_eq!(offered, ip(100));
        assert_eq!(lease, Duration::from_secs(60));
        assert_eq!(store.pool_contents(), vec![ip(101)]);

        let lease = store.request(mac(1), ip(100), 1, now).unwrap();
        assert_eq!(lease, Duration::from_secs(60));
    }

    #[test]
    fn repeated_discover_is_idempotent() {
        let (store, _pf, _bf) = test_store(vec![ip(100), ip(101)]);
        let now = Instant::now();
        store.discover(mac(1), None, Duration::from_secs(60), 1, now).unwrap();
        let (offered_again, _) = store
            .discover(mac(1), None, Duration::from_secs(60), 1, now)
            .unwrap();
        assert_eq!(offered_again, ip(100));
        assert_eq!(store.pool_contents(), vec![ip(101)]);
    }

    #[test]
    fn pool_exhausted_yields_error() {
        let (store, _pf, _bf) = test_store(vec![]);
        let now = Instant::now();
        let err = store
            .discover(mac(1), None, Duration::from_secs(60), 1, now)
            .unwrap_err();
        assert_eq!(err, HandlerError::PoolExhausted);
    }

    #[test]
    fn release_returns_address_to_tail() {
        let (store, _pf, _bf) = test_store(vec![ip(100), ip(101)]);
        let now = Instant::now();
        store.discover(mac(1), Some(ip(101)), Duration::from_secs(300), 1, now).unwrap();
        store.request(mac(1), ip(101), 1, now).unwrap();
        assert_eq!(store.pool_contents(), vec![ip(100)]);
        store.release(mac(1));
        assert_eq!(store.pool_contents(), vec![ip(100), ip(101)]);
    }

    #[test]
    fn scanner_reclaims_expired_binding() {
        let (store, _pf, _bf) = test_store(vec![ip(100)]);
        let now = Instant::now();
        store.discover(mac(1), None, Duration::from_secs(2), 1, now).unwrap();
        store.request(mac(1), ip(100), 1, now).unwrap();
        assert!(store.pool_contents().is_empty());

        let later = now + Duration::from_secs(3);
        let reclaimed = store.reclaim_expired(later);
        assert_eq!(reclaimed, vec![(mac(1), ip(100))]);
        assert_eq!(store.pool_contents(), vec![ip(100)]);
    }
}
