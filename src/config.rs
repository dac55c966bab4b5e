//! Process configuration (spec §6): parsed once at startup from CLI flags
//! (with environment-variable fallback via `clap`'s `env` feature) and
//! immutable for the life of the process.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "dhcpd", about = "A DHCPv4 lease server")]
pub struct Config {
    /// IPv4 address this server binds on and advertises as option 54.
    #[arg(long, env = "DHCPD_SERVER_IP")]
    pub server_ip: Ipv4Addr,

    /// Default lease duration, in seconds, used when a client omits option 51.
    #[arg(long = "lease-duration", env = "DHCPD_LEASE_DURATION", default_value_t = 60)]
    pub lease_duration_secs: u32,

    #[arg(long = "pool-file", env = "DHCPD_POOL_FILE")]
    pub pool_file_path: PathBuf,

    #[arg(long = "blocklist-file", env = "DHCPD_BLOCKLIST_FILE")]
    pub blocklist_file_path: PathBuf,

    #[arg(long = "log-file", env = "DHCPD_LOG_FILE")]
    pub log_file_path: Option<PathBuf>,

    #[arg(long, env = "DHCPD_SUBNET_MASK")]
    pub subnet_mask: Ipv4Addr,

    #[arg(long, env = "DHCPD_ROUTER")]
    pub router: Ipv4Addr,

    /// Comma-separated list of DNS server addresses.
    #[arg(long = "dns", env = "DHCPD_DNS", value_delimiter = ',')]
    pub dns_servers: Vec<Ipv4Addr>,

    #[arg(long = "domain-name", env = "DHCPD_DOMAIN_NAME")]
    pub domain_name: String,

    #[arg(long = "broadcast-address", env = "DHCPD_BROADCAST_ADDRESS")]
    pub broadcast_address: Ipv4Addr,
}

impl Config {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_duration_secs as u64)
    }
}
