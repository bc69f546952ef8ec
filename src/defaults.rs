use std::{net::Ipv4Addr, time::Duration};
use pnet::util::MacAddr;


pub fn interface() -> String { "eth0".to_string() }
pub fn vip_address() -> Ipv4Addr { VIP_ADDRESS }

pub const VIP_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 38, 1, 50);
pub const VIP_PREFIX_LEN: u8 = 24;

// gratuitous ARP burst
pub const BROADCAST_MAC_ADDRESS: MacAddr = MacAddr(0xff, 0xff, 0xff, 0xff, 0xff, 0xff);
pub const ANNOUNCE_COUNT: usize = 3;
pub const ANNOUNCE_INTERVAL: Duration = Duration::ZERO;

pub const LOG_PATTERN: &str = "vip: {d(%Y-%m-%d %H:%M:%S,%3f)} {l}: {m}{n}";
