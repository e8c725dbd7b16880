//! Wire formats
//!
//! PPP framing, the shared control packet layout of LCP/IPCP, PAP, and the
//! IPv4/UDP headers used by the tunnel.

pub mod control;
pub mod ipcp;
pub mod ipv4;
pub mod lcp;
pub mod pap;
pub mod ppp;
pub mod udp;
