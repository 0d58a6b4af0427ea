pub mod active_scanner;
pub mod bgp_stream;
pub mod route_leak;
pub mod threat_feed;
