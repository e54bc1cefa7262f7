//! Best-effort network helpers used when a server starts.
//!
//! Nothing here is allowed to fail a serve cycle; errors are logged and
//! swallowed.

use log::{info, warn};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::process::{Command, Stdio};

/// The machine's outward-facing IPv4 address, if it has one.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn local_ip() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 80)).ok()?;

    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if is_network_address(ip) => Some(ip),
        _ => None,
    }
}

fn is_network_address(ip: Ipv4Addr) -> bool {
    !ip.is_loopback() && !ip.is_unspecified()
}

/// Command that opens a URL with the platform's default handler.
fn browser_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

/// Opens `url` in the default browser without waiting for it.
pub fn open_browser(url: &str) {
    let result = Command::new(browser_command())
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match result {
        Ok(_) => info!(target: "server", "Opened browser at {}", url),
        Err(e) => warn!(target: "server", "Failed to open browser: {}", e),
    }
}
