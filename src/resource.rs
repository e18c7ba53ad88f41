// VISA-style resource strings for LAN instruments, and finding them

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::instrument::Instrument;
use crate::rpc::port_mapping::{broadcast_get_port, Mapping, Protocol};
use crate::socket::SocketClient;
use crate::vxi11::{CoreClient, DEFAULT_DEVICE_NAME, DEVICE_CORE_PROG, DEVICE_CORE_VERS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceAddress {
	// TCPIP[board]::host[::device][::INSTR]
	Vxi11 { board: u16, host: String, device: String },
	// TCPIP[board]::host::port::SOCKET
	Socket { board: u16, host: String, port: u16 },
}

impl ResourceAddress {

	pub fn vxi11(host:&str) -> Self {
		ResourceAddress::Vxi11{ board: 0, host: host.to_owned(), device: DEFAULT_DEVICE_NAME.to_owned() }
	}

	pub fn host(&self) -> &str {
		match self {
			ResourceAddress::Vxi11{ host, .. } | ResourceAddress::Socket{ host, .. } => host,
		}
	}

	pub fn open(&self, timeout:Duration) -> Result<Box<dyn Instrument>> {
		info!("Opening {}", self);
		match self {
			ResourceAddress::Vxi11{ host, device, .. } => Ok(Box::new(CoreClient::open(host, device, timeout)?)),
			ResourceAddress::Socket{ host, port, .. }  => Ok(Box::new(SocketClient::connect(host, *port, timeout)?)),
		}
	}

}

impl FromStr for ResourceAddress {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self> {
		let bad = || Error::InvalidResource(s.to_owned());
		let parts:Vec<&str> = s.trim().split("::").collect();

		let interface = parts[0].to_ascii_uppercase();
		let board_str = interface.strip_prefix("TCPIP").ok_or_else(bad)?;
		let board:u16 = if board_str.is_empty() { 0 } else { board_str.parse().map_err(|_| bad())? };

		let host = parts.get(1).filter(|h| !h.is_empty()).ok_or_else(bad)?.to_string();
		let rest:Vec<String> = parts[2..].iter().map(|p| p.to_string()).collect();
		let is = |p:&String, kw:&str| p.eq_ignore_ascii_case(kw);

		match rest.as_slice() {
			[] => Ok(ResourceAddress::Vxi11{ board, host, device: DEFAULT_DEVICE_NAME.to_owned() }),
			[kw] if is(kw, "INSTR") => Ok(ResourceAddress::Vxi11{ board, host, device: DEFAULT_DEVICE_NAME.to_owned() }),
			[kw] if is(kw, "SOCKET") => Err(bad()),
			[device] => Ok(ResourceAddress::Vxi11{ board, host, device: device.clone() }),
			[device, kw] if is(kw, "INSTR") && !device.is_empty() => Ok(ResourceAddress::Vxi11{ board, host, device: device.clone() }),
			[port, kw] if is(kw, "SOCKET") => Ok(ResourceAddress::Socket{ board, host, port: port.parse().map_err(|_| bad())? }),
			_ => Err(bad()),
		}
	}
}

impl std::convert::TryFrom<String> for ResourceAddress {
	type Error = Error;
	fn try_from(s:String) -> Result<Self> { s.parse() }
}

impl From<ResourceAddress> for String {
	fn from(r:ResourceAddress) -> String { r.to_string() }
}

impl fmt::Display for ResourceAddress {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		match self {
			ResourceAddress::Vxi11{ board, host, device } => write!(f, "TCPIP{}::{}::{}::INSTR", board, host, device),
			ResourceAddress::Socket{ board, host, port }  => write!(f, "TCPIP{}::{}::{}::SOCKET", board, host, port),
		}
	}
}

/// Configured resources first, then any VXI-11 instrument that answers a portmapper broadcast
/// within `broadcast`.  Duplicates are dropped, keeping the first occurrence.
pub fn list_resources(configured:&[ResourceAddress], broadcast:Option<Duration>) -> Vec<ResourceAddress> {
	let mut ans:Vec<ResourceAddress> = vec![];
	for r in configured {
		if !ans.contains(r) { ans.push(r.clone()); }
	}

	if let Some(listen) = broadcast {
		let mapping = Mapping{ program: DEVICE_CORE_PROG, version: DEVICE_CORE_VERS, protocol: Protocol::TCP, port: 0 };
		match broadcast_get_port(&mapping, Ipv4Addr::BROADCAST, listen) {
			Ok(found) => {
				info!("{} VXI-11 instrument(s) answered the broadcast", found.len());
				for (addr, _port) in found {
					let r = ResourceAddress::vxi11(&addr.to_string());
					if !ans.contains(&r) { ans.push(r); }
				}
			},
			Err(e) => warn!("VXI-11 discovery broadcast failed: {}", e),
		}
	}

	ans
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s:&str) -> ResourceAddress { s.parse().unwrap() }

	#[test]
	fn vxi11_forms() {
		assert_eq!(parse("TCPIP0::192.168.1.5::inst0::INSTR"), ResourceAddress::vxi11("192.168.1.5"));
		assert_eq!(parse("tcpip::192.168.1.5"), ResourceAddress::vxi11("192.168.1.5"));
		assert_eq!(parse("TCPIP::scope.lan::INSTR"), ResourceAddress::vxi11("scope.lan"));
		assert_eq!(parse("TCPIP1::10.0.0.2::gpib0,7"), ResourceAddress::Vxi11{ board: 1, host: "10.0.0.2".to_owned(), device: "gpib0,7".to_owned() });
	}

	#[test]
	fn socket_form() {
		let r = parse("TCPIP0::10.0.0.9::5025::SOCKET");
		assert_eq!(r, ResourceAddress::Socket{ board: 0, host: "10.0.0.9".to_owned(), port: 5025 });
		assert_eq!(r.host(), "10.0.0.9");
	}

	#[test]
	fn display_round_trips() {
		for s in &["TCPIP0::192.168.1.5::inst0::INSTR", "TCPIP2::h::5025::SOCKET"] {
			assert_eq!(parse(s).to_string(), *s);
		}
	}

	#[test]
	fn invalid_addresses() {
		for s in &["", "USB0::0x0957::0x1796::MY123::INSTR", "TCPIP0", "TCPIP0::::INSTR", "TCPIPx::h", "TCPIP0::h::SOCKET", "TCPIP0::h::notaport::SOCKET", "TCPIP0::h::a::b::c"] {
			assert!(s.parse::<ResourceAddress>().is_err(), "{} should be rejected", s);
		}
	}

	#[test]
	fn configured_resources_are_deduplicated() {
		let a = ResourceAddress::vxi11("a");
		let b = ResourceAddress::vxi11("b");
		assert_eq!(list_resources(&[a.clone(), b.clone(), a.clone()], None), vec![a, b]);
	}
}
