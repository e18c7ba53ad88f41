
pub const PMAP_PROG:u32 = 100000;
pub const PMAP_VERS:u32 = 2;
pub const PMAP_PORT:u16 = 111;

pub const PMAPPROC_GETPORT:u32 = 3;     // (mapping) -> unsigned int

use std::io::{self, Error, ErrorKind};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::xdr::Unpacker;

use super::{IPPROTO_TCP, IPPROTO_UDP};
use super::xdr_pack;
use super::tcp_clients::TcpClient;
use super::udp_clients::BroadcastUdpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
	TCP,
	UDP,
}

impl Protocol {
	pub fn to_u32(self) -> u32 { match self {
		Protocol::TCP => IPPROTO_TCP,
		Protocol::UDP => IPPROTO_UDP,
	}}
}

#[derive(Debug, Clone, Copy)]
pub struct Mapping {
	pub program: u32,
	pub version: u32,
	pub protocol: Protocol,
	pub port: u32,				// XDR encodes ports as u32
}

fn unpack_port(unpacker:&Unpacker, port:u32) -> io::Result<u16> {
	if !unpacker.all_data_consumed() {
		return Err(Error::new(ErrorKind::Other, "Data unexpectedly left over in unpacker after unpacking port"));
	}
	if port > u16::MAX as u32 {
		return Err(Error::new(ErrorKind::InvalidData, "Port mapper returned a port outside the u16 range"));
	}
	Ok(port as u16)
}

pub struct TcpPortMapperClient {
	pub host: String,
	tcp_client: TcpClient,
}

impl TcpPortMapperClient {

	pub fn new(host:&str, timeout:Option<Duration>) -> io::Result<Self> {
		let tcp_client = TcpClient::connect((host, PMAP_PORT), PMAP_PROG, PMAP_VERS, timeout)?;
		Ok(Self{ host: host.to_owned(), tcp_client })
	}

	// Zero means the program isn't registered
	pub fn get_port(&mut self, m:&Mapping) -> io::Result<u16> {
		self.tcp_client.start_call(PMAPPROC_GETPORT)?;
		xdr_pack::pack_mapping(&mut self.tcp_client.packer, m.program, m.version, m.protocol.to_u32(), m.port)?;
		self.tcp_client.do_call()?;

		let port:u32 = self.tcp_client.unpacker.unpack_u32()?;
		unpack_port(&self.tcp_client.unpacker, port)
	}

}

// Ask every port mapper on the local broadcast domain where the mapped program lives.  Hosts that
// answer with port zero don't have the program registered and are left out.
pub fn broadcast_get_port(m:&Mapping, target:Ipv4Addr, listen:Duration) -> io::Result<Vec<(IpAddr, u16)>> {
	let mut client = BroadcastUdpClient::bind(PMAP_PORT, PMAP_PROG, PMAP_VERS)?;
	client.start_call(PMAPPROC_GETPORT)?;
	xdr_pack::pack_mapping(&mut client.packer, m.program, m.version, m.protocol.to_u32(), m.port)?;

	let mut ans = vec![];
	for (addr, body) in client.make_call(target, listen)? {
		let mut unpacker = Unpacker::new();
		unpacker.reset(&body);
		let port:u32 = unpacker.unpack_u32()?;
		let port = unpack_port(&unpacker, port)?;
		if port != 0 { ans.push((addr, port)); }
	}

	Ok(ans)
}
