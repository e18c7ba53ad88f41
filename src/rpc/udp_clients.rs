
use std::collections::BTreeSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use log::debug;

use crate::xdr;
use super::{xdr_pack, xdr_unpack};

// Sends a single RPC call to the broadcast address and collects every matching reply
pub struct BroadcastUdpClient {
	socket: UdpSocket,
	pub prog: u32,
	pub vers: u32,
	pub port: u16,
	pub lastxid: u32,
	pub packer: xdr::Packer,
	pub unpacker: xdr::Unpacker,
	recv_buff: [u8; 8192],
}

impl BroadcastUdpClient {

	pub fn bind(port:u16, prog: u32, vers: u32) -> io::Result<Self> {
		let socket:UdpSocket = UdpSocket::bind("0.0.0.0:0")?;
		socket.set_broadcast(true)?;

		Ok(Self{ socket, prog, vers, port, lastxid: 0, packer: xdr::Packer::new(), unpacker: xdr::Unpacker::new(), recv_buff: [0; 8192] })
	}

	pub fn start_call(&mut self, prc:u32) -> io::Result<()> {
		self.lastxid = self.lastxid.wrapping_add(1);
		self.packer.reset();
		xdr_pack::pack_callheader_no_auth(&mut self.packer, self.lastxid, self.prog, self.vers, prc)
	}

	// Returns the sender and the reply body of every accepted reply that arrives before the deadline
	pub fn make_call(&mut self, target:Ipv4Addr, listen:Duration) -> io::Result<Vec<(IpAddr, Vec<u8>)>> {
		let sent = self.socket.send_to(self.packer.as_bytes(), (target, self.port))?;
		if sent != self.packer.as_bytes().len() {
			return Err(io::Error::new(io::ErrorKind::Other, "Sent the wrong number of bytes"));
		}

		let deadline = Instant::now() + listen;
		let mut seen:BTreeSet<IpAddr> = BTreeSet::new();
		let mut replies = vec![];
		loop {
			let now = Instant::now();
			if now >= deadline { break; }
			self.socket.set_read_timeout(Some(deadline - now))?;

			let (n, addr):(usize, SocketAddr) = match self.socket.recv_from(&mut self.recv_buff) {
				Ok(x) => x,
				Err(ref e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => break,
				Err(e) => return Err(e),
			};

			self.unpacker.reset(&self.recv_buff[0..n]);
			let accepted = xdr_unpack::unpack_xid(&mut self.unpacker)
				.and_then(|xid| if xid == self.lastxid { xdr_unpack::unpack_reply_status(&mut self.unpacker).map(|_| true) } else { Ok(false) });

			match accepted {
				Ok(true) if seen.insert(addr.ip()) => replies.push((addr.ip(), self.unpacker.remaining().to_vec())),
				Ok(_)  => { },
				Err(e) => debug!("Ignoring broadcast reply from {}: {}", addr, e),
			}
		}

		Ok(replies)
	}

}
