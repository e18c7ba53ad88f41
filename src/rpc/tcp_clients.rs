
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};
use log::{trace, warn};

use crate::xdr;
use super::{xdr_pack, xdr_unpack, LAST_FRAGMENT};

pub struct TcpClient {
	stream: TcpStream,
	pub prog: u32,
	pub vers: u32,
	pub lastxid: u32,
	pub packer: xdr::Packer,
	pub unpacker: xdr::Unpacker,
}

impl TcpClient {

	pub fn connect<A: ToSocketAddrs>(addr: A, prog: u32, vers: u32, timeout: Option<Duration>) -> io::Result<Self> {
		let stream = TcpStream::connect(addr)?;
		stream.set_read_timeout(timeout)?;
		stream.set_write_timeout(timeout)?;
		stream.set_nodelay(true)?;
		Ok(Self{ stream, prog, vers, lastxid: 0, packer: xdr::Packer::new(), unpacker: xdr::Unpacker::new() })
	}

	// Bump the xid and pack the call header; procedure arguments get packed after this
	pub fn start_call(&mut self, prc:u32) -> io::Result<()> {
		self.lastxid = self.lastxid.wrapping_add(1);
		self.packer.reset();
		xdr_pack::pack_callheader_no_auth(&mut self.packer, self.lastxid, self.prog, self.vers, prc)
	}

	// Send whatever is in the packer and leave the reply body in the unpacker
	pub fn do_call(&mut self) -> io::Result<()> {
		let call:&[u8] = self.packer.as_bytes();
		let mut send_bytes:Vec<u8> = Vec::with_capacity(call.len() + 4);
		send_bytes.write_u32::<BigEndian>(call.len() as u32 | LAST_FRAGMENT)?;
		send_bytes.extend_from_slice(call);
		self.stream.write_all(&send_bytes)?;
		trace!("RPC call xid={} prog={:#x} ({} bytes)", self.lastxid, self.prog, call.len());

		loop {
			let reply = self.read_record()?;
			self.unpacker.reset(&reply);

			let xid = xdr_unpack::unpack_xid(&mut self.unpacker)?;
			if xid == self.lastxid {
				xdr_unpack::unpack_reply_status(&mut self.unpacker)?;
				return Ok(());
			}

			// A reply to an earlier call that timed out on our side; drop it and keep reading
			warn!("Discarding stale RPC reply xid={} while waiting for xid={}", xid, self.lastxid);
		}
	}

	fn read_record(&mut self) -> io::Result<Vec<u8>> {
		let mut record:Vec<u8> = vec![];
		let mut last:bool = false;
		while !last {
			let header:u32 = self.stream.read_u32::<BigEndian>()?;
			last = (header & LAST_FRAGMENT) != 0;
			let n = (header & !LAST_FRAGMENT) as usize;

			let start = record.len();
			record.resize(start + n, 0);
			self.stream.read_exact(&mut record[start..])?;
		}
		Ok(record)
	}

}
