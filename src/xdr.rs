
use std::io::{self, Error, ErrorKind};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::InvalidData, msg) }

// Number of zero bytes needed to bring `n` up to a multiple of four
fn padding(n:usize) -> usize { (4 - n % 4) % 4 }

#[derive(Default)]
pub struct Packer {
	buff: Vec<u8>
}

#[derive(Default)]
pub struct Unpacker {
	buff: Vec<u8>,
	pos: usize,
}

impl Packer {

	pub fn new() -> Self { Self::default() }

	pub fn reset(&mut self) { self.buff.clear(); }

	pub fn as_bytes(&self) -> &[u8] { &self.buff }

	// Every packing method adds a multiple of four bytes, so alignment holds as long as we started aligned
	pub fn pack_u32(&mut self, x:u32) -> io::Result<()> { self.buff.write_u32::<BigEndian>(x) }
	pub fn pack_i32(&mut self, x:i32) -> io::Result<()> { self.buff.write_i32::<BigEndian>(x) }

	pub fn pack_bool(&mut self, b:bool) -> io::Result<()> { self.pack_i32(if b { 1 } else { 0 }) }

	pub fn pack_enum(&mut self, x:i32) -> io::Result<()> { self.pack_i32(x) }

	pub fn pack_variable_len_opaque(&mut self, data:&[u8]) -> io::Result<()> {
		if data.len() > u32::MAX as usize {
			return Err(err("Opaque data too long for XDR"));
		}
		self.pack_u32(data.len() as u32)?;
		self.buff.extend_from_slice(data);
		let pad = padding(data.len());
		self.buff.extend(std::iter::repeat(0).take(pad));
		Ok(())
	}

	pub fn pack_string(&mut self, s:&str) -> io::Result<()> { self.pack_variable_len_opaque(s.as_bytes()) }

}

impl Unpacker {

	pub fn new() -> Self { Self::default() }

	pub fn reset(&mut self, data:&[u8]) {
		self.buff.clear();
		self.buff.extend_from_slice(data);
		self.pos = 0;
	}

	pub fn remaining(&self) -> &[u8] { &self.buff[self.pos..] }

	pub fn all_data_consumed(&self) -> bool { self.pos == self.buff.len() }

	fn take(&mut self, n:usize) -> io::Result<&[u8]> {
		if self.buff.len() - self.pos < n {
			return Err(err("Tried to read past the end of the XDR buffer"));
		}
		let start = self.pos;
		self.pos += n;
		Ok(&self.buff[start..self.pos])
	}

	pub fn unpack_u32(&mut self) -> io::Result<u32> { self.take(4).map(BigEndian::read_u32) }
	pub fn unpack_i32(&mut self) -> io::Result<i32> { self.take(4).map(BigEndian::read_i32) }

	// An enum is an i32 with a restricted set of values.  The set depends on the application, so at
	// this level an enum is the same as an i32
	pub fn unpack_enum(&mut self) -> io::Result<i32> { self.unpack_i32() }

	pub fn unpack_bool(&mut self) -> io::Result<bool> {
		match self.unpack_i32()? {
			0 => Ok(false),
			1 => Ok(true),
			_ => Err(err("Expected 0 or 1 for an XDR bool")),
		}
	}

	pub fn unpack_variable_len_opaque(&mut self) -> io::Result<Vec<u8>> {
		let n = self.unpack_u32()? as usize;
		let ans:Vec<u8> = self.take(n)?.to_vec();
		self.take(padding(n))?;
		Ok(ans)
	}

}
