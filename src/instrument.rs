// Transport seam between the oscilloscope driver and whatever carries the SCPI traffic

use std::str;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ieee488;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder { LsbFirst, MsbFirst }

pub fn decode_i16(payload:&[u8], order:ByteOrder) -> Result<Vec<i16>> {
	if payload.len() % 2 != 0 {
		return Err(Error::MalformedBlock(format!("{} bytes is not a whole number of 16-bit words", payload.len())));
	}
	let mut ans:Vec<i16> = vec![0; payload.len() / 2];
	match order {
		ByteOrder::LsbFirst => LittleEndian::read_i16_into(payload, &mut ans),
		ByteOrder::MsbFirst => BigEndian::read_i16_into(payload, &mut ans),
	}
	Ok(ans)
}

pub trait Instrument {

	fn write(&mut self, data:&[u8]) -> Result<()>;

	// One complete response message, terminator included
	fn read(&mut self) -> Result<Vec<u8>>;

	// IEEE 488.2 block payload
	fn read_block(&mut self) -> Result<Vec<u8>> {
		let msg = self.read()?;
		ieee488::parse_block(&msg).map(|b| b.to_vec())
	}

	fn send(&mut self, cmd:&str) -> Result<()> {
		debug!("-> {}", cmd);
		self.write(cmd.as_bytes())
	}

	// Response text exactly as received
	fn query_raw(&mut self, cmd:&str) -> Result<String> {
		self.send(cmd)?;
		let resp = self.read()?;
		let s = str::from_utf8(&resp)?.to_owned();
		debug!("<- {:?}", s);
		Ok(s)
	}

	fn query(&mut self, cmd:&str) -> Result<String> {
		self.query_raw(cmd).map(|s| s.trim_end_matches(|c| c == '\n' || c == '\r').to_owned())
	}

	fn query_block(&mut self, cmd:&str) -> Result<Vec<u8>> {
		self.send(cmd)?;
		let block = self.read_block()?;
		debug!("<- block of {} bytes", block.len());
		Ok(block)
	}

	fn query_i16_block(&mut self, cmd:&str, order:ByteOrder) -> Result<Vec<i16>> {
		decode_i16(&self.query_block(cmd)?, order)
	}

}

impl<I: Instrument + ?Sized> Instrument for Box<I> {
	fn write(&mut self, data:&[u8]) -> Result<()> { (**self).write(data) }
	fn read(&mut self) -> Result<Vec<u8>>          { (**self).read() }
	fn read_block(&mut self) -> Result<Vec<u8>>    { (**self).read_block() }
}

#[cfg(test)]
pub(crate) mod fake {
	use std::collections::VecDeque;

	use super::*;

	// Records every command and answers reads from a queue of canned responses
	#[derive(Default)]
	pub struct FakeInstrument {
		pub sent: Vec<String>,
		pub responses: VecDeque<Vec<u8>>,
	}

	impl FakeInstrument {
		pub fn respond(&mut self, resp:&[u8]) -> &mut Self {
			self.responses.push_back(resp.to_vec());
			self
		}
	}

	impl Instrument for FakeInstrument {
		fn write(&mut self, data:&[u8]) -> Result<()> {
			self.sent.push(String::from_utf8_lossy(data).into_owned());
			Ok(())
		}

		fn read(&mut self) -> Result<Vec<u8>> {
			self.responses.pop_front().ok_or_else(|| Error::Timeout("no canned response left".to_owned()))
		}
	}
}
