use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use scope_capture::wait::Sleeper;
use scope_capture::{Error, Instrument, Result};

pub const IDN:&str = "KEYSIGHT TECHNOLOGIES,MSOX4154A,MY55000001,07.20.2019061800";

// Answers queries the way an InfiniiVision would, keyed on the current waveform source
#[derive(Default)]
pub struct ScriptedScope {
	pub sent: Vec<String>,
	pub preambles: HashMap<String, String>,
	pub data: HashMap<String, Vec<u8>>,
	source: String,
	pending: Option<Vec<u8>>,
}

impl ScriptedScope {
	pub fn with_channel(mut self, source:&str, preamble:&str, samples:&[i16]) -> Self {
		self.preambles.insert(source.to_owned(), preamble.to_owned());
		let payload:Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
		let mut block = format!("#8{:08}", payload.len()).into_bytes();
		block.extend_from_slice(&payload);
		block.push(b'\n');
		self.data.insert(source.to_owned(), block);
		self
	}
}

impl Instrument for ScriptedScope {
	fn write(&mut self, data:&[u8]) -> Result<()> {
		let cmd = String::from_utf8_lossy(data).trim_end().to_owned();
		self.pending = match cmd.as_str() {
			"*IDN?" => Some(format!("{}\n", IDN).into_bytes()),
			":OPERegister:CONDition?" => Some(b"+0\n".to_vec()),
			":WAVeform:PREamble?" => self.preambles.get(&self.source).map(|p| p.clone().into_bytes()),
			":WAVeform:DATA?" => self.data.get(&self.source).cloned(),
			_ => {
				if let Some(src) = cmd.strip_prefix(":WAVeform:SOURce ") { self.source = src.to_owned(); }
				None
			},
		};
		self.sent.push(cmd);
		Ok(())
	}

	fn read(&mut self) -> Result<Vec<u8>> {
		self.pending.take().ok_or_else(|| Error::Timeout("nothing to read".to_owned()))
	}
}

#[derive(Default)]
pub struct RecordingSleeper {
	pub slept: RefCell<Vec<Duration>>,
}

impl Sleeper for &RecordingSleeper {
	fn sleep(&self, d:Duration) { self.slept.borrow_mut().push(d) }
}
