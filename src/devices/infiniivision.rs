
use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::channel::{Channel, ChannelSet};
use crate::error::{Error, Result};
use crate::instrument::{ByteOrder, Instrument};
use crate::wait::WaitStrategy;
use crate::waveform::{Preamble, Waveform, WaveformFormat};

lazy_static! {
	static ref IDN_RE: Regex = Regex::new("^([^,]+),([^,]+),([^,]+),([^,\\s]+)").unwrap();
}

// :TIMebase:RANGe accepts up to 50 s/div across the ten divisions
pub const MAX_ACQUISITION_SECONDS:f64 = 500.0;

// Run bit of the operation status condition register
pub const OPER_RUN_BIT:u32 = 1 << 3;

pub const KNOWN_MANUFACTURERS:[&str; 2] = ["KEYSIGHT TECHNOLOGIES", "AGILENT TECHNOLOGIES"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
	pub manufacturer: String,
	pub model: String,
	pub serial_num: String,
	pub fw_version: String,
}

impl Identity {
	pub fn parse(idn:&str) -> Result<Self> {
		let caps = IDN_RE.captures(idn.trim()).ok_or_else(|| Error::UnexpectedResponse{ command: "*IDN?".to_owned(), response: idn.to_owned() })?;
		let field = |i:usize| caps.get(i).map(|m| m.as_str().trim().to_owned()).unwrap_or_default();
		Ok(Identity{ manufacturer: field(1), model: field(2), serial_num: field(3), fw_version: field(4) })
	}
}

pub fn validate_duration(seconds:f64) -> Result<Duration> {
	if seconds.is_finite() && seconds > 0.0 && seconds <= MAX_ACQUISITION_SECONDS {
		Ok(Duration::from_secs_f64(seconds))
	} else {
		Err(Error::InvalidDuration(seconds))
	}
}

// True while an acquisition is in progress
pub fn run_bit_set(inst:&mut dyn Instrument) -> Result<bool> {
	let cmd = ":OPERegister:CONDition?";
	let res = inst.query(cmd)?;
	let value:u32 = res.trim().trim_start_matches('+').parse()
		.map_err(|_| Error::UnexpectedResponse{ command: cmd.to_owned(), response: res.clone() })?;
	Ok(value & OPER_RUN_BIT != 0)
}

pub struct InfiniiVision<I: Instrument> {
	inst: I,
	identity: Identity,
	transfer_format_set: bool,
}

impl<I: Instrument> InfiniiVision<I> {

	pub fn new(mut inst:I) -> Result<Self> {
		let identity = Identity::parse(&inst.query("*IDN?")?)?;

		let manufacturer = identity.manufacturer.to_ascii_uppercase();
		if !KNOWN_MANUFACTURERS.iter().any(|m| manufacturer.starts_with(m)) {
			warn!("{} {} isn't a known InfiniiVision manufacturer; commands may not be understood", identity.manufacturer, identity.model);
		}
		info!("Connected to {} {} (serial {}, firmware {})", identity.manufacturer, identity.model, identity.serial_num, identity.fw_version);

		Ok(Self{ inst, identity, transfer_format_set: false })
	}

	pub fn identity(&self) -> &Identity { &self.identity }

	pub fn set_display(&mut self, ch:Channel, on:bool) -> Result<()> {
		self.inst.send(&format!(":CHANnel{}:DISPlay {}", ch.number(), if on {"ON"} else {"OFF"}))
	}

	// With several channels requested the rest get switched off so the record only holds what was asked for
	pub fn configure(&mut self, channels:&ChannelSet) -> Result<()> {
		if channels.is_empty() { return Err(Error::NoChannels); }

		for ch in channels.iter() {
			self.set_display(ch, true)?;
		}
		if channels.len() > 1 {
			for ch in Channel::all().filter(|ch| !channels.contains(*ch)) {
				self.set_display(ch, false)?;
			}
		}

		self.inst.send(":WAVeform:POINts:MODE MAX")
	}

	// Signed 16-bit words, least significant byte first
	pub fn set_transfer_format(&mut self) -> Result<()> {
		self.inst.send(":WAVeform:FORMat WORD")?;
		self.inst.send(":WAVeform:UNSigned 0")?;
		self.inst.send(":WAVeform:BYTeorder LSBFirst")?;
		self.transfer_format_set = true;
		Ok(())
	}

	// Sent as given; `Duration` would round anything below a nanosecond down to zero
	pub fn set_timebase_range(&mut self, seconds:f64) -> Result<()> {
		self.inst.send(&format!(":TIMebase:RANGe {}", seconds))
	}

	pub fn single(&mut self) -> Result<()> { self.inst.send(":SINGle") }

	pub fn acquire<W: WaitStrategy + ?Sized>(&mut self, seconds:f64, wait:&W) -> Result<()> {
		let window = validate_duration(seconds)?;
		self.set_timebase_range(seconds)?;
		self.single()?;
		info!("Single acquisition started over {} s", seconds);
		wait.wait(&mut self.inst, window)
	}

	pub fn operation_complete(&mut self) -> Result<bool> {
		Ok(self.inst.query("*OPC?")?.trim().trim_start_matches('+') == "1")
	}

	pub fn is_running(&mut self) -> Result<bool> { run_bit_set(&mut self.inst) }

	pub fn select_source(&mut self, ch:Channel) -> Result<()> {
		self.inst.send(&format!(":WAVeform:SOURce {}", ch.scpi_name()))
	}

	// Describes whichever channel is currently the waveform source
	pub fn read_preamble(&mut self) -> Result<Preamble> {
		Preamble::parse(&self.inst.query_raw(":WAVeform:PREamble?")?)
	}

	pub fn read_samples(&mut self, ch:Channel) -> Result<Vec<i16>> {
		if !self.transfer_format_set { return Err(Error::TransferFormatNotSet); }
		self.select_source(ch)?;
		let raw = self.inst.query_i16_block(":WAVeform:DATA?", ByteOrder::LsbFirst)?;
		debug!("{}: {} raw samples", ch, raw.len());
		Ok(raw)
	}

	// The preamble is fetched for this channel right before its data, never shared with another channel
	pub fn read_channel(&mut self, ch:Channel) -> Result<Waveform> {
		if !self.transfer_format_set { return Err(Error::TransferFormatNotSet); }
		self.select_source(ch)?;
		let preamble = self.read_preamble()?;
		if preamble.format != WaveformFormat::Word {
			return Err(Error::UnexpectedFormat(preamble.format));
		}
		let raw = self.read_samples(ch)?;
		Waveform::decode(ch, preamble, &raw)
	}

	pub fn capture<W: WaitStrategy + ?Sized>(&mut self, channels:&ChannelSet, seconds:f64, wait:&W) -> Result<Vec<Waveform>> {
		validate_duration(seconds)?;
		self.configure(channels)?;
		self.set_transfer_format()?;
		self.acquire(seconds, wait)?;
		channels.iter().map(|ch| self.read_channel(ch)).collect()
	}

	pub fn into_inner(self) -> I { self.inst }

}

#[cfg(test)]
mod tests {
	use std::convert::TryFrom;

	use super::*;
	use crate::instrument::fake::FakeInstrument;
	use crate::wait::{FixedDelay, FIXED_DELAY_MARGIN};
	use crate::wait::fake::FakeSleeper;

	const IDN:&[u8] = b"KEYSIGHT TECHNOLOGIES,DSOX3024T,MY00000001,07.50.2021102830\n";

	fn scope() -> InfiniiVision<FakeInstrument> {
		let mut inst = FakeInstrument::default();
		inst.respond(IDN);
		let mut scope = InfiniiVision::new(inst).unwrap();
		scope.inst.sent.clear();
		scope
	}

	fn ch(n:u8) -> Channel { Channel::try_from(n).unwrap() }

	#[test]
	fn identity_is_parsed() {
		let scope = scope();
		assert_eq!(scope.identity().model, "DSOX3024T");
		assert_eq!(scope.identity().fw_version, "07.50.2021102830");
	}

	#[test]
	fn single_channel_leaves_others_alone() {
		let mut scope = scope();
		scope.configure(&ChannelSet::single(ch(2))).unwrap();
		assert_eq!(scope.inst.sent, vec![":CHANnel2:DISPlay ON", ":WAVeform:POINts:MODE MAX"]);
	}

	#[test]
	fn multi_channel_disables_the_rest() {
		let mut scope = scope();
		scope.configure(&"1,3".parse().unwrap()).unwrap();
		assert_eq!(scope.inst.sent, vec![
			":CHANnel1:DISPlay ON",
			":CHANnel3:DISPlay ON",
			":CHANnel2:DISPlay OFF",
			":CHANnel4:DISPlay OFF",
			":WAVeform:POINts:MODE MAX",
		]);
	}

	#[test]
	fn duration_is_bounded() {
		let mut scope = scope();
		let sleeper = FakeSleeper::default();
		let wait = FixedDelay{ sleeper: &sleeper };
		assert!(matches!(scope.acquire(0.0, &wait), Err(Error::InvalidDuration(_))));
		assert!(matches!(scope.acquire(500.5, &wait), Err(Error::InvalidDuration(_))));
		assert!(scope.inst.sent.is_empty());

		scope.acquire(500.0, &wait).unwrap();
		assert_eq!(scope.inst.sent, vec![":TIMebase:RANGe 500", ":SINGle"]);
		assert_eq!(*sleeper.slept.borrow(), vec![Duration::from_secs(501)]);
	}

	#[test]
	fn sub_nanosecond_window_is_not_rounded() {
		let mut scope = scope();
		let sleeper = FakeSleeper::default();
		scope.acquire(1e-10, &FixedDelay{ sleeper: &sleeper }).unwrap();
		assert_eq!(scope.inst.sent, vec![":TIMebase:RANGe 0.0000000001", ":SINGle"]);
		assert_eq!(*sleeper.slept.borrow(), vec![FIXED_DELAY_MARGIN]);
	}

	#[test]
	fn samples_need_transfer_format() {
		let mut scope = scope();
		assert!(matches!(scope.read_samples(ch(1)), Err(Error::TransferFormatNotSet)));
		assert!(scope.inst.sent.is_empty());
	}

	#[test]
	fn read_channel_fetches_its_own_preamble() {
		let mut scope = scope();
		scope.set_transfer_format().unwrap();
		scope.inst.sent.clear();
		scope.inst
			.respond(b"+1,+0,+3,+1,+1.0E-03,+0.0E+00,+0,+1.0E-01,+5.0E-01,+0\n")
			.respond(b"#16\x00\x80\x00\x00\xff\x7f\n");

		let wf = scope.read_channel(ch(4)).unwrap();
		assert_eq!(scope.inst.sent, vec![
			":WAVeform:SOURce CHANnel4",
			":WAVeform:PREamble?",
			":WAVeform:SOURce CHANnel4",
			":WAVeform:DATA?",
		]);
		assert_eq!(wf.len(), 3);
		assert_eq!(wf.time(), &[0.0, 1e-3, 2e-3]);
		assert!((wf.voltage()[0] - (-32768.0 * 0.1f32 as f64 + 0.5)).abs() < 1e-9);
		assert_eq!(wf.voltage()[1], 0.5);
	}

	#[test]
	fn byte_format_preamble_is_rejected() {
		let mut scope = scope();
		scope.set_transfer_format().unwrap();
		scope.inst.respond(b"+0,+0,+3,+1,+1.0E-03,+0.0E+00,+0,+1.0E-01,+5.0E-01,+0\n");
		assert!(matches!(scope.read_channel(ch(1)), Err(Error::UnexpectedFormat(WaveformFormat::Byte))));
	}

	#[test]
	fn length_mismatch_is_reported() {
		let mut scope = scope();
		scope.set_transfer_format().unwrap();
		scope.inst
			.respond(b"+1,+0,+4,+1,+1.0E-03,+0.0E+00,+0,+1.0E-01,+5.0E-01,+0\n")
			.respond(b"#14\x00\x00\x00\x00\n");
		assert!(matches!(scope.read_channel(ch(1)), Err(Error::LengthMismatch{ expected: 4, actual: 2 })));
	}

	#[test]
	fn run_bit_and_opc() {
		let mut scope = scope();
		scope.inst.respond(b"+8\n").respond(b"+0\n").respond(b"1\n");
		assert!(scope.is_running().unwrap());
		assert!(!scope.is_running().unwrap());
		assert!(scope.operation_complete().unwrap());
	}
}
