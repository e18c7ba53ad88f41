// Decoding of InfiniiVision waveform transfers: the :WAVeform:PREamble? response and the raw
// sample block it describes.

use std::convert::TryFrom;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::{Error, Result};

pub const PREAMBLE_KEYS:[&str; 10] = [
	"format",
	"type",
	"points",
	"count",
	"xincrement",
	"xorigin",
	"xreference",
	"yincrement",
	"yorigin",
	"yreference",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveformFormat { Byte, Word, Ascii }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionType { Normal, PeakDetect, Average, HighResolution }

impl WaveformFormat {
	pub fn from_code(code:i32) -> Option<Self> { match code {
		0 => Some(WaveformFormat::Byte),
		1 => Some(WaveformFormat::Word),
		4 => Some(WaveformFormat::Ascii),
		_ => None,
	}}
}

impl AcquisitionType {
	pub fn from_code(code:i32) -> Option<Self> { match code {
		0 => Some(AcquisitionType::Normal),
		1 => Some(AcquisitionType::PeakDetect),
		2 => Some(AcquisitionType::Average),
		3 => Some(AcquisitionType::HighResolution),
		_ => None,
	}}
}

/// Scaling information for one completed acquisition of one source channel.
///
/// Field widths follow the instrument's declaration: the x scale is double precision, the y
/// scale single precision, and the reference points are integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preamble {
	pub format: WaveformFormat,
	pub acquisition_type: AcquisitionType,
	pub points: u32,
	pub count: u32,
	pub xincrement: f64,
	pub xorigin: f64,
	pub xreference: i32,
	pub yincrement: f32,
	pub yorigin: f32,
	pub yreference: i32,
}

fn invalid(name:&'static str, value:&str) -> Error {
	Error::InvalidPreambleField{ name, value: value.to_owned() }
}

// NR1 integers, or NR3 values that happen to be integral
fn parse_int<T: TryFrom<i64>>(name:&'static str, value:&str) -> Result<T> {
	let n:i64 = match value.parse::<i64>() {
		Ok(n) => n,
		Err(_) => {
			let x:f64 = value.parse().map_err(|_| invalid(name, value))?;
			if !x.is_finite() || x.fract() != 0.0 || x.abs() > i64::MAX as f64 { return Err(invalid(name, value)); }
			x as i64
		}
	};
	T::try_from(n).map_err(|_| invalid(name, value))
}

fn parse_f64(name:&'static str, value:&str) -> Result<f64> {
	match value.parse::<f64>() {
		Ok(x) if x.is_finite() => Ok(x),
		_ => Err(invalid(name, value)),
	}
}

fn parse_f32(name:&'static str, value:&str) -> Result<f32> {
	match value.parse::<f32>() {
		Ok(x) if x.is_finite() => Ok(x),
		_ => Err(invalid(name, value)),
	}
}

impl Preamble {

	pub fn parse(response:&str) -> Result<Self> {
		// The response is framed by a trailing newline that belongs to neither field
		let body = response.strip_suffix('\n').map(|s| s.strip_suffix('\r').unwrap_or(s)).unwrap_or(response);

		let fields:Vec<&str> = body.split(',').map(str::trim).collect();
		if fields.len() != PREAMBLE_KEYS.len() {
			return Err(Error::MalformedPreamble{ fields: fields.len(), response: response.to_owned() });
		}

		let format_code:i32 = parse_int("format", fields[0])?;
		let type_code:i32   = parse_int("type", fields[1])?;

		Ok(Preamble {
			format:           WaveformFormat::from_code(format_code).ok_or_else(|| invalid("format", fields[0]))?,
			acquisition_type: AcquisitionType::from_code(type_code).ok_or_else(|| invalid("type", fields[1]))?,
			points:           parse_int("points", fields[2])?,
			count:            parse_int("count", fields[3])?,
			xincrement:       parse_f64("xincrement", fields[4])?,
			xorigin:          parse_f64("xorigin", fields[5])?,
			xreference:       parse_int("xreference", fields[6])?,
			yincrement:       parse_f32("yincrement", fields[7])?,
			yorigin:          parse_f32("yorigin", fields[8])?,
			yreference:       parse_int("yreference", fields[9])?,
		})
	}

	pub fn points(&self) -> usize { self.points as usize }

}

impl FromStr for Preamble {
	type Err = Error;
	fn from_str(s:&str) -> Result<Self> { Preamble::parse(s) }
}

// time[i] = (i - xreference) * xincrement + xorigin
pub fn compute_time_axis(p:&Preamble) -> Vec<f64> {
	let xref = p.xreference as f64;
	(0..p.points).map(|i| (i as f64 - xref) * p.xincrement + p.xorigin).collect()
}

// voltage = (s - yreference) * yincrement + yorigin, evaluated in double precision
pub fn scale_samples(raw:&[i16], p:&Preamble) -> Vec<f64> {
	let yref = p.yreference as f64;
	let yinc = p.yincrement as f64;
	let yorg = p.yorigin as f64;
	raw.iter().map(|&s| (s as f64 - yref) * yinc + yorg).collect()
}

/// One channel of one acquisition in physical units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waveform {
	channel: Channel,
	preamble: Preamble,
	time: Vec<f64>,
	voltage: Vec<f64>,
}

impl Waveform {

	// The preamble must be the one fetched for this channel in this acquisition
	pub fn decode(channel:Channel, preamble:Preamble, raw:&[i16]) -> Result<Self> {
		if raw.len() != preamble.points() {
			return Err(Error::LengthMismatch{ expected: preamble.points(), actual: raw.len() });
		}

		let time = compute_time_axis(&preamble);
		let voltage = scale_samples(raw, &preamble);
		Ok(Waveform{ channel, preamble, time, voltage })
	}

	pub fn channel(&self) -> Channel { self.channel }
	pub fn preamble(&self) -> &Preamble { &self.preamble }
	pub fn time(&self) -> &[f64] { &self.time }
	pub fn voltage(&self) -> &[f64] { &self.voltage }

	pub fn len(&self) -> usize { self.time.len() }
	pub fn is_empty(&self) -> bool { self.time.is_empty() }

	pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
		self.time.iter().copied().zip(self.voltage.iter().copied())
	}

	pub fn voltage_range(&self) -> Option<(f64, f64)> {
		if self.voltage.is_empty() { return None; }
		let lo = self.voltage.iter().copied().fold(f64::INFINITY, f64::min);
		let hi = self.voltage.iter().copied().fold(f64::NEG_INFINITY, f64::max);
		Some((lo, hi))
	}

}
