use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("RPC error: {0}")]
	Rpc(String),

	#[error("VXI-11 error {code}: {message}")]
	Vxi11 { code: i32, message: &'static str },

	#[error("Timed out: {0}")]
	Timeout(String),

	#[error("Malformed preamble: expected 10 fields, got {fields} in {response:?}")]
	MalformedPreamble { fields: usize, response: String },

	#[error("Invalid value {value:?} for preamble field {name}")]
	InvalidPreambleField { name: &'static str, value: String },

	#[error("Sample count mismatch: preamble declares {expected} points, received {actual}")]
	LengthMismatch { expected: usize, actual: usize },

	#[error("Malformed binary block: {0}")]
	MalformedBlock(String),

	#[error("Invalid channel {0}, expected 1 to 4")]
	InvalidChannel(u8),

	#[error("Invalid channel {0:?}, expected 1 to 4")]
	InvalidChannelName(String),

	#[error("No channels requested")]
	NoChannels,

	#[error("Invalid acquisition duration {0} s, expected more than 0 and at most 500")]
	InvalidDuration(f64),

	#[error("Invalid selection {input:?}, expected an index below {count}")]
	InvalidSelection { input: String, count: usize },

	#[error("Invalid resource address {0:?}")]
	InvalidResource(String),

	#[error("Waveform format is {0:?}, expected WORD")]
	UnexpectedFormat(crate::waveform::WaveformFormat),

	#[error("Transfer format must be set before reading waveform data")]
	TransferFormatNotSet,

	#[error("Unexpected response to {command}: {response:?}")]
	UnexpectedResponse { command: String, response: String },

	#[error("Response is not valid UTF-8")]
	Utf8(#[from] std::str::Utf8Error),

	#[error("Configuration error: {0}")]
	Config(#[from] config::ConfigError),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),

	#[error("Plot error: {0}")]
	Plot(String),
}
