// IEEE 488.2 arbitrary block framing used by binary query responses:
//   definite form   `#<n><n length digits><payload>`
//   indefinite form `#0<payload>\n`

use std::io::Read;

use crate::error::{Error, Result};

fn malformed(msg:&str) -> Error { Error::MalformedBlock(msg.to_owned()) }

// Value of the single digit that follows `#`
pub fn length_digit_count(b:u8) -> Result<usize> {
	if b.is_ascii_digit() { Ok((b - b'0') as usize) }
	else { Err(malformed("Expected a digit after '#'")) }
}

pub fn parse_length(digits:&[u8]) -> Result<usize> {
	if digits.is_empty() || !digits.iter().all(|b| b.is_ascii_digit()) {
		return Err(malformed("Block length contains non-digit characters"));
	}
	std::str::from_utf8(digits)?
		.parse::<usize>()
		.map_err(|_| malformed("Block length doesn't fit in usize"))
}

// Extract the payload of a complete block response.  Leading whitespace is skipped and a single
// trailing terminator after a definite block is ignored.
pub fn parse_block(data:&[u8]) -> Result<&[u8]> {
	let start = data.iter().position(|b| !b.is_ascii_whitespace()).ok_or_else(|| malformed("Empty response"))?;
	let data = &data[start..];

	if data[0] != b'#' { return Err(malformed("Block doesn't start with '#'")); }
	let n = length_digit_count(*data.get(1).ok_or_else(|| malformed("Truncated block header"))?)?;

	if n == 0 {
		let body = &data[2..];
		return Ok(body.strip_suffix(b"\n").unwrap_or(body));
	}

	let digits = data.get(2..2 + n).ok_or_else(|| malformed("Truncated block length"))?;
	let len = parse_length(digits)?;
	let body = &data[2 + n..];
	if body.len() < len {
		return Err(Error::MalformedBlock(format!("Block declares {} bytes but only {} arrived", len, body.len())));
	}

	Ok(&body[..len])
}

// Streaming variant for transports without message framing.  Consumes the block and its
// terminator from `rdr`.
pub fn read_block<R: Read>(rdr:&mut R) -> Result<Vec<u8>> {
	let mut b = [0u8; 1];
	loop {
		rdr.read_exact(&mut b)?;
		if !b[0].is_ascii_whitespace() { break; }
	}
	if b[0] != b'#' { return Err(malformed("Block doesn't start with '#'")); }

	rdr.read_exact(&mut b)?;
	let n = length_digit_count(b[0])?;

	if n == 0 {
		let mut body = vec![];
		loop {
			rdr.read_exact(&mut b)?;
			if b[0] == b'\n' { return Ok(body); }
			body.push(b[0]);
		}
	}

	let mut digits = vec![0u8; n];
	rdr.read_exact(&mut digits)?;
	let len = parse_length(&digits)?;

	let mut body = vec![0u8; len];
	rdr.read_exact(&mut body)?;

	// Terminator after the payload
	rdr.read_exact(&mut b)?;
	if b[0] != b'\n' { return Err(malformed("Expected newline after block payload")); }

	Ok(body)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn definite_block() {
		assert_eq!(parse_block(b"#15hello\n").unwrap(), b"hello");
		assert_eq!(parse_block(b"#800000002\x01\x02").unwrap(), &[1, 2]);
	}

	#[test]
	fn payload_may_contain_newlines() {
		assert_eq!(parse_block(b"#14\n\n\n\n\n").unwrap(), b"\n\n\n\n");
	}

	#[test]
	fn indefinite_block() {
		assert_eq!(parse_block(b"#0abc\n").unwrap(), b"abc");
	}

	#[test]
	fn truncated_block_is_rejected() {
		assert!(parse_block(b"#210abc").is_err());
		assert!(parse_block(b"#9").is_err());
		assert!(parse_block(b"abc").is_err());
		assert!(parse_block(b"").is_err());
	}

	#[test]
	fn streaming_read_stops_after_terminator() {
		let mut rdr:&[u8] = b"#14\x00\x01\x02\x03\nrest";
		assert_eq!(read_block(&mut rdr).unwrap(), vec![0, 1, 2, 3]);
		assert_eq!(rdr, b"rest");
	}

	#[test]
	fn streaming_read_rejects_missing_terminator() {
		let mut rdr:&[u8] = b"#12abX";
		assert!(read_block(&mut rdr).is_err());
	}
}
