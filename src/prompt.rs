// Interactive selection on the terminal.  Bad input is reported and asked again; running out of
// input aborts.

use std::fmt::Display;
use std::io::{BufRead, Write};

use crate::channel::ChannelSet;
use crate::error::{Error, Result};

fn read_line<R: BufRead>(input:&mut R) -> Result<Option<String>> {
	let mut line = String::new();
	if input.read_line(&mut line)? == 0 { return Ok(None); }
	Ok(Some(line.trim().to_owned()))
}

pub fn parse_index(s:&str, count:usize) -> Result<usize> {
	match s.trim().parse::<usize>() {
		Ok(i) if i < count => Ok(i),
		_ => Err(Error::InvalidSelection{ input: s.to_owned(), count }),
	}
}

pub fn select_index<R: BufRead, W: Write, T: Display>(input:&mut R, output:&mut W, title:&str, items:&[T]) -> Result<usize> {
	if items.is_empty() {
		return Err(Error::InvalidSelection{ input: String::new(), count: 0 });
	}

	writeln!(output, "{}", title)?;
	for (i, item) in items.iter().enumerate() {
		writeln!(output, "  [{}] {}", i, item)?;
	}

	loop {
		writeln!(output, "Select by typing index")?;
		output.flush()?;
		let line = read_line(input)?.ok_or_else(|| Error::InvalidSelection{ input: "<end of input>".to_owned(), count: items.len() })?;
		match parse_index(&line, items.len()) {
			Ok(i)  => return Ok(i),
			Err(e) => writeln!(output, "{}", e)?,
		}
	}
}

pub fn select_channels<R: BufRead, W: Write>(input:&mut R, output:&mut W) -> Result<ChannelSet> {
	loop {
		writeln!(output, "What channel(s) are you using? [1-4, comma separated]")?;
		output.flush()?;
		let line = read_line(input)?.ok_or(Error::NoChannels)?;
		match line.parse::<ChannelSet>() {
			Ok(set) => return Ok(set),
			Err(e)  => writeln!(output, "{}", e)?,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn reprompts_until_valid_index() {
		let mut input = Cursor::new("7\nabc\n1\n");
		let mut output = vec![];
		let i = select_index(&mut input, &mut output, "Instrument list:", &["a", "b"]).unwrap();
		assert_eq!(i, 1);
		let text = String::from_utf8(output).unwrap();
		assert!(text.contains("  [0] a\n  [1] b\n"));
		assert_eq!(text.matches("Invalid selection").count(), 2);
	}

	#[test]
	fn end_of_input_aborts() {
		let mut input = Cursor::new("9\n");
		let mut output = vec![];
		assert!(matches!(select_index(&mut input, &mut output, "x", &["a"]), Err(Error::InvalidSelection{ .. })));
		assert!(select_index(&mut Cursor::new(""), &mut Vec::<u8>::new(), "x", &[] as &[&str]).is_err());
	}

	#[test]
	fn channel_prompt() {
		let mut input = Cursor::new("5\n2, 4\n");
		let mut output = vec![];
		let set = select_channels(&mut input, &mut output).unwrap();
		assert_eq!(set.iter().map(u8::from).collect::<Vec<u8>>(), vec![2, 4]);
		assert!(String::from_utf8(output).unwrap().contains("Invalid channel 5"));
	}
}
