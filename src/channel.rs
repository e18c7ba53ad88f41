use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const NUM_CHANNELS:u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(u8);

impl Channel {
	pub fn number(self) -> u8 { self.0 }

	// Argument form used by :WAVeform:SOURce and friends
	pub fn scpi_name(self) -> String { format!("CHANnel{}", self.0) }

	pub fn all() -> impl Iterator<Item = Channel> { (1..=NUM_CHANNELS).map(Channel) }
}

impl TryFrom<u8> for Channel {
	type Error = Error;

	fn try_from(n:u8) -> Result<Self> {
		if (1..=NUM_CHANNELS).contains(&n) { Ok(Channel(n)) }
		else { Err(Error::InvalidChannel(n)) }
	}
}

impl From<Channel> for u8 {
	fn from(ch:Channel) -> u8 { ch.0 }
}

impl FromStr for Channel {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self> {
		let s = s.trim();
		let lower = s.to_ascii_lowercase();
		let digits = ["channel", "ch"].iter().find_map(|p| lower.strip_prefix(*p)).unwrap_or(&lower);
		let n:u8 = digits.parse().map_err(|_| Error::InvalidChannelName(s.to_owned()))?;
		Channel::try_from(n)
	}
}

impl fmt::Display for Channel {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result { write!(f, "CH{}", self.0) }
}

// Channels requested for one acquisition, always in ascending order and never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct ChannelSet(BTreeSet<Channel>);

impl ChannelSet {

	pub fn new<I: IntoIterator<Item = Channel>>(channels:I) -> Result<Self> {
		let set:BTreeSet<Channel> = channels.into_iter().collect();
		if set.is_empty() { Err(Error::NoChannels) }
		else { Ok(ChannelSet(set)) }
	}

	pub fn single(ch:Channel) -> Self { ChannelSet(std::iter::once(ch).collect()) }

	pub fn contains(&self, ch:Channel) -> bool { self.0.contains(&ch) }
	pub fn len(&self) -> usize { self.0.len() }
	pub fn is_empty(&self) -> bool { self.0.is_empty() }
	pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ { self.0.iter().copied() }

}

impl TryFrom<Vec<u8>> for ChannelSet {
	type Error = Error;

	fn try_from(v:Vec<u8>) -> Result<Self> {
		let channels = v.into_iter().map(Channel::try_from).collect::<Result<Vec<Channel>>>()?;
		ChannelSet::new(channels)
	}
}

impl From<ChannelSet> for Vec<u8> {
	fn from(set:ChannelSet) -> Vec<u8> { set.iter().map(u8::from).collect() }
}

// Comma or whitespace separated list such as "1,3" or "CH2 CH4"
impl FromStr for ChannelSet {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self> {
		let channels = s.split(|c:char| c == ',' || c.is_whitespace())
			.filter(|tok| !tok.is_empty())
			.map(Channel::from_str)
			.collect::<Result<Vec<Channel>>>()?;
		ChannelSet::new(channels)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn channel_bounds() {
		assert!(Channel::try_from(0).is_err());
		assert_eq!(Channel::try_from(4).unwrap().number(), 4);
		assert!(matches!(Channel::try_from(5), Err(Error::InvalidChannel(5))));
	}

	#[test]
	fn channel_names() {
		let ch:Channel = "CH2".parse().unwrap();
		assert_eq!(ch.scpi_name(), "CHANnel2");
		assert_eq!(ch.to_string(), "CH2");
		assert_eq!("Ch3".parse::<Channel>().unwrap().number(), 3);
		assert_eq!("CHANnel4".parse::<Channel>().unwrap().number(), 4);
	}

	#[test]
	fn unparsable_channel_keeps_its_text() {
		match "abc".parse::<Channel>() {
			Err(e @ Error::InvalidChannelName(_)) => assert_eq!(e.to_string(), "Invalid channel \"abc\", expected 1 to 4"),
			other => panic!("unexpected {:?}", other),
		}
		assert!(matches!("CH300".parse::<Channel>(), Err(Error::InvalidChannelName(ref s)) if s == "CH300"));
		assert!(matches!("ch9".parse::<Channel>(), Err(Error::InvalidChannel(9))));
	}

	#[test]
	fn set_is_sorted_and_deduplicated() {
		let set:ChannelSet = "3, 1 3".parse().unwrap();
		assert_eq!(set.iter().map(u8::from).collect::<Vec<u8>>(), vec![1, 3]);
	}

	#[test]
	fn empty_set_is_rejected() {
		assert!(matches!("".parse::<ChannelSet>(), Err(Error::NoChannels)));
		assert!("1,9".parse::<ChannelSet>().is_err());
	}

	#[test]
	fn set_deserializes_from_numbers() {
		let set:ChannelSet = serde_json::from_str("[2, 1]").unwrap();
		assert_eq!(serde_json::to_string(&set).unwrap(), "[1,2]");
		assert!(serde_json::from_str::<ChannelSet>("[]").is_err());
	}
}
