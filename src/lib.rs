
// External data representation, a protocol for serializing data to be sent over the network
pub mod xdr;

// Remote procedure call, a protocol build on top of XDR to provide something like C-style function calls over the network
pub mod rpc;

// A protocol using RPC that's meant to communicate with instruments like oscilloscopes, power supplies, waveform generators, etc
pub mod vxi11;

// SCPI straight over TCP, for instruments that listen on a raw socket
pub mod socket;

// IEEE 488.2 binary block framing
pub mod ieee488;

// The transport trait the device drivers talk through
pub mod instrument;

// VISA-style resource strings and instrument discovery
pub mod resource;

// Module for the oscilloscopes we know how to drive
pub mod devices;

pub mod channel;
pub mod waveform;
pub mod wait;

pub mod config;
pub mod error;
pub mod output;
pub mod plot;
pub mod prompt;

pub use crate::channel::{Channel, ChannelSet};
pub use crate::error::{Error, Result};
pub use crate::instrument::{ByteOrder, Instrument};
pub use crate::waveform::{compute_time_axis, scale_samples, Preamble, Waveform};
