
use std::io::{self, Error, ErrorKind};

use crate::xdr::Unpacker;
use crate::rpc::{REPLY, MSG_DENIED, RPC_MISMATCH, AUTH_ERROR, MSG_ACCEPTED, PROG_UNAVAIL, PROG_MISMATCH, PROC_UNAVAIL, GARBAGE_ARGS, SUCCESS};

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::Other, msg) }

#[derive(Debug, PartialEq)]
pub struct Auth {
	pub flavor: i32,
	pub body: Vec<u8>,
}

pub fn unpack_auth(unpacker:&mut Unpacker) -> io::Result<Auth> {
	let flavor:i32  = unpacker.unpack_enum()?;
	let body:Vec<u8> = unpacker.unpack_variable_len_opaque()?;
	Ok(Auth{ flavor, body })
}

// Only the xid is read before anything can fail, so callers can tell a stale reply from a failed one
pub fn unpack_xid(unpacker:&mut Unpacker) -> io::Result<u32> {
	let xid:u32 = unpacker.unpack_u32()?;

	let mtype:i32 = unpacker.unpack_enum()?;
	if mtype != REPLY { return Err(err("Expected REPLY message type in RPC reply header")); }

	Ok(xid)
}

// Everything in the reply header after the xid and message type
pub fn unpack_reply_status(unpacker:&mut Unpacker) -> io::Result<Auth> {
	match unpacker.unpack_enum()? {
		MSG_DENIED => {
			match unpacker.unpack_enum()? {
				RPC_MISMATCH => {
					unpacker.unpack_u32()?;	// lowest supported version
					unpacker.unpack_u32()?;	// highest supported version
					return Err(err("Message denied due to RPC_MISMATCH"))
				},
				AUTH_ERROR => {
					unpacker.unpack_u32()?;	// auth_stat
					return Err(err("Message denied due to AUTH_ERROR"))
				}
				_ => return Err(err("Message denied for an unknown reason")),
			}
		},
		MSG_ACCEPTED => { },
		_            => return Err(err("Neither MSG_DENIED nor MSG_ACCEPTED in RPC reply header")),
	}

	let verf = unpack_auth(unpacker)?;

	match unpacker.unpack_enum()? {
		SUCCESS       => Ok(verf),
		PROG_UNAVAIL  => Err(err("Program unavailable")),
		PROG_MISMATCH => {
			unpacker.unpack_u32()?;
			unpacker.unpack_u32()?;
			Err(err("Program version mismatch"))
		},
		PROC_UNAVAIL  => Err(err("Procedure unavailable")),
		GARBAGE_ARGS  => Err(err("Server could not decode arguments")),
		_             => Err(err("Call failed for an unknown reason")),
	}
}
