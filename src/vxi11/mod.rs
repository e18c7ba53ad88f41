
// Device core
pub const DEVICE_CORE_PROG:u32  = 0x0607af;
pub const DEVICE_CORE_VERS:u32  = 1;
pub const CREATE_LINK:u32       = 10;
pub const DEVICE_WRITE:u32      = 11;
pub const DEVICE_READ:u32       = 12;
pub const DESTROY_LINK:u32      = 23;

pub const CLIENT_ID:i32 = 3333;
pub const DEFAULT_LOCK_TIMEOUT:u32 = 10000;
pub const DEFAULT_DEVICE_NAME:&str = "inst0";

pub const OPERATION_FLAGS_END:i32 = 8;

// Reason bits in a device_read reply
pub const REASON_REQCNT:i32 = 1;
pub const REASON_CHR:i32    = 2;
pub const REASON_END:i32    = 4;

// Largest chunk requested per device_read call
pub const READ_REQUEST_SIZE:u32 = 0x10_0000;

use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::instrument::Instrument;
use crate::rpc::port_mapping::{TcpPortMapperClient, Mapping, Protocol};
use crate::rpc::tcp_clients::TcpClient;

pub mod xdr_pack;

pub fn device_error(code:i32) -> Result<()> {
	let message = match code {
		0  => return Ok(()),
		1  => "Syntax error",
		3  => "Device not accessible",
		4  => "Invalid link identifier",
		5  => "Parameter error",
		6  => "Channel not established",
		8  => "Operation not supported",
		9  => "Out of resources",
		11 => "Device locked by another link",
		12 => "No lock held by this link",
		15 => return Err(Error::Timeout("VXI-11 I/O timeout".to_owned())),
		17 => "I/O error",
		21 => "Invalid address",
		23 => "Abort",
		29 => "Channel already established",
		_  => "Unknown error",
	};
	Err(Error::Vxi11{ code, message })
}

#[derive(Debug, Clone, Copy)]
pub struct Link {
	pub link_id: i32,
	pub max_recv_size: u32,
}

pub struct CoreClient {
	client: TcpClient,
	opt_link: Option<Link>,
	io_timeout_ms: u32,
}

impl CoreClient {

	fn get_link(&self) -> Result<Link> {
		self.opt_link.ok_or_else(|| Error::Rpc("No link".to_owned()))
	}

	pub fn new(host:&str, timeout:Duration) -> Result<Self> {

		// Find the port to use for the core program
		let mut pmap_client = TcpPortMapperClient::new(host, Some(timeout))?;

		let mapping = Mapping {
			program: DEVICE_CORE_PROG,
			version: DEVICE_CORE_VERS,
			protocol: Protocol::TCP,
			port: 0,
		};

		let port = pmap_client.get_port(&mapping)?;
		if port == 0 {
			return Err(Error::Rpc(format!("{} doesn't have the VXI-11 core program registered", host)));
		}
		debug!("VXI-11 core channel for {} on port {}", host, port);

		Self::connect(host, port, timeout)
	}

	// Core channel on a port that's already known, skipping the port mapper
	pub fn connect(host:&str, port:u16, timeout:Duration) -> Result<Self> {
		// The socket timeout leaves the instrument room to report its own I/O timeout first
		let io_timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
		let client = TcpClient::connect((host, port), DEVICE_CORE_PROG, DEVICE_CORE_VERS, Some(timeout + Duration::from_secs(1)))?;

		Ok(CoreClient { client, opt_link: None, io_timeout_ms })
	}

	// Connect and create a link to `device` in one step
	pub fn open(host:&str, device:&str, timeout:Duration) -> Result<Self> {
		let mut core = Self::new(host, timeout)?;
		core.create_link(device)?;
		Ok(core)
	}

	pub fn link(&self) -> Option<Link> { self.opt_link }

	pub fn create_link(&mut self, device:&str) -> Result<()> {
		if self.opt_link.is_some() {
			return Err(Error::Rpc("Already connected to a link".to_owned()));
		}

		self.client.start_call(CREATE_LINK)?;
		xdr_pack::pack_create_link_parms(&mut self.client.packer, CLIENT_ID, false, DEFAULT_LOCK_TIMEOUT, device)?;
		self.client.do_call()?;

		let error:i32         = self.client.unpacker.unpack_i32()?;
		let link_id:i32       = self.client.unpacker.unpack_i32()?;
		let _abort_port:u32   = self.client.unpacker.unpack_u32()?;
		let max_recv_size:u32 = self.client.unpacker.unpack_u32()?;
		device_error(error)?;

		info!("Created VXI-11 link {} to {} (max_recv_size={})", link_id, device, max_recv_size);
		self.opt_link = Some(Link{ link_id, max_recv_size });
		Ok(())
	}

	fn write_chunk(&mut self, link:&Link, chunk:&[u8], last:bool) -> Result<()> {
		self.client.start_call(DEVICE_WRITE)?;
		let flags = if last { OPERATION_FLAGS_END } else { 0 };
		xdr_pack::pack_device_write_parms(&mut self.client.packer, link.link_id, self.io_timeout_ms, DEFAULT_LOCK_TIMEOUT, flags, chunk)?;
		self.client.do_call()?;

		let error:i32 = self.client.unpacker.unpack_i32()?;
		let size:u32  = self.client.unpacker.unpack_u32()?;
		device_error(error)?;

		if size as usize != chunk.len() {
			return Err(Error::Rpc(format!("Device accepted {} of {} bytes", size, chunk.len())));
		}
		Ok(())
	}

	pub fn destroy_link(&mut self) -> Result<()> {
		let link = self.opt_link.take().ok_or_else(|| Error::Rpc("No link to destroy".to_owned()))?;

		self.client.start_call(DESTROY_LINK)?;
		xdr_pack::pack_device_link(&mut self.client.packer, link.link_id)?;
		self.client.do_call()?;

		device_error(self.client.unpacker.unpack_i32()?)?;
		info!("Destroyed VXI-11 link {}", link.link_id);
		Ok(())
	}

}

impl Instrument for CoreClient {

	// Messages longer than the device's receive buffer go out in several calls with END on the last one
	fn write(&mut self, data:&[u8]) -> Result<()> {
		let link = self.get_link()?;
		let chunk_size = (link.max_recv_size as usize).max(1);

		if data.is_empty() {
			return self.write_chunk(&link, data, true);
		}

		let mut chunks = data.chunks(chunk_size).peekable();
		while let Some(chunk) = chunks.next() {
			let last = chunks.peek().is_none();
			self.write_chunk(&link, chunk, last)?;
		}
		Ok(())
	}

	fn read(&mut self) -> Result<Vec<u8>> {
		let link = self.get_link()?;
		let mut ans:Vec<u8> = vec![];

		loop {
			self.client.start_call(DEVICE_READ)?;
			xdr_pack::pack_device_read_parms(&mut self.client.packer, link.link_id, READ_REQUEST_SIZE, self.io_timeout_ms, DEFAULT_LOCK_TIMEOUT, 0, 0)?;
			self.client.do_call()?;

			let error:i32    = self.client.unpacker.unpack_i32()?;
			let reason:i32   = self.client.unpacker.unpack_i32()?;
			let data:Vec<u8> = self.client.unpacker.unpack_variable_len_opaque()?;
			device_error(error)?;

			ans.extend_from_slice(&data);

			if reason & REASON_END != 0 { return Ok(ans); }
			if reason & (REASON_REQCNT | REASON_CHR) == 0 {
				return Err(Error::Rpc(format!("device_read returned reason {:#x} without END", reason)));
			}
		}
	}

}

impl Drop for CoreClient {

	fn drop(&mut self) {
		if self.opt_link.is_some() {
			if let Err(e) = self.destroy_link() {
				warn!("Unable to destroy VXI-11 link: {}", e);
			}
		}
	}

}
