// SCPI over a plain TCP socket, the "SOCKET" resource class.  Messages are newline terminated and
// binary responses carry their own IEEE 488.2 length header.

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::ieee488;
use crate::instrument::Instrument;

pub const DEFAULT_SCPI_PORT:u16 = 5025;

pub struct SocketClient {
	stream: TcpStream,
	reader: BufReader<TcpStream>,
}

impl SocketClient {

	pub fn connect(host:&str, port:u16, timeout:Duration) -> Result<Self> {
		let stream = TcpStream::connect((host, port))?;
		stream.set_read_timeout(Some(timeout))?;
		stream.set_write_timeout(Some(timeout))?;
		stream.set_nodelay(true)?;
		let reader = BufReader::new(stream.try_clone()?);
		debug!("Connected to SCPI socket {}:{}", host, port);
		Ok(Self{ stream, reader })
	}

}

impl Instrument for SocketClient {

	fn write(&mut self, data:&[u8]) -> Result<()> {
		let mut msg:Vec<u8> = Vec::with_capacity(data.len() + 1);
		msg.extend_from_slice(data);
		if !data.ends_with(b"\n") { msg.push(b'\n'); }
		self.stream.write_all(&msg)?;
		Ok(())
	}

	fn read(&mut self) -> Result<Vec<u8>> {
		let mut line:Vec<u8> = vec![];
		let n = self.reader.read_until(b'\n', &mut line)?;
		if n == 0 {
			return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "Instrument closed the connection")));
		}
		Ok(line)
	}

	fn read_block(&mut self) -> Result<Vec<u8>> {
		ieee488::read_block(&mut self.reader)
	}

}

impl Drop for SocketClient {

	fn drop(&mut self) {
		if let Err(e) = self.stream.shutdown(Shutdown::Both) {
			warn!("Unable to shut down SCPI socket: {}", e);
		}
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Read;
	use std::net::TcpListener;
	use std::thread;

	#[test]
	fn text_and_block_over_loopback() {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();

		let server = thread::spawn(move || {
			let (mut conn, _) = listener.accept().unwrap();
			let mut buf = [0u8; 64];
			let n = conn.read(&mut buf).unwrap();
			assert_eq!(&buf[..n], b"*IDN?\n");
			conn.write_all(b"AGILENT,DSO-X 2024A,MY1,02.40\n#14\x01\x00\x02\x00\n").unwrap();
		});

		let mut client = SocketClient::connect("127.0.0.1", port, Duration::from_secs(5)).unwrap();
		assert_eq!(client.query("*IDN?").unwrap(), "AGILENT,DSO-X 2024A,MY1,02.40");
		assert_eq!(client.read_block().unwrap(), vec![1, 0, 2, 0]);
		server.join().unwrap();
	}
}
