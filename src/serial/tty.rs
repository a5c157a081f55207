use std::io::{
	self,
	Read,
	Write,
};
use std::path::Path;
use std::time::Duration;

use serialport::{
	ClearBuffer,
	DataBits,
	FlowControl,
	Parity,
	SerialPort as _,
	StopBits,
	TTYPort,
};

use super::{
	PORT_TIMEOUT,
	Port,
};

const BAUD_RATE: u32 = 115_200;

pub struct SerialPort {
	tty: TTYPort,
}

impl Read for SerialPort {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.tty.read(buf)
	}
}

impl Write for SerialPort {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.tty.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.tty.flush()
	}
}

impl Port for SerialPort {
	fn discard_input(&mut self) -> io::Result<()> {
		Ok(self.tty.clear(ClearBuffer::Input)?)
	}

	fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
		Ok(self.tty.set_timeout(timeout)?)
	}
}

// raw mode, 115200 8N1, no flow control, reads time out
pub fn open_serial_port(path: &Path) -> crate::AResult<SerialPort> {
	let mut tty = serialport::new(path.to_string_lossy(), BAUD_RATE)
		.data_bits(DataBits::Eight)
		.parity(Parity::None)
		.stop_bits(StopBits::One)
		.flow_control(FlowControl::None)
		.timeout(PORT_TIMEOUT)
		.open_native()?;

	// nobody else should talk to the adapter while we're using it
	tty.set_exclusive(true)?;
	tty.clear(ClearBuffer::All)?;

	Ok(SerialPort { tty })
}
