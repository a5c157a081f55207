//! Serial link to the bus adapter
//!
//! The BusPirate shows up as a USB serial device (FT232 based); it talks
//! 115200 8N1 without any flow control, both in its user terminal and in
//! binary mode.

use std::io;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

mod tty;

pub use self::tty::{
	SerialPort,
	open_serial_port,
};

/// default read timeout; long transfers raise it for their reply
pub const PORT_TIMEOUT: Duration = Duration::from_secs(1);

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Byte stream to the adapter
///
/// Reads must not block forever: when no data arrives within the port
/// timeout `read` fails with `io::ErrorKind::TimedOut`.
pub trait Port: io::Read + io::Write {
	/// drop everything received but not read yet
	fn discard_input(&mut self) -> io::Result<()>;

	fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl<'a, P: Port + ?Sized> Port for &'a mut P {
	fn discard_input(&mut self) -> io::Result<()> {
		(**self).discard_input()
	}

	fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
		(**self).set_timeout(timeout)
	}
}
