#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod bus;
pub mod buspirate;
pub mod discovery;
pub mod eeprom;
pub mod image;
pub mod serial;
pub mod sim;

use std::path::Path;

/// Parse a decimal number, or a hex number with "0x" prefix
pub fn parse_int(s: &str) -> AResult<usize> {
	let parsed = if s.starts_with("0x") || s.starts_with("0X") {
		usize::from_str_radix(&s[2..], 16)
	} else {
		s.parse::<usize>()
	};
	match parsed {
		Ok(v) => Ok(v),
		Err(e) => bail!("invalid number {:?}: {}", s, e),
	}
}

/// Open the adapter on the given tty and switch it to I2C mode
pub fn open_buspirate(device: &Path, config: &buspirate::I2cConfig) -> AResult<buspirate::BusPirate<serial::SerialPort>> {
	let port = with_context!(("couldn't open serial port {}", device.display()), {
		serial::open_serial_port(device)
	})?;
	buspirate::BusPirate::open_i2c(port, config)
}
