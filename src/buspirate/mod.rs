//! BusPirate binary I2C mode
//!
//! Protocol summary (all replies are single bytes unless noted):
//! - user terminal: 20x `0x00` switches to binary mode, answer "BBIO1"
//! - binary mode: `0x02` enters I2C mode ("I2C1"), `0x0f` resets to the
//!   user terminal (0x01)
//! - I2C mode: `0x00` back to binary mode ("BBIO1"), `0x4?` peripherals,
//!   `0x6?` speed (0x01 each), `0x08` write-then-read:
//!   `0x08 wh wl rh rl data...`; the adapter sends START, the data bytes,
//!   reads the requested bytes (ACK all but the last) and sends STOP.
//!   Answer: 0x01 followed by the read bytes, or 0x00 if a written byte
//!   wasn't acknowledged.

use std::io::{
	Read,
	Write,
};
use std::time::Duration;

use crate::bus::{
	Ack,
	I2cBus,
};
use crate::serial::{
	PORT_TIMEOUT,
	Port,
	reliable_sleep,
};

mod config;
mod consts;

pub use self::config::{
	I2cConfig,
	Peripherals,
	Speed,
};

pub use self::consts::MAX_TRANSFER_LEN;

use self::consts::*;

// extra "BBIO1" answers and terminal echo before we're in sync
const BBIO_SEARCH_LIMIT: usize = 512;
const SETTLE_DELAY: Duration = Duration::from_millis(10);
// target supply needs a moment after switching power on
const POWER_UP_DELAY: Duration = Duration::from_millis(50);

/// Adapter in I2C mode
///
/// Dropping it switches the peripherals (power, pull-ups) off and resets
/// the adapter to its user terminal.
pub struct BusPirate<P: Port> {
	port: P,
	in_binary_mode: bool,
	speed: Speed,
}

/// How long to wait for the answer to a write-then-read
///
/// The adapter only answers after the whole transaction went over the bus
/// (device byte and data are part of `write_len`); allow twice the
/// nominal clock time on top of the port timeout.
pub fn reply_timeout(speed: Speed, write_len: usize, read_len: usize) -> Duration {
	PORT_TIMEOUT + 2 * speed.transfer_time(write_len + read_len)
}

impl<P: Port> BusPirate<P> {
	pub fn open_i2c(port: P, config: &I2cConfig) -> crate::AResult<Self> {
		let mut bp = BusPirate {
			port,
			in_binary_mode: false,
			speed: config.speed,
		};
		with_context!("couldn't enter BusPirate binary mode", bp.enter_binary_mode())?;
		bp.in_binary_mode = true;

		with_context!("couldn't enter BusPirate I2C mode", bp.enter_i2c_mode())?;
		bp.set_speed(config.speed)?;
		bp.set_peripherals(config.peripherals)?;
		if config.peripherals.power {
			reliable_sleep(POWER_UP_DELAY);
		}
		info!("BusPirate in I2C mode ({}, power {}, pull-ups {})",
			config.speed,
			if config.peripherals.power { "on" } else { "off" },
			if config.peripherals.pullups { "on" } else { "off" },
		);

		Ok(bp)
	}

	fn read_byte(&mut self) -> crate::AResult<u8> {
		let mut b = [0u8];
		self.port.read_exact(&mut b)?;
		Ok(b[0])
	}

	fn send(&mut self, data: &[u8]) -> crate::AResult<()> {
		self.port.write_all(data)?;
		self.port.flush()?;
		Ok(())
	}

	fn expect_reply(&mut self, expected: &[u8], what: &str) -> crate::AResult<()> {
		let mut reply = vec![0u8; expected.len()];
		self.port.read_exact(&mut reply)?;
		ensure!(&reply[..] == expected, "unexpected reply to {}: {:?} (expected {:?})",
			what, String::from_utf8_lossy(&reply), String::from_utf8_lossy(expected)
		);
		Ok(())
	}

	fn command(&mut self, command: u8, what: &str) -> crate::AResult<()> {
		self.send(&[command])?;
		let reply = self.read_byte()?;
		ensure!(REPLY_OK == reply, "BusPirate rejected {} (0x{:02x}): reply 0x{:02x}", what, command, reply);
		Ok(())
	}

	fn enter_binary_mode(&mut self) -> crate::AResult<()> {
		self.port.discard_input()?;
		self.send(&[BBIO_RESET; BBIO_ENTER_ZEROES])?;

		// every zero after the switch is answered with another "BBIO1"
		let mut window = [0u8; 5];
		let mut received = 0usize;
		while &window != BBIO_VERSION {
			ensure!(received < BBIO_SEARCH_LIMIT, "no {:?} in the first {} bytes", String::from_utf8_lossy(BBIO_VERSION), received);
			window.rotate_left(1);
			window[4] = self.read_byte()?;
			received += 1;
		}

		reliable_sleep(SETTLE_DELAY);
		self.port.discard_input()?;
		self.send(&[BBIO_RESET])?;
		self.expect_reply(BBIO_VERSION, "binary mode reset")?;
		debug!("BusPirate in binary mode");
		Ok(())
	}

	fn enter_i2c_mode(&mut self) -> crate::AResult<()> {
		self.send(&[BBIO_ENTER_I2C])?;
		self.expect_reply(I2C_VERSION, "I2C mode")
	}

	pub fn set_speed(&mut self, speed: Speed) -> crate::AResult<()> {
		self.command(I2C_SPEED | speed.bits(), "speed setting")?;
		self.speed = speed;
		Ok(())
	}

	pub fn set_peripherals(&mut self, peripherals: Peripherals) -> crate::AResult<()> {
		self.command(I2C_PERIPHERALS | peripherals.bits(), "peripheral configuration")
	}

	fn bulk_transfer(&mut self, write: &[u8], read: &mut [u8]) -> crate::AResult<Ack> {
		ensure!(write.len() <= MAX_TRANSFER_LEN, "can't write {} bytes in one transaction (at most {})", write.len(), MAX_TRANSFER_LEN);
		ensure!(read.len() <= MAX_TRANSFER_LEN, "can't read {} bytes in one transaction (at most {})", read.len(), MAX_TRANSFER_LEN);

		let mut cmd = Vec::with_capacity(5 + write.len());
		cmd.push(I2C_WRITE_THEN_READ);
		cmd.extend_from_slice(&(write.len() as u16).to_be_bytes());
		cmd.extend_from_slice(&(read.len() as u16).to_be_bytes());
		cmd.extend_from_slice(write);
		self.send(&cmd)?;

		self.port.set_timeout(reply_timeout(self.speed, write.len(), read.len()))?;
		let reply = self.read_byte();
		self.port.set_timeout(PORT_TIMEOUT)?;

		match reply? {
			REPLY_OK => {
				self.port.read_exact(read)?;
				Ok(Ack::Ack)
			},
			REPLY_FAILED => Ok(Ack::Nack),
			reply => bail!("unexpected reply 0x{:02x} to write-then-read", reply),
		}
	}

	fn reset(&mut self) -> crate::AResult<()> {
		self.set_peripherals(Peripherals::off())?;
		self.send(&[BBIO_RESET])?;
		self.expect_reply(BBIO_VERSION, "binary mode reset")?;
		self.command(BBIO_RESET_TERMINAL, "terminal reset")?;
		debug!("BusPirate reset to user terminal");
		Ok(())
	}
}

impl<P: Port> I2cBus for BusPirate<P> {
	fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> crate::AResult<Ack> {
		with_context!("BusPirate I2C transaction failed", self.bulk_transfer(write, read))
	}
}

impl<P: Port> Drop for BusPirate<P> {
	fn drop(&mut self) {
		if self.in_binary_mode {
			if let Err(e) = self.reset() {
				error!("Couldn't reset BusPirate: {}", e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::VecDeque;
	use std::io;

	use crate::eeprom::{
		self,
		EepromProfile,
	};
	use crate::sim::SimulatedEeprom;

	#[derive(Clone, Copy, PartialEq, Eq, Debug)]
	enum Mode {
		Terminal,
		Binary,
		I2c,
	}

	// adapter firmware answering on a byte stream, with a bus behind it
	struct FakeBusPirate<B: I2cBus> {
		bus: B,
		mode: Mode,
		pending: Vec<u8>,
		output: VecDeque<u8>,
		peripherals: u8,
		speed: Option<u8>,
		dead: bool,
		timeout: Duration,
		// bus time of the transaction whose answer is in `output`
		busy_for: Duration,
	}

	fn speed_from_bits(bits: u8) -> Speed {
		let all = [Speed::Khz5, Speed::Khz50, Speed::Khz100, Speed::Khz400];
		*all.iter().find(|s| s.bits() == bits).unwrap()
	}

	impl<B: I2cBus> FakeBusPirate<B> {
		fn new(bus: B) -> Self {
			FakeBusPirate {
				bus,
				mode: Mode::Terminal,
				pending: Vec::new(),
				output: VecDeque::new(),
				peripherals: 0,
				speed: None,
				dead: false,
				timeout: PORT_TIMEOUT,
				busy_for: Duration::from_secs(0),
			}
		}

		// returns false if more input is needed
		fn process(&mut self) -> bool {
			let cmd = match self.pending.first() {
				None => return false,
				Some(&c) => c,
			};
			let mut consumed = 1;
			match (self.mode, cmd) {
				(_, 0x00) => {
					self.output.extend(BBIO_VERSION.iter());
					self.mode = Mode::Binary;
				},
				(Mode::Terminal, _) => (),
				(Mode::Binary, 0x02) => {
					self.output.extend(I2C_VERSION.iter());
					self.mode = Mode::I2c;
				},
				(Mode::Binary, 0x0f) => {
					self.output.push_back(REPLY_OK);
					self.mode = Mode::Terminal;
				},
				(Mode::I2c, 0x40..=0x4f) => {
					self.peripherals = cmd & 0x0f;
					self.output.push_back(REPLY_OK);
				},
				(Mode::I2c, 0x60..=0x63) => {
					self.speed = Some(cmd & 0x03);
					self.output.push_back(REPLY_OK);
				},
				(Mode::I2c, 0x08) => {
					if self.pending.len() < 5 {
						return false;
					}
					let wlen = (self.pending[1] as usize) << 8 | self.pending[2] as usize;
					let rlen = (self.pending[3] as usize) << 8 | self.pending[4] as usize;
					if self.pending.len() < 5 + wlen {
						return false;
					}
					consumed = 5 + wlen;
					let write = self.pending[5..consumed].to_vec();
					let mut read = vec![0u8; rlen];
					self.busy_for = speed_from_bits(self.speed.unwrap()).transfer_time(wlen + rlen);
					match self.bus.transfer(&write, &mut read).unwrap() {
						Ack::Ack => {
							self.output.push_back(REPLY_OK);
							self.output.extend(read);
						},
						Ack::Nack => self.output.push_back(REPLY_FAILED),
					}
				},
				_ => self.output.push_back(REPLY_FAILED),
			}
			self.pending.drain(..consumed);
			true
		}
	}

	impl<B: I2cBus> io::Read for FakeBusPirate<B> {
		fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
			if self.output.is_empty() || self.busy_for > self.timeout {
				self.output.clear();
				return Err(io::Error::new(io::ErrorKind::TimedOut, "no response"));
			}
			self.busy_for = Duration::from_secs(0);
			let mut n = 0;
			while n < buf.len() {
				match self.output.pop_front() {
					Some(b) => buf[n] = b,
					None => break,
				}
				n += 1;
			}
			Ok(n)
		}
	}

	impl<B: I2cBus> io::Write for FakeBusPirate<B> {
		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			if !self.dead {
				self.pending.extend_from_slice(buf);
				while self.process() {}
			}
			Ok(buf.len())
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	impl<B: I2cBus> Port for FakeBusPirate<B> {
		fn discard_input(&mut self) -> io::Result<()> {
			self.output.clear();
			Ok(())
		}

		fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
			self.timeout = timeout;
			Ok(())
		}
	}

	fn profile() -> EepromProfile {
		EepromProfile::from_chip("24c02", 0x50).unwrap()
	}

	#[test]
	fn session_setup_and_release() {
		let mut fake = FakeBusPirate::new(SimulatedEeprom::new(profile()));
		let config = I2cConfig {
			speed: Speed::Khz100,
			peripherals: Peripherals { power: true, pullups: true, ..Peripherals::off() },
		};

		{
			let _bp = BusPirate::open_i2c(&mut fake, &config).unwrap();
		}
		assert_eq!(fake.speed, Some(0b10));
		assert_eq!(fake.peripherals, 0);
		assert_eq!(fake.mode, Mode::Terminal);
		assert!(fake.output.is_empty());
	}

	#[test]
	fn flash_and_dump_over_wire() {
		let p = profile();
		let image: Vec<u8> = (0..=255u8).rev().collect();
		let mut fake = FakeBusPirate::new(SimulatedEeprom::new(p.clone()));

		{
			let mut bp = BusPirate::open_i2c(&mut fake, &I2cConfig::default()).unwrap();
			probe_while_open(&mut bp);
			eeprom::flash(&mut bp, &p, &mut &image[..]).unwrap();
			assert_eq!(eeprom::dump(&mut bp, &p, 100).unwrap(), image);
		}
		assert_eq!(fake.bus.memory(), &image[..]);
		assert_eq!(fake.bus.page_writes().len(), p.pages());
	}

	fn probe_while_open<P: Port>(bp: &mut BusPirate<P>) {
		assert!(bp.probe(0xa0).unwrap());
		assert!(!bp.probe(0xa2).unwrap());
	}

	#[test]
	fn nack_is_reported() {
		let mut fake = FakeBusPirate::new(SimulatedEeprom::new(profile()));
		let mut bp = BusPirate::open_i2c(&mut fake, &I2cConfig::default()).unwrap();

		assert_eq!(bp.transfer(&[0xb0, 0x00], &mut []).unwrap(), Ack::Nack);
		assert!(bp.write(&[0xb0, 0x00]).is_err());
		assert!(bp.transfer(&vec![0xa0; MAX_TRANSFER_LEN + 1], &mut []).is_err());
	}

	#[test]
	fn slow_clock_long_read() {
		let p = EepromProfile::from_chip("24c512", 0x50).unwrap();
		let mut fake = FakeBusPirate::new(SimulatedEeprom::new(p.clone()));
		let config = I2cConfig {
			speed: Speed::Khz5,
			..I2cConfig::default()
		};

		{
			let mut bp = BusPirate::open_i2c(&mut fake, &config).unwrap();
			let data = eeprom::dump(&mut bp, &p, MAX_TRANSFER_LEN).unwrap();
			assert_eq!(data.len(), p.capacity());
			assert!(data.iter().all(|&b| b == 0xff));
		}
		assert_eq!(fake.timeout, PORT_TIMEOUT);
	}

	#[test]
	fn reply_timeout_covers_bus_time() {
		for &speed in [Speed::Khz5, Speed::Khz50, Speed::Khz100, Speed::Khz400].iter() {
			let timeout = reply_timeout(speed, 3, MAX_TRANSFER_LEN);
			assert!(timeout > speed.transfer_time(3 + MAX_TRANSFER_LEN));
			assert!(timeout >= PORT_TIMEOUT);
		}
		assert_eq!(reply_timeout(Speed::Khz400, 0, 0), PORT_TIMEOUT);
	}

	#[test]
	fn silent_adapter() {
		let mut fake = FakeBusPirate::new(SimulatedEeprom::new(profile()));
		fake.dead = true;

		assert!(BusPirate::open_i2c(&mut fake, &I2cConfig::default()).is_err());
		assert!(fake.pending.is_empty());
	}
}
