//! Abstract I2C master
//!
//! One call is one complete bus transaction: START, all `write` bytes (each
//! must be acknowledged by the slave), `read.len()` bytes from the slave
//! (master ACKs all but the last byte), STOP.
//!
//! The first written byte is the address byte, including the R/W bit in
//! the lowest bit. There is no repeated START: to read from a given word
//! address the pointer has to be set in a separate write transaction.

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Ack {
	Ack,
	Nack,
}

impl Ack {
	pub fn is_ack(self) -> bool {
		self == Ack::Ack
	}
}

pub trait I2cBus {
	/// `Ack::Nack` if any written byte wasn't acknowledged; `read` content
	/// is unspecified in that case.
	fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> crate::AResult<Ack>;

	fn write(&mut self, data: &[u8]) -> crate::AResult<()> {
		self.write_then_read(data, &mut [])
	}

	fn write_then_read(&mut self, data: &[u8], read: &mut [u8]) -> crate::AResult<()> {
		ensure!(!data.is_empty(), "I2C transaction without address byte");
		match self.transfer(data, read)? {
			Ack::Ack => Ok(()),
			Ack::Nack => bail!("I2C device 0x{:02x} didn't acknowledge", data[0] >> 1),
		}
	}

	/// check whether anything answers to the given address byte
	///
	/// read probes clock in a single byte so the slave releases SDA before
	/// the STOP condition.
	fn probe(&mut self, address_byte: u8) -> crate::AResult<bool> {
		let mut dummy = [0u8; 1];
		let read = if 0 != address_byte & 1 { &mut dummy[..] } else { &mut dummy[..0] };
		Ok(self.transfer(&[address_byte], read)?.is_ack())
	}
}

impl<'a, B: I2cBus + ?Sized> I2cBus for &'a mut B {
	fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> crate::AResult<Ack> {
		(**self).transfer(write, read)
	}
}
