use std::fmt;

use super::profile::AddressWidth;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Operation {
	Read,
	Write,
}

impl Operation {
	// R/W bit in the address byte
	fn bit(self) -> u8 {
		match self {
			Operation::Read => 0b1,
			Operation::Write => 0b0,
		}
	}
}

/// Address byte plus word address of a single EEPROM location
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
	device: u8,
	word: [u8; 2],
	word_len: usize,
}

impl Address {
	/// `device` is the 7-bit address with block bits already merged in;
	/// `word` is truncated to `width`.
	pub fn new(device: u8, operation: Operation, word: usize, width: AddressWidth) -> Self {
		assert!(device <= 0x7f);
		let word_len = width.bytes();
		Address {
			device: (device << 1) | operation.bit(),
			word: [(word >> 8) as u8, word as u8],
			word_len,
		}
	}

	/// address byte on the wire: 7-bit device address and R/W bit
	pub fn device_byte(&self) -> u8 {
		self.device
	}

	pub fn operation(&self) -> Operation {
		if 0 != self.device & 1 { Operation::Read } else { Operation::Write }
	}

	/// word address, big endian
	pub fn word_bytes(&self) -> &[u8] {
		&self.word[2 - self.word_len..]
	}

	/// same location with the other R/W bit
	pub fn with_operation(&self, operation: Operation) -> Self {
		Address {
			device: (self.device & !1) | operation.bit(),
			..*self
		}
	}

	/// address byte followed by the word address; enough to move the chip's
	/// address pointer, and the prefix of every page write
	pub fn header(&self) -> Vec<u8> {
		let mut header = Vec::with_capacity(1 + self.word_len);
		header.push(self.device);
		header.extend_from_slice(self.word_bytes());
		header
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Address(0x{:02x} [{:?}]", self.device >> 1, self.operation())?;
		for b in self.word_bytes() {
			write!(f, " {:02x}", b)?;
		}
		write!(f, ")")
	}
}
