use std::fmt;

use super::address::{
	Address,
	Operation,
};

/// Number of word address bytes following the device address byte
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AddressWidth {
	One,
	Two,
}

impl AddressWidth {
	pub fn from_bits(bits: usize) -> crate::AResult<Self> {
		match bits {
			8 => Ok(AddressWidth::One),
			16 => Ok(AddressWidth::Two),
			_ => bail!("unsupported address width: {} bits (expected 8 or 16)", bits),
		}
	}

	pub fn bytes(self) -> usize {
		match self {
			AddressWidth::One => 1,
			AddressWidth::Two => 2,
		}
	}

	pub fn bits(self) -> usize {
		8 * self.bytes()
	}
}

impl fmt::Display for AddressWidth {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}-bit", self.bits())
	}
}

// small chips take the high address bits from the device address (A0..A2)
const MAX_BLOCK_BITS: usize = 3;

pub const MAX_DEVICE_ADDRESS: u8 = 0x7f;
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x50;

/// 7-bit device address as given on the command line ("0x50", "80")
pub fn parse_device_address(s: &str) -> crate::AResult<u8> {
	let a = crate::parse_int(s)?;
	ensure!(a <= MAX_DEVICE_ADDRESS as usize,
		"The maximum I2C address is 0x{:02x}, but 0x{:x} was provided", MAX_DEVICE_ADDRESS, a
	);
	Ok(a as u8)
}

// name, capacity, page size, address width
static KNOWN_CHIPS: [(&str, usize, usize, AddressWidth); 11] = [
	("24c01", 128, 8, AddressWidth::One),
	("24c02", 256, 8, AddressWidth::One),
	("24c04", 512, 16, AddressWidth::One),
	("24c08", 1024, 16, AddressWidth::One),
	("24c16", 2048, 16, AddressWidth::One),
	("24c32", 4096, 32, AddressWidth::Two),
	("24c64", 8192, 32, AddressWidth::Two),
	("24c128", 16384, 64, AddressWidth::Two),
	("24c256", 32768, 64, AddressWidth::Two),
	("24c512", 65536, 128, AddressWidth::Two),
	("24c1024", 131072, 256, AddressWidth::Two),
];

pub fn known_chips() -> impl Iterator<Item = &'static str> {
	KNOWN_CHIPS.iter().map(|chip| chip.0)
}

/// Geometry and bus address of a single EEPROM chip
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct EepromProfile {
	name: String,
	capacity: usize,
	page_size: usize,
	address_width: AddressWidth,
	device_address: u8,
	block_mask: u8,
}

impl EepromProfile {
	pub fn new(name: &str, capacity: usize, page_size: usize, address_width: AddressWidth, device_address: u8) -> crate::AResult<Self> {
		ensure!(capacity > 0, "EEPROM capacity must not be zero");
		ensure!(page_size > 0, "EEPROM page size must not be zero");
		ensure!(page_size <= capacity, "page size {} larger than capacity {}", page_size, capacity);
		ensure!(0 == capacity % page_size, "capacity {} is not a multiple of the page size {}", capacity, page_size);
		ensure!(device_address <= MAX_DEVICE_ADDRESS,
			"The maximum I2C address is 0x{:02x}, but 0x{:02x} was provided", MAX_DEVICE_ADDRESS, device_address
		);

		let word_limit = 1usize << address_width.bits();
		let max_capacity = word_limit << MAX_BLOCK_BITS;
		ensure!(capacity <= max_capacity,
			"capacity {} can't be addressed with {} word addresses (at most {} bytes)", capacity, address_width, max_capacity
		);

		let mut block_bits = 0;
		while (word_limit << block_bits) < capacity {
			block_bits += 1;
		}
		let block_mask = ((1u16 << block_bits) - 1) as u8;
		ensure!(0 == device_address & block_mask,
			"device address 0x{:02x} overlaps the block select bits 0x{:02x} of a {} byte EEPROM", device_address, block_mask, capacity
		);

		Ok(EepromProfile {
			name: name.into(),
			capacity,
			page_size,
			address_width,
			device_address,
			block_mask,
		})
	}

	pub fn from_chip(chip: &str, device_address: u8) -> crate::AResult<Self> {
		let lower = chip.to_ascii_lowercase();
		let lookup = lower.trim_start_matches("at");
		for &(name, capacity, page_size, address_width) in KNOWN_CHIPS.iter() {
			if name == lookup {
				return Self::new(name, capacity, page_size, address_width, device_address);
			}
		}
		bail!("unknown EEPROM chip {:?} (known: {})", chip, known_chips().collect::<Vec<_>>().join(", "))
	}

	/// custom geometry as listed in a datasheet
	pub fn from_pages(page_size: usize, pages: usize, address_width: AddressWidth, device_address: u8) -> crate::AResult<Self> {
		let capacity = match page_size.checked_mul(pages) {
			Some(c) => c,
			None => bail!("{} pages of {} bytes overflow", pages, page_size),
		};
		Self::new("custom", capacity, page_size, address_width, device_address)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn page_size(&self) -> usize {
		self.page_size
	}

	pub fn pages(&self) -> usize {
		self.capacity / self.page_size
	}

	pub fn address_width(&self) -> AddressWidth {
		self.address_width
	}

	pub fn device_address(&self) -> u8 {
		self.device_address
	}

	/// device address bits used for the high part of the memory address
	pub fn block_mask(&self) -> u8 {
		self.block_mask
	}

	pub fn address(&self, offset: usize, operation: Operation) -> crate::AResult<Address> {
		ensure!(offset < self.capacity,
			"offset 0x{:x} out of range for {} byte EEPROM", offset, self.capacity
		);
		let word_bits = self.address_width.bits();
		let block = (offset >> word_bits) as u8;
		debug_assert!(0 == block & !self.block_mask);

		Ok(Address::new(
			self.device_address | block,
			operation,
			offset & ((1usize << word_bits) - 1),
			self.address_width,
		))
	}
}

impl fmt::Display for EepromProfile {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f,
			"{} ({} bytes, {} pages of {} bytes, {} word address) at 0x{:02x}",
			self.name,
			self.capacity,
			self.pages(),
			self.page_size,
			self.address_width,
			self.device_address,
		)
	}
}
