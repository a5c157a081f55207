//! I2C EEPROMs of the 24Cxx family
//!
//! Bus layout of the transactions (S = START, P = STOP, `dev` = 7-bit
//! device address shifted left with R/W bit):
//! - set address pointer: S `dev|W` word-address P
//! - page write: S `dev|W` word-address data... P; data wraps around inside
//!   the page, the chip is busy for a few ms afterwards and NACKs its address
//! - sequential read: S `dev|R` data... P; starts at the address pointer
//!
//! The word address has 1 or 2 bytes (big endian); address bits beyond that
//! are taken from the lower bits of the device address ("block select").

mod address;
mod chunks;
mod profile;
mod transfer;

pub use self::address::{
	Address,
	Operation,
};

pub use self::chunks::{
	Chunk,
	Chunks,
};

pub use self::profile::{
	AddressWidth,
	DEFAULT_DEVICE_ADDRESS,
	EepromProfile,
	MAX_DEVICE_ADDRESS,
	known_chips,
	parse_device_address,
};

pub use self::transfer::{
	Progress,
	WRITE_CYCLE_POLL_LIMIT,
	dump,
	flash,
	verify,
	wait_for_write_cycle,
	wipe,
};
