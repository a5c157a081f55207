//! In-memory I2C EEPROM
//!
//! Behaves like a 24Cxx chip on the bus: the address byte selects the chip
//! (and memory block), writes set the address pointer and optionally store
//! data inside the current page (wrapping at the page end), reads continue
//! at the address pointer (wrapping at the end of memory). After each data
//! write the chip ignores its address for a configurable number of
//! transactions, like during a real write cycle.

use crate::bus::{
	Ack,
	I2cBus,
};
use crate::eeprom::{
	Chunk,
	EepromProfile,
};

pub struct SimulatedEeprom {
	profile: EepromProfile,
	memory: Vec<u8>,
	pointer: usize,
	write_cycle_polls: usize,
	busy: usize,
	page_writes: Vec<Chunk>,
}

impl SimulatedEeprom {
	/// blank (0xff) chip
	pub fn new(profile: EepromProfile) -> Self {
		let memory = vec![0xff; profile.capacity()];
		Self::with_content(profile, memory)
	}

	pub fn with_content(profile: EepromProfile, memory: Vec<u8>) -> Self {
		assert_eq!(memory.len(), profile.capacity());
		SimulatedEeprom {
			profile,
			memory,
			pointer: 0,
			write_cycle_polls: 2,
			busy: 0,
			page_writes: Vec::new(),
		}
	}

	/// number of transactions NACKed after each page write
	pub fn with_write_cycle_polls(mut self, polls: usize) -> Self {
		self.write_cycle_polls = polls;
		self
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	/// every page write so far, in bus order
	pub fn page_writes(&self) -> &[Chunk] {
		&self.page_writes
	}

	fn page_write(&mut self, data: &[u8]) -> crate::AResult<()> {
		let page_size = self.profile.page_size();
		ensure!(data.len() <= page_size, "page write of {} bytes exceeds page size {}", data.len(), page_size);

		let page = self.pointer - self.pointer % page_size;
		let mut in_page = self.pointer % page_size;
		for &b in data {
			self.memory[page + in_page] = b;
			in_page = (in_page + 1) % page_size;
		}
		self.page_writes.push(Chunk {
			offset: self.pointer,
			len: data.len(),
		});
		self.pointer = page + in_page;
		self.busy = self.write_cycle_polls;
		Ok(())
	}
}

impl I2cBus for SimulatedEeprom {
	fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> crate::AResult<Ack> {
		ensure!(!write.is_empty(), "I2C transaction without address byte");
		let device = write[0] >> 1;
		let block_mask = self.profile.block_mask();
		if device & !block_mask != self.profile.device_address() {
			return Ok(Ack::Nack);
		}
		if self.busy > 0 {
			self.busy -= 1;
			return Ok(Ack::Nack);
		}

		if 0 != write[0] & 1 {
			ensure!(1 == write.len(), "writing data after a read address byte");
			let capacity = self.profile.capacity();
			for r in read.iter_mut() {
				*r = self.memory[self.pointer];
				self.pointer = (self.pointer + 1) % capacity;
			}
			return Ok(Ack::Ack);
		}

		ensure!(read.is_empty(), "reading after a write address byte");
		let width = self.profile.address_width().bytes();
		if write.len() <= width {
			// chip acks partial word addresses but ignores them
			return Ok(Ack::Ack);
		}
		let word = write[1..=width].iter().fold(0usize, |w, &b| (w << 8) | b as usize);
		let block = (device & block_mask) as usize;
		self.pointer = (block << (8 * width)) | word;
		ensure!(self.pointer < self.profile.capacity(), "address 0x{:x} out of range", self.pointer);

		let data = &write[1 + width..];
		if !data.is_empty() {
			self.page_write(data)?;
		}
		Ok(Ack::Ack)
	}
}
