use std::io;
use std::time::Duration;

use crate::bus::I2cBus;
use crate::serial::reliable_sleep;

use super::{
	Address,
	Chunks,
	EepromProfile,
	Operation,
};

// a page write takes 5ms on most chips, 10ms on some older ones
pub const WRITE_CYCLE_POLL_LIMIT: usize = 200;
const WRITE_CYCLE_POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Logs progress of a transfer in steps of 10 percent
pub struct Progress {
	what: &'static str,
	total: usize,
	done: usize,
	reported_tenths: usize,
}

impl Progress {
	pub fn new(what: &'static str, total: usize) -> Self {
		Progress {
			what,
			total,
			done: 0,
			reported_tenths: 0,
		}
	}

	pub fn done(&self) -> usize {
		self.done
	}

	pub fn advance(&mut self, bytes: usize) {
		self.done += bytes;
		if 0 == self.total {
			return;
		}
		let tenths = self.done * 10 / self.total;
		if tenths > self.reported_tenths {
			self.reported_tenths = tenths;
			info!("{}: {}/{} bytes ({}%)", self.what, self.done, self.total, tenths * 10);
		}
	}
}

/// Poll until the chip acknowledges its address again
///
/// While the internal write cycle runs the chip ignores the bus. Returns
/// the number of polls that were NACKed.
pub fn wait_for_write_cycle<B>(bus: &mut B, address: &Address) -> crate::AResult<usize>
where
	B: I2cBus + ?Sized,
{
	let probe = address.with_operation(Operation::Write).device_byte();
	for polls in 0..WRITE_CYCLE_POLL_LIMIT {
		if bus.probe(probe)? {
			return Ok(polls);
		}
		reliable_sleep(WRITE_CYCLE_POLL_INTERVAL);
	}
	bail!("EEPROM 0x{:02x} didn't finish write cycle after {} polls", probe >> 1, WRITE_CYCLE_POLL_LIMIT);
}

/// move the chip's address pointer, then read sequentially from there
fn read_at<B>(bus: &mut B, profile: &EepromProfile, offset: usize, target: &mut [u8]) -> crate::AResult<()>
where
	B: I2cBus + ?Sized,
{
	let address = profile.address(offset, Operation::Write)?;
	ensure!(offset + target.len() <= profile.capacity(),
		"read of {} bytes at 0x{:x} exceeds capacity", target.len(), offset
	);
	with_context!(("setting address pointer to 0x{:x}", offset),
		bus.write(&address.header())
	)?;
	let read = address.with_operation(Operation::Read).device_byte();
	with_context!(("reading {} bytes at 0x{:x}", target.len(), offset),
		bus.write_then_read(&[read], target)
	)?;
	Ok(())
}

/// Read the whole chip
pub fn dump<B>(bus: &mut B, profile: &EepromProfile, chunk_size: usize) -> crate::AResult<Vec<u8>>
where
	B: I2cBus + ?Sized,
{
	ensure!(chunk_size > 0, "read chunk size must not be zero");
	let mut image = vec![0u8; profile.capacity()];
	let mut progress = Progress::new("dump", profile.capacity());

	for chunk in Chunks::new(profile.capacity(), chunk_size) {
		debug!("reading {} bytes at 0x{:04x}", chunk.len, chunk.offset);
		read_at(bus, profile, chunk.offset, &mut image[chunk.offset..chunk.end()])?;
		progress.advance(chunk.len);
	}

	Ok(image)
}

/// Write `profile.capacity()` bytes from `source`, one page per transaction
///
/// Waits for the write cycle after every page. The caller is expected to
/// have checked the source size; running short is an error, but the pages
/// written up to that point stay written.
pub fn flash<B, R>(bus: &mut B, profile: &EepromProfile, source: &mut R) -> crate::AResult<()>
where
	B: I2cBus + ?Sized,
	R: io::Read + ?Sized,
{
	let mut progress = Progress::new("flash", profile.capacity());
	let mut buf = Vec::with_capacity(3 + profile.page_size());

	for chunk in Chunks::pages(profile.capacity(), profile.page_size()) {
		let address = profile.address(chunk.offset, Operation::Write)?;

		buf.clear();
		buf.extend_from_slice(&address.header());
		let header_len = buf.len();
		buf.resize(header_len + chunk.len, 0);
		with_context!(("reading source data for 0x{:x}", chunk.offset), {
			source.read_exact(&mut buf[header_len..])?;
			Ok(())
		})?;

		debug!("writing {} bytes at 0x{:04x}", chunk.len, chunk.offset);
		with_context!(("writing page at 0x{:x}", chunk.offset),
			bus.write(&buf)
		)?;
		let polls = wait_for_write_cycle(bus, &address)?;
		trace!("write cycle at 0x{:04x} done after {} polls", chunk.offset, polls);

		progress.advance(chunk.len);
	}

	Ok(())
}

/// Fill the whole chip with a repeated pattern
pub fn wipe<B>(bus: &mut B, profile: &EepromProfile, pattern: &crate::image::Pattern) -> crate::AResult<()>
where
	B: I2cBus + ?Sized,
{
	flash(bus, profile, &mut pattern.reader())
}

/// Compare the chip content with `expected`
pub fn verify<B>(bus: &mut B, profile: &EepromProfile, expected: &[u8], chunk_size: usize) -> crate::AResult<()>
where
	B: I2cBus + ?Sized,
{
	ensure!(chunk_size > 0, "read chunk size must not be zero");
	ensure!(expected.len() <= profile.capacity(),
		"can't verify {} bytes on a {} byte EEPROM", expected.len(), profile.capacity()
	);
	let mut progress = Progress::new("verify", expected.len());
	let mut buf = vec![0u8; chunk_size];

	for chunk in Chunks::new(expected.len(), chunk_size) {
		let data = &mut buf[..chunk.len];
		read_at(bus, profile, chunk.offset, data)?;
		let wanted = &expected[chunk.offset..chunk.end()];
		if let Some(pos) = data.iter().zip(wanted).position(|(d, w)| d != w) {
			bail!("Verify failed at 0x{:04x}: expected 0x{:02x}, EEPROM has 0x{:02x}",
				chunk.offset + pos, wanted[pos], data[pos]
			);
		}
		progress.advance(chunk.len);
	}

	Ok(())
}
