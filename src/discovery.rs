//! Find devices on the bus
//!
//! EEPROMs acknowledge both their write and their read address byte; other
//! devices sometimes only answer one of them.

use crate::bus::I2cBus;
use crate::eeprom::MAX_DEVICE_ADDRESS;

#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct ScanResult {
	/// 7-bit addresses acknowledging both directions
	pub eeproms: Vec<u8>,
	/// address bytes (incl. R/W bit) acknowledged without their counterpart
	pub single: Vec<u8>,
}

/// Probe every 7-bit address (the general call address 0 excluded)
pub fn scan<B>(bus: &mut B) -> crate::AResult<ScanResult>
where
	B: I2cBus + ?Sized,
{
	let mut result = ScanResult::default();
	for address in 1..=MAX_DEVICE_ADDRESS {
		let write = address << 1;
		let read = write | 1;
		let write_ack = bus.probe(write)?;
		let read_ack = bus.probe(read)?;
		match (write_ack, read_ack) {
			(true, true) => {
				debug!("device at 0x{:02x}", address);
				result.eeproms.push(address);
			},
			(true, false) => result.single.push(write),
			(false, true) => result.single.push(read),
			(false, false) => trace!("No device found at address 0x{:02x}", address),
		}
	}
	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bus::Ack;
	use crate::eeprom::EepromProfile;
	use crate::sim::SimulatedEeprom;

	#[test]
	fn finds_eeprom_blocks() {
		// a 24c04 answers on two addresses
		let p = EepromProfile::from_chip("24c04", 0x50).unwrap();
		let mut sim = SimulatedEeprom::new(p);

		let result = scan(&mut sim).unwrap();
		assert_eq!(result.eeproms, vec![0x50, 0x51]);
		assert!(result.single.is_empty());
	}

	// answers only writes at 0x20
	struct WriteOnly;

	impl I2cBus for WriteOnly {
		fn transfer(&mut self, write: &[u8], _read: &mut [u8]) -> crate::AResult<Ack> {
			Ok(if write[0] == 0x40 { Ack::Ack } else { Ack::Nack })
		}
	}

	#[test]
	fn single_direction() {
		let result = scan(&mut WriteOnly).unwrap();
		assert!(result.eeproms.is_empty());
		assert_eq!(result.single, vec![0x40]);
	}
}
