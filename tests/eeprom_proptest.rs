//! Property tests for addressing and the transfer loops, run against the
//! simulated EEPROM.

use buspirate_i2c_eeprom::eeprom::{
	self,
	AddressWidth,
	Chunks,
	EepromProfile,
	Operation,
};
use buspirate_i2c_eeprom::image::{
	self,
	Format,
	Pattern,
};
use buspirate_i2c_eeprom::sim::SimulatedEeprom;
use proptest::prelude::*;

fn chip_strategy() -> impl Strategy<Value = &'static str> {
	prop_oneof![
		Just("24c01"),
		Just("24c02"),
		Just("24c04"),
		Just("24c08"),
		Just("24c16"),
		Just("24c32"),
		Just("24c64"),
	]
}

/// custom geometries: power-of-two page size, any page count that fits
fn custom_profile_strategy() -> impl Strategy<Value = EepromProfile> {
	(0u32..7, 1usize..64, any::<bool>()).prop_map(|(page_shift, pages, two_bytes)| {
		let (width, pages) = if two_bytes {
			(AddressWidth::Two, pages)
		} else {
			// 8-bit words plus block bits: 2 KiB at most
			(AddressWidth::One, pages.min(2048 >> page_shift))
		};
		EepromProfile::from_pages(1 << page_shift, pages, width, 0x50).unwrap()
	})
}

fn profile_strategy() -> impl Strategy<Value = EepromProfile> {
	prop_oneof![
		chip_strategy().prop_map(|chip| EepromProfile::from_chip(chip, 0x50).unwrap()),
		custom_profile_strategy(),
	]
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(32))]

	/// The R/W bit always matches the operation, the word bytes are the
	/// offset's low bits and the block bits carry the rest.
	#[test]
	fn address_byte_matches_operation(profile in profile_strategy(), seed in any::<usize>()) {
		let offset = seed % profile.capacity();
		for &op in [Operation::Read, Operation::Write].iter() {
			let address = profile.address(offset, op).unwrap();
			let rw = address.device_byte() & 1;
			prop_assert_eq!(rw, if op == Operation::Read { 1 } else { 0 });
			prop_assert_eq!(address.operation(), op);

			let width = profile.address_width().bytes();
			prop_assert_eq!(address.word_bytes().len(), width);
			let word = address.word_bytes().iter().fold(0usize, |w, &b| (w << 8) | b as usize);
			let block = ((address.device_byte() >> 1) & profile.block_mask()) as usize;
			prop_assert_eq!((block << (8 * width)) | word, offset);
			prop_assert_eq!((address.device_byte() >> 1) & !profile.block_mask(), profile.device_address());
		}
		prop_assert!(profile.address(profile.capacity() + seed % 1024, Operation::Read).is_err());
	}

	/// Page-aligned chunks cover the range exactly and stay inside a page.
	#[test]
	fn page_chunks_never_span_pages(page_shift in 0u32..9, end in 0usize..5000, start in 0usize..5000) {
		let page_size = 1usize << page_shift;
		let start = start.min(end);
		let mut next = start;
		for chunk in Chunks::pages(end, page_size).starting_at(start) {
			prop_assert_eq!(chunk.offset, next);
			prop_assert!(chunk.len > 0);
			prop_assert_eq!(chunk.offset / page_size, (chunk.end() - 1) / page_size);
			next = chunk.end();
		}
		prop_assert_eq!(next, end);
	}

	/// dump, flash, dump: the second dump is the flashed image
	#[test]
	fn flash_round_trip(profile in profile_strategy(), seed in any::<u64>(), chunk_size in 1usize..300) {
		let original: Vec<u8> = (0..profile.capacity()).map(|i| (i as u64 ^ seed) as u8).collect();
		let mut sim = SimulatedEeprom::with_content(profile.clone(), original.clone());

		let before = eeprom::dump(&mut sim, &profile, chunk_size).unwrap();
		prop_assert_eq!(&before, &original);

		let image: Vec<u8> = before.iter().map(|b| b.rotate_left(3) ^ 0x5a).collect();
		eeprom::flash(&mut sim, &profile, &mut &image[..]).unwrap();
		let after = eeprom::dump(&mut sim, &profile, chunk_size).unwrap();
		prop_assert_eq!(&after, &image);
		eeprom::verify(&mut sim, &profile, &image, chunk_size).unwrap();

		// the flash loop never writes across a page boundary
		let page_size = profile.page_size();
		for w in sim.page_writes() {
			prop_assert!(w.len <= page_size);
			prop_assert_eq!(w.offset / page_size, (w.end() - 1) / page_size);
		}
	}

	/// wipe followed by dump yields only the fill pattern
	#[test]
	fn wipe_then_dump(profile in profile_strategy(), fill in any::<u8>()) {
		let mut sim = SimulatedEeprom::new(profile.clone());
		let pattern = Pattern::byte(fill);

		eeprom::wipe(&mut sim, &profile, &pattern).unwrap();
		let content = eeprom::dump(&mut sim, &profile, profile.page_size()).unwrap();
		prop_assert_eq!(content.len(), profile.capacity());
		prop_assert!(content.iter().all(|&b| b == fill));
	}

	/// hex dumps decode to what was encoded
	#[test]
	fn hex_format_decodes(data in proptest::collection::vec(any::<u8>(), 0..200)) {
		let encoded = Format::Hex.encode(&data);
		prop_assert_eq!(Format::Hex.decode(encoded).unwrap(), data);
	}
}

#[test]
fn blank_dump_has_capacity_bytes() {
	let dir = std::env::temp_dir().join(format!("buspirate-i2c-eeprom-blank-{}", std::process::id()));
	let _ = std::fs::remove_dir_all(&dir);

	for &chip in ["24c02", "24c16", "24c256"].iter() {
		let profile = EepromProfile::from_chip(chip, 0x50).unwrap();
		let path = dir.join(format!("{}.bin", chip));
		image::create_blank(&path, Format::Binary, &Pattern::byte(0xff), profile.capacity(), true).unwrap();

		let data = std::fs::read(&path).unwrap();
		assert_eq!(data.len(), profile.capacity());
		assert!(data.iter().all(|&b| b == 0xff));

		// and it is accepted as flash input for the same chip
		assert_eq!(image::read_image(&path, Format::Binary, profile.capacity()).unwrap(), data);
	}

	std::fs::remove_dir_all(&dir).unwrap();
}
