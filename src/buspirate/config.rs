use std::fmt;
use std::str;
use std::time::Duration;

// 8 data bits + ACK
const BITS_PER_BYTE: u64 = 9;

/// I2C clock rates supported by the (software) I2C master
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Speed {
	Khz5,
	Khz50,
	Khz100,
	Khz400,
}

impl Speed {
	pub const NAMES: [&'static str; 4] = ["400kHz", "100kHz", "50kHz", "5kHz"];

	pub(super) fn bits(self) -> u8 {
		match self {
			Speed::Khz5 => 0b00,
			Speed::Khz50 => 0b01,
			Speed::Khz100 => 0b10,
			Speed::Khz400 => 0b11,
		}
	}

	pub fn hz(self) -> u64 {
		match self {
			Speed::Khz5 => 5_000,
			Speed::Khz50 => 50_000,
			Speed::Khz100 => 100_000,
			Speed::Khz400 => 400_000,
		}
	}

	/// Time the clock needs to shift `bytes` bytes over the bus
	pub fn transfer_time(self, bytes: usize) -> Duration {
		let bits = bytes as u64 * BITS_PER_BYTE;
		Duration::from_micros(bits * 1_000_000 / self.hz())
	}
}

impl Default for Speed {
	fn default() -> Self {
		Speed::Khz400
	}
}

impl str::FromStr for Speed {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lower = s.to_ascii_lowercase();
		match lower.trim_end_matches("khz") {
			"5" => Ok(Speed::Khz5),
			"50" => Ok(Speed::Khz50),
			"100" => Ok(Speed::Khz100),
			"400" => Ok(Speed::Khz400),
			_ => bail!("unsupported I2C speed {:?} (expected one of {})", s, Speed::NAMES.join(", ")),
		}
	}
}

impl fmt::Display for Speed {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}kHz", self.hz() / 1000)
	}
}

/// Peripheral outputs of the adapter
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Peripherals {
	/// 3.3V and 5V supply pins
	pub power: bool,
	/// on-board pull-up resistors (pulled to Vpu)
	pub pullups: bool,
	pub aux: bool,
	pub chip_select: bool,
}

impl Peripherals {
	pub fn off() -> Self {
		Peripherals::default()
	}

	pub(super) fn bits(&self) -> u8 {
		let power = if self.power { 0b1000 } else { 0 };
		let pullups = if self.pullups { 0b0100 } else { 0 };
		let aux = if self.aux { 0b0010 } else { 0 };
		let cs = if self.chip_select { 0b0001 } else { 0 };
		power | pullups | aux | cs
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct I2cConfig {
	pub speed: Speed,
	pub peripherals: Peripherals,
}

impl Default for I2cConfig {
	// powers the target, external pull-ups expected
	fn default() -> Self {
		I2cConfig {
			speed: Speed::default(),
			peripherals: Peripherals {
				power: true,
				..Peripherals::off()
			},
		}
	}
}
