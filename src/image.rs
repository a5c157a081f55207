//! EEPROM images on disk

use std::fmt;
use std::fs;
use std::io::{
	self,
	Read,
	Write,
};
use std::path::Path;
use std::str;

const HEX_BYTES_PER_LINE: usize = 16;

fn hex_digit(c: u8) -> Option<u8> {
	match c {
		b'0'..=b'9' => Some(c - b'0'),
		b'a'..=b'f' => Some(c - b'a' + 10),
		b'A'..=b'F' => Some(c - b'A' + 10),
		_ => None,
	}
}

/// parse hex digits, ignoring ASCII whitespace
pub fn parse_hex(text: &[u8]) -> crate::AResult<Vec<u8>> {
	let mut result = Vec::with_capacity(text.len() / 2);
	let mut high: Option<u8> = None;
	for (pos, &c) in text.iter().enumerate() {
		if c.is_ascii_whitespace() {
			continue;
		}
		let digit = match hex_digit(c) {
			Some(d) => d,
			None => bail!("invalid hex character {:?} at position {}", c as char, pos),
		};
		high = match high {
			None => Some(digit),
			Some(h) => {
				result.push(h << 4 | digit);
				None
			},
		};
	}
	ensure!(high.is_none(), "odd number of hex digits");
	Ok(result)
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Format {
	Binary,
	Hex,
}

impl Format {
	pub fn encode(self, data: &[u8]) -> Vec<u8> {
		match self {
			Format::Binary => data.to_vec(),
			Format::Hex => {
				let mut out = Vec::with_capacity(data.len() * 2 + data.len() / HEX_BYTES_PER_LINE + 1);
				for line in data.chunks(HEX_BYTES_PER_LINE) {
					for b in line {
						// writing into a Vec can't fail
						let _ = write!(out, "{:02x}", b);
					}
					out.push(b'\n');
				}
				out
			},
		}
	}

	pub fn decode(self, raw: Vec<u8>) -> crate::AResult<Vec<u8>> {
		match self {
			Format::Binary => Ok(raw),
			Format::Hex => parse_hex(&raw),
		}
	}
}

impl str::FromStr for Format {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"binary" | "bin" => Ok(Format::Binary),
			"hex" => Ok(Format::Hex),
			_ => bail!("unknown dump format {:?} (expected binary or hex)", s),
		}
	}
}

impl fmt::Display for Format {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Format::Binary => write!(f, "binary"),
			Format::Hex => write!(f, "hex"),
		}
	}
}

/// Non-empty byte sequence repeated to fill memory
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Pattern(Vec<u8>);

impl Pattern {
	pub fn new(bytes: Vec<u8>) -> crate::AResult<Self> {
		ensure!(!bytes.is_empty(), "fill pattern must not be empty");
		Ok(Pattern(bytes))
	}

	pub fn byte(b: u8) -> Self {
		Pattern(vec![b])
	}

	/// hex string like "DEADBEEF"
	pub fn parse(hex: &str) -> crate::AResult<Self> {
		let bytes = with_context!(("invalid fill pattern {:?}", hex), parse_hex(hex.as_bytes()))?;
		Self::new(bytes)
	}

	/// endless stream of the pattern
	pub fn reader(&self) -> PatternReader {
		PatternReader {
			pattern: &self.0,
			position: 0,
		}
	}

	pub fn fill(&self, len: usize) -> Vec<u8> {
		self.0.iter().cloned().cycle().take(len).collect()
	}
}

impl str::FromStr for Pattern {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Pattern::parse(s)
	}
}

pub struct PatternReader<'a> {
	pattern: &'a [u8],
	position: usize,
}

impl<'a> Read for PatternReader<'a> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		for b in buf.iter_mut() {
			*b = self.pattern[self.position];
			self.position = (self.position + 1) % self.pattern.len();
		}
		Ok(buf.len())
	}
}

/// Check (and prepare) the destination of an output file
///
/// Existing files are only replaced and missing parent directories only
/// created with `force`. Call before any bus activity.
pub fn prepare_output(path: &Path, force: bool) -> crate::AResult<()> {
	ensure!(!path.is_dir(), "The specified output {} is a directory", path.display());
	if force {
		warn!("--force/-f given: existing files will be overwritten and missing directories created");
	}

	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() && !parent.exists() {
			ensure!(force,
				"The output file parent directory ({}) does not exist, and --force/-f has not been specified", parent.display()
			);
			with_context!(("couldn't create directory {}", parent.display()), {
				fs::create_dir_all(parent)?;
				Ok(())
			})?;
		}
	}

	if path.exists() {
		ensure!(force, "The output file {} already exists and --force/-f has not been specified", path.display());
		warn!("The existing file {} will be overwritten", path.display());
	}

	Ok(())
}

/// Write (or replace) an image file, see `prepare_output`
pub fn write_image(path: &Path, format: Format, data: &[u8]) -> crate::AResult<()> {
	with_context!(("couldn't write {}", path.display()), {
		let mut file = fs::File::create(path)?;
		file.write_all(&format.encode(data))?;
		file.sync_all()?;
		Ok(())
	})?;
	info!("File written to {} ({} bytes, {})", path.display(), data.len(), format);
	Ok(())
}

/// Load an image that must fill exactly `capacity` bytes
pub fn read_image(path: &Path, format: Format, capacity: usize) -> crate::AResult<Vec<u8>> {
	ensure!(path.exists(), "The specified input file {} does not exist", path.display());
	ensure!(path.is_file(), "The specified input {} is not a regular file", path.display());

	let raw = with_context!(("couldn't read {}", path.display()), {
		let mut raw = Vec::new();
		fs::File::open(path)?.read_to_end(&mut raw)?;
		Ok(raw)
	})?;
	let data = with_context!(("couldn't decode {} as {}", path.display(), format), format.decode(raw))?;

	ensure!(data.len() == capacity,
		"Input file {} has {} bytes, but the EEPROM holds {} bytes", path.display(), data.len(), capacity
	);
	Ok(data)
}

/// Image of `capacity` bytes filled with `pattern`, no bus involved
pub fn create_blank(path: &Path, format: Format, pattern: &Pattern, capacity: usize, force: bool) -> crate::AResult<()> {
	prepare_output(path, force)?;
	write_image(path, format, &pattern.fill(capacity))
}
