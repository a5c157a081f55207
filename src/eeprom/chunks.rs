/// Contiguous piece of the address space handled in one bus transaction
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Chunk {
	pub offset: usize,
	pub len: usize,
}

impl Chunk {
	pub fn end(&self) -> usize {
		self.offset + self.len
	}
}

/// Iterator over `[start, end)` in chunks of at most `max_len` bytes
///
/// With `align` set chunks additionally end at multiples of `align`, so
/// none of them spans two pages.
#[derive(Clone, Debug)]
pub struct Chunks {
	offset: usize,
	end: usize,
	max_len: usize,
	align: Option<usize>,
}

impl Chunks {
	/// read transfers can cross page boundaries
	pub fn new(end: usize, max_len: usize) -> Self {
		assert!(max_len > 0);
		Chunks {
			offset: 0,
			end,
			max_len,
			align: None,
		}
	}

	/// chunks for page writes
	pub fn pages(end: usize, page_size: usize) -> Self {
		assert!(page_size > 0);
		Chunks {
			offset: 0,
			end,
			max_len: page_size,
			align: Some(page_size),
		}
	}

	pub fn starting_at(mut self, offset: usize) -> Self {
		self.offset = offset;
		self
	}

	/// bytes not handed out yet
	pub fn remaining(&self) -> usize {
		self.end.saturating_sub(self.offset)
	}
}

impl Iterator for Chunks {
	type Item = Chunk;

	fn next(&mut self) -> Option<Chunk> {
		let remaining = self.remaining();
		if 0 == remaining {
			return None;
		}
		let mut len = remaining.min(self.max_len);
		if let Some(align) = self.align {
			len = len.min(align - self.offset % align);
		}
		let chunk = Chunk {
			offset: self.offset,
			len,
		};
		self.offset += len;
		Some(chunk)
	}
}
