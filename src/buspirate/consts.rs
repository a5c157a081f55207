// binary ("bitbang") mode
pub const BBIO_RESET: u8 = 0x00; // enter binary mode / leave protocol mode; answer "BBIO1"
pub const BBIO_ENTER_I2C: u8 = 0x02; // answer "I2C1"
pub const BBIO_RESET_TERMINAL: u8 = 0x0f; // back to user terminal; answer 0x01

pub const BBIO_VERSION: &[u8; 5] = b"BBIO1";
pub const I2C_VERSION: &[u8; 4] = b"I2C1";

// terminal mode switches after 20 zero bytes in a row
pub const BBIO_ENTER_ZEROES: usize = 20;

// I2C mode
pub const I2C_WRITE_THEN_READ: u8 = 0x08; // 16-bit write count, 16-bit read count (big endian), data
pub const I2C_PERIPHERALS: u8 = 0x40; // | power, pullups, aux, cs
pub const I2C_SPEED: u8 = 0x60; // | speed (0..3)

pub const REPLY_OK: u8 = 0x01;
pub const REPLY_FAILED: u8 = 0x00;

/// most bytes a single write-then-read may write or read
pub const MAX_TRANSFER_LEN: usize = 4096;
