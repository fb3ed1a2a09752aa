//! Bit-packed text encoding of integer streams.
//!
//! Each character of the encoded text carries a fixed number of bits
//! (`bits_per_char`), stored as the code point `base + value`. A stream starts with a
//! 32-bit element count, followed by the elements at a caller-chosen width. Neither the
//! element width nor the count width has to be a multiple of the character width, so
//! both sides keep a carry buffer of partially consumed bits between calls.
//!
//! Characters whose code point lies below `base` are skipped while decoding, which lets
//! encoded blobs be wrapped across lines of a text file.

use std::io::{self, BufRead, Write};

/// Number of bits carried by one character unless configured otherwise.
pub const DEFAULT_BITS_PER_CHAR: u32 = 6;
/// Code point of the character that encodes the value zero (`'@'`).
pub const DEFAULT_BASE_CHAR: u32 = 64;

const COUNT_BITS: u32 = 32;
const MAX_LINE_LENGTH: usize = 80;

fn low_mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

fn check_data_bits(bits: u32) -> io::Result<()> {
    if (1..=32).contains(&bits) {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("element width must be between 1 and 32 bits, got {bits}"),
        ))
    }
}

fn check_bits_per_char(bits: u32) -> io::Result<()> {
    if (1..=16).contains(&bits) {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("bits per character must be between 1 and 16, got {bits}"),
        ))
    }
}

/// Pull-based decoder over a text source.
///
/// The decoder is forward-only: every call consumes characters from the underlying
/// reader and there is no way to rewind. Text is pulled one line at a time, so any
/// remainder of the current line is discarded when the decoder is dropped.
pub struct BitPackedDecoder<R> {
    source: R,
    line: String,
    cursor: usize,
    bits_per_char: u32,
    base: u32,
    data_bits: u32,
    buffer: u32,
    available: u32,
}

impl<R: BufRead> BitPackedDecoder<R> {
    /// Creates a decoder for the default 6-bit alphabet starting at `'@'`.
    pub fn new(source: R) -> Self {
        Self {
            source,
            line: String::new(),
            cursor: 0,
            bits_per_char: DEFAULT_BITS_PER_CHAR,
            base: DEFAULT_BASE_CHAR,
            data_bits: COUNT_BITS,
            buffer: 0,
            available: 0,
        }
    }

    /// Creates a decoder for a custom alphabet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `bits_per_char` is outside `1..=16`.
    pub fn with_alphabet(source: R, bits_per_char: u32, base: u32) -> io::Result<Self> {
        check_bits_per_char(bits_per_char)?;
        let mut decoder = Self::new(source);
        decoder.bits_per_char = bits_per_char;
        decoder.base = base;
        Ok(decoder)
    }

    /// Reads the 32-bit element count that prefixes every stream and switches the
    /// element width to `data_bits` for all following [`read`](Self::read) calls.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a width outside `1..=32`, and the errors of
    /// [`read`](Self::read) if the count cannot be decoded.
    pub fn initialize(&mut self, data_bits: u32) -> io::Result<u32> {
        check_data_bits(data_bits)?;
        self.data_bits = COUNT_BITS;
        let count = self.read()?;
        self.data_bits = data_bits;
        Ok(count)
    }

    /// Sets the element width directly, for streams without a count prefix.
    pub fn set_data_bits(&mut self, data_bits: u32) -> io::Result<()> {
        check_data_bits(data_bits)?;
        self.data_bits = data_bits;
        Ok(())
    }

    /// Assembles the next element, most significant bit first.
    ///
    /// # Errors
    ///
    /// - `UnexpectedEof` if the source ends in the middle of an element.
    /// - `InvalidData` if a character encodes more than `bits_per_char` bits.
    /// - Any I/O error of the underlying reader.
    pub fn read(&mut self) -> io::Result<u32> {
        let mut value: u64 = 0;
        let mut needed = self.data_bits;
        while needed > 0 {
            if self.available == 0 {
                self.buffer = self.next_symbol()?;
                self.available = self.bits_per_char;
            }
            let take = needed.min(self.available);
            let bits = (self.buffer >> (self.available - take)) & low_mask(take);
            value = (value << take) | u64::from(bits);
            self.available -= take;
            needed -= take;
        }
        Ok(value as u32)
    }

    fn next_symbol(&mut self) -> io::Result<u32> {
        loop {
            let c = self.next_char()?.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "bit-packed stream ended in the middle of an element",
                )
            })?;
            let code = u32::from(c);
            if code < self.base {
                continue;
            }
            let value = code - self.base;
            if value >> self.bits_per_char != 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("character {c:?} is outside the {}-bit alphabet", self.bits_per_char),
                ));
            }
            return Ok(value);
        }
    }

    fn next_char(&mut self) -> io::Result<Option<char>> {
        loop {
            if let Some(c) = self.line[self.cursor..].chars().next() {
                self.cursor += c.len_utf8();
                return Ok(Some(c));
            }
            self.line.clear();
            self.cursor = 0;
            if self.source.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
        }
    }
}

/// Companion encoder producing text that [`BitPackedDecoder`] reads back.
///
/// Output lines are wrapped at 80 characters; [`finish`](Self::finish) flushes the
/// partially filled last character and terminates the line.
pub struct BitPackedEncoder<W: Write> {
    sink: W,
    bits_per_char: u32,
    base: u32,
    data_bits: u32,
    buffer: u32,
    filled: u32,
    line_length: usize,
}

impl<W: Write> BitPackedEncoder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            bits_per_char: DEFAULT_BITS_PER_CHAR,
            base: DEFAULT_BASE_CHAR,
            data_bits: COUNT_BITS,
            buffer: 0,
            filled: 0,
            line_length: 0,
        }
    }

    pub fn with_alphabet(sink: W, bits_per_char: u32, base: u32) -> io::Result<Self> {
        check_bits_per_char(bits_per_char)?;
        let mut encoder = Self::new(sink);
        encoder.bits_per_char = bits_per_char;
        encoder.base = base;
        Ok(encoder)
    }

    /// Writes the element count and switches to `data_bits` wide elements.
    pub fn initialize(&mut self, data_bits: u32, count: u32) -> io::Result<()> {
        check_data_bits(data_bits)?;
        self.data_bits = COUNT_BITS;
        self.write(count)?;
        self.data_bits = data_bits;
        Ok(())
    }

    /// Sets the element width without writing a count prefix.
    pub fn set_data_bits(&mut self, data_bits: u32) -> io::Result<()> {
        check_data_bits(data_bits)?;
        self.data_bits = data_bits;
        Ok(())
    }

    /// Appends the low `data_bits` bits of `value`.
    pub fn write(&mut self, value: u32) -> io::Result<()> {
        let mut remaining = self.data_bits;
        while remaining > 0 {
            let take = remaining.min(self.bits_per_char - self.filled);
            let bits = (value >> (remaining - take)) & low_mask(take);
            self.buffer = (self.buffer << take) | bits;
            self.filled += take;
            remaining -= take;
            if self.filled == self.bits_per_char {
                self.emit()?;
            }
        }
        Ok(())
    }

    /// Pads and writes the last character, ends the line and returns the sink.
    pub fn finish(mut self) -> io::Result<W> {
        if self.filled > 0 {
            self.buffer <<= self.bits_per_char - self.filled;
            self.emit()?;
        }
        if self.line_length > 0 {
            writeln!(self.sink)?;
        }
        Ok(self.sink)
    }

    fn emit(&mut self) -> io::Result<()> {
        let c = char::from_u32(self.base + self.buffer).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "alphabet base produces an invalid code point",
            )
        })?;
        write!(self.sink, "{c}")?;
        self.buffer = 0;
        self.filled = 0;
        self.line_length += 1;
        if self.line_length == MAX_LINE_LENGTH {
            writeln!(self.sink)?;
            self.line_length = 0;
        }
        Ok(())
    }
}
