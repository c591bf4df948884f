//! Fixed-width record codec.
//!
//! A record file is a flat array of 8-byte signed integers with no header or
//! footer. [`RecordWriter`] and [`RecordReader`] stream records through any
//! `Write`/`Read` so multi-gigabyte files never sit in memory.

use std::fmt;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Width of one record in bytes.
pub const RECORD_WIDTH: u64 = 8;

const WIDTH: usize = RECORD_WIDTH as usize;
const BUF_CAPACITY: usize = 64 * 1024;

/// Byte order used to encode records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Host byte order
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    #[must_use]
    pub fn encode(self, value: i64) -> [u8; WIDTH] {
        match self {
            Self::Native => value.to_ne_bytes(),
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }

    #[must_use]
    pub fn decode(self, bytes: [u8; WIDTH]) -> i64 {
        match self {
            Self::Native => i64::from_ne_bytes(bytes),
            Self::Little => i64::from_le_bytes(bytes),
            Self::Big => i64::from_be_bytes(bytes),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Little => write!(f, "little"),
            Self::Big => write!(f, "big"),
        }
    }
}

impl FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "ne" => Ok(Self::Native),
            "little" | "le" => Ok(Self::Little),
            "big" | "be" => Ok(Self::Big),
            _ => Err(format!(
                "unknown byte order: {s}. Expected one of: native, little, big"
            )),
        }
    }
}

/// Number of whole records in `bytes`, or `None` if there is a partial tail.
#[must_use]
pub fn records_in(bytes: u64) -> Option<u64> {
    (bytes % RECORD_WIDTH == 0).then_some(bytes / RECORD_WIDTH)
}

/// Buffered record sink.
pub struct RecordWriter<W: Write> {
    inner: BufWriter<W>,
    order: ByteOrder,
    written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W, order: ByteOrder) -> Self {
        Self {
            inner: BufWriter::with_capacity(BUF_CAPACITY, inner),
            order,
            written: 0,
        }
    }

    pub fn write_record(&mut self, value: i64) -> io::Result<()> {
        self.inner.write_all(&self.order.encode(value))?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, values: &[i64]) -> io::Result<()> {
        for &value in values {
            self.write_record(value)?;
        }
        Ok(())
    }

    /// Records written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush buffered bytes and hand back the inner writer.
    pub fn finish(self) -> io::Result<W> {
        self.inner.into_inner().map_err(io::IntoInnerError::into_error)
    }
}

/// One item yielded by [`RecordReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    Record(i64),
    /// The stream ended `len` bytes into a record that starts at `offset`.
    Partial { offset: u64, len: usize },
}

/// Streaming record decoder.
///
/// Yields one [`Chunk::Record`] per 8 bytes and, if the stream length is not a
/// multiple of 8, a final [`Chunk::Partial`]. Policy for partial tails is left
/// to the caller.
pub struct RecordReader<R: Read> {
    inner: BufReader<R>,
    order: ByteOrder,
    offset: u64,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R, order: ByteOrder) -> Self {
        Self {
            inner: BufReader::with_capacity(BUF_CAPACITY, inner),
            order,
            offset: 0,
            done: false,
        }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn fill(&mut self, buf: &mut [u8; WIDTH]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < WIDTH {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = [0u8; WIDTH];
        let filled = match self.fill(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        match filled {
            0 => {
                self.done = true;
                None
            }
            WIDTH => {
                self.offset += RECORD_WIDTH;
                Some(Ok(Chunk::Record(self.order.decode(buf))))
            }
            len => {
                self.done = true;
                let offset = self.offset;
                self.offset += len as u64;
                Some(Ok(Chunk::Partial { offset, len }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all(values: &[i64], order: ByteOrder) -> Vec<u8> {
        let mut writer = RecordWriter::new(Vec::new(), order);
        writer.write_all(values).unwrap();
        assert_eq!(writer.written(), values.len() as u64);
        writer.finish().unwrap()
    }

    fn decode_all(bytes: &[u8], order: ByteOrder) -> Vec<Chunk> {
        RecordReader::new(bytes, order)
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn values_come_back_in_file_order() {
        let values = [i64::MIN, -1, 0, 1, 42, i64::MAX];
        let bytes = encode_all(&values, ByteOrder::Native);
        assert_eq!(bytes.len(), values.len() * WIDTH);

        let decoded: Vec<Chunk> = decode_all(&bytes, ByteOrder::Native);
        let expected: Vec<Chunk> = values.iter().copied().map(Chunk::Record).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn explicit_byte_orders_are_fixed() {
        assert_eq!(ByteOrder::Little.encode(1), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ByteOrder::Big.encode(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(ByteOrder::Native.encode(-7), (-7i64).to_ne_bytes());
    }

    #[test]
    fn empty_stream_yields_nothing() {
        assert!(decode_all(&[], ByteOrder::Native).is_empty());
    }

    #[test]
    fn partial_tail_is_reported_once() {
        let mut bytes = encode_all(&[5, 6], ByteOrder::Little);
        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let decoded = decode_all(&bytes, ByteOrder::Little);
        assert_eq!(
            decoded,
            vec![
                Chunk::Record(5),
                Chunk::Record(6),
                Chunk::Partial { offset: 16, len: 3 },
            ]
        );
    }

    #[test]
    fn reader_handles_short_reads() {
        // Hands out one byte per read call.
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }

        let bytes = encode_all(&[123_456_789, -987_654_321], ByteOrder::Big);
        let reader = RecordReader::new(Trickle(&bytes), ByteOrder::Big);
        let values: Vec<Chunk> = reader.map(Result::unwrap).collect();
        assert_eq!(
            values,
            vec![Chunk::Record(123_456_789), Chunk::Record(-987_654_321)]
        );
    }

    #[test]
    fn records_in_checks_width() {
        assert_eq!(records_in(0), Some(0));
        assert_eq!(records_in(64), Some(8));
        assert_eq!(records_in(65), None);
    }

    #[test]
    fn byte_order_from_str() {
        assert_eq!("little".parse::<ByteOrder>().unwrap(), ByteOrder::Little);
        assert_eq!("BE".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
        assert_eq!("native".parse::<ByteOrder>().unwrap(), ByteOrder::Native);
        assert!("middle".parse::<ByteOrder>().is_err());
    }
}
