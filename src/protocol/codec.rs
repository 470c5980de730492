//! Payload sub-field primitives (spec.md §4.1): length-prefixed UTF-8
//! strings, big-endian signed integers, big-endian IEEE-754 doubles.

use crate::error::Error;
use std::io::{self, Read, Write};

/// Writes a 2-byte big-endian length-prefixed UTF-8 string.
pub fn write_utf<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    let len: u16 = bytes
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "UTF string too long"))?;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(bytes)
}

/// Reads a 2-byte big-endian length-prefixed UTF-8 string.
pub fn read_utf<R: Read>(r: &mut R) -> Result<String, Error> {
    let mut len_buf = [0u8; 2];
    r.read_exact(&mut len_buf)
        .map_err(|e| Error::Protocol(format!("truncated UTF length: {e}")))?;
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .map_err(|e| Error::Protocol(format!("truncated UTF payload: {e}")))?;
    String::from_utf8(buf).map_err(|e| Error::Protocol(format!("invalid UTF-8: {e}")))
}

/// Writes a 4-byte big-endian signed integer.
pub fn write_int<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

/// Reads a 4-byte big-endian signed integer.
pub fn read_int<R: Read>(r: &mut R) -> Result<i32, Error> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)
        .map_err(|e| Error::Protocol(format!("truncated int: {e}")))?;
    Ok(i32::from_be_bytes(buf))
}

/// Writes an 8-byte big-endian IEEE-754 double.
pub fn write_double<W: Write>(w: &mut W, v: f64) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

/// Reads an 8-byte big-endian IEEE-754 double.
pub fn read_double<R: Read>(r: &mut R) -> Result<f64, Error> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)
        .map_err(|e| Error::Protocol(format!("truncated double: {e}")))?;
    Ok(f64::from_be_bytes(buf))
}
