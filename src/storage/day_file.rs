//! On-disk day files: `day_<n>.dat`, a raw concatenation of Sale records
//! with no framing or count header (spec.md §4.5, §6).

use crate::error::Error;
use crate::protocol::codec::{write_double, write_int, write_utf};
use crate::sale::Sale;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub fn day_file_path(data_dir: &Path, day: i64) -> PathBuf {
    data_dir.join(format!("day_{day}.dat"))
}

/// Writes every sale sequentially to `day_<n>.dat`. If this fails partway,
/// the caller must not treat the day as persisted.
pub fn write_day_file(data_dir: &Path, day: i64, sales: &[Sale]) -> Result<(), Error> {
    let path = day_file_path(data_dir, day);
    let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
    let mut writer = BufWriter::new(file);
    for sale in sales {
        write_utf(&mut writer, &sale.product).map_err(|e| Error::io(&path, e))?;
        write_int(&mut writer, sale.quantity).map_err(|e| Error::io(&path, e))?;
        write_double(&mut writer, sale.price).map_err(|e| Error::io(&path, e))?;
    }
    writer.flush().map_err(|e| Error::io(&path, e))?;
    Ok(())
}

/// Reads a day file to EOF. Returns an empty sequence (without creating the
/// file) if it doesn't exist.
pub fn read_day_file(data_dir: &Path, day: i64) -> Result<Vec<Sale>, Error> {
    let path = day_file_path(data_dir, day);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(&path, e)),
    };
    let mut reader = BufReader::new(file);
    let mut sales = Vec::new();
    loop {
        let product = match read_one_utf_or_eof(&mut reader) {
            Some(p) => p?,
            None => break,
        };
        let quantity = crate::protocol::codec::read_int(&mut reader)
            .map_err(|e| Error::Protocol(format!("truncated day file {}: {e}", path.display())))?;
        let price = crate::protocol::codec::read_double(&mut reader)
            .map_err(|e| Error::Protocol(format!("truncated day file {}: {e}", path.display())))?;
        sales.push(Sale::new(product, quantity, price));
    }
    Ok(sales)
}

/// Reads one UTF field, returning `None` on a clean EOF before any byte of
/// the length prefix, or `Some(Err(..))` for any other failure.
fn read_one_utf_or_eof<R: Read>(r: &mut R) -> Option<Result<String, Error>> {
    let mut probe = [0u8; 1];
    match r.read(&mut probe) {
        Ok(0) => return None,
        Ok(_) => {}
        Err(e) => return Some(Err(Error::Protocol(format!("day file read error: {e}")))),
    }
    let mut len_buf = [0u8; 1];
    let second = match r.read(&mut len_buf) {
        Ok(1) => len_buf[0],
        _ => return Some(Err(Error::Protocol("truncated day file record".into()))),
    };
    let len = u16::from_be_bytes([probe[0], second]) as usize;
    let mut buf = vec![0u8; len];
    if let Err(e) = r.read_exact(&mut buf) {
        return Some(Err(Error::Protocol(format!("truncated day file record: {e}"))));
    }
    Some(String::from_utf8(buf).map_err(|e| Error::Protocol(format!("invalid UTF-8 in day file: {e}"))))
}

pub fn delete_day_file(data_dir: &Path, day: i64) -> std::io::Result<()> {
    let path = day_file_path(data_dir, day);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_sales_through_a_day_file() {
        let dir = tempdir().unwrap();
        let sales = vec![
            Sale::new("Apple", 3, 1.5),
            Sale::new("Banana", -1, 0.0),
            Sale::new("Cherry", 100, 99.99),
        ];
        write_day_file(dir.path(), 7, &sales).unwrap();
        let read_back = read_day_file(dir.path(), 7).unwrap();
        assert_eq!(read_back, sales);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let sales = read_day_file(dir.path(), 42).unwrap();
        assert!(sales.is_empty());
    }

    #[test]
    fn empty_sale_list_writes_an_empty_file() {
        let dir = tempdir().unwrap();
        write_day_file(dir.path(), 1, &[]).unwrap();
        let sales = read_day_file(dir.path(), 1).unwrap();
        assert!(sales.is_empty());
    }

    #[test]
    fn delete_is_idempotent_when_missing() {
        let dir = tempdir().unwrap();
        delete_day_file(dir.path(), 5).unwrap();
        delete_day_file(dir.path(), 5).unwrap();
    }
}
