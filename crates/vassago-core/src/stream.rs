//! Byte-source helpers shared by the frame demuxer and the content reader.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// Fill `buf` completely, reporting a short read as [`Error::UnexpectedEof`].
///
/// `position` is the number of bytes consumed before this call and is only
/// used for the error.
pub fn read_exact<R: Read + ?Sized>(input: &mut R, buf: &mut [u8], position: u64) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => return Err(Error::unexpected_eof(position + filled as u64)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Read a fixed-size array.
pub fn read_array<const N: usize, R: Read + ?Sized>(input: &mut R, position: u64) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    read_exact(input, &mut buf, position)?;
    Ok(buf)
}

/// Bytes between the current position and the end of the stream.
///
/// The stream position is left unchanged.
pub fn remaining_len<S: Seek + ?Sized>(input: &mut S) -> Result<u64> {
    let current = input.stream_position()?;
    let end = input.seek(SeekFrom::End(0))?;
    if end != current {
        input.seek(SeekFrom::Start(current))?;
    }
    Ok(end.saturating_sub(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_array() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        let head: [u8; 2] = read_array(&mut cursor, 0).unwrap();
        assert_eq!(head, [1, 2]);
        let rest: [u8; 3] = read_array(&mut cursor, 2).unwrap();
        assert_eq!(rest, [3, 4, 5]);
    }

    #[test]
    fn test_short_read_is_eof() {
        let mut cursor = Cursor::new(vec![1u8, 2]);
        let err = read_array::<4, _>(&mut cursor, 10).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { bytes_read: 12 }));
    }

    #[test]
    fn test_remaining_len_keeps_position() {
        let mut cursor = Cursor::new(vec![0u8; 32]);
        cursor.set_position(10);
        assert_eq!(remaining_len(&mut cursor).unwrap(), 22);
        assert_eq!(cursor.position(), 10);
    }
}
