//! Fixed-capacity read and write buffers
//!
//! Invariants:
//! - read: `pos <= valid <= capacity`
//! - write: `pos <= capacity`

use crate::error::BufferedError;

/// Allocate a zeroed buffer, reporting allocation failure instead of aborting.
pub(crate) fn alloc_zeroed(len: usize) -> Result<Vec<u8>, BufferedError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| BufferedError::OutOfMemory)?;
    data.resize(len, 0);
    Ok(data)
}

pub(crate) struct ReadBuffer {
    data: Box<[u8]>,
    valid: usize,
    pos: usize,
}

impl ReadBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferedError> {
        Ok(Self {
            data: alloc_zeroed(capacity)?.into_boxed_slice(),
            valid: 0,
            pos: 0,
        })
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.valid
    }

    pub fn available(&self) -> usize {
        self.valid - self.pos
    }

    /// Forget the buffered bytes.
    pub fn discard(&mut self) {
        self.valid = 0;
        self.pos = 0;
    }

    /// Whole buffer for a refill; call `filled` with the byte count afterwards.
    pub fn spare(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn filled(&mut self, n: usize) {
        self.valid = n.min(self.data.len());
        self.pos = 0;
    }

    /// Copy buffered bytes into `dst`, returning how many were copied.
    pub fn take(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.available());
        dst[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

pub(crate) struct WriteBuffer {
    data: Box<[u8]>,
    pos: usize,
}

impl WriteBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferedError> {
        Ok(Self {
            data: alloc_zeroed(capacity)?.into_boxed_slice(),
            pos: 0,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    pub fn is_full(&self) -> bool {
        self.pos == self.data.len()
    }

    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn pending(&self) -> &[u8] {
        &self.data[..self.pos]
    }

    /// Copy as much of `src` as fits, returning how many bytes were taken.
    pub fn put(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.data.len() - self.pos);
        self.data[self.pos..self.pos + n].copy_from_slice(&src[..n]);
        self.pos += n;
        n
    }

    pub fn clear(&mut self) {
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_buffer_take_respects_valid_length() {
        let mut buf = ReadBuffer::with_capacity(8).unwrap();
        assert!(buf.is_exhausted());

        buf.spare()[..3].copy_from_slice(b"abc");
        buf.filled(3);

        let mut out = [0u8; 2];
        assert_eq!(buf.take(&mut out), 2);
        assert_eq!(&out, b"ab");
        assert_eq!(buf.available(), 1);

        let mut out = [0u8; 8];
        assert_eq!(buf.take(&mut out), 1);
        assert_eq!(out[0], b'c');
        assert!(buf.is_exhausted());
    }

    #[test]
    fn read_buffer_discard_resets() {
        let mut buf = ReadBuffer::with_capacity(4).unwrap();
        buf.filled(4);
        buf.discard();
        assert!(buf.is_exhausted());
        assert_eq!(buf.available(), 0);
    }

    #[test]
    fn write_buffer_put_stops_at_capacity() {
        let mut buf = WriteBuffer::with_capacity(4).unwrap();

        assert_eq!(buf.put(b"abcdef"), 4);
        assert!(buf.is_full());
        assert_eq!(buf.pending(), b"abcd");
        assert_eq!(buf.put(b"x"), 0);

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn huge_allocation_reports_out_of_memory() {
        let result = ReadBuffer::with_capacity(usize::MAX);
        assert!(matches!(result, Err(BufferedError::OutOfMemory)));
    }
}
