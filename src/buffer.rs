//! `Buffer`: a length-tagged byte region with copy/append/splice, the thin value type
//! `Sample` and `Stream` are built on top of (§3 "Buffer / Sample / Stream contract").

/// A growable, length-tagged region of raw bytes.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn resize(&mut self, new_len: usize) {
        self.data.resize(new_len, 0);
    }

    /// Overwrites `self` with a copy of `src`.
    pub fn copy_from(&mut self, src: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(src);
    }

    /// Appends `src` at the end.
    pub fn append(&mut self, src: &[u8]) {
        self.data.extend_from_slice(src);
    }

    /// Replaces the `len` bytes starting at `offset` with `src`, growing the buffer if the
    /// replacement does not fit. `len` and `src.len()` need not match.
    pub fn splice(&mut self, offset: usize, len: usize, src: &[u8]) {
        let end = (offset + len).min(self.data.len());
        let offset = offset.min(end);
        self.data.splice(offset..end, src.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_splice() {
        let mut buf = Buffer::new();
        buf.append(&[1, 2, 3]);
        buf.append(&[4, 5]);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5]);
        buf.splice(1, 2, &[9]);
        assert_eq!(buf.as_slice(), &[1, 9, 4, 5]);
    }
}
