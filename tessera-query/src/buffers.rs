//! Borrowed caller buffers.

use tessera_error::{tessera_bail, tessera_err, TesseraResult};

/// One target channel's caller buffers.
///
/// Fixed-size targets borrow one data buffer; var-sized targets borrow an
/// offsets buffer plus a values buffer. After a submit, `*_produced` holds
/// the bytes written by that submission.
#[derive(Debug)]
pub struct BufferEntry<'a> {
    name: String,
    data: &'a mut [u8],
    var: Option<&'a mut [u8]>,
    data_produced: u64,
    var_produced: u64,
}

impl<'a> BufferEntry<'a> {
    /// The target channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the entry carries a values buffer.
    pub fn is_var(&self) -> bool {
        self.var.is_some()
    }

    /// Capacity in bytes of the data (fixed values, or offsets) buffer.
    pub fn data_capacity(&self) -> u64 {
        self.data.len() as u64
    }

    /// Capacity in bytes of the values buffer, if any.
    pub fn var_capacity(&self) -> Option<u64> {
        self.var.as_ref().map(|v| v.len() as u64)
    }

    /// Bytes written into the data buffer by the last submit.
    pub fn data_produced(&self) -> u64 {
        self.data_produced
    }

    /// Bytes written into the values buffer by the last submit.
    pub fn var_produced(&self) -> u64 {
        self.var_produced
    }

    /// The written prefix of the data buffer.
    pub fn data_bytes(&self) -> &[u8] {
        &self.data[..usize::try_from(self.data_produced).unwrap_or(0)]
    }

    /// The written prefix of the values buffer.
    pub fn var_bytes(&self) -> &[u8] {
        match &self.var {
            Some(values) => &values[..usize::try_from(self.var_produced).unwrap_or(0)],
            None => &[],
        }
    }

    pub(crate) fn reset_produced(&mut self) {
        self.data_produced = 0;
        self.var_produced = 0;
    }

    /// Remaining capacity of the data buffer.
    pub(crate) fn data_remaining(&self) -> u64 {
        self.data_capacity() - self.data_produced
    }

    /// Remaining capacity of the values buffer.
    pub(crate) fn var_remaining(&self) -> u64 {
        self.var_capacity().unwrap_or(0) - self.var_produced
    }

    /// Append to the data buffer; the caller has checked capacity.
    pub(crate) fn push_data(&mut self, bytes: &[u8]) -> TesseraResult<()> {
        let start = usize::try_from(self.data_produced)
            .map_err(|_| tessera_err!(Internal: "buffer cursor out of range"))?;
        let end = start + bytes.len();
        if end > self.data.len() {
            tessera_bail!(Internal: "write past the data buffer of {}", self.name);
        }
        self.data[start..end].copy_from_slice(bytes);
        self.data_produced += bytes.len() as u64;
        Ok(())
    }

    /// Append to the values buffer; the caller has checked capacity.
    pub(crate) fn push_var(&mut self, bytes: &[u8]) -> TesseraResult<()> {
        let produced = self.var_produced;
        let values = self
            .var
            .as_mut()
            .ok_or_else(|| tessera_err!(Internal: "no values buffer on {}", self.name))?;
        let start = usize::try_from(produced)
            .map_err(|_| tessera_err!(Internal: "buffer cursor out of range"))?;
        let end = start + bytes.len();
        if end > values.len() {
            tessera_bail!(Internal: "write past the values buffer of {}", self.name);
        }
        values[start..end].copy_from_slice(bytes);
        self.var_produced += bytes.len() as u64;
        Ok(())
    }
}

/// The full set of caller buffers bound to a query.
#[derive(Debug, Default)]
pub struct QueryBuffers<'a> {
    entries: Vec<BufferEntry<'a>>,
}

impl<'a> QueryBuffers<'a> {
    /// An empty buffer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a fixed-size target to one data buffer.
    pub fn fixed(mut self, name: impl Into<String>, data: &'a mut [u8]) -> Self {
        self.entries.push(BufferEntry {
            name: name.into(),
            data,
            var: None,
            data_produced: 0,
            var_produced: 0,
        });
        self
    }

    /// Bind a var-sized target to an offsets buffer and a values buffer.
    pub fn var(
        mut self,
        name: impl Into<String>,
        offsets: &'a mut [u8],
        values: &'a mut [u8],
    ) -> Self {
        self.entries.push(BufferEntry {
            name: name.into(),
            data: offsets,
            var: Some(values),
            data_produced: 0,
            var_produced: 0,
        });
        self
    }

    /// Number of bound targets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no targets are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bound entries, in binding order.
    pub fn entries(&self) -> &[BufferEntry<'a>] {
        &self.entries
    }

    /// The entry bound to `name`.
    pub fn entry(&self, name: &str) -> Option<&BufferEntry<'a>> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [BufferEntry<'a>] {
        &mut self.entries
    }

    pub(crate) fn reset_produced(&mut self) {
        for entry in &mut self.entries {
            entry.reset_produced();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produced_tracks_writes() {
        let mut data = [0u8; 8];
        let mut bufs = QueryBuffers::new().fixed("a1", &mut data);
        let entry = &mut bufs.entries_mut()[0];
        entry.push_data(&[1, 2, 3, 4]).unwrap();
        assert_eq!(entry.data_produced(), 4);
        assert_eq!(entry.data_remaining(), 4);
        assert_eq!(entry.data_bytes(), &[1, 2, 3, 4]);

        entry.push_data(&[5, 6, 7, 8]).unwrap();
        assert!(entry.push_data(&[9]).is_err());
        entry.reset_produced();
        assert_eq!(entry.data_produced(), 0);
        assert_eq!(entry.data_remaining(), 8);
    }

    #[test]
    fn var_entries_carry_two_buffers() {
        let mut offsets = [0u8; 16];
        let mut values = [0u8; 4];
        let mut bufs = QueryBuffers::new().var("a2", &mut offsets, &mut values);
        let entry = &mut bufs.entries_mut()[0];
        assert!(entry.is_var());
        assert_eq!(entry.data_capacity(), 16);
        assert_eq!(entry.var_capacity(), Some(4));
        entry.push_var(b"ab").unwrap();
        assert_eq!(entry.var_bytes(), b"ab");
        assert_eq!(entry.var_remaining(), 2);
    }
}
