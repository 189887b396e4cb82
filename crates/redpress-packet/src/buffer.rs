/// Backing storage for a packet view.
///
/// Views created with `new_view` borrow immutably and builders created with
/// `new` borrow mutably; all multi-byte fields are big-endian on the wire.
#[derive(Debug)]
pub enum Buffer<'a> {
    Immutable(&'a [u8]),
    Mutable(&'a mut [u8]),
}

impl Buffer<'_> {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Immutable(packet) => packet,
            Buffer::Mutable(packet) => packet,
        }
    }

    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        match self {
            Buffer::Immutable(_) => panic!("write operation called on readonly buffer"),
            Buffer::Mutable(packet) => packet,
        }
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.as_slice()[offset]
    }

    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes(self.read_array(offset))
    }

    pub fn read_array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut bytes = [0_u8; N];
        bytes.copy_from_slice(&self.as_slice()[offset..offset + N]);
        bytes
    }

    pub fn write_u8(&mut self, offset: usize, val: u8) {
        self.as_slice_mut()[offset] = val;
    }

    pub fn write_u16(&mut self, offset: usize, val: u16) {
        self.write_slice(offset, &val.to_be_bytes());
    }

    pub fn write_slice(&mut self, offset: usize, vals: &[u8]) {
        self.as_slice_mut()[offset..offset + vals.len()].copy_from_slice(vals);
    }
}
