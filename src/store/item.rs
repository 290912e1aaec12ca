//! On-flash item layout: `id` (u16 LE), `len` (total item bytes),
//! `pad` (padding bytes after the payload), payload.

pub const HEADER_LEN: usize = 4;

/// Largest item that fits the 8-bit length field on a word boundary.
pub const MAX_ITEM_LEN: usize = 252;

pub const ID_TOMBSTONE: u16 = 0;
pub const ID_SPECIAL: u16 = 0xFFFE;
pub const ID_FREE: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Tombstone,
    Line(u16),
    Special,
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub len: u8,
    pub pad: u8,
}

impl Header {
    pub fn decode(bytes: &[u8]) -> Header {
        Header {
            id: u16::from_le_bytes([bytes[0], bytes[1]]),
            len: bytes[2],
            pad: bytes[3],
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let id = self.id.to_le_bytes();
        [id[0], id[1], self.len, self.pad]
    }

    pub fn kind(&self) -> Kind {
        match self.id {
            ID_TOMBSTONE => Kind::Tombstone,
            ID_SPECIAL => Kind::Special,
            ID_FREE => Kind::Free,
            id => Kind::Line(id),
        }
    }

    pub fn payload_len(&self) -> usize {
        (self.len as usize).saturating_sub(HEADER_LEN + self.pad as usize)
    }

    /// The same header with its id cleared.
    pub fn tombstone(&self) -> Header {
        Header {
            id: ID_TOMBSTONE,
            ..*self
        }
    }
}

/// Total bytes an item with this payload occupies.
pub fn item_len(payload_len: usize) -> usize {
    (HEADER_LEN + payload_len + 3) & !3
}

pub fn encode(id: u16, payload: &[u8]) -> Vec<u8> {
    let len = item_len(payload.len());
    debug_assert!(len <= MAX_ITEM_LEN);
    let header = Header {
        id,
        len: len as u8,
        pad: (len - HEADER_LEN - payload.len()) as u8,
    };
    let mut buf = Vec::with_capacity(len);
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf.resize(len, 0xFF);
    buf
}
