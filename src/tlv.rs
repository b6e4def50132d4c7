//! NIP-19 type-length-value payloads
//!
//! lengths up to 127 take a single byte. longer values set the high bit on the first length byte,
//! whose lower bits say how many big-endian length bytes follow.

use crate::encoding::EncodingError;

pub const TLV_SPECIAL: u8 = 0;
pub const TLV_RELAY: u8 = 1;
pub const TLV_AUTHOR: u8 = 2;
pub const TLV_KIND: u8 = 3;

const EXTENDED_LENGTH: u8 = 0x80;
const MAX_LENGTH_BYTES: usize = std::mem::size_of::<usize>();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvEntry {
    pub tag: u8,
    pub value: Vec<u8>,
}

impl TlvEntry {
    pub fn new(tag: u8, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }
}

/// serialize entries in the given order
pub fn build(entries: &[TlvEntry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(entries.iter().map(|e| 2 + e.value.len()).sum());
    for entry in entries {
        write_entry(&mut buf, entry.tag, &entry.value);
    }
    buf
}

/// append a single entry to `buf`
pub fn write_entry(buf: &mut Vec<u8>, tag: u8, value: &[u8]) {
    buf.push(tag);

    let length = value.len();
    if length <= 127 {
        buf.push(length as u8);
    } else {
        let be = length.to_be_bytes();
        let skip = be.iter().take_while(|&&b| b == 0).count();
        let length_bytes = &be[skip..];
        buf.push(EXTENDED_LENGTH | length_bytes.len() as u8);
        buf.extend_from_slice(length_bytes);
    }

    buf.extend_from_slice(value);
}

/// parse a full TLV payload, failing on any truncation
pub fn parse(data: &[u8]) -> Result<Vec<TlvEntry>, EncodingError> {
    let mut entries = Vec::new();
    let mut curr = 0;

    while curr < data.len() {
        let start = curr;
        let tag = data[curr];
        curr += 1;

        let first = *data.get(curr).ok_or(EncodingError::TruncatedTlv(start))?;
        curr += 1;

        let length = if first & EXTENDED_LENGTH == 0 {
            first as usize
        } else {
            let count = (first & !EXTENDED_LENGTH) as usize;
            if count == 0 || count > MAX_LENGTH_BYTES {
                return Err(EncodingError::InvalidTlvLength(start));
            }
            let length_bytes = data
                .get(curr..curr + count)
                .ok_or(EncodingError::TruncatedTlv(start))?;
            curr += count;
            length_bytes
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | b as usize)
        };

        let end = curr
            .checked_add(length)
            .ok_or(EncodingError::InvalidTlvLength(start))?;
        let value = data
            .get(curr..end)
            .ok_or(EncodingError::TruncatedTlv(start))?;
        entries.push(TlvEntry::new(tag, value));
        curr = end;
    }

    Ok(entries)
}

/// kinds travel as 4-byte big-endian integers
pub fn write_kind(kind: u32) -> [u8; 4] {
    kind.to_be_bytes()
}

pub fn read_kind(bytes: &[u8]) -> Result<u32, EncodingError> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| EncodingError::InvalidKindLength(bytes.len()))?;
    Ok(u32::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_across_length_encodings() {
        let entries = vec![
            TlvEntry::new(TLV_SPECIAL, Vec::<u8>::new()),
            TlvEntry::new(TLV_RELAY, vec![0xabu8]),
            TlvEntry::new(TLV_AUTHOR, vec![1u8; 127]),
            TlvEntry::new(TLV_KIND, vec![2u8; 128]),
            TlvEntry::new(TLV_RELAY, vec![3u8; 300]),
            TlvEntry::new(9, vec![4u8; 70_000]),
            TlvEntry::new(TLV_SPECIAL, vec![5u8; 5]),
        ];

        let built = build(&entries);
        assert_eq!(parse(&built).unwrap(), entries);
    }

    #[test]
    fn test_length_field_layout() {
        let short = build(&[TlvEntry::new(1, vec![0u8; 127])]);
        assert_eq!(&short[..2], &[1, 127]);

        let long = build(&[TlvEntry::new(1, vec![0u8; 128])]);
        assert_eq!(&long[..3], &[1, 0x81, 128]);

        let longer = build(&[TlvEntry::new(1, vec![0u8; 300])]);
        assert_eq!(&longer[..4], &[1, 0x82, 0x01, 0x2c]);
        assert_eq!(longer.len(), 4 + 300);
    }

    #[test]
    fn test_parse_accepts_padded_length_bytes() {
        // 0x82 0x00 0x05 is a non-minimal way of saying 5
        let data = [0u8, 0x82, 0x00, 0x05, 1, 2, 3, 4, 5];
        let entries = parse(&data).unwrap();
        assert_eq!(entries, vec![TlvEntry::new(0, vec![1u8, 2, 3, 4, 5])]);
    }

    #[test]
    fn test_parse_malformed() {
        let cases: Vec<&[u8]> = vec![
            &[0],                // missing length
            &[0, 3, 1, 2],       // value too short
            &[0, 0x80, 1],       // extended with no length bytes
            &[0, 0x82, 0x01],    // truncated length bytes
            &[0, 0x81, 200, 1],  // extended value too short
            &[0, 0x89, 1, 1, 1], // too many length bytes
            &[0, 1, 7, 2],       // second entry truncated
        ];

        for data in cases {
            assert!(parse(data).is_err(), "should fail for {:?}", data);
        }
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_kind() {
        assert_eq!(write_kind(30023), [0, 0, 0x75, 0x47]);
        assert_eq!(read_kind(&write_kind(30023)).unwrap(), 30023);
        assert_eq!(read_kind(&write_kind(u32::MAX)).unwrap(), u32::MAX);
        assert!(read_kind(&[0, 1, 2]).is_err());
    }
}
