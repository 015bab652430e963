//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Minimal CBOR (RFC 8949 subset) — only what COSE_Sign1 needs: unsigned and
//! negative integers, byte strings, text strings, arrays, and maps, with
//! definite-length head encodings of 1, 2, 3, or 5 bytes. Indefinite-length
//! items, floats, tags, and simple values are out of scope: this is not a
//! general-purpose CBOR implementation.

use crate::error::CryptoError;

const MAJOR_UINT: u8 = 0;
const MAJOR_NEGINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    Uint(u64),
    /// Represents the CBOR negative integer `-(1 + n)` for `n = NegInt(n)`.
    NegInt(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    Map(Vec<(CborValue, CborValue)>),
}

impl CborValue {
    pub fn int(v: i64) -> CborValue {
        if v >= 0 {
            CborValue::Uint(v as u64)
        } else {
            CborValue::NegInt((-1 - v) as u64)
        }
    }
}

fn encode_head(out: &mut Vec<u8>, major: u8, value: u64) {
    let major_bits = major << 5;
    if value < 24 {
        out.push(major_bits | value as u8);
    } else if value <= u8::MAX as u64 {
        out.push(major_bits | 24);
        out.push(value as u8);
    } else if value <= u16::MAX as u64 {
        out.push(major_bits | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else {
        out.push(major_bits | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    }
}

pub fn encode(value: &CborValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &CborValue, out: &mut Vec<u8>) {
    match value {
        CborValue::Uint(n) => encode_head(out, MAJOR_UINT, *n),
        CborValue::NegInt(n) => encode_head(out, MAJOR_NEGINT, *n),
        CborValue::Bytes(b) => {
            encode_head(out, MAJOR_BYTES, b.len() as u64);
            out.extend_from_slice(b);
        }
        CborValue::Text(s) => {
            encode_head(out, MAJOR_TEXT, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
        CborValue::Array(items) => {
            encode_head(out, MAJOR_ARRAY, items.len() as u64);
            for item in items {
                encode_into(item, out);
            }
        }
        CborValue::Map(entries) => {
            encode_head(out, MAJOR_MAP, entries.len() as u64);
            for (k, v) in entries {
                encode_into(k, out);
                encode_into(v, out);
            }
        }
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8, CryptoError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| CryptoError::MalformedCbor("unexpected end of input".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], CryptoError> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| CryptoError::MalformedCbor("length overflow".into()))?;
        if end > self.data.len() {
            return Err(CryptoError::MalformedCbor(
                "item length exceeds remaining input".into(),
            ));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn head(&mut self) -> Result<(u8, u64), CryptoError> {
        let first = self.byte()?;
        let major = first >> 5;
        let info = first & 0x1f;
        let value = match info {
            0..=23 => info as u64,
            24 => self.byte()? as u64,
            25 => {
                let b = self.bytes(2)?;
                u16::from_be_bytes([b[0], b[1]]) as u64
            }
            26 => {
                let b = self.bytes(4)?;
                u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64
            }
            _ => {
                return Err(CryptoError::MalformedCbor(format!(
                    "unsupported additional info {info}"
                )))
            }
        };
        Ok((major, value))
    }
}

pub fn decode(data: &[u8]) -> Result<CborValue, CryptoError> {
    let mut cur = Cursor { data, pos: 0 };
    let value = decode_value(&mut cur)?;
    if cur.pos != data.len() {
        return Err(CryptoError::MalformedCbor("trailing bytes after item".into()));
    }
    Ok(value)
}

fn decode_value(cur: &mut Cursor) -> Result<CborValue, CryptoError> {
    let (major, value) = cur.head()?;
    match major {
        0 => Ok(CborValue::Uint(value)),
        1 => Ok(CborValue::NegInt(value)),
        2 => {
            let n = value as usize;
            Ok(CborValue::Bytes(cur.bytes(n)?.to_vec()))
        }
        3 => {
            let n = value as usize;
            let bytes = cur.bytes(n)?;
            let s = std::str::from_utf8(bytes)
                .map_err(|e| CryptoError::MalformedCbor(format!("invalid utf-8 text: {e}")))?;
            Ok(CborValue::Text(s.to_string()))
        }
        4 => {
            let n = value as usize;
            let mut items = Vec::with_capacity(n);
            for _ in 0..n {
                items.push(decode_value(cur)?);
            }
            Ok(CborValue::Array(items))
        }
        5 => {
            let n = value as usize;
            let mut entries = Vec::with_capacity(n);
            for _ in 0..n {
                let k = decode_value(cur)?;
                let v = decode_value(cur)?;
                entries.push((k, v));
            }
            Ok(CborValue::Map(entries))
        }
        other => Err(CryptoError::UnsupportedCborType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_uint_small_and_large() {
        for n in [0u64, 1, 23, 24, 255, 256, 65535, 65536, 4_000_000_000] {
            let v = CborValue::Uint(n);
            let bytes = encode(&v);
            assert_eq!(decode(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn round_trip_negint() {
        let v = CborValue::int(-8);
        let bytes = encode(&v);
        assert_eq!(decode(&bytes).unwrap(), CborValue::NegInt(7));
    }

    #[test]
    fn round_trip_bytes_and_text() {
        let v = CborValue::Array(vec![
            CborValue::Bytes(vec![1, 2, 3]),
            CborValue::Text("hello".into()),
        ]);
        let bytes = encode(&v);
        assert_eq!(decode(&bytes).unwrap(), v);
    }

    #[test]
    fn round_trip_map() {
        let v = CborValue::Map(vec![
            (CborValue::Uint(1), CborValue::Text("a".into())),
            (CborValue::Uint(2), CborValue::Bytes(vec![9, 9])),
        ]);
        let bytes = encode(&v);
        assert_eq!(decode(&bytes).unwrap(), v);
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode(&CborValue::Uint(1));
        bytes.push(0xff);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn rejects_truncated_length() {
        // byte string head claiming length 10 with no body
        let bytes = vec![0x4a];
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn rejects_unsupported_major_type() {
        // major type 7 (floats/simple) is out of scope
        let bytes = vec![0xe0];
        assert!(decode(&bytes).is_err());
    }
}
