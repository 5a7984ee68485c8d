//
// image.rs --- Program images for LoadBinary.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Program images, read from raw binaries or Intel HEX files.
//!
//! A HEX file is flattened into one contiguous image starting at its
//! lowest data address.  Gaps between records are zero filled.

use std::fs;
use std::path::Path;
use std::slice::Chunks;

use ihex::{Reader, Record};
use log::debug;

use crate::error::{Error, Result};
use crate::fw::config::MAX_BLOCK;

/// A flat program image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryImage {
    base: u32,
    bytes: Vec<u8>,
}

impl BinaryImage {
    /// An image made of `bytes`, with no address of its own.
    pub fn from_bytes(bytes: Vec<u8>) -> BinaryImage {
        BinaryImage { base: 0, bytes }
    }

    /// Parse Intel HEX text.
    pub fn from_ihex(text: &str) -> Result<BinaryImage> {
        let mut upper = 0u32;
        let mut chunks: Vec<(u32, Vec<u8>)> = Vec::new();

        for record in Reader::new(text) {
            match record? {
                Record::Data { offset, value } => {
                    chunks.push((upper + offset as u32, value));
                },
                Record::ExtendedSegmentAddress(seg) => upper = (seg as u32) << 4,
                Record::ExtendedLinearAddress(hi) => upper = (hi as u32) << 16,
                Record::EndOfFile => break,
                _ => {},
            }
        }

        let base = match chunks.iter().map(|&(addr, _)| addr).min() {
            Some(base) => base,
            None => return Ok(BinaryImage { base: 0, bytes: Vec::new() }),
        };
        let end = chunks.iter().map(|&(addr, ref v)| addr + v.len() as u32).max().unwrap_or(base);
        if (end - base) as usize > 0x10000 {
            return Err(Error::ImageTooLarge((end - base) as usize));
        }

        let mut bytes = vec![0u8; (end - base) as usize];
        for (addr, value) in chunks {
            let start = (addr - base) as usize;
            bytes[start..start + value.len()].copy_from_slice(&value);
        }

        debug!("hex image of {} bytes at {:04X}", bytes.len(), base);
        Ok(BinaryImage { base, bytes })
    }

    /// Read a file, as Intel HEX if it is named `*.hex`, `*.ihex` or
    /// `*.ihx` and as a raw binary otherwise.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<BinaryImage> {
        let path = path.as_ref();
        let is_hex = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => ["hex", "ihex", "ihx"].iter().any(|x| ext.eq_ignore_ascii_case(x)),
            None => false,
        };

        if is_hex {
            BinaryImage::from_ihex(&fs::read_to_string(path)?)
        } else {
            Ok(BinaryImage::from_bytes(fs::read(path)?))
        }
    }

    /// The lowest address in the source file.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The image cut into the blocks it is sent as.
    pub fn blocks(&self) -> Chunks<u8> {
        self.bytes.chunks(MAX_BLOCK)
    }

    pub fn block_count(&self) -> usize {
        (self.bytes.len() + MAX_BLOCK - 1) / MAX_BLOCK
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_image() {
        let text = ":0401000001020304F1\n\
                    :02010600AABB92\n\
                    :00000001FF\n";
        let image = BinaryImage::from_ihex(text).unwrap();
        assert_eq!(image.base(), 0x0100);
        assert_eq!(image.bytes(), &[1, 2, 3, 4, 0, 0, 0xaa, 0xbb]);
    }

    #[test]
    fn bad_checksum_in_hex() {
        let text = ":0401000001020304F2\n:00000001FF\n";
        match BinaryImage::from_ihex(text) {
            Err(Error::Hex(_)) => {},
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_hex() {
        let image = BinaryImage::from_ihex(":00000001FF\n").unwrap();
        assert!(image.is_empty());
        assert_eq!(image.block_count(), 0);
    }

    #[test]
    fn block_split() {
        let image = BinaryImage::from_bytes(vec![0; 356]);
        assert_eq!(image.block_count(), 2);
        let sizes: Vec<usize> = image.blocks().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![256, 100]);

        assert_eq!(BinaryImage::from_bytes(vec![0; 256]).block_count(), 1);
        assert_eq!(BinaryImage::from_bytes(vec![0; 257]).block_count(), 2);
    }
}
