//
// block.rs --- Checksummed block framing.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Blocks are sent as `[length-1][payload...][checksum]`.
//!
//! Storing `length - 1` lets one byte describe payloads of 1 to 256
//! bytes.  The checksum is the XOR of every payload byte, which
//! catches any single flipped bit but misses the same bit flipped in
//! two different bytes.

use log::trace;

use crate::fw::config::MAX_BLOCK;
use crate::fw::error::{LinkError, Result};
use crate::fw::link::SerialLink;
use crate::hal::{Countdown, Uart};

/// XOR of all bytes.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// A received block. Fixed capacity, no allocation.
pub struct Block {
    data: [u8; MAX_BLOCK],
    len: usize,
}

impl Block {
    pub fn new() -> Block {
        Block {
            data: [0; MAX_BLOCK],
            len: 0,
        }
    }

    /// The payload of the last block received into this buffer.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn checksum(&self) -> u8 {
        checksum(self.payload())
    }
}

impl Default for Block {
    fn default() -> Block {
        Block::new()
    }
}

impl SerialLink {
    /// Receive a block of at most `max_len` payload bytes into `block`
    /// and return its length.
    ///
    /// Every failure has already been reported to the host when this
    /// returns. An oversized length byte is rejected before any
    /// payload or checksum byte is read. Only bytes already received
    /// are flushed; payload bytes still on the wire are later read as
    /// command bytes, so a stray 0x01 starts a LoadBinary.
    pub fn receive_block<H>(&mut self, hw: &mut H, max_len: usize, block: &mut Block) -> Result<usize>
        where H: Uart + Countdown
    {
        self.arm_timeout(hw, 1);
        let size = self.recv_byte(hw);
        self.validate(hw)?;
        let len = match size {
            Some(size) => size as usize + 1,
            None => return Err(LinkError::Timeout),
        };

        if len > max_len {
            return Err(self.report(hw, LinkError::InvalidSize));
        }

        self.arm_timeout(hw, len as u16 + 1);
        block.len = 0;
        while block.len < len {
            match self.recv_byte(hw) {
                Some(byte) => {
                    block.data[block.len] = byte;
                    block.len += 1;
                },
                None => break,
            }
        }
        let received = if block.len == len { self.recv_byte(hw) } else { None };
        self.validate(hw)?;
        let received = received.ok_or(LinkError::Timeout)?;

        if received != block.checksum() {
            trace!("checksum {:02X}, expected {:02X}", received, block.checksum());
            return Err(self.report(hw, LinkError::ChecksumFailed));
        }

        Ok(len)
    }

    /// Send `bytes` (1 to 256 of them) as one block. The host's reply,
    /// if any, is the caller's business.
    pub fn send_block<H: Uart>(&mut self, hw: &mut H, bytes: &[u8]) {
        debug_assert!(!bytes.is_empty() && bytes.len() <= MAX_BLOCK);

        self.send_byte(hw, (bytes.len() - 1) as u8);
        let mut sum = 0;
        for &b in bytes {
            sum ^= b;
            self.send_byte(hw, b);
        }
        self.send_byte(hw, sum);
    }
}

#[cfg(test)]
#[path = "block_test.rs"]
mod test;
