//
// link.rs --- Byte-level serial link with timeout and sticky errors.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The byte layer of the host protocol.
//!
//! ## Implementation Notes
//!
//! Receive errors reported by the UART are latched into `LinkFlags`
//! and stay set until the next `validate` checkpoint.  The UART only
//! buffers two bytes, so a caller that reads more than two bytes
//! between checkpoints can lose an error report.

use bitflags::bitflags;
use log::{trace, warn};

use crate::fw::config::Config;
use crate::fw::error::{LinkError, Result, STATUS_OK};
use crate::hal::{Countdown, RxStatus, Uart};

bitflags! {
    /// Receive errors seen since the last checkpoint.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct LinkFlags: u8 {
        const FRAME_ERROR     = 0b01;
        const BUFFER_OVERFLOW = 0b10;
    }
}

/// The serial link to the host.
#[derive(Debug)]
pub struct SerialLink {
    flags: LinkFlags,
    cycles_per_byte: u16,
    max_bytes: u16,
}

impl SerialLink {
    pub fn new(config: &Config) -> SerialLink {
        SerialLink {
            flags: LinkFlags::empty(),
            cycles_per_byte: config.cycles_per_byte(),
            max_bytes: config.max_timed_bytes(),
        }
    }

    /// Errors latched since the last checkpoint.
    pub fn flags(&self) -> LinkFlags {
        self.flags
    }

    /// Return the timer ticks allowed for `expected` bytes. Counts past
    /// the 16-bit range are clamped, so large transfers must be chunked
    /// to avoid premature timeouts.
    pub fn timeout_ticks(&self, expected: u16) -> u16 {
        if expected <= self.max_bytes {
            expected * self.cycles_per_byte
        } else {
            u16::max_value()
        }
    }

    /// Start the timeout timer for `expected` bytes.
    pub fn arm_timeout<H: Countdown>(&self, hw: &mut H, expected: u16) {
        hw.clear();
        hw.start(self.timeout_ticks(expected));
    }

    fn latch(&mut self, status: RxStatus) {
        if status.contains(RxStatus::FRAME_ERROR) {
            self.flags.insert(LinkFlags::FRAME_ERROR);
        }
        if status.contains(RxStatus::DATA_OVERRUN) {
            self.flags.insert(LinkFlags::BUFFER_OVERFLOW);
        }
    }

    /// Take a byte if one has already arrived.
    pub fn try_recv<H: Uart>(&mut self, hw: &mut H) -> Option<u8> {
        if !hw.rx_ready() {
            return None;
        }
        let (byte, status) = hw.read();
        self.latch(status);
        Some(byte)
    }

    /// Wait for a byte. Returns `None` once the armed timer expires.
    pub fn recv_byte<H: Uart + Countdown>(&mut self, hw: &mut H) -> Option<u8> {
        loop {
            if let Some(byte) = self.try_recv(hw) {
                return Some(byte);
            }
            if hw.expired() {
                return None;
            }
        }
    }

    /// Receive a big-endian 16-bit value.
    pub fn recv_u16<H: Uart + Countdown>(&mut self, hw: &mut H) -> Option<u16> {
        let hi = self.recv_byte(hw)?;
        let lo = self.recv_byte(hw)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    /// Wait for the transmitter and send a byte.
    pub fn send_byte<H: Uart>(&mut self, hw: &mut H, byte: u8) {
        while !hw.tx_ready() {}
        hw.write(byte);
    }

    /// Discard everything already received.
    pub fn flush_input<H: Uart>(&mut self, hw: &mut H) {
        while hw.rx_ready() {
            let (byte, _) = hw.read();
            trace!("flushed {:02X}", byte);
        }
    }

    /// Send the OK status.
    pub fn send_ok<H: Uart>(&mut self, hw: &mut H) {
        self.send_byte(hw, STATUS_OK);
    }

    /// Flush pending input and send `err` to the host.
    pub fn report<H: Uart>(&mut self, hw: &mut H, err: LinkError) -> LinkError {
        warn!("reporting {}", err);
        self.flush_input(hw);
        self.send_byte(hw, err.code());
        err
    }

    /// Checkpoint: stop the timer and check for latched errors.
    ///
    /// At most one error is reported per checkpoint. Frame errors win
    /// over overflows, which win over a timeout. Reporting flushes the
    /// input and clears every flag.
    pub fn validate<H: Uart + Countdown>(&mut self, hw: &mut H) -> Result<()> {
        hw.stop();
        let err = if self.flags.contains(LinkFlags::FRAME_ERROR) {
            LinkError::FrameError
        } else if self.flags.contains(LinkFlags::BUFFER_OVERFLOW) {
            LinkError::BufferOverflow
        } else if hw.expired() {
            LinkError::Timeout
        } else {
            return Ok(());
        };

        self.report(hw, err);
        self.flags = LinkFlags::empty();
        hw.clear();
        Err(err)
    }
}

#[cfg(test)]
#[path = "link_test.rs"]
mod test;
