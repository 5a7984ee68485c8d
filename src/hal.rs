//
// hal.rs --- Hardware primitives used by the controller core.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Hardware primitives consumed by the firmware core.
//!
//! Every line group is an 8-bit port with a direction register, an
//! output latch (which doubles as the pull-up enable for inputs) and
//! an input sampler.  All control lines are active low: "asserting"
//! a line means driving it low.

use bitflags::bitflags;

/// A named group of up to eight lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    /// D0-D7, shared with the target and the memory device.
    Data,
    /// A0-A7. The low nibble carries the I/O port during a trap.
    AddrLo,
    /// A8-A15.
    AddrHi,
    /// Bus arbitration and wait-state lines, see `Handshake`.
    Handshake,
    /// Target strobes, reset and the user line, see `Strobe`.
    Target,
}

bitflags! {
    /// Lines in the `Group::Handshake` port.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Handshake: u8 {
        /// Bus request to the target (output).
        const BUSRQ      = 0b0000_1000;
        /// Bus acknowledge from the target (input).
        const BUSACK     = 0b0001_0000;
        /// Wait line held low by the I/O flip-flop (input).
        const WAIT       = 0b0010_0000;
        /// Clears the I/O wait flip-flop (output).
        const WAIT_RESET = 0b0100_0000;
        /// Bank-select latch enable (output).
        const BANK_LATCH = 0b1000_0000;
    }
}

bitflags! {
    /// Lines in the `Group::Target` port.
    ///
    /// `RD`, `WR` and `MREQ` double as the memory device's output
    /// enable, write enable and chip enable.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Strobe: u8 {
        /// Shared user switch / LED line.
        const USER  = 0b0000_0100;
        const RD    = 0b0000_1000;
        const WR    = 0b0001_0000;
        const MREQ  = 0b0010_0000;
        /// Target reset (output).
        const RESET = 0b0100_0000;
        /// Target clock (driven by `ClockGen`).
        const CLK   = 0b1000_0000;
    }
}

bitflags! {
    /// Receive status reported by the UART alongside each byte.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct RxStatus: u8 {
        const FRAME_ERROR  = 0b0001_0000;
        const DATA_OVERRUN = 0b0000_1000;
    }
}

/// Operations on line groups.
pub trait Gpio {
    /// Return the direction mask of `group` (1 = output).
    fn direction(&self, group: Group) -> u8;

    /// Set the direction mask of `group`.
    fn set_direction(&mut self, group: Group, outputs: u8);

    /// Return the output latch of `group`.
    fn level(&self, group: Group) -> u8;

    /// Set the output latch of `group`. For input lines a 1 enables
    /// the pull-up.
    fn set_level(&mut self, group: Group, level: u8);

    /// Sample the actual line levels of `group`.
    fn sample(&mut self, group: Group) -> u8;

    /// Make the lines in `mask` outputs.
    fn claim(&mut self, group: Group, mask: u8) {
        let dir = self.direction(group);
        self.set_direction(group, dir | mask);
    }

    /// Return the lines in `mask` to inputs with pull-ups enabled.
    fn release(&mut self, group: Group, mask: u8) {
        let level = self.level(group);
        self.set_level(group, level | mask);
        let dir = self.direction(group);
        self.set_direction(group, dir & !mask);
    }

    /// Drive every line of `group` with `value`.
    fn drive(&mut self, group: Group, value: u8) {
        self.set_direction(group, 0xff);
        self.set_level(group, value);
    }

    /// Set the lines in `mask` high or low, leaving the rest alone.
    fn set_lines(&mut self, group: Group, mask: u8, high: bool) {
        let level = self.level(group);
        if high {
            self.set_level(group, level | mask);
        } else {
            self.set_level(group, level & !mask);
        }
    }

    /// Toggle the lines in `mask` twice. At the controller's clock a
    /// single cycle satisfies the memory device's minimum pulse width.
    fn pulse(&mut self, group: Group, mask: u8) {
        let level = self.level(group);
        self.set_level(group, level ^ mask);
        self.set_level(group, level);
    }

    /// Return true if all lines in `mask` sample high.
    fn is_high(&mut self, group: Group, mask: u8) -> bool {
        self.sample(group) & mask == mask
    }
}

/// The serial port.
pub trait Uart {
    /// Return true if a received byte is waiting.
    fn rx_ready(&mut self) -> bool;

    /// Return true if the transmitter can accept a byte.
    fn tx_ready(&mut self) -> bool;

    /// Take the received byte and the status latched with it.
    fn read(&mut self) -> (u8, RxStatus);

    /// Load a byte into the transmitter.
    fn write(&mut self, byte: u8);
}

/// The serial timeout timer.
pub trait Countdown {
    /// Zero the counter and start counting towards `ticks`.
    fn start(&mut self, ticks: u16);

    /// Stop counting. The expired flag is left as it is.
    fn stop(&mut self);

    /// Return the sticky compare-match flag.
    fn expired(&mut self) -> bool;

    /// Clear the compare-match flag.
    fn clear(&mut self);
}

/// The free-running clock fed to the target.
pub trait ClockGen {
    fn start_clock(&mut self);
    fn stop_clock(&mut self);
}

/// The interrupt raised when the target begins an I/O cycle.
pub trait TrapLine {
    fn enable_traps(&mut self);
    fn disable_traps(&mut self);
    fn traps_enabled(&self) -> bool;

    /// Take a latched I/O request. Boards with a real interrupt vector
    /// service traps there and always return false.
    fn take_trap(&mut self) -> bool;
}

/// Everything the foreground needs from a board.
pub trait Board: Gpio + Uart + Countdown + ClockGen + TrapLine {}

impl<T: Gpio + Uart + Countdown + ClockGen + TrapLine> Board for T {}

/// What the trap handler may touch: the lines, and a console write
/// that never waits on the transmitter.
pub trait TrapContext: Gpio {
    fn console_put(&mut self, byte: u8);
}

impl<T: Gpio + Uart> TrapContext for T {
    fn console_put(&mut self, byte: u8) {
        self.write(byte);
    }
}
