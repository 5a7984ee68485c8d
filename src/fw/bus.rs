//
// bus.rs --- Shared bus arbitration and memory injection.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Ownership of the shared bus.
//!
//! The controller may only drive the data, address and memory strobe
//! lines through a `Bus` handle, which exists only while the target
//! has handed the bus over.  Dropping the handle puts every line back
//! to input-with-pull-up and lets the target have the bus again.
//!
//! `acquire` waits on the target's acknowledge with no timeout. A
//! target that never acknowledges hangs the controller.

use log::trace;

use crate::fw::shared::SharedState;
use crate::hal::{Gpio, Group, Handshake, Strobe};

/// Who currently owns the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Owner {
    Target,
    Controller,
}

/// Tracks bus ownership across acquisitions.
#[derive(Debug)]
pub struct BusArbiter {
    owner: Owner,
}

/// Return true if the target is held in reset. A target in reset
/// floats its bus lines and never acknowledges a bus request.
pub fn target_in_reset<H: Gpio>(hw: &H) -> bool {
    hw.level(Group::Target) & Strobe::RESET.bits() == 0
}

impl BusArbiter {
    pub fn new() -> BusArbiter {
        BusArbiter { owner: Owner::Target }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Take the bus from the target, or reuse a bus kept by
    /// `Bus::keep`.
    pub fn acquire<'a, H: Gpio>(&'a mut self, hw: &'a mut H) -> Bus<'a, H> {
        if self.owner == Owner::Target {
            hw.set_lines(Group::Handshake, Handshake::BUSRQ.bits(), false);
            if !target_in_reset(&*hw) {
                while hw.is_high(Group::Handshake, Handshake::BUSACK.bits()) {}
            }
            self.owner = Owner::Controller;
            trace!("bus acquired");
        }
        Bus { hw, arbiter: self, keep: false }
    }

    /// Hand the bus back to the target.
    pub fn release<H: Gpio>(&mut self, hw: &mut H) {
        if self.owner == Owner::Controller {
            release_lines(hw);
            hw.set_lines(Group::Handshake, Handshake::BUSRQ.bits(), true);
            self.owner = Owner::Target;
            trace!("bus released");
        }
    }
}

impl Default for BusArbiter {
    fn default() -> BusArbiter {
        BusArbiter::new()
    }
}

fn release_lines<H: Gpio>(hw: &mut H) {
    let strobes = (Strobe::RD | Strobe::WR | Strobe::MREQ).bits();
    hw.release(Group::Target, strobes);
    hw.release(Group::AddrLo, 0xff);
    hw.release(Group::AddrHi, 0xff);
    hw.release(Group::Data, 0xff);
}

/////////////////////////////////////////////////////////////////////
// Owned bus

/// The bus while the controller owns it.
pub struct Bus<'a, H: Gpio> {
    hw: &'a mut H,
    arbiter: &'a mut BusArbiter,
    keep: bool,
}

impl<'a, H: Gpio> Bus<'a, H> {
    /// Drive the address lines and enable the memory device with the
    /// given strobe also under our control.
    fn begin(&mut self, strobe: Strobe) {
        self.hw.claim(Group::AddrLo, 0xff);
        self.hw.claim(Group::AddrHi, 0xff);

        // Strobes go high before they become outputs so the device
        // never sees a glitch. OE stays pulled up while writing.
        let lines = (strobe | Strobe::MREQ).bits();
        self.hw.set_lines(Group::Target, lines, true);
        self.hw.claim(Group::Target, lines);
        self.hw.set_lines(Group::Target, Strobe::MREQ.bits(), false);
    }

    fn end(&mut self) {
        release_lines(&mut *self.hw);
    }

    fn set_address(&mut self, addr: u16) {
        let [lo, hi] = addr.to_le_bytes();
        self.hw.set_level(Group::AddrLo, lo);
        self.hw.set_level(Group::AddrHi, hi);
    }

    fn put(&mut self, addr: u16, value: u8) {
        self.set_address(addr);
        self.hw.set_level(Group::Data, value);
        self.hw.pulse(Group::Target, Strobe::WR.bits());
    }

    fn get(&mut self, addr: u16) -> u8 {
        self.set_address(addr);
        self.hw.set_lines(Group::Target, Strobe::RD.bits(), false);
        let value = self.hw.sample(Group::Data);
        self.hw.set_lines(Group::Target, Strobe::RD.bits(), true);
        value
    }

    /// Store a byte at `addr`.
    pub fn write_byte_at(&mut self, addr: u16, value: u8) {
        self.inject_image(addr, &[value]);
    }

    /// Load a byte from `addr`.
    pub fn read_byte_at(&mut self, addr: u16) -> u8 {
        let mut buf = [0];
        self.read_region(addr, &mut buf);
        buf[0]
    }

    /// Store `bytes` at consecutive addresses starting at `base`.
    pub fn inject_image(&mut self, base: u16, bytes: &[u8]) {
        self.begin(Strobe::WR);
        self.hw.claim(Group::Data, 0xff);
        let mut addr = base;
        for &b in bytes {
            self.put(addr, b);
            addr = addr.wrapping_add(1);
        }
        self.end();
        trace!("wrote {} bytes at {:04X}", bytes.len(), base);
    }

    /// Fill `buf` from consecutive addresses starting at `base`.
    pub fn read_region(&mut self, base: u16, buf: &mut [u8]) {
        self.begin(Strobe::RD);
        let mut addr = base;
        for x in buf.iter_mut() {
            *x = self.get(addr);
            addr = addr.wrapping_add(1);
        }
        self.end();
    }

    /// Latch `index` into the bank-select register and remember it.
    pub fn switch_bank(&mut self, index: u8, shared: &SharedState) {
        self.hw.drive(Group::Data, index);
        self.hw.pulse(Group::Handshake, Handshake::BANK_LATCH.bits());
        self.hw.release(Group::Data, 0xff);
        shared.set_bank(index);
        trace!("bank {}", index);
    }

    /// Give the bus back now.
    pub fn release(self) {}

    /// Keep the bus after this handle goes away. The next `acquire`
    /// reuses it without a new handshake.
    pub fn keep(mut self) {
        self.keep = true;
    }
}

impl<'a, H: Gpio> Drop for Bus<'a, H> {
    fn drop(&mut self) {
        if !self.keep {
            self.arbiter.release(&mut *self.hw);
        }
    }
}

#[cfg(test)]
#[path = "bus_test.rs"]
mod test;
