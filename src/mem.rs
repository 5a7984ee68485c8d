//
// mem.rs --- Banked memory device.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

/// Operations on memory as the target sees it.
pub trait Mem {
    /// Load a byte from `addr` and return it.
    fn loadb(&self, addr: u16) -> u8;

    /// Store a byte at `addr`.
    fn storeb(&mut self, addr: u16, val: u8);

    /// Store an array of bytes starting at `addr`. Useful for tests.
    fn store(&mut self, mut addr: u16, bytes: &[u8]) {
        for x in bytes.iter() {
            self.storeb(addr, *x);
            addr = addr.wrapping_add(1);
        }
    }

    /// Read an array of bytes starting at `addr`. Useful for tests.
    fn load(&self, mut addr: u16, bytes: &mut [u8]) {
        for x in bytes.iter_mut() {
            *x = self.loadb(addr);
            addr = addr.wrapping_add(1);
        }
    }
}

/// Size of the window selected by the bank latch.
pub const BANK_SIZE: usize = 0x10000;

/// A static RAM larger than the target's address space. The bank
/// latch picks which 64K window the 16-bit address lands in.
pub struct SRAM {
    contents: Vec<u8>,
    bank: u8,
}

impl SRAM {
    /// Create a new `SRAM` of `banks` 64K windows.
    pub fn new(banks: usize) -> SRAM {
        assert!(banks > 0 && banks <= 256);
        SRAM {
            contents: vec![0u8; banks * BANK_SIZE],
            bank: 0,
        }
    }

    /// The index currently held by the bank latch.
    pub fn bank(&self) -> u8 {
        self.bank
    }

    /// Load the bank latch. Indexes past the last bank wrap around.
    pub fn latch(&mut self, bank: u8) {
        self.bank = bank;
    }

    pub fn banks(&self) -> usize {
        self.contents.len() / BANK_SIZE
    }

    fn index(&self, bank: u8, addr: u16) -> usize {
        (bank as usize % self.banks()) * BANK_SIZE + addr as usize
    }

    /// Load from any bank, ignoring the latch.
    pub fn peek(&self, bank: u8, addr: u16) -> u8 {
        self.contents[self.index(bank, addr)]
    }

    /// Store into any bank, ignoring the latch.
    pub fn poke(&mut self, bank: u8, addr: u16, val: u8) {
        let i = self.index(bank, addr);
        self.contents[i] = val;
    }
}

impl Mem for SRAM {
    fn loadb(&self, addr: u16) -> u8 {
        self.peek(self.bank, addr)
    }

    fn storeb(&mut self, addr: u16, val: u8) {
        let bank = self.bank;
        self.poke(bank, addr, val);
    }
}
