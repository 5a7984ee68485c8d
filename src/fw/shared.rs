//
// shared.rs --- State shared between the foreground and the trap handler.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Fields written from both contexts.
///
/// The trap handler runs to completion and is never preempted by the
/// foreground, so a single atomic store per field is all either side
/// needs.  Per field:
///
/// * `bank` --- written by the foreground (`switch_bank`) and by the
///   handler (target writes to the bank port); read by both.
/// * `blocks_remaining` --- written by the foreground during a load;
///   read by anyone.
/// * `traps_serviced` --- written by the handler; read by the foreground.
#[derive(Debug, Default)]
pub struct SharedState {
    bank: AtomicU8,
    blocks_remaining: AtomicU8,
    traps_serviced: AtomicU32,
}

impl SharedState {
    pub fn new(bank: u8) -> SharedState {
        SharedState {
            bank: AtomicU8::new(bank),
            ..SharedState::default()
        }
    }

    /// The bank index last written to the latch.
    pub fn bank(&self) -> u8 {
        self.bank.load(Ordering::SeqCst)
    }

    pub fn set_bank(&self, bank: u8) {
        self.bank.store(bank, Ordering::SeqCst);
    }

    /// Blocks still expected by an in-flight load.
    pub fn blocks_remaining(&self) -> u8 {
        self.blocks_remaining.load(Ordering::SeqCst)
    }

    pub fn set_blocks_remaining(&self, count: u8) {
        self.blocks_remaining.store(count, Ordering::SeqCst);
    }

    /// Number of I/O traps handled since startup.
    pub fn traps_serviced(&self) -> u32 {
        self.traps_serviced.load(Ordering::SeqCst)
    }

    pub(crate) fn count_trap(&self) {
        self.traps_serviced.fetch_add(1, Ordering::SeqCst);
    }
}
