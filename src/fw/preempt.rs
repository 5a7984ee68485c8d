//
// preempt.rs --- Trap preemption of foreground hardware access.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The foreground reaches the board only through `Preempt`, which
//! runs a pending trap to completion before each access. Every
//! foreground busy-wait polls the hardware, so a trap raised while
//! the foreground spins is serviced inside the spin, as an interrupt
//! would be.  Traps are masked while the handler runs.
//!
//! On a board whose interrupt vector calls `trap::service` directly,
//! `take_trap` never reports anything and this layer is inert.

use std::sync::Arc;

use crate::fw::shared::SharedState;
use crate::fw::trap;
use crate::hal::{Board, ClockGen, Countdown, Gpio, Group, RxStatus, TrapLine, Uart};

pub struct Preempt<B: Board> {
    board: B,
    shared: Arc<SharedState>,
}

impl<B: Board> Preempt<B> {
    pub fn new(board: B, shared: Arc<SharedState>) -> Preempt<B> {
        Preempt { board, shared }
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Run the trap handler if a trap is pending and unmasked.
    pub fn preempt(&mut self) {
        if self.board.traps_enabled() && self.board.take_trap() {
            self.board.disable_traps();
            trap::service(&mut self.board, &self.shared);
            self.board.enable_traps();
        }
    }
}

impl<B: Board> Gpio for Preempt<B> {
    fn direction(&self, group: Group) -> u8 {
        self.board.direction(group)
    }

    fn set_direction(&mut self, group: Group, outputs: u8) {
        self.preempt();
        self.board.set_direction(group, outputs);
    }

    fn level(&self, group: Group) -> u8 {
        self.board.level(group)
    }

    fn set_level(&mut self, group: Group, level: u8) {
        self.preempt();
        self.board.set_level(group, level);
    }

    fn sample(&mut self, group: Group) -> u8 {
        self.preempt();
        self.board.sample(group)
    }
}

impl<B: Board> Uart for Preempt<B> {
    fn rx_ready(&mut self) -> bool {
        self.preempt();
        self.board.rx_ready()
    }

    fn tx_ready(&mut self) -> bool {
        self.preempt();
        self.board.tx_ready()
    }

    fn read(&mut self) -> (u8, RxStatus) {
        self.preempt();
        self.board.read()
    }

    fn write(&mut self, byte: u8) {
        self.preempt();
        self.board.write(byte);
    }
}

impl<B: Board> Countdown for Preempt<B> {
    fn start(&mut self, ticks: u16) {
        self.preempt();
        self.board.start(ticks);
    }

    fn stop(&mut self) {
        self.preempt();
        self.board.stop();
    }

    fn expired(&mut self) -> bool {
        self.preempt();
        self.board.expired()
    }

    fn clear(&mut self) {
        self.preempt();
        self.board.clear();
    }
}

impl<B: Board> ClockGen for Preempt<B> {
    fn start_clock(&mut self) {
        self.preempt();
        self.board.start_clock();
    }

    fn stop_clock(&mut self) {
        self.preempt();
        self.board.stop_clock();
    }
}

impl<B: Board> TrapLine for Preempt<B> {
    fn enable_traps(&mut self) {
        self.board.enable_traps();
    }

    fn disable_traps(&mut self) {
        self.board.disable_traps();
    }

    fn traps_enabled(&self) -> bool {
        self.board.traps_enabled()
    }

    fn take_trap(&mut self) -> bool {
        self.board.take_trap()
    }
}
