//
// sim.rs --- Simulated controller board.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! A deterministic board for running the controller on a host.
//!
//! ## Implementation Notes
//!
//! Lines are modelled at the level of wired resolution: a line reads
//! the controller's latch if the controller drives it, otherwise the
//! value of whatever external driver is active (target, memory
//! device, switch), otherwise high through the pull-up.  A line
//! driven by both the controller and something external is counted
//! as a contention.
//!
//! Time is counted in timeout-timer ticks and only advances while the
//! controller polls for a byte that has not arrived yet.  Host bytes
//! are scheduled one byte-time apart.

use std::collections::VecDeque;
use std::mem;

use crate::hal::{ClockGen, Countdown, Gpio, Group, Handshake, RxStatus, Strobe, TrapLine, Uart};
use crate::mem::{Mem, SRAM};

/// Timer ticks to shift one byte in at 9600 baud with a 20 MHz
/// clock and a /1024 prescaler.
pub const DEFAULT_BYTE_TICKS: u64 = 20;

const GROUPS: usize = 5;

fn slot(group: Group) -> usize {
    match group {
        Group::Data      => 0,
        Group::AddrLo    => 1,
        Group::AddrHi    => 2,
        Group::Handshake => 3,
        Group::Target    => 4,
    }
}

const ALL: [Group; GROUPS] = [
    Group::Data, Group::AddrLo, Group::AddrHi, Group::Handshake, Group::Target,
];

/// An I/O cycle the target is frozen in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct IoCycle {
    port: u8,
    read: bool,
    data: u8,
}

struct RxByte {
    at: u64,
    byte: u8,
    status: RxStatus,
}

/// The simulated board: controller pins, memory device, target and
/// host side of the serial line.
pub struct SimBoard {
    ddr: [u8; GROUPS],
    port: [u8; GROUPS],
    ram: SRAM,

    clock: bool,
    io: Option<IoCycle>,
    io_reads: Vec<u8>,
    switch_closed: bool,
    traps_enabled: bool,
    trap_pending: bool,
    contentions: usize,

    now: u64,
    byte_ticks: u64,
    last_arrival: u64,
    rx: VecDeque<RxByte>,
    tx: Vec<u8>,
    deadline: Option<u64>,
    expired: bool,
}

impl SimBoard {
    /// Create a board with 512K of banked RAM and every pin an input.
    pub fn new() -> SimBoard {
        SimBoard {
            ddr: [0; GROUPS],
            port: [0; GROUPS],
            ram: SRAM::new(8),
            clock: false,
            io: None,
            io_reads: Vec::new(),
            switch_closed: false,
            traps_enabled: false,
            trap_pending: false,
            contentions: 0,
            now: 0,
            byte_ticks: DEFAULT_BYTE_TICKS,
            last_arrival: 0,
            rx: VecDeque::new(),
            tx: Vec::new(),
            deadline: None,
            expired: false,
        }
    }

    /////////////////////////////////////////////////////////////////
    // Line resolution

    fn driven(&self, group: Group, mask: u8) -> Option<bool> {
        let i = slot(group);
        if self.ddr[i] & mask == mask {
            Some(self.port[i] & mask == mask)
        } else {
            None
        }
    }

    /// True while the reset line is low or undriven.
    pub fn in_reset(&self) -> bool {
        self.driven(Group::Target, Strobe::RESET.bits()) != Some(true)
    }

    pub fn clock_running(&self) -> bool {
        self.clock
    }

    fn bus_requested(&self) -> bool {
        self.driven(Group::Handshake, Handshake::BUSRQ.bits()) == Some(false)
    }

    /// True while the target has handed the bus to the controller.
    pub fn granted(&self) -> bool {
        !self.in_reset() && self.clock && self.io.is_none() && self.bus_requested()
    }

    fn target_drives_bus(&self) -> bool {
        !self.in_reset() && !self.granted()
    }

    fn address(&self) -> u16 {
        let lo = self.resolve(Group::AddrLo) as u16;
        let hi = self.resolve(Group::AddrHi) as u16;
        (hi << 8) | lo
    }

    fn memory_outputs(&self) -> bool {
        let strobes = self.resolve(Group::Target);
        strobes & Strobe::MREQ.bits() == 0
            && strobes & Strobe::RD.bits() == 0
            && strobes & Strobe::WR.bits() != 0
    }

    /// Lines driven by something other than the controller, and
    /// their values.
    fn external(&self, group: Group) -> (u8, u8) {
        match group {
            Group::Data => {
                match self.io {
                    Some(io) if !io.read => (0xff, io.data),
                    _ if self.memory_outputs() => (0xff, self.ram.loadb(self.address())),
                    _ => (0, 0),
                }
            },
            Group::AddrLo => {
                if self.target_drives_bus() {
                    (0xff, self.io.map_or(0, |io| io.port))
                } else {
                    (0, 0)
                }
            },
            Group::AddrHi => {
                if self.target_drives_bus() { (0xff, 0) } else { (0, 0) }
            },
            Group::Handshake => {
                let mut value = 0;
                if !self.granted() {
                    value |= Handshake::BUSACK.bits();
                }
                if self.io.is_none() {
                    value |= Handshake::WAIT.bits();
                }
                ((Handshake::BUSACK | Handshake::WAIT).bits(), value)
            },
            Group::Target => {
                let mut mask = 0;
                let mut value = 0;
                if self.target_drives_bus() {
                    let strobes = Strobe::RD | Strobe::WR | Strobe::MREQ;
                    mask |= strobes.bits();
                    value |= strobes.bits();
                    match self.io {
                        Some(io) if io.read => value &= !Strobe::RD.bits(),
                        Some(_) => value &= !Strobe::WR.bits(),
                        None => {},
                    }
                }
                let user = Strobe::USER.bits();
                if self.switch_closed && self.ddr[slot(Group::Target)] & user == 0 {
                    mask |= user;
                }
                (mask, value)
            },
        }
    }

    fn resolve(&self, group: Group) -> u8 {
        let i = slot(group);
        let ddr = self.ddr[i];
        let (mask, value) = self.external(group);
        (self.port[i] & ddr) | (value & mask & !ddr) | (!mask & !ddr)
    }

    fn snapshot(&self) -> [u8; GROUPS] {
        let mut lines = [0; GROUPS];
        for &g in ALL.iter() {
            lines[slot(g)] = self.resolve(g);
        }
        lines
    }

    fn check_contention(&mut self) {
        for &g in ALL.iter() {
            let (mask, _) = self.external(g);
            if self.ddr[slot(g)] & mask != 0 {
                self.contentions += 1;
            }
        }
    }

    /// React to edges between two line snapshots.
    fn edges(&mut self, before: [u8; GROUPS], after: [u8; GROUPS]) {
        let fell = |g: Group, mask: u8| before[slot(g)] & mask != 0 && after[slot(g)] & mask == 0;
        let rose = |g: Group, mask: u8| before[slot(g)] & mask == 0 && after[slot(g)] & mask != 0;
        let data = before[slot(Group::Data)];

        // The memory device commits a write on the rising edge of WE.
        if rose(Group::Target, Strobe::WR.bits())
            && before[slot(Group::Target)] & Strobe::MREQ.bits() == 0
        {
            let addr = (before[slot(Group::AddrHi)] as u16) << 8 | before[slot(Group::AddrLo)] as u16;
            self.ram.storeb(addr, data);
        }

        if fell(Group::Handshake, Handshake::BANK_LATCH.bits()) {
            self.ram.latch(data);
        }

        if fell(Group::Handshake, Handshake::WAIT_RESET.bits()) {
            if let Some(io) = self.io.take() {
                if io.read {
                    self.io_reads.push(data);
                }
            }
        }
    }

    fn update<F: FnOnce(&mut SimBoard)>(&mut self, f: F) {
        let before = self.snapshot();
        f(self);
        if self.in_reset() {
            self.io = None;
        }
        let after = self.snapshot();
        self.edges(before, after);
        self.check_contention();
    }

    /////////////////////////////////////////////////////////////////
    // Target

    /// Start an I/O write from the target. Returns false if the target
    /// cannot run a bus cycle right now.
    pub fn io_write(&mut self, port: u8, value: u8) -> bool {
        self.start_io(IoCycle { port, read: false, data: value })
    }

    /// Start an I/O read from the target. The value it reads shows up
    /// in `take_io_reads` once the cycle completes.
    pub fn io_read(&mut self, port: u8) -> bool {
        self.start_io(IoCycle { port, read: true, data: 0 })
    }

    fn start_io(&mut self, io: IoCycle) -> bool {
        if !self.clock || !self.target_drives_bus() || self.io.is_some() {
            return false;
        }
        self.update(|sim| sim.io = Some(io));
        self.trap_pending = true;
        true
    }

    /// True while the target is frozen in an I/O cycle.
    pub fn io_waiting(&self) -> bool {
        self.io.is_some()
    }

    /// Values returned to the target by completed I/O reads.
    pub fn take_io_reads(&mut self) -> Vec<u8> {
        mem::replace(&mut self.io_reads, Vec::new())
    }

    /// Open or close the user switch.
    pub fn set_switch(&mut self, closed: bool) {
        self.update(|sim| sim.switch_closed = closed);
    }

    /// The user line's output level, or `None` in switch mode.
    pub fn led_line(&self) -> Option<bool> {
        self.driven(Group::Target, Strobe::USER.bits())
    }

    pub fn ram(&self) -> &SRAM {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut SRAM {
        &mut self.ram
    }

    /// Number of times a line was driven from both ends.
    pub fn contentions(&self) -> usize {
        self.contentions
    }

    /// True if every bus line the controller can drive is an input.
    pub fn bus_released(&self) -> bool {
        let strobes = (Strobe::RD | Strobe::WR | Strobe::MREQ).bits();
        self.ddr[slot(Group::Data)] == 0
            && self.ddr[slot(Group::AddrLo)] == 0
            && self.ddr[slot(Group::AddrHi)] == 0
            && self.ddr[slot(Group::Target)] & strobes == 0
            && !self.bus_requested()
    }

    /////////////////////////////////////////////////////////////////
    // Host

    /// Queue bytes from the host, one byte-time apart.
    pub fn host_send(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.host_send_with(b, RxStatus::empty());
        }
    }

    /// Queue one byte that arrives with the given receive status.
    pub fn host_send_with(&mut self, byte: u8, status: RxStatus) {
        let at = self.last_arrival.max(self.now) + self.byte_ticks;
        self.rx.push_back(RxByte { at, byte, status });
        self.last_arrival = at;
    }

    /// Delay the next queued byte by `ticks`.
    pub fn host_stall(&mut self, ticks: u64) {
        self.last_arrival = self.last_arrival.max(self.now) + ticks;
    }

    /// True if queued host bytes have not been read yet.
    pub fn input_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Take everything the controller has sent.
    pub fn take_sent(&mut self) -> Vec<u8> {
        mem::replace(&mut self.tx, Vec::new())
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Let `ticks` pass without the controller doing anything.
    pub fn advance(&mut self, ticks: u64) {
        self.now += ticks;
    }

    fn update_timer(&mut self) {
        if let Some(deadline) = self.deadline {
            if self.now >= deadline {
                self.expired = true;
            }
        }
    }
}

impl Default for SimBoard {
    fn default() -> SimBoard {
        SimBoard::new()
    }
}

impl Gpio for SimBoard {
    fn direction(&self, group: Group) -> u8 {
        self.ddr[slot(group)]
    }

    fn set_direction(&mut self, group: Group, outputs: u8) {
        self.update(|sim| sim.ddr[slot(group)] = outputs);
    }

    fn level(&self, group: Group) -> u8 {
        self.port[slot(group)]
    }

    fn set_level(&mut self, group: Group, level: u8) {
        self.update(|sim| sim.port[slot(group)] = level);
    }

    fn sample(&mut self, group: Group) -> u8 {
        self.resolve(group)
    }
}

impl Uart for SimBoard {
    fn rx_ready(&mut self) -> bool {
        match self.rx.front() {
            Some(b) if b.at <= self.now => true,
            _ => {
                self.now += 1;
                false
            },
        }
    }

    fn tx_ready(&mut self) -> bool {
        true
    }

    fn read(&mut self) -> (u8, RxStatus) {
        match self.rx.front() {
            Some(b) if b.at <= self.now => {},
            _ => return (0, RxStatus::empty()),
        }
        match self.rx.pop_front() {
            Some(b) => (b.byte, b.status),
            None => (0, RxStatus::empty()),
        }
    }

    fn write(&mut self, byte: u8) {
        self.tx.push(byte);
    }
}

impl Countdown for SimBoard {
    fn start(&mut self, ticks: u16) {
        self.deadline = Some(self.now + ticks as u64);
    }

    fn stop(&mut self) {
        self.update_timer();
        self.deadline = None;
    }

    fn expired(&mut self) -> bool {
        self.update_timer();
        self.expired
    }

    fn clear(&mut self) {
        self.expired = false;
    }
}

impl ClockGen for SimBoard {
    fn start_clock(&mut self) {
        self.update(|sim| sim.clock = true);
    }

    fn stop_clock(&mut self) {
        self.update(|sim| sim.clock = false);
    }
}

impl TrapLine for SimBoard {
    fn enable_traps(&mut self) {
        self.traps_enabled = true;
    }

    fn disable_traps(&mut self) {
        self.traps_enabled = false;
    }

    fn traps_enabled(&self) -> bool {
        self.traps_enabled
    }

    fn take_trap(&mut self) -> bool {
        mem::replace(&mut self.trap_pending, false)
    }
}
