//
// trap.rs --- I/O trap handler.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Emulation of the target's memory-mapped peripherals.
//!
//! When the target starts an I/O cycle the wait flip-flop freezes it
//! and raises the trap.  The handler decodes the port from A0-A3,
//! answers the request on the data lines, then lets the target finish
//! the cycle.  It only ever sees a `TrapContext`, so it cannot reach
//! the blocking serial primitives; console output is fire-and-forget.

use crate::fw::shared::SharedState;
use crate::hal::{Group, Handshake, Strobe, TrapContext};

pub const PORT_CONSOLE: u8 = 0;
pub const PORT_USER: u8 = 1;
pub const PORT_BANK: u8 = 2;

/// Direction of an I/O cycle, seen from the target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// The I/O cycle the target is frozen in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IoRequest {
    pub port: u8,
    pub direction: Direction,
}

impl IoRequest {
    /// Decode the request from the address and strobe lines.
    pub fn sample<C: TrapContext>(hw: &mut C) -> IoRequest {
        let port = hw.sample(Group::AddrLo) & 0x0f;
        let direction = if hw.is_high(Group::Target, Strobe::RD.bits()) {
            Direction::Write
        } else {
            Direction::Read
        };
        IoRequest { port, direction }
    }
}

/// Commands written to the user port.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UserCommand {
    DisableLed,
    EnableLed,
    LedMode,
    SwitchMode,
}

impl UserCommand {
    pub fn from_byte(byte: u8) -> Option<UserCommand> {
        match byte {
            0 => Some(UserCommand::DisableLed),
            1 => Some(UserCommand::EnableLed),
            2 => Some(UserCommand::LedMode),
            3 => Some(UserCommand::SwitchMode),
            _ => None,
        }
    }
}

/// Service one trap. Does nothing if the target is not actually
/// waiting, which filters the edge seen when the wait line rises.
pub fn service<C: TrapContext>(hw: &mut C, shared: &SharedState) {
    if hw.is_high(Group::Handshake, Handshake::WAIT.bits()) {
        return;
    }

    let req = IoRequest::sample(hw);
    match req.port {
        PORT_CONSOLE => console(hw, req.direction),
        PORT_USER => user(hw, req.direction),
        PORT_BANK => bank(hw, req.direction, shared),
        _ => {},
    }

    complete(hw, req.direction);
    shared.count_trap();
}

fn console<C: TrapContext>(hw: &mut C, direction: Direction) {
    if direction == Direction::Write {
        let byte = hw.sample(Group::Data);
        hw.console_put(byte);
    }
}

fn user<C: TrapContext>(hw: &mut C, direction: Direction) {
    let line = Strobe::USER.bits();
    match direction {
        Direction::Read => {
            // The switch pulls the line low when closed.
            let closed = !hw.is_high(Group::Target, line);
            hw.drive(Group::Data, closed as u8);
        },
        Direction::Write => {
            let led_mode = hw.direction(Group::Target) & line != 0;
            match UserCommand::from_byte(hw.sample(Group::Data)) {
                Some(UserCommand::DisableLed) => {
                    if led_mode {
                        hw.set_lines(Group::Target, line, true);
                    }
                },
                Some(UserCommand::EnableLed) => {
                    if led_mode {
                        hw.set_lines(Group::Target, line, false);
                    }
                },
                Some(UserCommand::LedMode) => {
                    // Starts with the LED off.
                    hw.set_lines(Group::Target, line, true);
                    hw.claim(Group::Target, line);
                },
                Some(UserCommand::SwitchMode) => {
                    hw.release(Group::Target, line);
                },
                None => {},
            }
        },
    }
}

fn bank<C: TrapContext>(hw: &mut C, direction: Direction, shared: &SharedState) {
    match direction {
        Direction::Read => {
            hw.drive(Group::Data, shared.bank());
        },
        Direction::Write => {
            // The target is driving the new index on the data lines,
            // so the latch takes it straight from there.
            shared.set_bank(hw.sample(Group::Data));
            hw.pulse(Group::Handshake, Handshake::BANK_LATCH.bits());
        },
    }
}

/// Let the target finish its cycle, then take the bus long enough to
/// stop driving the data lines. BUSRQ is put back the way it was found
/// so a foreground acquire in progress is not cancelled.
fn complete<C: TrapContext>(hw: &mut C, direction: Direction) {
    let busrq = Handshake::BUSRQ.bits();
    let requested = hw.level(Group::Handshake) & busrq == 0;

    hw.set_lines(Group::Handshake, busrq, false);
    hw.pulse(Group::Handshake, Handshake::WAIT_RESET.bits());
    while hw.is_high(Group::Handshake, Handshake::BUSACK.bits()) {}

    if direction == Direction::Read {
        hw.release(Group::Data, 0xff);
    }

    if !requested {
        hw.set_lines(Group::Handshake, busrq, true);
    }
}

#[cfg(test)]
#[path = "trap_test.rs"]
mod test;
