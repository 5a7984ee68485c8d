//
// command.rs --- Host command loop.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The foreground task.
//!
//! ## Implementation Notes
//!
//! Each command reports its own failures to the host as a status
//! byte; nothing is retried here.  A failed `LoadBinary` leaves the
//! target held in reset with its clock stopped, so a partially loaded
//! image never runs.

use std::sync::Arc;

use log::{debug, info};

use crate::fw::block::Block;
use crate::fw::bus::{BusArbiter, Owner};
use crate::fw::config::{Config, MAX_BLOCK, RAM_WINDOW};
use crate::fw::error::{LinkError, Result};
use crate::fw::link::SerialLink;
use crate::fw::preempt::Preempt;
use crate::fw::shared::SharedState;
use crate::hal::{Board, ClockGen, Gpio, Group, Handshake, Strobe, TrapLine};

pub const CMD_LOAD_BINARY: u8 = 1;
pub const CMD_ECHO: u8 = 2;
pub const CMD_UPLOAD_TO_RAM: u8 = 3;
pub const CMD_DOWNLOAD_FROM_RAM: u8 = 4;

/// Block-count cell contents while a load is being set up.
pub const LOAD_PENDING: u8 = 0xff;

/// Commands understood by the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    LoadBinary,
    Echo,
    UploadToRam,
    DownloadFromRam,
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Command> {
        match byte {
            CMD_LOAD_BINARY       => Some(Command::LoadBinary),
            CMD_ECHO              => Some(Command::Echo),
            CMD_UPLOAD_TO_RAM     => Some(Command::UploadToRam),
            CMD_DOWNLOAD_FROM_RAM => Some(Command::DownloadFromRam),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Command::LoadBinary      => CMD_LOAD_BINARY,
            Command::Echo            => CMD_ECHO,
            Command::UploadToRam     => CMD_UPLOAD_TO_RAM,
            Command::DownloadFromRam => CMD_DOWNLOAD_FROM_RAM,
        }
    }
}

/// States of the composite load protocol.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    AwaitSize,
    AwaitBlocks { remaining: u16 },
    Done,
    Aborted(LinkError),
}

/// The bus controller.
pub struct Controller<B: Board> {
    hw: Preempt<B>,
    shared: Arc<SharedState>,
    link: SerialLink,
    arbiter: BusArbiter,
    block: Block,
    config: Config,
}

impl<B: Board> Controller<B> {
    /// Put every line into its idle state, hold the target in reset
    /// and select the initial bank.
    pub fn new(board: B, config: Config) -> Controller<B> {
        let shared = Arc::new(SharedState::new(config.initial_bank));
        let mut ctl = Controller {
            hw: Preempt::new(board, shared.clone()),
            shared,
            link: SerialLink::new(&config),
            arbiter: BusArbiter::new(),
            block: Block::new(),
            config,
        };

        ctl.init_lines();
        let bank = ctl.config.initial_bank;
        ctl.switch_bank(bank);
        ctl
    }

    fn init_lines(&mut self) {
        let hw = &mut self.hw;
        hw.disable_traps();
        hw.stop_clock();

        hw.release(Group::Data, 0xff);
        hw.release(Group::AddrLo, 0xff);
        hw.release(Group::AddrHi, 0xff);

        let outputs = Handshake::BUSRQ | Handshake::WAIT_RESET | Handshake::BANK_LATCH;
        hw.set_level(Group::Handshake, (Handshake::BUSRQ | Handshake::WAIT_RESET).bits());
        hw.set_direction(Group::Handshake, outputs.bits());

        let pulled = Strobe::USER | Strobe::RD | Strobe::WR | Strobe::MREQ | Strobe::CLK;
        hw.set_level(Group::Target, pulled.bits());
        hw.set_direction(Group::Target, (Strobe::RESET | Strobe::CLK).bits());
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn board(&self) -> &B {
        self.hw.board()
    }

    pub fn board_mut(&mut self) -> &mut B {
        self.hw.board_mut()
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn bus_owner(&self) -> Owner {
        self.arbiter.owner()
    }

    /// Handle one command if a command byte has arrived. Returns false
    /// if there was nothing to do.
    pub fn step(&mut self) -> bool {
        let byte = match self.link.try_recv(&mut self.hw) {
            Some(byte) => byte,
            None => return false,
        };
        if self.link.validate(&mut self.hw).is_err() {
            return true;
        }

        let result = match Command::from_byte(byte) {
            Some(cmd) => {
                debug!("command {:?}", cmd);
                self.dispatch(cmd)
            },
            None => {
                debug!("unknown command {:02X}", byte);
                Err(self.link.report(&mut self.hw, LinkError::UnknownCommand))
            },
        };

        if let Err(err) = result {
            debug!("command {:02X} failed: {}", byte, err);
        }
        true
    }

    /// Serve the host forever.
    pub fn run(&mut self) -> ! {
        info!("bus controller ready");
        loop {
            self.step();
        }
    }

    pub fn dispatch(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::LoadBinary      => self.load_binary(),
            Command::Echo            => self.echo(),
            Command::UploadToRam     => self.upload_to_ram(),
            Command::DownloadFromRam => {
                self.download_from_ram();
                Ok(())
            },
        }
    }

    /////////////////////////////////////////////////////////////////
    // Target control

    fn hold_reset(&mut self) {
        self.hw.set_lines(Group::Target, Strobe::RESET.bits(), false);
    }

    fn release_reset(&mut self) {
        self.hw.set_lines(Group::Target, Strobe::RESET.bits(), true);
    }

    /// Select the memory window the target sees.
    pub fn switch_bank(&mut self, index: u8) {
        let mut bus = self.arbiter.acquire(&mut self.hw);
        bus.switch_bank(index, &self.shared);
    }

    /////////////////////////////////////////////////////////////////
    // Commands

    /// Read one byte and send it back.
    pub fn echo(&mut self) -> Result<()> {
        self.link.arm_timeout(&mut self.hw, 1);
        let byte = self.link.recv_byte(&mut self.hw);
        self.link.validate(&mut self.hw)?;
        let byte = byte.ok_or(LinkError::Timeout)?;
        self.link.send_byte(&mut self.hw, byte);
        Ok(())
    }

    /// Store one block of up to 16 bytes at address 0.
    pub fn upload_to_ram(&mut self) -> Result<()> {
        let len = self.link.receive_block(&mut self.hw, RAM_WINDOW, &mut self.block)?;
        self.arbiter.acquire(&mut self.hw).inject_image(0, self.block.payload());
        self.link.send_ok(&mut self.hw);
        debug!("uploaded {} bytes", len);
        Ok(())
    }

    /// Send the first 16 bytes of memory as one block.
    pub fn download_from_ram(&mut self) {
        let mut buf = [0; RAM_WINDOW];
        self.arbiter.acquire(&mut self.hw).read_region(0, &mut buf);
        self.link.send_block(&mut self.hw, &buf);
    }

    /// Place the bootstrap, start the target on it, then stream the
    /// image in. The target is released on success and halted in
    /// reset on failure.
    pub fn load_binary(&mut self) -> Result<()> {
        self.hw.stop_clock();
        self.hold_reset();
        self.hw.disable_traps();

        let bootstrap = self.config.bootstrap();
        let cell = self.config.block_count_cell;
        {
            let mut bus = self.arbiter.acquire(&mut self.hw);
            bus.inject_image(0, &bootstrap);
            // Nonzero until the size is known, so the bootstrap never
            // jumps into whatever image is already in memory.
            bus.write_byte_at(cell, LOAD_PENDING);
        }

        self.release_reset();
        self.hw.start_clock();

        match self.load_image() {
            Ok(()) => {
                self.hw.enable_traps();
                self.arbiter.release(&mut self.hw);
                info!("image loaded, target running");
                Ok(())
            },
            Err(err) => {
                self.hw.stop_clock();
                self.hold_reset();
                self.arbiter.release(&mut self.hw);
                info!("load aborted: {}", err);
                Err(err)
            },
        }
    }

    /// Run the load protocol until it is `Done` or `Aborted`.
    fn load_image(&mut self) -> Result<()> {
        let mut state = LoadState::AwaitSize;
        let mut addr = self.config.image_base;

        loop {
            state = match state {
                LoadState::AwaitSize => match self.await_size() {
                    Ok(0) => LoadState::Done,
                    Ok(total) => LoadState::AwaitBlocks { remaining: total },
                    Err(err) => LoadState::Aborted(err),
                },
                LoadState::AwaitBlocks { remaining } => match self.await_block(addr, remaining) {
                    Ok(len) if len == remaining => LoadState::Done,
                    Ok(len) => {
                        addr = addr.wrapping_add(len);
                        LoadState::AwaitBlocks { remaining: remaining - len }
                    },
                    Err(err) => LoadState::Aborted(err),
                },
                LoadState::Done => return Ok(()),
                LoadState::Aborted(err) => return Err(err),
            };
        }
    }

    /// Receive the image size and publish the block count.
    fn await_size(&mut self) -> Result<u16> {
        self.link.arm_timeout(&mut self.hw, 2);
        let total = self.link.recv_u16(&mut self.hw);
        self.link.validate(&mut self.hw)?;
        let total = total.ok_or(LinkError::Timeout)?;

        if total as u32 > self.config.max_image_size() {
            return Err(self.link.report(&mut self.hw, LinkError::InvalidSize));
        }

        let blocks = ((total as usize + MAX_BLOCK - 1) / MAX_BLOCK) as u8;
        let cell = self.config.block_count_cell;
        self.arbiter.acquire(&mut self.hw).write_byte_at(cell, blocks);
        self.shared.set_blocks_remaining(blocks);
        self.link.send_ok(&mut self.hw);

        debug!("loading {} bytes in {} blocks", total, blocks);
        Ok(total)
    }

    /// Receive one block and write it at `addr`. Every block is full
    /// except the last, which must be exactly `remaining` long.
    fn await_block(&mut self, addr: u16, remaining: u16) -> Result<u16> {
        let len = self.link.receive_block(&mut self.hw, MAX_BLOCK, &mut self.block)?;
        let expected = (remaining as usize).min(MAX_BLOCK);
        if len != expected {
            debug!("block of {} bytes, expected {}", len, expected);
            return Err(self.link.report(&mut self.hw, LinkError::InvalidSize));
        }

        let left = self.shared.blocks_remaining().saturating_sub(1);
        let cell = self.config.block_count_cell;
        let mut bus = self.arbiter.acquire(&mut self.hw);
        bus.inject_image(addr, self.block.payload());
        bus.write_byte_at(cell, left);
        if len == remaining as usize {
            // The target must not start on the image until the
            // controller lets go of the bus after the load.
            bus.keep();
        } else {
            bus.release();
        }

        self.shared.set_blocks_remaining(left);
        self.link.send_ok(&mut self.hw);
        Ok(len as u16)
    }
}

#[cfg(test)]
#[path = "command_test.rs"]
mod test;
