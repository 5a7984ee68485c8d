//
// config.rs --- Controller configuration.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

/// Largest block payload.
pub const MAX_BLOCK: usize = 256;

/// Payload limit for `UploadToRam`, and the size of `DownloadFromRam`.
pub const RAM_WINDOW: usize = 16;

/// Board and protocol parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Controller clock in Hz.
    pub cpu_hz: u32,
    /// Serial line rate in bits per second.
    pub baud: u32,
    /// Prescaler feeding the timeout timer.
    pub prescaler: u32,
    /// Line bits per byte (start + 8 data + stop).
    pub bits_per_byte: u32,
    /// Slack factor allowed for a slow host.
    pub margin: u32,
    /// Bank selected at startup.
    pub initial_bank: u8,
    /// Where uploaded images are placed and where the bootstrap jumps.
    pub image_base: u16,
    /// Cell holding the number of blocks still to arrive.
    pub block_count_cell: u16,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            cpu_hz: 20_000_000,
            baud: 9600,
            prescaler: 1024,
            bits_per_byte: 10,
            margin: 5,
            initial_bank: 2,
            image_base: 0x0100,
            block_count_cell: 0x00ff,
        }
    }
}

impl Config {
    /// Timer ticks allowed per expected byte. Never less than one.
    pub fn cycles_per_byte(&self) -> u16 {
        let ticks = self.cpu_hz as u64 * self.bits_per_byte as u64 * self.margin as u64
            / self.baud as u64
            / self.prescaler as u64;
        ticks.max(1).min(u16::max_value() as u64) as u16
    }

    /// Largest byte count whose timeout fits the 16-bit timer.
    pub fn max_timed_bytes(&self) -> u16 {
        u16::max_value() / self.cycles_per_byte()
    }

    /// Largest image `LoadBinary` accepts.
    pub fn max_image_size(&self) -> u32 {
        0x10000 - self.image_base as u32
    }

    /// The program placed at address 0 before a load. It spins until
    /// the block-count cell reads zero, then jumps to the image:
    ///
    /// ```text
    /// loop: ld a, (cell)
    ///       or a
    ///       jr nz, loop
    ///       jp base
    /// ```
    pub fn bootstrap(&self) -> [u8; 9] {
        let cell = self.block_count_cell.to_le_bytes();
        let base = self.image_base.to_le_bytes();
        [
            0x3a, cell[0], cell[1],     // ld a, (cell)
            0xb7,                       // or a
            0x20, 0xfa,                 // jr nz, -6
            0xc3, base[0], base[1],     // jp base
        ]
    }
}
