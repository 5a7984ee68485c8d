//
// error.rs --- Host tool error type.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use std::io;
use std::num;
use std::result;

use thiserror::Error;

use crate::fw::LinkError;

/// Errors seen by the host side.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("invalid hex file: {0}")]
    Hex(#[from] ihex::ReaderError),
    #[error("invalid number: {0}")]
    Parse(#[from] num::ParseIntError),
    #[error("controller reported: {0}")]
    Device(#[from] LinkError),
    #[error("unexpected reply {0:02X}")]
    UnexpectedReply(u8),
    #[error("image of {0} bytes does not fit below the top of memory")]
    ImageTooLarge(usize),
    #[error("block of {0} bytes, must be 1 to {1}")]
    BadLength(usize, usize),
    #[error("downloaded block failed its checksum")]
    Checksum,
    #[error("no bus controller found")]
    NotFound,
}

pub type Result<T> = result::Result<T, Error>;
