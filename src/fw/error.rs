//
// error.rs --- Protocol status codes.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use std::result;

use thiserror::Error;

/// Status byte sent to the host after each fallible phase.
pub const STATUS_OK: u8 = 0;

/// Errors detected by the serial link and block layer. Each one is
/// reported to the host as a single status byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("timed out waiting for data")]
    Timeout,
    #[error("invalid block size")]
    InvalidSize,
    #[error("checksum mismatch")]
    ChecksumFailed,
    #[error("unknown command")]
    UnknownCommand,
    #[error("serial frame error")]
    FrameError,
    #[error("serial receive buffer overflow")]
    BufferOverflow,
}

pub type Result<T> = result::Result<T, LinkError>;

impl LinkError {
    /// Return the status byte for this error.
    pub fn code(self) -> u8 {
        match self {
            LinkError::Timeout        => 1,
            LinkError::InvalidSize    => 2,
            LinkError::ChecksumFailed => 3,
            LinkError::UnknownCommand => 4,
            LinkError::FrameError     => 5,
            LinkError::BufferOverflow => 6,
        }
    }

    /// Decode a status byte. `Ok(None)` is the OK status and `Err`
    /// carries a byte that is not a status code at all.
    pub fn from_code(code: u8) -> result::Result<Option<LinkError>, u8> {
        match code {
            STATUS_OK => Ok(None),
            1 => Ok(Some(LinkError::Timeout)),
            2 => Ok(Some(LinkError::InvalidSize)),
            3 => Ok(Some(LinkError::ChecksumFailed)),
            4 => Ok(Some(LinkError::UnknownCommand)),
            5 => Ok(Some(LinkError::FrameError)),
            6 => Ok(Some(LinkError::BufferOverflow)),
            x => Err(x),
        }
    }
}
