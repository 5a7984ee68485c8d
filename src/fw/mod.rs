//
// mod.rs --- Bus controller firmware.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

pub mod error;
pub mod config;
pub mod shared;
pub mod link;
pub mod block;
pub mod bus;
pub mod trap;
pub mod preempt;
pub mod command;

pub use self::error::{LinkError, Result};
pub use self::config::Config;
pub use self::block::{checksum, Block};
pub use self::bus::{Bus, BusArbiter, Owner};
pub use self::command::{Command, Controller};
pub use self::link::SerialLink;
pub use self::shared::SharedState;
