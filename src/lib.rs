//
// lib.rs --- Bus controller core library.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Firmware core for a controller that shares an address/data bus
//! with an 8-bit target CPU, plus the host-side tools that talk to it.
//!
//! * `fw` --- the controller: serial link, block framing, bus
//!   arbitration, the I/O trap handler and the command loop.
//! * `hal` --- the hardware primitives the controller runs on.
//! * `sim` --- a simulated board for running the controller on a host.
//! * `image`, `host` --- loading program images and driving the
//!   controller from a host over a serial port.

pub mod hal;
pub mod mem;
pub mod fw;
pub mod sim;
pub mod image;
pub mod host;
pub mod error;
