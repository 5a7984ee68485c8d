//
// host.rs --- Host side of the serial protocol.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Drive a bus controller from a host.
//!
//! The client waits for the status byte after every phase before it
//! sends the next one.  It never retries: the controller discards
//! whatever it has buffered when it reports an error, so the client
//! gives up on the first failure.

use std::io::{Read, Write};
use std::time::Duration;

use log::{debug, info};
use serialport::{DataBits, Parity, SerialPort, SerialPortType, StopBits};

use crate::error::{Error, Result};
use crate::fw::block::checksum;
use crate::fw::command::{CMD_DOWNLOAD_FROM_RAM, CMD_ECHO, CMD_LOAD_BINARY, CMD_UPLOAD_TO_RAM};
use crate::fw::config::{Config, MAX_BLOCK, RAM_WINDOW};
use crate::fw::LinkError;

/// USB vendor ID of the controller board.
pub const USB_VID: u16 = 0x1209;
/// USB product ID of the controller board.
pub const USB_PID: u16 = 0x80A0;

/// A connection to a bus controller over any byte stream.
pub struct Client<P> {
    port: P,
    max_image: usize,
}

impl<P: Read + Write> Client<P> {
    pub fn new(port: P) -> Client<P> {
        Client::with_config(port, &Config::default())
    }

    /// A client for a controller built with `config`.
    pub fn with_config(port: P, config: &Config) -> Client<P> {
        Client {
            port,
            max_image: config.max_image_size() as usize,
        }
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn recv_byte(&mut self) -> Result<u8> {
        let mut buf = [0];
        self.port.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a status byte and turn it into a result.
    fn expect_ok(&mut self) -> Result<()> {
        let status = self.recv_byte()?;
        match LinkError::from_code(status) {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(Error::Device(err)),
            Err(byte) => Err(Error::UnexpectedReply(byte)),
        }
    }

    fn send_block(&mut self, payload: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(payload.len() + 2);
        frame.push((payload.len() - 1) as u8);
        frame.extend_from_slice(payload);
        frame.push(checksum(payload));
        self.send(&frame)
    }

    /// Send `byte` and return what comes back. A controller that
    /// timed out answers with the timeout status instead.
    pub fn echo(&mut self, byte: u8) -> Result<u8> {
        self.send(&[CMD_ECHO, byte])?;
        self.recv_byte()
    }

    /// Load `image` and start the target on it.
    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        if image.len() > self.max_image {
            return Err(Error::ImageTooLarge(image.len()));
        }

        let size = (image.len() as u16).to_be_bytes();
        self.send(&[CMD_LOAD_BINARY, size[0], size[1]])?;
        self.expect_ok()?;

        for (i, block) in image.chunks(MAX_BLOCK).enumerate() {
            self.send_block(block)?;
            self.expect_ok()?;
            debug!("block {} accepted", i);
        }

        info!("loaded {} bytes", image.len());
        Ok(())
    }

    /// Store up to 16 bytes at the bottom of the target's memory.
    pub fn upload(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() || data.len() > RAM_WINDOW {
            return Err(Error::BadLength(data.len(), RAM_WINDOW));
        }
        self.send(&[CMD_UPLOAD_TO_RAM])?;
        self.send_block(data)?;
        self.expect_ok()
    }

    /// Fetch the bottom 16 bytes of the target's memory.
    pub fn download(&mut self) -> Result<[u8; RAM_WINDOW]> {
        self.send(&[CMD_DOWNLOAD_FROM_RAM])?;

        let size = self.recv_byte()?;
        if size as usize != RAM_WINDOW - 1 {
            return Err(Error::UnexpectedReply(size));
        }

        let mut data = [0; RAM_WINDOW];
        self.port.read_exact(&mut data)?;
        if self.recv_byte()? != checksum(&data) {
            return Err(Error::Checksum);
        }
        Ok(data)
    }
}

/// Find the serial port of the first attached controller board.
pub fn find_port() -> Result<String> {
    for port in serialport::available_ports()? {
        if let SerialPortType::UsbPort(ref usb) = port.port_type {
            if usb.vid == USB_VID && usb.pid == USB_PID {
                debug!("found controller at {}", port.port_name);
                return Ok(port.port_name);
            }
        }
    }
    Err(Error::NotFound)
}

/// Open `path` with the controller's line settings.
pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path, baud)
        .timeout(timeout)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .open()?;
    Ok(port)
}

#[cfg(test)]
#[path = "host_test.rs"]
mod test;
