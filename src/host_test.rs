//
// host_test.rs --- Host client tests.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use std::collections::VecDeque;
use std::io::{self, Cursor};

use super::*;
use crate::fw::Controller;
use crate::sim::SimBoard;

// A port that plays back canned replies and records requests.
struct Script {
    replies: Cursor<Vec<u8>>,
    sent: Vec<u8>,
}

impl Script {
    fn new(replies: &[u8]) -> Script {
        Script { replies: Cursor::new(replies.to_vec()), sent: Vec::new() }
    }
}

impl Read for Script {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.replies.read(buf)
    }
}

impl Write for Script {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// A port wired to a controller on a simulated board. The controller
// runs whenever the client waits for a reply.
struct Loopback {
    ctl: Controller<SimBoard>,
    replies: VecDeque<u8>,
}

impl Loopback {
    fn new() -> Loopback {
        Loopback {
            ctl: Controller::new(SimBoard::new(), Config::default()),
            replies: VecDeque::new(),
        }
    }
}

impl Read for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.replies.is_empty() && self.ctl.board().input_pending() {
            self.ctl.step();
            self.replies.extend(self.ctl.board_mut().take_sent());
        }
        let mut n = 0;
        while n < buf.len() {
            match self.replies.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                },
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for Loopback {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ctl.board_mut().host_send(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Test the bytes of a two-block load.
#[test]
fn load_request() {
    let image: Vec<u8> = (0..300).map(|i| i as u8).collect();
    let mut client = Client::new(Script::new(&[0, 0, 0]));
    client.load(&image).unwrap();

    let sent = client.into_inner().sent;
    assert_eq!(&sent[..3], &[CMD_LOAD_BINARY, 0x01, 0x2c]);
    assert_eq!(sent[3], 0xff);
    assert_eq!(&sent[4..260], &image[..256]);
    assert_eq!(sent[260], checksum(&image[..256]));
    assert_eq!(sent[261], 43);
    assert_eq!(sent.len(), 3 + 258 + 46);
}

// Test that the client stops at the first error status.
#[test]
fn load_stops_on_error() {
    let image = vec![0x11; 300];
    let mut client = Client::new(Script::new(&[0, 3]));
    match client.load(&image) {
        Err(Error::Device(LinkError::ChecksumFailed)) => {},
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(client.into_inner().sent.len(), 3 + 258);
}

#[test]
fn load_too_large() {
    let mut client = Client::new(Script::new(&[]));
    match client.load(&vec![0; 0xff01]) {
        Err(Error::ImageTooLarge(0xff01)) => {},
        other => panic!("unexpected {:?}", other),
    }
    assert!(client.into_inner().sent.is_empty());
}

#[test]
fn garbage_status() {
    let mut client = Client::new(Script::new(&[0x42]));
    match client.upload(&[1]) {
        Err(Error::UnexpectedReply(0x42)) => {},
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn upload_length_checked() {
    let mut client = Client::new(Script::new(&[]));
    assert!(client.upload(&[]).is_err());
    assert!(client.upload(&[0; 17]).is_err());
    assert!(client.into_inner().sent.is_empty());
}

// Test that a corrupted download is refused.
#[test]
fn download_checksum() {
    let mut reply = vec![15];
    reply.extend_from_slice(&[1; 16]);
    reply.push(1);
    let mut client = Client::new(Script::new(&reply));
    match client.download() {
        Err(Error::Checksum) => {},
        other => panic!("unexpected {:?}", other),
    }
}

// Test that a connection that closes early is an IO error.
#[test]
fn short_reply() {
    let mut client = Client::new(Script::new(&[]));
    match client.echo(5) {
        Err(Error::IO(_)) => {},
        other => panic!("unexpected {:?}", other),
    }
}

/////////////////////////////////////////////////////////////////////
// Against a simulated controller

#[test]
fn echo_loopback() {
    let mut client = Client::new(Loopback::new());
    for &b in [0x00, 0x5a, 0xff].iter() {
        assert_eq!(client.echo(b).unwrap(), b);
    }
}

#[test]
fn upload_download_loopback() {
    let mut client = Client::new(Loopback::new());
    let data: Vec<u8> = (0..16).map(|i| 0xf0 ^ i).collect();
    client.upload(&data).unwrap();
    assert_eq!(&client.download().unwrap()[..], &data[..]);

    let port = client.into_inner();
    assert_eq!(port.ctl.board().ram().peek(2, 0x0000), 0xf0);
}

#[test]
fn empty_load_loopback() {
    let mut client = Client::new(Loopback::new());
    client.load(&[]).unwrap();

    let port = client.into_inner();
    assert!(!port.ctl.board().in_reset());
    assert!(port.ctl.board().clock_running());
}
