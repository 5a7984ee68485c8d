//
// block_test.rs --- Block framing unit tests.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use proptest::prelude::*;

use super::*;
use crate::fw::config::{Config, RAM_WINDOW};
use crate::sim::SimBoard;

// Frame `payload` the way the host does.
fn frame(payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![(payload.len() - 1) as u8];
    bytes.extend_from_slice(payload);
    bytes.push(checksum(payload));
    bytes
}

// Fixture to feed `bytes` to a fresh link and receive one block.
fn receive(bytes: &[u8], max_len: usize) -> (Result<usize>, Block, SimBoard) {
    let mut link = SerialLink::new(&Config::default());
    let mut hw = SimBoard::new();
    let mut block = Block::new();
    hw.host_send(bytes);
    let res = link.receive_block(&mut hw, max_len, &mut block);
    (res, block, hw)
}

// Fixture to receive a block whose sender pauses for `stall` ticks
// halfway through the payload.
fn receive_stalled(bytes: &[u8], split: usize, stall: u64) -> (Result<usize>, Block, SimBoard) {
    let mut link = SerialLink::new(&Config::default());
    let mut hw = SimBoard::new();
    let mut block = Block::new();
    hw.host_send(&bytes[..split]);
    hw.host_stall(stall);
    hw.host_send(&bytes[split..]);
    let res = link.receive_block(&mut hw, MAX_BLOCK, &mut block);
    (res, block, hw)
}

#[test]
fn checksum_is_xor() {
    assert_eq!(checksum(&[]), 0);
    assert_eq!(checksum(&[0x0f, 0xf0]), 0xff);
    assert_eq!(checksum(&[0xaa, 0xaa]), 0);
    assert_eq!(checksum(&[0x01, 0x02, 0x04]), 0x07);
}

// Test that a length byte of 0xff means a full 256-byte block.
#[test]
fn full_block() {
    let payload: Vec<u8> = (0..=255).collect();
    let (res, block, mut hw) = receive(&frame(&payload), MAX_BLOCK);

    assert_eq!(res, Ok(256));
    assert_eq!(block.payload(), &payload[..]);
    assert!(hw.take_sent().is_empty());
}

// Test that an oversized length is refused before the payload is read.
#[test]
fn oversize_rejected_early() {
    let payload = [0x55; 17];
    let (res, block, mut hw) = receive(&frame(&payload), RAM_WINDOW);

    assert_eq!(res, Err(LinkError::InvalidSize));
    assert!(block.is_empty());
    assert_eq!(hw.take_sent(), vec![LinkError::InvalidSize.code()]);
    assert!(hw.input_pending());
}

// Test that the payload timeout covers the whole block, so a pause
// longer than one byte-time is fine as long as the block finishes
// within 17 byte-times of its length byte.
#[test]
fn stall_within_block_window() {
    let payload: Vec<u8> = (1..=16).collect();
    let (res, block, mut hw) = receive_stalled(&frame(&payload), 9, 1300);

    assert_eq!(res, Ok(16));
    assert_eq!(block.payload(), &payload[..]);
    assert!(hw.take_sent().is_empty());
    assert!(hw.now() < 20 + 17 * 101);
}

// Test that a pause running past the block window times out.
#[test]
fn stall_past_block_window() {
    let payload: Vec<u8> = (1..=16).collect();
    let (res, block, mut hw) = receive_stalled(&frame(&payload), 9, 1700);

    assert_eq!(res, Err(LinkError::Timeout));
    assert_eq!(block.payload(), &payload[..8]);
    assert_eq!(hw.take_sent(), vec![LinkError::Timeout.code()]);
    assert!(hw.input_pending());
}

// Test that a short payload times out.
#[test]
fn short_payload_times_out() {
    let (res, _, mut hw) = receive(&[3, 0xaa, 0xbb], MAX_BLOCK);
    assert_eq!(res, Err(LinkError::Timeout));
    assert_eq!(hw.take_sent(), vec![LinkError::Timeout.code()]);
}

// Test that a missing checksum byte times out.
#[test]
fn missing_checksum_times_out() {
    let (res, block, mut hw) = receive(&[1, 0xaa, 0xbb], MAX_BLOCK);
    assert_eq!(res, Err(LinkError::Timeout));
    assert_eq!(block.payload(), &[0xaa, 0xbb]);
    assert_eq!(hw.take_sent(), vec![1]);
}

// Test that nothing at all times out on the length byte.
#[test]
fn silence_times_out() {
    let (res, _, mut hw) = receive(&[], MAX_BLOCK);
    assert_eq!(res, Err(LinkError::Timeout));
    assert_eq!(hw.take_sent(), vec![1]);
}

// Test that the same bit flipped in two bytes slips through the XOR.
#[test]
fn double_flip_goes_unnoticed() {
    let mut bytes = frame(&[0x10, 0x20, 0x30]);
    bytes[1] ^= 0x04;
    bytes[3] ^= 0x04;

    let (res, block, _) = receive(&bytes, MAX_BLOCK);
    assert_eq!(res, Ok(3));
    assert_eq!(block.payload(), &[0x14, 0x20, 0x34]);
}

// Test the wire format of an outgoing block.
#[test]
fn send_block_format() {
    let mut link = SerialLink::new(&Config::default());
    let mut hw = SimBoard::new();
    link.send_block(&mut hw, &[0x01, 0x02, 0x03]);
    assert_eq!(hw.take_sent(), vec![0x02, 0x01, 0x02, 0x03, 0x00]);
}

proptest! {
    // Test that whatever `send_block` emits, `receive_block` accepts.
    #[test]
    fn sent_blocks_are_received(payload in prop::collection::vec(any::<u8>(), 1..=MAX_BLOCK)) {
        let mut link = SerialLink::new(&Config::default());
        let mut hw = SimBoard::new();
        link.send_block(&mut hw, &payload);
        let wire = hw.take_sent();

        let (res, block, mut hw) = receive(&wire, MAX_BLOCK);
        prop_assert_eq!(res, Ok(payload.len()));
        prop_assert_eq!(block.payload(), &payload[..]);
        prop_assert!(hw.take_sent().is_empty());
    }

    // Test that any single flipped payload bit is caught.
    #[test]
    fn single_flip_is_caught(
        payload in prop::collection::vec(any::<u8>(), 1..=64),
        index in any::<prop::sample::Index>(),
        bit in 0..8u8,
    ) {
        let mut bytes = frame(&payload);
        let i = 1 + index.index(payload.len());
        bytes[i] ^= 1 << bit;

        let (res, _, mut hw) = receive(&bytes, MAX_BLOCK);
        prop_assert_eq!(res, Err(LinkError::ChecksumFailed));
        prop_assert_eq!(hw.take_sent(), vec![LinkError::ChecksumFailed.code()]);
    }
}
