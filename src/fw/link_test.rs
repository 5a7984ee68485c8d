//
// link_test.rs --- Serial link unit tests.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use super::*;
use crate::fw::config::Config;
use crate::hal::{Countdown, RxStatus};
use crate::sim::SimBoard;

// Fixture to create a link and an idle board.
fn test_link() -> (SerialLink, SimBoard) {
    (SerialLink::new(&Config::default()), SimBoard::new())
}

// Test that timeouts scale with the byte count and clamp at 16 bits.
#[test]
fn timeout_ticks() {
    let (link, _) = test_link();
    assert_eq!(link.timeout_ticks(1), 101);
    assert_eq!(link.timeout_ticks(648), 648 * 101);
    assert_eq!(link.timeout_ticks(649), 0xffff);
    assert_eq!(link.timeout_ticks(0xffff), 0xffff);
}

// Test that a byte arriving in time passes the checkpoint.
#[test]
fn byte_in_time() {
    let (mut link, mut hw) = test_link();
    hw.host_send(&[0x42]);

    link.arm_timeout(&mut hw, 1);
    assert_eq!(link.recv_byte(&mut hw), Some(0x42));
    assert_eq!(link.validate(&mut hw), Ok(()));
    assert!(hw.take_sent().is_empty());
}

// Test that the timeout fires after exactly the allotted ticks.
#[test]
fn timeout_fires_on_time() {
    let (mut link, mut hw) = test_link();

    link.arm_timeout(&mut hw, 1);
    let start = hw.now();
    assert_eq!(link.recv_byte(&mut hw), None);
    assert_eq!(hw.now() - start, 101);

    assert_eq!(link.validate(&mut hw), Err(LinkError::Timeout));
    assert_eq!(hw.take_sent(), vec![LinkError::Timeout.code()]);
    assert!(!hw.expired());
}

// Test that a byte arriving after the timeout is left for the next
// command rather than flushed.
#[test]
fn late_byte_survives_timeout() {
    let (mut link, mut hw) = test_link();
    hw.host_stall(200);
    hw.host_send(&[0x01]);

    link.arm_timeout(&mut hw, 1);
    assert_eq!(link.recv_byte(&mut hw), None);
    assert_eq!(link.validate(&mut hw), Err(LinkError::Timeout));
    assert!(hw.input_pending());

    link.arm_timeout(&mut hw, 2);
    assert_eq!(link.recv_byte(&mut hw), Some(0x01));
    assert_eq!(link.validate(&mut hw), Ok(()));
}

// Test that two-byte values are big-endian.
#[test]
fn recv_u16_big_endian() {
    let (mut link, mut hw) = test_link();
    hw.host_send(&[0x01, 0x64]);

    link.arm_timeout(&mut hw, 2);
    assert_eq!(link.recv_u16(&mut hw), Some(356));
    assert_eq!(link.validate(&mut hw), Ok(()));
}

// Test that receive errors stay latched until the checkpoint.
#[test]
fn errors_are_sticky() {
    let (mut link, mut hw) = test_link();
    hw.host_send_with(0x11, RxStatus::FRAME_ERROR);
    hw.host_send(&[0x22]);

    link.arm_timeout(&mut hw, 2);
    assert_eq!(link.recv_byte(&mut hw), Some(0x11));
    assert_eq!(link.recv_byte(&mut hw), Some(0x22));
    assert!(link.flags().contains(LinkFlags::FRAME_ERROR));

    assert_eq!(link.validate(&mut hw), Err(LinkError::FrameError));
    assert_eq!(link.flags(), LinkFlags::empty());
}

// Test that a frame error wins over an overflow and a timeout, and
// that only one status goes out per checkpoint.
#[test]
fn frame_error_has_priority() {
    let (mut link, mut hw) = test_link();
    hw.host_send_with(0x11, RxStatus::DATA_OVERRUN);
    hw.host_send_with(0x22, RxStatus::FRAME_ERROR);

    link.arm_timeout(&mut hw, 2);
    link.recv_byte(&mut hw);
    link.recv_byte(&mut hw);
    assert_eq!(link.recv_byte(&mut hw), None);

    assert_eq!(link.validate(&mut hw), Err(LinkError::FrameError));
    assert_eq!(hw.take_sent(), vec![LinkError::FrameError.code()]);

    // Everything was cleared by the report.
    assert_eq!(link.validate(&mut hw), Ok(()));
    assert!(hw.take_sent().is_empty());
}

// Test that an overflow wins over a timeout.
#[test]
fn overflow_beats_timeout() {
    let (mut link, mut hw) = test_link();
    hw.host_send_with(0x11, RxStatus::DATA_OVERRUN);

    link.arm_timeout(&mut hw, 1);
    assert_eq!(link.recv_byte(&mut hw), Some(0x11));
    assert_eq!(link.recv_byte(&mut hw), None);
    assert_eq!(link.validate(&mut hw), Err(LinkError::BufferOverflow));
    assert_eq!(hw.take_sent(), vec![6]);
}

// Test that reporting discards input that has already arrived.
#[test]
fn report_flushes_input() {
    let (mut link, mut hw) = test_link();
    hw.host_send(&[1, 2, 3]);
    hw.advance(100);

    assert_eq!(link.report(&mut hw, LinkError::UnknownCommand), LinkError::UnknownCommand);
    assert!(!hw.input_pending());
    assert_eq!(hw.take_sent(), vec![4]);
}

// Test the OK status byte.
#[test]
fn send_ok() {
    let (mut link, mut hw) = test_link();
    link.send_ok(&mut hw);
    assert_eq!(hw.take_sent(), vec![STATUS_OK]);
}
