#![cfg(unix)]

mod support;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use subghz_frame::{format_frame_line, Im920Frame, Im920Meta, Packet, SubGhzFrame};
use subghz_link::{CycleState, LinkError};
use support::{start, start_ok, Reply, TEST_IDLE};

#[test]
fn commands_run_in_submission_order() {
    let hold = Duration::from_millis(150);
    let (interface, module) = start(move |command| match command {
        "RWTM" => Reply::After(hold, b"00A0\r\n".to_vec()),
        "RSTM" => Reply::lines(&["0100"]),
        _ => Reply::lines(&["NG"]),
    });
    let interface = Arc::new(interface);

    let first = {
        let interface = Arc::clone(&interface);
        thread::spawn(move || interface.active_duration())
    };
    thread::sleep(Duration::from_millis(30));
    let second = {
        let interface = Arc::clone(&interface);
        thread::spawn(move || interface.sleep_duration())
    };

    assert_eq!(first.join().unwrap().unwrap(), 0x00A0);
    assert_eq!(second.join().unwrap().unwrap(), 0x0100);

    interface.close();
    let timeline = module.timeline();
    let commands: Vec<&str> = timeline.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(commands, vec!["RWTM", "RSTM"]);

    // The second command is not written until the first one is answered.
    let gap = timeline[1].1.duration_since(timeline[0].1);
    assert!(gap >= hold, "second command arrived after {gap:?}");
}

#[test]
fn multi_line_reply_is_one_response() {
    let (interface, module) = start(|command| match command {
        "RPRM" => Reply::lines(&["ID:0001", "STNN:01", "STCH:02"]),
        _ => Reply::lines(&["OK"]),
    });

    let lines = interface.exec("RPRM").unwrap();
    assert_eq!(lines, vec!["ID:0001", "STNN:01", "STCH:02"]);

    interface.close();
    assert_eq!(module.commands(), vec!["RPRM"]);
}

#[test]
fn lines_within_idle_window_accumulate() {
    let gap = TEST_IDLE / 4;
    let (interface, _module) = start(move |_| {
        Reply::Chunks(vec![
            (Duration::ZERO, b"LINE-ONE\r\n".to_vec()),
            (gap, b"LINE-TWO\r\n".to_vec()),
        ])
    });

    let lines = interface.exec("RPRM").unwrap();
    assert_eq!(lines, vec!["LINE-ONE", "LINE-TWO"]);
}

#[test]
fn line_after_idle_window_starts_new_batch() {
    let late = TEST_IDLE * 5;
    let (interface, _module) = start(move |command| match command {
        "RPRM" => Reply::Chunks(vec![
            (Duration::ZERO, b"EARLY\r\n".to_vec()),
            (late, b"LATE-LINE\r\n".to_vec()),
        ]),
        _ => Reply::lines(&["OK"]),
    });

    assert_eq!(interface.exec("RPRM").unwrap(), vec!["EARLY"]);

    // Let the late line land; it must not answer the next command.
    thread::sleep(late * 2);
    assert_eq!(interface.exec("DSRX").unwrap(), vec!["OK"]);
}

#[test]
fn frames_and_responses_are_separated() {
    let frame_bytes = Im920Frame::outbound(Packet::notice("ping").with_sequence(9))
        .unwrap()
        .frame_bytes()
        .clone();
    let frame_line = format_frame_line(
        &Im920Meta {
            node_id: 2,
            module_id: 0x00BE,
            rssi: 0x9C,
        },
        &frame_bytes,
    );

    let reply_line = frame_line.clone();
    let (interface, _module) = start(move |_| {
        Reply::Now(format!("{reply_line}\r\nOK\r\n").into_bytes())
    });

    interface.enable_sleep().unwrap();

    let frame = interface
        .try_take_received_frame(Duration::from_secs(2))
        .unwrap()
        .expect("frame should be queued");
    assert_eq!(frame.sender(), "be");
    assert_eq!(frame.node_id(), Some(2));
    assert_eq!(frame.rssi(), Some(-100));
    assert_eq!(frame.packet().sequence, Some(9));
    assert_eq!(frame.payload(), &frame_bytes);
}

#[test]
fn unsolicited_frames_keep_arrival_order() {
    let (interface, module) = start_ok();
    for seq in 0..5u8 {
        let bytes = Im920Frame::outbound(Packet::data(vec![seq], false).with_sequence(seq))
            .unwrap()
            .frame_bytes()
            .clone();
        module.print(&format_frame_line(&Im920Meta::default(), &bytes));
    }

    for seq in 0..5u8 {
        let frame = interface.take_received_frame().unwrap();
        assert_eq!(frame.packet().sequence, Some(seq));
    }
    assert!(interface
        .try_take_received_frame(Duration::from_millis(50))
        .unwrap()
        .is_none());
}

#[test]
fn undecodable_frame_and_stray_line() {
    let (interface, module) = start_ok();
    // Frame-shaped but the packet type is unknown: surfaced to the reader.
    module.print("01,0002,1A:03,06,00");
    // Not a frame and no command in flight: dropped before the next command.
    module.print("01,0002,1A");

    let err = interface.take_received_frame().unwrap_err();
    assert!(matches!(err, LinkError::Frame(_)));

    thread::sleep(TEST_IDLE * 4);
    assert_eq!(interface.exec("DSRX").unwrap(), vec!["OK"]);
}

#[test]
fn ng_reply_fails_command() {
    let (interface, _module) = start(|command| {
        if command.starts_with("SSTM") {
            Reply::lines(&["NG"])
        } else {
            Reply::lines(&["OK"])
        }
    });

    let err = interface.set_sleep_duration(0x0200).unwrap_err();
    assert!(matches!(
        err,
        LinkError::CommandFailed { ref command, ref response } if command == "SSTM0200" && response == "NG"
    ));
    interface.set_active_duration(0x0010).unwrap();
}

#[test]
fn reset_waits_for_version_banner() {
    let (interface, module) = start(|command| match command {
        "SRST" => Reply::After(Duration::from_millis(20), b"IM920 Ver.02.30\r\n".to_vec()),
        _ => Reply::lines(&["OK"]),
    });

    interface.reset_interface().unwrap();
    interface.close();
    assert_eq!(module.commands(), vec!["SRST"]);
}

#[test]
fn wake_command_reaches_module_whole() {
    let (interface, module) = start_ok();
    interface.disable_sleep().unwrap();
    interface.close();
    assert_eq!(module.commands(), vec!["?ENRX"]);
}

#[test]
fn send_data_uses_txda() {
    let (interface, module) = start_ok();
    interface.send_data(b"\x01\xAB").unwrap();
    interface.send_data_async(b"hi").unwrap();
    assert_eq!(interface.exec("RPRM").unwrap(), vec!["OK"]);

    interface.close();
    assert_eq!(module.commands(), vec!["TXDA01AB", "TXDA6869", "RPRM"]);
}

#[test]
fn fire_and_forget_tickets_return_to_pool() {
    let (interface, _module) = start_ok();
    for _ in 0..20 {
        interface.send_data_async(b"x").unwrap();
    }
    // A sync command queued last completes after all of them.
    interface.enable_sleep().unwrap();

    let pool = interface.ticket_pool();
    assert_eq!(pool.available(), pool.capacity());
}

#[test]
fn close_stops_both_cycles() {
    let (interface, module) = start_ok();
    assert_eq!(interface.exec("DSRX").unwrap(), vec!["OK"]);

    interface.close();
    assert_eq!(interface.reader_state(), CycleState::Stopped);
    assert_eq!(interface.writer_state(), CycleState::Stopped);
    assert!(matches!(interface.enable_sleep(), Err(LinkError::Closed)));

    // The module side sees the line go away.
    assert_eq!(module.commands(), vec!["DSRX"]);
}

#[test]
fn close_interrupts_issuer_waiting_for_silent_module() {
    let (interface, _module) = start(|_| Reply::Nothing);
    let interface = Arc::new(interface);

    let issuer = {
        let interface = Arc::clone(&interface);
        thread::spawn(move || interface.exec("RWTM"))
    };
    let queued = {
        let interface = Arc::clone(&interface);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            interface.exec("RSTM")
        })
    };

    thread::sleep(Duration::from_millis(100));
    interface.close();

    assert!(matches!(issuer.join().unwrap(), Err(LinkError::Interrupted)));
    assert!(matches!(queued.join().unwrap(), Err(LinkError::Interrupted)));
}
