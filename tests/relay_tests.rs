mod common;

use common::{element, Call, Script, ScriptedLibrary, TestSink, FAILED};
use rsdtcpip::buffer::Buffer;
use rsdtcpip::caps::Caps;
use rsdtcpip::error::Error;
use rsdtcpip::library::SessionHandle;
use rsdtcpip::pad::{Filter, FlowError};
use rsdtcpip::state::State;

fn storage() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[test]
fn decrypted_buffer_is_forwarded_once_and_freed_once() {
    let dir = storage();
    let library = ScriptedLibrary::with_script(Script {
        decrypt: Ok(Some(900)),
        ..Script::default()
    });
    let mut element = element(&library, dir.path());
    element.set_state(State::Playing).expect("play");

    element
        .push_buffer(Buffer::from_vec(vec![0x5Au8; 1024]))
        .expect("flow ok");

    let sink = element.downstream().expect("linked");
    assert_eq!(sink.buffers.len(), 1);
    assert_eq!(sink.buffers[0].len(), 900);
    assert_eq!(
        library.count(|c| *c == Call::AllocDecrypt(SessionHandle(42), 1024)),
        1
    );
    // Still owned by the downstream buffer.
    assert_eq!(library.count(|c| matches!(c, Call::Free(_))), 0);

    element.downstream_mut().expect("linked").buffers.clear();
    assert_eq!(library.count(|c| *c == Call::Free(900)), 1);
    assert_eq!(library.count(|c| matches!(c, Call::Free(_))), 1);

    let stats = element.stats();
    assert_eq!(stats.buffers, 1);
    assert_eq!(stats.encrypted_bytes, 1024);
    assert_eq!(stats.cleartext_bytes, 900);
}

#[test]
fn decrypt_failure_forwards_nothing() {
    let dir = storage();
    let library = ScriptedLibrary::with_script(Script {
        decrypt: Err(FAILED),
        ..Script::default()
    });
    let mut element = element(&library, dir.path());
    element.set_state(State::Playing).expect("play");

    let result = element.push_buffer(Buffer::from_vec(vec![0u8; 188]));
    assert_eq!(result, Err(FlowError::Error));
    assert!(element.downstream().expect("linked").buffers.is_empty());
    assert_eq!(library.count(|c| matches!(c, Call::Free(_))), 0);
    assert_eq!(element.stats().decrypt_failures, 1);
}

#[test]
fn no_decrypt_without_an_open_session() {
    let dir = storage();
    let library = ScriptedLibrary::with_script(Script {
        open: Err(FAILED),
        ..Script::default()
    });
    let mut element = element(&library, dir.path());

    assert_eq!(
        element.push_buffer(Buffer::from_vec(vec![1u8; 16])),
        Err(FlowError::Flushing)
    );

    assert!(element.set_state(State::Paused).is_err());
    assert_eq!(element.session_handle(), SessionHandle::INVALID);
    assert_eq!(
        element.push_buffer(Buffer::from_vec(vec![1u8; 16])),
        Err(FlowError::Flushing)
    );

    assert_eq!(library.count(|c| matches!(c, Call::AllocDecrypt(..))), 0);
}

#[test]
fn no_decrypt_after_teardown() {
    let dir = storage();
    let library = ScriptedLibrary::new();
    let mut element = element(&library, dir.path());

    element.set_state(State::Playing).expect("play");
    element
        .push_buffer(Buffer::from_vec(vec![1u8; 16]))
        .expect("while playing");
    element.set_state(State::Ready).expect("ready");

    assert_eq!(
        element.push_buffer(Buffer::from_vec(vec![1u8; 16])),
        Err(FlowError::Flushing)
    );
    assert_eq!(library.count(|c| matches!(c, Call::AllocDecrypt(..))), 1);
}

#[test]
fn downstream_flow_error_is_returned_and_region_freed() {
    let dir = storage();
    let library = ScriptedLibrary::new();
    let mut element = element(&library, dir.path());
    element.set_state(State::Playing).expect("play");
    element.downstream_mut().expect("linked").flow = Some(FlowError::Eos);

    let result = element.push_buffer(Buffer::from_vec(vec![2u8; 64]));
    assert_eq!(result, Err(FlowError::Eos));
    assert_eq!(library.count(|c| *c == Call::Free(64)), 1);
    assert_eq!(element.stats().buffers, 0);
}

#[test]
fn failed_free_is_not_retried() {
    let dir = storage();
    let library = ScriptedLibrary::with_script(Script {
        free: Err(FAILED),
        ..Script::default()
    });
    let mut element = element(&library, dir.path());
    element.set_state(State::Playing).expect("play");

    element
        .push_buffer(Buffer::from_vec(vec![3u8; 32]))
        .expect("flow ok");
    element.downstream_mut().expect("linked").buffers.clear();
    assert_eq!(library.count(|c| *c == Call::Free(32)), 1);

    element.set_state(State::Null).expect("stop");
    drop(element);
    assert_eq!(library.count(|c| matches!(c, Call::Free(_))), 1);
}

#[test]
fn caps_are_propagated_unchanged() {
    let dir = storage();
    let library = ScriptedLibrary::new();
    let mut element = element(&library, dir.path());

    let caps = Caps::new("video/mpegts, systemstream=(boolean)true");
    element.accept_upstream_caps(caps.clone()).expect("caps");

    assert_eq!(element.downstream_caps(), Some(&caps));
    assert_eq!(
        element.downstream().expect("linked").caps.as_ref(),
        Some(&caps)
    );
}

#[test]
fn refused_caps_are_not_negotiated() {
    let dir = storage();
    let library = ScriptedLibrary::new();
    let mut element = element(&library, dir.path());
    element.downstream_mut().expect("linked").refuse_caps = true;

    let err = element
        .accept_upstream_caps(Caps::new("video/x-raw"))
        .expect_err("refused");
    assert!(matches!(err, Error::NotNegotiated(_)));
    assert_eq!(element.downstream_caps(), None);
}

#[test]
fn caps_set_before_linking_reach_the_new_peer() {
    let dir = storage();
    let library = ScriptedLibrary::new();
    let mut element = element(&library, dir.path());
    element.unlink();

    let caps = Caps::new("video/mpegts");
    element.accept_upstream_caps(caps.clone()).expect("caps");
    element.link(TestSink::default());

    assert_eq!(element.downstream_caps(), Some(&caps));
    assert_eq!(
        element.downstream().expect("linked").caps.as_ref(),
        Some(&caps)
    );
}

#[test]
fn peer_refusing_earlier_caps_leaves_output_without_caps() {
    let dir = storage();
    let library = ScriptedLibrary::new();
    let mut element = element(&library, dir.path());
    element.unlink();

    let caps = Caps::new("video/mpegts");
    element.accept_upstream_caps(caps.clone()).expect("caps");
    element.link(TestSink {
        refuse_caps: true,
        ..TestSink::default()
    });

    assert_eq!(element.downstream_caps(), None);
    assert_eq!(element.sink_caps(), Some(&caps));
    assert_eq!(element.downstream().expect("linked").caps, None);

    // A later peer that accepts them gets them.
    element.link(TestSink::default());
    assert_eq!(element.downstream_caps(), Some(&caps));
}
