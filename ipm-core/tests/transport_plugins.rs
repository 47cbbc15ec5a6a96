//! Contracts exercised through the public API only: in-process contexts and
//! a hand-written transport plugged in through the registry.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use ipm_core::error::Result;
use ipm_core::inproc::{self, InprocContext};
use ipm_core::prelude::*;
use parking_lot::Mutex;

#[test]
fn test_contexts_are_isolated() {
    let a = InprocContext::new();
    let b = InprocContext::new();

    let mut sender = inproc::sender(&a);
    sender
        .connect_for_sends(ConnectionInfo::new("inproc://shared-name"))
        .unwrap();

    // Same name, other namespace: no peer, and binding is allowed
    let mut other = inproc::sender(&b);
    other
        .connect_for_sends(ConnectionInfo::new("inproc://shared-name"))
        .unwrap();
    let err = other
        .send(Fragment::from("x"), Timeout::NO_BLOCK, "")
        .unwrap_err();
    assert!(matches!(err, IpmError::SendTimeoutExpired(_)));

    assert_eq!(a.bound_endpoints(), vec!["shared-name"]);
    assert_eq!(b.bound_endpoints(), vec!["shared-name"]);
}

#[test]
fn test_connect_before_bind() {
    let ctx = InprocContext::new();
    let mut receiver = inproc::receiver(&ctx);
    receiver
        .connect_for_receives(ConnectionInfo::new("inproc://early"))
        .unwrap();
    assert!(receiver.can_receive());
    assert!(ctx.bound_endpoints().is_empty());

    let mut sender = inproc::sender(&ctx);
    sender
        .connect_for_sends(ConnectionInfo::new("inproc://early"))
        .unwrap();
    sender
        .send(Fragment::from("hi"), Timeout::NO_BLOCK, "m")
        .unwrap();
    assert_eq!(
        receiver.receive(Timeout::NO_BLOCK, Some(2)).unwrap(),
        Response::new("hi", "m")
    );
}

#[test]
fn test_default_connection_string() {
    let ctx = InprocContext::new();
    let mut receiver = inproc::receiver(&ctx);
    receiver.connect_for_receives(ConnectionInfo::default()).unwrap();
    let mut sender = inproc::sender(&ctx);
    sender.connect_for_sends(ConnectionInfo::default()).unwrap();

    assert_eq!(ctx.bound_endpoints(), vec!["default"]);
}

#[test]
fn test_options_come_from_connection_info() {
    let ctx = InprocContext::new();
    let mut receiver = inproc::receiver(&ctx);
    receiver
        .connect_for_receives(ConnectionInfo::new("inproc://opts").with_field("recv_hwm", 3))
        .unwrap();
    assert_eq!(receiver.options().recv_hwm, 3);

    let mut sender = inproc::sender(&ctx);
    let err = sender
        .connect_for_sends(ConnectionInfo::new("inproc://opts").with_field("send_hwm", "many"))
        .unwrap_err();
    assert!(matches!(err, IpmError::Config(_)));
    assert!(!sender.can_send());
}

/// Loopback transport: every accepted frame lands in a shared queue.
#[derive(Clone, Default)]
struct Loopback {
    frames: Arc<Mutex<VecDeque<Frame>>>,
}

impl SendTransport for Loopback {
    fn connect(&mut self, _: &ConnectionInfo, _: &EndpointOptions) -> Result<()> {
        Ok(())
    }

    fn try_send_frame(&mut self, frame: &[u8], more: bool) -> Result<bool> {
        self.frames
            .lock()
            .push_back(Frame::new(Bytes::copy_from_slice(frame), more));
        Ok(true)
    }
}

impl RecvTransport for Loopback {
    fn connect(&mut self, _: &ConnectionInfo, _: &EndpointOptions) -> Result<()> {
        Ok(())
    }

    fn try_recv_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.lock().pop_front())
    }
}

#[test]
fn test_custom_transport_through_registry() {
    let shared = Loopback::default();
    let registry = Registry::new();
    let for_sender = shared.clone();
    registry
        .register_sender("Loopback", move || TransportSender::new(for_sender.clone()))
        .unwrap();
    let for_receiver = shared.clone();
    registry
        .register_receiver("Loopback", move || TransportReceiver::new(for_receiver.clone()))
        .unwrap();

    let mut sender = registry.make_sender("Loopback").unwrap();
    let mut receiver = registry.make_receiver("Loopback").unwrap();
    sender.connect_for_sends(ConnectionInfo::default()).unwrap();
    receiver.connect_for_receives(ConnectionInfo::default()).unwrap();

    sender
        .send(Fragment::from("payload"), Timeout::NO_BLOCK, "meta")
        .unwrap();
    assert_eq!(shared.frames.lock().len(), 2);

    let msg = receiver.receive(Timeout::NO_BLOCK, None).unwrap();
    assert_eq!(msg, Response::new("payload", "meta"));
}

#[test]
fn test_metadata_only_message_is_torn() {
    let shared = Loopback::default();
    shared
        .frames
        .lock()
        .push_back(Frame::new(Bytes::from_static(b"meta"), false));

    let mut receiver = TransportReceiver::new(shared);
    receiver.connect_for_receives(ConnectionInfo::default()).unwrap();
    let err = receiver.receive(Timeout::NO_BLOCK, None).unwrap_err();
    assert!(matches!(err, IpmError::TornMessage(_)));
}

#[test]
fn test_oversized_message_is_rejected_and_drained() {
    let shared = Loopback::default();
    let options = EndpointOptions::default().with_max_msg_size(4);

    let mut sender = TransportSender::new(shared.clone());
    sender.connect_for_sends(ConnectionInfo::default()).unwrap();
    sender
        .send(Fragment::from("too large"), Timeout::NO_BLOCK, "big")
        .unwrap();
    sender
        .send(Fragment::from("ok"), Timeout::NO_BLOCK, "small")
        .unwrap();

    let mut receiver = TransportReceiver::with_options(shared, options);
    receiver.connect_for_receives(ConnectionInfo::default()).unwrap();
    let err = receiver.receive(Timeout::NO_BLOCK, None).unwrap_err();
    assert!(matches!(err, IpmError::MessageTooLarge { max: 4, .. }));

    let msg = receiver.receive(Timeout::NO_BLOCK, None).unwrap();
    assert_eq!(msg.metadata, "small");
}
