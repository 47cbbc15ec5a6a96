//! ZeroMQ PUSH/PULL pipeline
//!
//! A receiver connects before the sender binds; libzmq completes the
//! connection in the background.
//!
//! # Run
//!
//! ```sh
//! cargo run --example zmq_push_pull --features zmq
//! ```

use ipm::prelude::*;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ipm::dev_tracing::init_tracing();

    let receiver_config = EndpointConfig::from_json(
        r#"{
            "plugin": "ZmqReceiver",
            "connection_info": { "connection_string": "tcp://127.0.0.1:5590", "recv_hwm": 100 }
        }"#,
    )?;
    let mut receiver = receiver_config.make_receiver()?;

    let mut sender = ipm::make_sender("ZmqSender")?;
    sender.connect_for_sends(ConnectionInfo::new("tcp://*:5590"))?;
    thread::sleep(Duration::from_millis(100));

    for i in 0..5u32 {
        let payload = i.to_le_bytes();
        sender.send(Fragment::from(&payload), Timeout::from_millis(1000), "counter")?;
    }

    let parts = [Fragment::from("frag-"), Fragment::from("ment")];
    sender.send_multipart(&parts, Timeout::from_millis(1000), "multipart")?;

    for _ in 0..5 {
        let msg = receiver.receive(Timeout::from_millis(1000), Some(4))?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&msg.data);
        println!("[{}] {}", msg.metadata, u32::from_le_bytes(bytes));
    }

    let msg = receiver.receive(Timeout::from_millis(1000), None)?;
    println!("[{}] {}", msg.metadata, String::from_utf8_lossy(&msg.data));

    Ok(())
}
