//! In-process publish/subscribe
//!
//! A publisher thread emits run-control and data messages; two subscribers
//! built from configuration records follow different topics.
//!
//! # Run
//!
//! ```sh
//! RUST_LOG=debug cargo run --example inproc_pubsub
//! ```

use ipm::prelude::*;
use std::thread;
use std::time::Duration;

const ENDPOINT: &str = "inproc://run-control";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ipm::dev_tracing::init_tracing();

    println!("=== Inproc Pub/Sub Demo ===\n");
    println!("Registered senders: {:?}", ipm::registry().sender_names());
    println!("Registered subscribers: {:?}\n", ipm::registry().subscriber_names());

    let mut publisher = ipm::make_sender("InprocPublisher")?;
    publisher.connect_for_sends(ConnectionInfo::new(ENDPOINT))?;

    let mut control = EndpointConfig::new("InprocSubscriber")
        .with_connection_info(ConnectionInfo::new(ENDPOINT))
        .with_topic("run.")
        .make_subscriber()?;
    let mut everything = EndpointConfig::new("InprocSubscriber")
        .with_connection_info(ConnectionInfo::new(ENDPOINT))
        .with_topic("")
        .make_subscriber()?;

    let producer = thread::spawn(move || -> ipm::Result<()> {
        let messages = [
            ("run.start", "run 42"),
            ("data.fragment", "ADC counts"),
            ("data.fragment", "more ADC counts"),
            ("run.stop", "run 42"),
        ];
        for (topic, body) in messages {
            publisher.send(Fragment::from(body), Timeout::NO_BLOCK, topic)?;
            thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    });

    println!("Run-control subscriber:");
    for _ in 0..2 {
        let msg = control.receive(Timeout::from_millis(1000), None)?;
        println!("   [{}] {}", msg.metadata, String::from_utf8_lossy(&msg.data));
    }

    println!("Catch-all subscriber:");
    for _ in 0..4 {
        let msg = everything.receive(Timeout::from_millis(1000), None)?;
        println!("   [{}] {}", msg.metadata, String::from_utf8_lossy(&msg.data));
    }

    producer.join().map_err(|_| "producer thread panicked")??;

    match control.receive(Timeout::from_millis(50), None) {
        Err(err) if err.is_timeout() => println!("\nNo more run-control messages"),
        other => println!("\nUnexpected: {other:?}"),
    }

    Ok(())
}
