//! Process-wide registry with the built-in plugins loaded.

use ipm_core::error::Result;
use ipm_core::inproc::{self, InprocContext};
use ipm_core::receiver::Receiver;
use ipm_core::registry::Registry;
use ipm_core::sender::Sender;
use ipm_core::subscriber::Subscriber;
use once_cell::sync::Lazy;
use tracing::{debug, error};

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    if let Err(err) = register_builtins(&registry) {
        error!("[IPM] failed to register built-in plugins: {}", err);
    }
    debug!(
        "[IPM] registry ready with senders {:?}, receivers {:?}, subscribers {:?}",
        registry.sender_names(),
        registry.receiver_names(),
        registry.subscriber_names()
    );
    registry
});

fn register_inproc(registry: &Registry) -> Result<()> {
    let ctx = InprocContext::global();
    registry.register_sender("InprocSender", move || inproc::sender(ctx))?;
    registry.register_sender("InprocPublisher", move || inproc::publisher(ctx))?;
    registry.register_receiver("InprocReceiver", move || inproc::receiver(ctx))?;
    registry.register_receiver("InprocSubscriber", move || inproc::subscriber(ctx))?;
    registry.register_subscriber("InprocSubscriber", move || inproc::subscriber(ctx))?;
    Ok(())
}

fn register_builtins(registry: &Registry) -> Result<()> {
    register_inproc(registry)?;
    #[cfg(feature = "zmq")]
    ipm_zmq::register(registry)?;
    Ok(())
}

/// The process-wide registry.
///
/// Pre-loaded with `InprocSender`, `InprocReceiver`, `InprocPublisher`,
/// `InprocSubscriber` and, with the `zmq` feature, the ZeroMQ plugins.
/// Further plugins may be registered at any time.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Fresh, unconnected sender from the process-wide registry.
pub fn make_sender(plugin: &str) -> Result<Box<dyn Sender>> {
    registry().make_sender(plugin)
}

/// Fresh, unconnected receiver from the process-wide registry.
pub fn make_receiver(plugin: &str) -> Result<Box<dyn Receiver>> {
    registry().make_receiver(plugin)
}

/// Fresh, unconnected subscriber from the process-wide registry.
pub fn make_subscriber(plugin: &str) -> Result<Box<dyn Subscriber>> {
    registry().make_subscriber(plugin)
}
