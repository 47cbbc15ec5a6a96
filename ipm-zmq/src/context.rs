use once_cell::sync::Lazy;
use tracing::debug;

static CONTEXT: Lazy<zmq::Context> = Lazy::new(|| {
    debug!("[ZMQ] creating global context");
    zmq::Context::new()
});

/// Process-wide ZeroMQ context shared by every endpoint built through the
/// plugin constructors.
///
/// `inproc://` names are scoped to a context, so endpoints created with a
/// different context cannot reach these ones over inproc.
pub fn global_context() -> &'static zmq::Context {
    &CONTEXT
}
