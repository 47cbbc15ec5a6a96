use std::time::Duration;

use ipm_core::config::ConnectionInfo;
use ipm_core::endpoint::EndpointError;
use ipm_core::error::{IpmError, Result};
use ipm_core::options::EndpointOptions;
use tracing::trace;

/// Map a libzmq error to the transport error variant.
pub fn zmq_error(op: &str, err: zmq::Error) -> IpmError {
    IpmError::transport(format!("zmq {op} failed: {err}"))
}

/// libzmq socket options are C ints.
pub fn to_sockopt(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub fn linger_ms(linger: Duration) -> i32 {
    i32::try_from(linger.as_millis()).unwrap_or(i32::MAX)
}

/// Check the connection string names a transport and pass it on unchanged.
///
/// libzmq owns the rest of the address grammar (wildcard ports, interface
/// names, source addresses) and reports its own errors on bind or connect.
pub fn address(info: &ConnectionInfo) -> Result<&str> {
    let addr = info.connection_string.as_str();
    match addr.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {
            trace!("[ZMQ] endpoint {} ({})", addr, scheme);
            Ok(addr)
        }
        _ => Err(EndpointError::InvalidScheme(addr.to_string()).into()),
    }
}

/// Create a socket with the queue and linger options applied.
pub fn open_socket(
    ctx: &zmq::Context,
    kind: zmq::SocketType,
    options: &EndpointOptions,
) -> Result<zmq::Socket> {
    let socket = ctx.socket(kind).map_err(|e| zmq_error("socket", e))?;
    socket
        .set_sndhwm(to_sockopt(options.send_hwm))
        .map_err(|e| zmq_error("set_sndhwm", e))?;
    socket
        .set_rcvhwm(to_sockopt(options.recv_hwm))
        .map_err(|e| zmq_error("set_rcvhwm", e))?;
    socket
        .set_linger(linger_ms(options.linger))
        .map_err(|e| zmq_error("set_linger", e))?;
    Ok(socket)
}
