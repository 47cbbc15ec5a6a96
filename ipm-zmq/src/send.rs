//! PUSH and PUB sending transports.

use ipm_core::config::ConnectionInfo;
use ipm_core::error::{IpmError, Result};
use ipm_core::options::EndpointOptions;
use ipm_core::transport::SendTransport;
use tracing::debug;

use crate::utils::{address, open_socket, zmq_error};

/// Sending half over a libzmq PUSH or PUB socket.
///
/// Binds the connection string. Binding again adds another endpoint to the
/// same socket. libzmq queues a multipart message atomically once its first
/// frame has been accepted.
pub struct ZmqSendTransport {
    ctx: zmq::Context,
    kind: zmq::SocketType,
    socket: Option<zmq::Socket>,
}

impl ZmqSendTransport {
    pub fn push(ctx: &zmq::Context) -> Self {
        Self::new(ctx, zmq::PUSH)
    }

    /// PUB never blocks: messages for slow or absent subscribers are dropped.
    pub fn publish(ctx: &zmq::Context) -> Self {
        Self::new(ctx, zmq::PUB)
    }

    fn new(ctx: &zmq::Context, kind: zmq::SocketType) -> Self {
        Self {
            ctx: ctx.clone(),
            kind,
            socket: None,
        }
    }

    pub fn socket_type(&self) -> zmq::SocketType {
        self.kind
    }
}

impl SendTransport for ZmqSendTransport {
    fn connect(&mut self, info: &ConnectionInfo, options: &EndpointOptions) -> Result<()> {
        let addr = address(info)?;
        if self.socket.is_none() {
            self.socket = Some(open_socket(&self.ctx, self.kind, options)?);
        }
        let Some(socket) = self.socket.as_ref() else {
            return Err(IpmError::transport("zmq socket missing after open"));
        };

        socket.bind(addr).map_err(|e| zmq_error("bind", e))?;
        debug!("[ZMQ] {:?} bound to {}", self.kind, addr);
        Ok(())
    }

    fn try_send_frame(&mut self, frame: &[u8], more: bool) -> Result<bool> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| IpmError::transport("zmq sender is not bound"))?;

        let flags = if more {
            zmq::DONTWAIT | zmq::SNDMORE
        } else {
            zmq::DONTWAIT
        };

        match socket.send(frame, flags) {
            Ok(()) => Ok(true),
            Err(zmq::Error::EAGAIN) => Ok(false),
            Err(e) => Err(zmq_error("send", e)),
        }
    }
}
