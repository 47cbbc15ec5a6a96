//! PULL and SUB receiving transports.

use std::collections::BTreeSet;

use bytes::Bytes;
use ipm_core::config::ConnectionInfo;
use ipm_core::error::{IpmError, Result};
use ipm_core::options::EndpointOptions;
use ipm_core::transport::{Frame, RecvTransport, SubscribeTransport};
use tracing::{debug, trace};

use crate::utils::{address, open_socket, zmq_error};

/// Receiving half over a libzmq PULL or SUB socket.
///
/// Connects to the connection string; libzmq retries the connection in the
/// background until the peer binds. Topics subscribed before the socket
/// exists are applied when it is created.
pub struct ZmqRecvTransport {
    ctx: zmq::Context,
    kind: zmq::SocketType,
    socket: Option<zmq::Socket>,
    topics: BTreeSet<Vec<u8>>,
}

impl ZmqRecvTransport {
    pub fn pull(ctx: &zmq::Context) -> Self {
        Self::new(ctx, zmq::PULL)
    }

    pub fn sub(ctx: &zmq::Context) -> Self {
        Self::new(ctx, zmq::SUB)
    }

    fn new(ctx: &zmq::Context, kind: zmq::SocketType) -> Self {
        Self {
            ctx: ctx.clone(),
            kind,
            socket: None,
            topics: BTreeSet::new(),
        }
    }

    pub fn socket_type(&self) -> zmq::SocketType {
        self.kind
    }

    fn require_sub(&self) -> Result<()> {
        if self.kind == zmq::SUB {
            Ok(())
        } else {
            Err(IpmError::transport(format!(
                "{:?} socket has no topic filter",
                self.kind
            )))
        }
    }
}

impl RecvTransport for ZmqRecvTransport {
    fn connect(&mut self, info: &ConnectionInfo, options: &EndpointOptions) -> Result<()> {
        let addr = address(info)?;
        if self.socket.is_none() {
            let socket = open_socket(&self.ctx, self.kind, options)?;
            for topic in &self.topics {
                socket
                    .set_subscribe(topic)
                    .map_err(|e| zmq_error("subscribe", e))?;
            }
            self.socket = Some(socket);
        }
        let Some(socket) = self.socket.as_ref() else {
            return Err(IpmError::transport("zmq socket missing after open"));
        };

        socket.connect(addr).map_err(|e| zmq_error("connect", e))?;
        debug!("[ZMQ] {:?} connected to {}", self.kind, addr);
        Ok(())
    }

    fn try_recv_frame(&mut self) -> Result<Option<Frame>> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(None);
        };

        match socket.recv_msg(zmq::DONTWAIT) {
            Ok(msg) => {
                let more = msg.get_more();
                Ok(Some(Frame::new(Bytes::copy_from_slice(&msg), more)))
            }
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(zmq_error("recv", e)),
        }
    }
}

impl SubscribeTransport for ZmqRecvTransport {
    fn subscribe(&mut self, topic: &[u8]) -> Result<()> {
        self.require_sub()?;
        if let Some(socket) = self.socket.as_ref() {
            socket
                .set_subscribe(topic)
                .map_err(|e| zmq_error("subscribe", e))?;
        } else {
            trace!("[ZMQ] deferring subscription until connect");
        }
        self.topics.insert(topic.to_vec());
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &[u8]) -> Result<()> {
        self.require_sub()?;
        if let Some(socket) = self.socket.as_ref() {
            socket
                .set_unsubscribe(topic)
                .map_err(|e| zmq_error("unsubscribe", e))?;
        }
        self.topics.remove(topic);
        Ok(())
    }
}
