//! UdpTransport - UDP fire-and-forget OSC messages

use std::io;
use std::net::SocketAddr;

use tokio::net::{ToSocketAddrs, UdpSocket};
use tracing::{debug, instrument, trace};

use contracts::{ContractError, Endpoint, LocalDevice, OutboundMessage, Transport};

use super::osc;

/// Max OSC packet size over UDP (IPv4 payload limit)
pub const MAX_PACKET_SIZE: usize = 65507;

/// Transport that sends OSC packets over a single UDP socket.
///
/// The socket is the device's own socket: queries sent from it carry the
/// device address as their source, so replies arrive back at the device.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind the device socket
    #[instrument(name = "udp_transport_bind", skip(addr))]
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        // try_send_to only succeeds once the reactor has seen the socket writable
        socket.writable().await?;

        debug!(local = %local_addr, "UdpTransport bound");

        Ok(Self { socket, local_addr })
    }

    /// Address replies to queries will arrive at
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn send(&self, endpoint: &Endpoint, message: &OutboundMessage) -> Result<(), ContractError> {
        let data = osc::encode(message)?;
        if data.len() > MAX_PACKET_SIZE {
            return Err(ContractError::transport(
                &message.address,
                format!("packet too large ({} > {MAX_PACKET_SIZE})", data.len()),
            ));
        }

        // Never await: a socket that is not writable right now drops the
        // packet, as UDP would anyway.
        match self.socket.try_send_to(&data, endpoint.addr) {
            Ok(sent) => {
                trace!(
                    address = %message.address,
                    target = %endpoint.addr,
                    bytes = sent,
                    "Sent"
                );
                Ok(())
            }
            Err(e) => Err(ContractError::transport(&message.address, e.to_string())),
        }
    }
}

impl Transport for UdpTransport {
    fn transmit(
        &self,
        endpoint: &Endpoint,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        self.send(endpoint, message)
    }

    fn transmit_query(
        &self,
        endpoint: &Endpoint,
        reply_source: &LocalDevice,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        if let Some(reply_addr) = reply_source.reply_addr {
            if reply_addr.port() != self.local_addr.port() {
                debug!(
                    device = %reply_source.name,
                    reply = %reply_addr,
                    local = %self.local_addr,
                    "Reply address differs from transport socket"
                );
            }
        }
        self.send(endpoint, message)
    }
}
