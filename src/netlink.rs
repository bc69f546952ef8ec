//! Kernel address table access.
//!
//! `AddressTable` is the seam the manager talks through. `RtNetlink` is the
//! real implementation: a NETLINK_ROUTE socket issuing RTM_NEWADDR and
//! RTM_DELADDR requests and waiting for the kernel's acknowledgement.
use std::net::IpAddr;

use ipnet::Ipv4Net;
use netlink_packet_core::{
    ErrorMessage, NetlinkHeader, NetlinkMessage, NetlinkPayload, NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL,
    NLM_F_REQUEST,
};
use netlink_packet_route::{
    address::{AddressAttribute, AddressMessage},
    AddressFamily, RouteNetlinkMessage,
};
use netlink_sys::{protocols::NETLINK_ROUTE, Socket, SocketAddr};
use pnet::datalink;

use crate::{error::NetError, NetResult};

const RECEIVE_BUFFER_LEN: usize = 8192;

/// Address mutation requested from the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrCmd {
    Add,
    Delete,
}

pub trait AddressTable {
    /// Kernel index of the interface called `name`, `None` when there is none.
    fn link_lookup(&mut self, name: &str) -> NetResult<Option<u32>>;

    /// Adds or deletes `address` on the interface with `index`.
    ///
    /// Fails with [`NetError::AddressConflict`] when the address is already
    /// present (add) or already absent (delete).
    fn addr(&mut self, cmd: AddrCmd, index: u32, address: Ipv4Net) -> NetResult<()>;

    fn close(&mut self);
}


pub struct RtNetlink {
    socket: Option<Socket>,
    sequence: u32,
}

impl RtNetlink {
    pub fn open() -> NetResult<Self> {
        let mut socket = Socket::new(NETLINK_ROUTE)
            .map_err(|err| NetError::Kernel(format!("unable to create netlink socket: {err}")))?;
        socket
            .bind_auto()
            .map_err(|err| NetError::Kernel(format!("unable to bind netlink socket: {err}")))?;
        socket
            .connect(&SocketAddr::new(0, 0))
            .map_err(|err| NetError::Kernel(format!("unable to connect netlink socket: {err}")))?;

        Ok(RtNetlink { socket: Some(socket), sequence: 0 })
    }

    // sends one request and blocks until the kernel acks or rejects it
    fn request(&mut self, cmd: AddrCmd, index: u32, address: Ipv4Net) -> NetResult<()> {
        self.sequence = self.sequence.wrapping_add(1);
        let sequence = self.sequence;
        let socket = match &self.socket {
            Some(socket) => socket,
            None => return Err(NetError::Kernel("netlink handle already closed".to_string())),
        };

        let buf = address_request(cmd, index, address, sequence);
        socket
            .send(&buf, 0)
            .map_err(|err| NetError::Kernel(format!("unable to send netlink request: {err}")))?;

        let mut receive_buffer = vec![0u8; RECEIVE_BUFFER_LEN];
        loop {
            let size = socket
                .recv(&mut &mut receive_buffer[..], 0)
                .map_err(|err| NetError::Kernel(format!("unable to receive netlink reply: {err}")))?;

            if let Some(result) = read_reply(&receive_buffer[..size], sequence, cmd) {
                return result;
            }
        }
    }
}

impl AddressTable for RtNetlink {
    fn link_lookup(&mut self, name: &str) -> NetResult<Option<u32>> {
        let index = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == name)
            .map(|iface| iface.index);
        Ok(index)
    }

    fn addr(&mut self, cmd: AddrCmd, index: u32, address: Ipv4Net) -> NetResult<()> {
        self.request(cmd, index, address)
    }

    fn close(&mut self) {
        // dropping the socket closes its descriptor
        self.socket.take();
    }
}

/// Serialized RTM_NEWADDR (add) or RTM_DELADDR (delete) request asking for an ack.
fn address_request(cmd: AddrCmd, index: u32, address: Ipv4Net, sequence: u32) -> Vec<u8> {
    let mut message = AddressMessage::default();
    message.header.family = AddressFamily::Inet;
    message.header.prefix_len = address.prefix_len();
    message.header.index = index;
    message.attributes.push(AddressAttribute::Local(IpAddr::V4(address.addr())));
    message.attributes.push(AddressAttribute::Address(IpAddr::V4(address.addr())));

    let (payload, flags) = match cmd {
        AddrCmd::Add => {
            message.attributes.push(AddressAttribute::Broadcast(address.broadcast()));
            (
                RouteNetlinkMessage::NewAddress(message),
                NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
            )
        }
        AddrCmd::Delete => (RouteNetlinkMessage::DelAddress(message), NLM_F_REQUEST | NLM_F_ACK),
    };

    let mut header = NetlinkHeader::default();
    header.flags = flags;
    header.sequence_number = sequence;

    let mut packet = NetlinkMessage::new(header, NetlinkPayload::InnerMessage(payload));
    packet.finalize();
    let mut buf = vec![0u8; packet.buffer_len()];
    packet.serialize(&mut buf[..]);
    buf
}

/// Walks one datagram of replies. `None` means the answer to `sequence` is
/// not in it and the caller has to keep receiving.
fn read_reply(buf: &[u8], sequence: u32, cmd: AddrCmd) -> Option<NetResult<()>> {
    let mut offset = 0;
    while offset < buf.len() {
        let reply = match NetlinkMessage::<RouteNetlinkMessage>::deserialize(&buf[offset..]) {
            Ok(reply) => reply,
            Err(err) => return Some(Err(NetError::Kernel(format!("unable to parse netlink reply: {err}")))),
        };
        let length = reply.header.length as usize;

        if reply.header.sequence_number == sequence {
            match reply.payload {
                NetlinkPayload::Error(err) => return Some(reply_to_result(cmd, err)),
                NetlinkPayload::Done(_) => return Some(Ok(())),
                _ => {}
            }
        }

        if length == 0 {
            return Some(Err(NetError::Kernel("truncated netlink reply".to_string())));
        }
        // netlink messages are 4 byte aligned
        offset += (length + 3) & !3;
    }
    None
}

fn reply_to_result(cmd: AddrCmd, err: ErrorMessage) -> NetResult<()> {
    // a zero error code is the kernel's acknowledgement
    let errno = match err.code {
        None => return Ok(()),
        Some(code) => -code.get(),
    };
    Err(classify(cmd, errno, err.to_io().to_string()))
}

/// Maps a kernel errno for `cmd` onto the error taxonomy.
pub(crate) fn classify(cmd: AddrCmd, errno: i32, detail: String) -> NetError {
    match (cmd, errno) {
        (AddrCmd::Add, libc::EEXIST) => NetError::AddressConflict(detail),
        (AddrCmd::Delete, libc::EADDRNOTAVAIL) => NetError::AddressConflict(detail),
        _ => NetError::Kernel(detail),
    }
}
