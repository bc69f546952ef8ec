use std::{net::Ipv4Addr, thread, time::Duration};
use pnet::{
    datalink::{self, Channel, DataLinkSender, NetworkInterface},
    util::MacAddr,
};
use crate::{defaults, error::NetError, packet::gratuitous_arp_frame, NetResult};


/// Raw link-layer transmission, below IP routing.
pub trait FrameSender {
    /// Hardware address of `interface`.
    fn mac_address(&mut self, interface: &str) -> NetResult<MacAddr>;

    /// Puts `frame` on the wire of `interface` `count` times, waiting `inter`
    /// between two frames.
    fn send_frame(&mut self, frame: &[u8], interface: &str, count: usize, inter: Duration) -> NetResult<()>;
}

/// Announces `vip_address` on `interface` with a burst of gratuitous ARPs so
/// neighbours and switches point it at this host's MAC.
pub fn announce(sender: &mut dyn FrameSender, interface: &str, vip_address: Ipv4Addr) -> NetResult<()> {
    let mac = sender.mac_address(interface)?;
    let frame = gratuitous_arp_frame(mac, vip_address);
    sender.send_frame(&frame, interface, defaults::ANNOUNCE_COUNT, defaults::ANNOUNCE_INTERVAL)
}


/// Sends through a pnet datalink channel opened per burst.
#[derive(Debug, Default)]
pub struct DatalinkSender;

impl FrameSender for DatalinkSender {
    fn mac_address(&mut self, interface: &str) -> NetResult<MacAddr> {
        let interface = get_interface(interface)?;
        interface
            .mac
            .ok_or_else(|| NetError::Link(format!("interface {} has no hardware address", interface.name)))
    }

    fn send_frame(&mut self, frame: &[u8], interface: &str, count: usize, inter: Duration) -> NetResult<()> {
        let interface = get_interface(interface)?;
        let mut sender = create_datalink_channel(&interface)?;

        for sent in 0..count {
            if sent > 0 && !inter.is_zero() {
                thread::sleep(inter);
            }
            match sender.send_to(frame, None) {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    return Err(NetError::Link(format!("unable to send frame on {}: {err}", interface.name)))
                }
                None => {
                    return Err(NetError::Link(format!("no room to send frame on {}", interface.name)))
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn get_interface(name: &str) -> NetResult<NetworkInterface> {
    let interface_names_match = |iface: &NetworkInterface| iface.name == name;
    let interfaces = datalink::interfaces();

    match interfaces.into_iter().find(interface_names_match) {
        Some(interface) => Ok(interface),
        None => Err(NetError::InterfaceNotFound(name.to_string())),
    }
}

pub(crate) fn create_datalink_channel(interface: &NetworkInterface) -> NetResult<Box<dyn DataLinkSender>> {
    match datalink::channel(interface, Default::default()) {
        Ok(Channel::Ethernet(tx, _rx)) => Ok(tx),
        Ok(_) => Err(NetError::Link("Unknown channel type".to_string())),
        Err(err) => Err(NetError::Link(format!("Problem creating datalink channel on {}: {err}", interface.name))),
    }
}
