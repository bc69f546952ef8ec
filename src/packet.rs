use std::net::Ipv4Addr;
use pnet::{
    packet::{
        arp::{ArpHardwareTypes, ArpOperations, MutableArpPacket},
        ethernet::{EtherTypes, MutableEthernetPacket},
        MutablePacket,
    },
    util::MacAddr,
};
use crate::defaults::BROADCAST_MAC_ADDRESS;

const ETHERNET_HEADER_LEN: usize = 14;
const ARP_PACKET_LEN: usize = 28;
pub const GRATUITOUS_ARP_LEN: usize = ETHERNET_HEADER_LEN + ARP_PACKET_LEN;

//
// Gratuitous ARP (RFC 5227 announcement) carried in a broadcast Ethernet frame.
//
//  dst: ff:ff:ff:ff:ff:ff   src: <interface mac>   type: 0x0806
//  htype 1 | ptype 0x0800 | hlen 6 | plen 4 | oper 1 (request)
//  sha <interface mac> | spa <vip> | tha 00:00:00:00:00:00 | tpa <vip>
//
pub fn gratuitous_arp_frame(source_mac: MacAddr, vip_address: Ipv4Addr) -> [u8; GRATUITOUS_ARP_LEN] {
    let mut ethernet_buffer = [0u8; GRATUITOUS_ARP_LEN];
    // both buffers are sized for the headers, so packet construction cannot fail
    if let Some(mut eth_packet) = MutableEthernetPacket::new(&mut ethernet_buffer) {
        eth_packet.set_destination(BROADCAST_MAC_ADDRESS);
        eth_packet.set_source(source_mac);
        eth_packet.set_ethertype(EtherTypes::Arp);

        if let Some(mut arp_packet) = MutableArpPacket::new(eth_packet.payload_mut()) {
            arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
            arp_packet.set_protocol_type(EtherTypes::Ipv4);
            arp_packet.set_hw_addr_len(6);
            arp_packet.set_proto_addr_len(4);
            arp_packet.set_operation(ArpOperations::Request);
            arp_packet.set_sender_hw_addr(source_mac);
            arp_packet.set_sender_proto_addr(vip_address);
            arp_packet.set_target_hw_addr(MacAddr::zero());
            arp_packet.set_target_proto_addr(vip_address);
        }
    }
    ethernet_buffer
}
