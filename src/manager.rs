//! The VIP manager: attaches or detaches the virtual address on the
//! configured interface and announces it after an attach.
//!
//! Nothing here escapes to the caller. Every outcome, including failures of
//! the kernel or the link layer, ends up as a log line so the cluster manager
//! never sees the hook fail.
use std::ops::{Deref, DerefMut};

use ipnet::Ipv4Net;
use log::{error, info, warn, Log};

use crate::{
    config::VipConfig,
    defaults,
    error::NetError,
    hook::Action,
    netlink::{AddrCmd, AddressTable},
    network::{announce, FrameSender},
    NetResult,
};

/// Closes the wrapped table exactly once, whichever way `manage` returns.
struct OpenTable<T: AddressTable>(T);

impl<T: AddressTable> Deref for OpenTable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: AddressTable> DerefMut for OpenTable<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: AddressTable> Drop for OpenTable<T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

pub fn manage<T, F>(action: Action, config: VipConfig, open: F, sender: &mut dyn FrameSender, logger: &dyn Log)
where
    T: AddressTable,
    F: FnOnce() -> NetResult<T>,
{
    let VipConfig { interface, vip_address } = config;

    let mut table = match open() {
        Ok(table) => OpenTable(table),
        Err(err) => {
            error!(logger: logger, "Unable to open the kernel address table: {err}");
            return;
        }
    };

    let index = match table.link_lookup(&interface) {
        Ok(Some(index)) => index,
        Ok(None) => {
            info!(logger: logger, "Interface {interface} not found. Skipping ip address manipulation.");
            return;
        }
        Err(err) => {
            error!(logger: logger, "Unable to look up interface {interface}: {err}");
            return;
        }
    };

    let address = match Ipv4Net::new(vip_address, defaults::VIP_PREFIX_LEN) {
        Ok(address) => address,
        Err(err) => {
            error!(logger: logger, "Invalid VIP {vip_address}: {err}");
            return;
        }
    };

    let cmd = match action {
        Action::Attach => AddrCmd::Add,
        Action::Detach => AddrCmd::Delete,
    };

    match (table.addr(cmd, index, address), action) {
        (Ok(()), Action::Attach) => {
            info!(logger: logger, "An ip address {vip_address} added to the network interface {interface}.");
            if let Err(err) = announce(sender, &interface, vip_address) {
                warn!(logger: logger, "Unable to announce {vip_address} on {interface} with gratuitous ARP: {err}");
            }
        }
        (Ok(()), Action::Detach) => {
            info!(logger: logger, "An ip address {vip_address} removed from the network interface {interface}.");
        }
        (Err(NetError::AddressConflict(detail)), Action::Attach) => {
            info!(
                logger: logger,
                "Unable to add an ip address {vip_address} to the network interface {interface}. Already added!"
            );
            info!(logger: logger, "Netlink error: {detail}");
        }
        (Err(NetError::AddressConflict(detail)), Action::Detach) => {
            info!(
                logger: logger,
                "Unable to remove an ip address {vip_address} from the network interface {interface}. Already removed!"
            );
            info!(logger: logger, "Netlink error: {detail}");
        }
        (Err(err), _) => {
            let verb = match cmd {
                AddrCmd::Add => "add",
                AddrCmd::Delete => "remove",
            };
            error!(logger: logger, "Unable to {verb} ip address {address} on the network interface {interface}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, net::Ipv4Addr, rc::Rc, time::Duration};

    use log::Level;
    use pnet::util::MacAddr;

    use super::*;
    use crate::logging::tests::Captured;

    #[derive(Default)]
    struct Calls {
        addr: Vec<(AddrCmd, u32, Ipv4Net)>,
        closed: usize,
    }

    /// Address table knowing a single `eth0` with index 1.
    struct DummyTable {
        calls: Rc<RefCell<Calls>>,
        reply: Option<fn() -> NetError>,
        lookup_fails: bool,
    }

    impl AddressTable for DummyTable {
        fn link_lookup(&mut self, name: &str) -> NetResult<Option<u32>> {
            if self.lookup_fails {
                return Err(NetError::Kernel("Resource temporarily unavailable".into()));
            }
            Ok(if name == "eth0" { Some(1) } else { None })
        }

        fn addr(&mut self, cmd: AddrCmd, index: u32, address: Ipv4Net) -> NetResult<()> {
            self.calls.borrow_mut().addr.push((cmd, index, address));
            match self.reply {
                Some(err) => Err(err()),
                None => Ok(()),
            }
        }

        fn close(&mut self) {
            self.calls.borrow_mut().closed += 1;
        }
    }

    #[derive(Default)]
    struct DummySender {
        bursts: Vec<(String, usize)>,
    }

    impl FrameSender for DummySender {
        fn mac_address(&mut self, _interface: &str) -> NetResult<MacAddr> {
            Ok(MacAddr(0x02, 0, 0, 0, 0, 0x01))
        }

        fn send_frame(&mut self, _frame: &[u8], interface: &str, count: usize, _inter: Duration) -> NetResult<()> {
            self.bursts.push((interface.to_string(), count));
            Ok(())
        }
    }

    fn config(interface: &str) -> VipConfig {
        VipConfig { interface: interface.to_string(), vip_address: Ipv4Addr::new(10, 0, 0, 10) }
    }

    fn run(
        action: Action,
        interface: &str,
        reply: Option<fn() -> NetError>,
    ) -> (Rc<RefCell<Calls>>, DummySender, Captured) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut sender = DummySender::default();
        let logger = Captured::default();
        let table_calls = Rc::clone(&calls);
        manage(
            action,
            config(interface),
            move || Ok(DummyTable { calls: table_calls, reply, lookup_fails: false }),
            &mut sender,
            &logger,
        );
        (calls, sender, logger)
    }

    fn vip() -> Ipv4Net {
        "10.0.0.10/24".parse().unwrap()
    }

    #[test]
    fn attach_adds_and_announces() {
        let (calls, sender, logger) = run(Action::Attach, "eth0", None);
        assert_eq!(calls.borrow().addr, vec![(AddrCmd::Add, 1, vip())]);
        assert_eq!(sender.bursts, vec![("eth0".to_string(), 3)]);
        assert_eq!(calls.borrow().closed, 1);
        assert_eq!(
            logger.at(Level::Info),
            vec!["An ip address 10.0.0.10 added to the network interface eth0.".to_string()]
        );
    }

    #[test]
    fn detach_deletes_without_announcing() {
        let (calls, sender, logger) = run(Action::Detach, "eth0", None);
        assert_eq!(calls.borrow().addr, vec![(AddrCmd::Delete, 1, vip())]);
        assert!(sender.bursts.is_empty());
        assert_eq!(calls.borrow().closed, 1);
        assert_eq!(
            logger.at(Level::Info),
            vec!["An ip address 10.0.0.10 removed from the network interface eth0.".to_string()]
        );
    }

    #[test]
    fn missing_interface_skips_everything() {
        for action in [Action::Attach, Action::Detach] {
            let (calls, sender, logger) = run(action, "wrong0", None);
            assert!(calls.borrow().addr.is_empty());
            assert!(sender.bursts.is_empty());
            assert_eq!(calls.borrow().closed, 1);
            assert_eq!(
                logger.at(Level::Info),
                vec!["Interface wrong0 not found. Skipping ip address manipulation.".to_string()]
            );
            assert!(logger.at(Level::Error).is_empty());
        }
    }

    #[test]
    fn lookup_failure_still_closes_the_table() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut sender = DummySender::default();
        let logger = Captured::default();
        let table_calls = Rc::clone(&calls);
        manage(
            Action::Attach,
            config("eth0"),
            move || Ok(DummyTable { calls: table_calls, reply: None, lookup_fails: true }),
            &mut sender,
            &logger,
        );
        assert!(calls.borrow().addr.is_empty());
        assert!(sender.bursts.is_empty());
        assert_eq!(calls.borrow().closed, 1);
        let errors = logger.at(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Resource temporarily unavailable"));
        assert!(logger.at(Level::Info).is_empty());
    }

    #[test]
    fn conflict_on_attach_is_absorbed() {
        let (calls, sender, logger) =
            run(Action::Attach, "eth0", Some(|| NetError::AddressConflict("File exists (os error 17)".into())));
        assert_eq!(calls.borrow().addr.len(), 1);
        assert!(sender.bursts.is_empty());
        assert_eq!(calls.borrow().closed, 1);
        let info = logger.at(Level::Info);
        assert!(info[0].ends_with("Already added!"));
        assert_eq!(info[1], "Netlink error: File exists (os error 17)");
        assert!(logger.at(Level::Error).is_empty());
    }

    #[test]
    fn conflict_on_detach_is_absorbed() {
        let (calls, _, logger) =
            run(Action::Detach, "eth0", Some(|| NetError::AddressConflict("Cannot assign requested address".into())));
        assert_eq!(calls.borrow().closed, 1);
        assert!(logger.at(Level::Info)[0].ends_with("Already removed!"));
    }

    #[test]
    fn other_kernel_failure_is_logged_as_error() {
        let (calls, sender, logger) =
            run(Action::Attach, "eth0", Some(|| NetError::Kernel("Operation not permitted".into())));
        assert_eq!(calls.borrow().addr.len(), 1);
        assert!(sender.bursts.is_empty());
        assert_eq!(calls.borrow().closed, 1);
        let errors = logger.at(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Operation not permitted"));
    }

    #[test]
    fn open_failure_is_logged() {
        let mut sender = DummySender::default();
        let logger = Captured::default();
        manage(
            Action::Attach,
            config("eth0"),
            || -> NetResult<DummyTable> { Err(NetError::Kernel("EPERM".into())) },
            &mut sender,
            &logger,
        );
        assert!(sender.bursts.is_empty());
        assert_eq!(logger.at(Level::Error).len(), 1);
    }

    #[test]
    fn announce_failure_does_not_undo_attach() {
        struct Broken;
        impl FrameSender for Broken {
            fn mac_address(&mut self, interface: &str) -> NetResult<MacAddr> {
                Err(NetError::Link(format!("{interface} has no hardware address")))
            }
            fn send_frame(&mut self, _: &[u8], _: &str, _: usize, _: Duration) -> NetResult<()> {
                unreachable!()
            }
        }

        let calls = Rc::new(RefCell::new(Calls::default()));
        let logger = Captured::default();
        let table_calls = Rc::clone(&calls);
        manage(
            Action::Attach,
            config("eth0"),
            move || Ok(DummyTable { calls: table_calls, reply: None, lookup_fails: false }),
            &mut Broken,
            &logger,
        );
        assert_eq!(calls.borrow().addr.len(), 1);
        assert_eq!(calls.borrow().closed, 1);
        assert_eq!(logger.at(Level::Info).len(), 1);
        assert_eq!(logger.at(Level::Warn).len(), 1);
    }
}
