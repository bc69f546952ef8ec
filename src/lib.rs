pub mod config;
pub mod defaults;
pub mod hook;
pub mod logging;
pub mod manager;
pub mod netlink;
pub mod network;
pub mod packet;

pub type NetResult<T> = Result<T, error::NetError>;

pub mod error {
    use std::fmt::Display;

    #[derive(Debug)]
    pub enum NetError {
        /// no interface with the given name exists on this host
        InterfaceNotFound(String),
        /// the address is already present (add) or already absent (delete)
        AddressConflict(String),
        /// any other rejection from the kernel address table
        Kernel(String),
        /// datalink problems while announcing the address
        Link(String),
    }

    impl Display for NetError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                NetError::InterfaceNotFound(name) => write!(f, "interface {name} not found"),
                NetError::AddressConflict(detail) => write!(f, "{detail}"),
                NetError::Kernel(detail) => write!(f, "{detail}"),
                NetError::Link(detail) => write!(f, "{detail}"),
            }
        }
    }

    impl std::error::Error for NetError {}

    #[derive(Debug)]
    pub struct OptError(pub String);

    impl Display for OptError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for OptError {}
}
