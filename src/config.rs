use std::{fs::File, io::BufReader, net::Ipv4Addr, path::{Path, PathBuf}};
use clap::Parser;
use log::LevelFilter;
use serde::Deserialize;
use crate::{defaults, error::OptError, hook::Invocation};


/// Cluster failover hook: attaches the VIP on promotion, detaches it on demotion.
///
/// Example:
///     vip on_role_change master myclustername
#[derive(Parser, Debug, Clone)]
#[command(name = "vip", version, about)]
pub struct CliArgs {
    /// network interface the VIP is attached to (default: eth0)
    #[arg(long)]
    pub interface: Option<String>,

    /// virtual IPv4 address to manage (default: 10.38.1.50)
    #[arg(long)]
    pub vip: Option<Ipv4Addr>,

    /// json file holding `interface` and `vip_address`
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// on_reload, on_restart, on_role_change, on_start or on_stop
    pub hook: String,

    /// current node role in the cluster: master or replica
    pub role: String,

    /// cluster name
    pub scope: String,
}

impl CliArgs {
    pub fn invocation(&self) -> Invocation {
        Invocation {
            hook: self.hook.clone(),
            role: self.role.clone(),
            scope: self.scope.clone(),
        }
    }
}

// for reading the optional JSON config file
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub interface: Option<String>,
    pub vip_address: Option<Ipv4Addr>,
}

/// What the manager acts on. Built once per run and handed over by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VipConfig {
    pub interface: String,
    pub vip_address: Ipv4Addr,
}

impl Default for VipConfig {
    fn default() -> Self {
        VipConfig {
            interface: defaults::interface(),
            vip_address: defaults::vip_address(),
        }
    }
}

impl VipConfig {
    // flags win over the file, the file wins over the defaults
    pub fn resolve(args: &CliArgs, file: Option<FileConfig>) -> VipConfig {
        let file = file.unwrap_or_default();
        VipConfig {
            interface: args
                .interface
                .clone()
                .or(file.interface)
                .unwrap_or_else(defaults::interface),
            vip_address: args
                .vip
                .or(file.vip_address)
                .unwrap_or_else(defaults::vip_address),
        }
    }
}

pub fn read_config_from_json_file<P: AsRef<Path>>(path: P) -> Result<FileConfig, OptError> {
    let file = File::open(path.as_ref()).map_err(|err| {
        OptError(format!("unable to open config file {:?}: {err}", path.as_ref().as_os_str()))
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|err| {
        OptError(format!("problem parsing config file {:?}: {err}", path.as_ref().as_os_str()))
    })
}
