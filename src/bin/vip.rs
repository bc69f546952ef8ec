use clap::Parser;
use log::{debug, error, info, Log};
use vip_failover::{
    config::{read_config_from_json_file, CliArgs, VipConfig},
    logging::stdout_logger,
    manager::manage,
    netlink::RtNetlink,
    network::DatalinkSender,
};

/// Invoked by the cluster manager as `vip [options] <hook> <role> <scope>`.
/// Always exits 0 once the arguments are parsed.
fn main() {
    let args = CliArgs::parse();
    let logger = match stdout_logger(args.log_level) {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("vip: {err}");
            return;
        }
    };

    let invocation = args.invocation();
    info!(
        logger: &logger,
        "hook='{}', role='{}', scope='{}'",
        invocation.hook,
        invocation.role,
        invocation.scope
    );

    let file_config = match &args.config {
        Some(path) => match read_config_from_json_file(path) {
            Ok(config) => Some(config),
            Err(err) => {
                error!(logger: &logger, "{err}. Falling back to defaults.");
                None
            }
        },
        None => None,
    };
    let config = VipConfig::resolve(&args, file_config);

    match invocation.action() {
        Some(action) => {
            debug!(logger: &logger, "{action:?} {} on {}", config.vip_address, config.interface);
            manage(action, config, RtNetlink::open, &mut DatalinkSender, &logger);
        }
        None => debug!(logger: &logger, "nothing to do for this hook call"),
    }

    logger.flush();
}
