use super::*;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Flags which toggle the optional families of individual collectors.
const COLLECTOR_TOGGLES: &[(&str, &str, &str)] = &[
    ("cpu", "info", "Enables metric cpu info"),
    ("gpu", "info", "Enables metric gpu info"),
];

/// Builds the command line parser. Every registered collector gets a
/// `--collector.<name>` and `--no-collector.<name>` flag pair.
pub fn command(collectors: &[&'static str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about(
            "Samples host performance counters and pushes them to a Prometheus push gateway.",
        )
        .arg(
            Arg::new("CONFIG")
                .help("Configuration file, command line flags take precedence")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set)
                .index(1),
        )
        .arg(
            Arg::new("collector.disable-defaults")
                .long("collector.disable-defaults")
                .help("Set all collectors to disabled by default")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("pusher.token")
                .long("pusher.token")
                .help("Token for push gateway")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("pusher.address")
                .long("pusher.address")
                .help("Address of push gateway")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("pusher.job")
                .long("pusher.job")
                .help("Job name used in the push path")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("pusher.instance")
                .long("pusher.instance")
                .help("Instance address used in the push path instead of the local IPv4 address")
                .value_parser(value_parser!(Ipv4Addr))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("pusher.timeout")
                .long("pusher.timeout")
                .help("Deadline for each push request")
                .value_parser(value_parser!(humantime::Duration))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("pusher.format")
                .long("pusher.format")
                .help("Exposition format: text or openmetrics")
                .value_parser(value_parser!(Format))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("path.procfs")
                .long("path.procfs")
                .help("procfs mountpoint")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("path.sysfs")
                .long("path.sysfs")
                .help("sysfs mountpoint")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("path.rootfs")
                .long("path.rootfs")
                .help("rootfs mountpoint")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .help("Time between scrape and push cycles")
                .value_parser(value_parser!(humantime::Duration))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("log.level")
                .long("log.level")
                .help("Only log messages with the given severity or above: error, warn, info, debug, trace")
                .value_parser(value_parser!(LogLevel))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("log.format")
                .long("log.format")
                .help("Output format of log messages: logfmt or json")
                .value_parser(value_parser!(LogFormat))
                .action(ArgAction::Set),
        );

    for name in collectors {
        command = toggle(
            command,
            format!("collector.{name}"),
            format!("Enable the {name} collector"),
        );
    }

    for (name, option, help) in COLLECTOR_TOGGLES {
        command = toggle(command, format!("collector.{name}.{option}"), help.to_string());
    }

    command
}

fn toggle(command: Command, id: String, help: String) -> Command {
    let negated = format!("no-{id}");

    command
        .arg(
            Arg::new(id.clone())
                .long(id.clone())
                .help(help)
                .overrides_with(negated.clone())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(negated.clone())
                .long(negated)
                .overrides_with(id)
                .hide(true)
                .action(ArgAction::SetTrue),
        )
}

fn toggled(args: &ArgMatches, id: &str) -> Option<bool> {
    if args.get_flag(id) {
        Some(true)
    } else if args.get_flag(&format!("no-{id}")) {
        Some(false)
    } else {
        None
    }
}

impl Config {
    /// Applies command line flags on top of the loaded configuration.
    /// `collectors` must be the same names the command was built with.
    pub fn apply_args(&mut self, args: &ArgMatches, collectors: &[&'static str]) {
        if args.get_flag("collector.disable-defaults") {
            self.defaults.set_enabled(false);
        }

        for name in collectors {
            if let Some(enabled) = toggled(args, &format!("collector.{name}")) {
                self.collector_mut(name).set_enabled(enabled);
            }
        }

        for (name, option, _) in COLLECTOR_TOGGLES {
            if let Some(value) = toggled(args, &format!("collector.{name}.{option}")) {
                self.collector_mut(name).set_info(value);
            }
        }

        if let Some(token) = args.get_one::<String>("pusher.token") {
            self.pusher.set_token(token.clone());
        }

        if let Some(address) = args.get_one::<String>("pusher.address") {
            self.pusher.set_address(address.clone());
        }

        if let Some(job) = args.get_one::<String>("pusher.job") {
            self.pusher.set_job(job.clone());
        }

        if let Some(instance) = args.get_one::<Ipv4Addr>("pusher.instance") {
            self.pusher.set_instance(*instance);
        }

        if let Some(timeout) = args.get_one::<humantime::Duration>("pusher.timeout") {
            self.pusher.set_timeout((*timeout).into());
        }

        if let Some(format) = args.get_one::<Format>("pusher.format") {
            self.pusher.set_format(*format);
        }

        if let Some(path) = args.get_one::<PathBuf>("path.procfs") {
            self.paths.set_procfs(path.clone());
        }

        if let Some(path) = args.get_one::<PathBuf>("path.sysfs") {
            self.paths.set_sysfs(path.clone());
        }

        if let Some(path) = args.get_one::<PathBuf>("path.rootfs") {
            self.paths.set_rootfs(path.clone());
        }

        if let Some(interval) = args.get_one::<humantime::Duration>("interval") {
            self.general.set_interval((*interval).into());
        }

        if let Some(level) = args.get_one::<LogLevel>("log.level") {
            self.log.set_level(*level);
        }

        if let Some(format) = args.get_one::<LogFormat>("log.format") {
            self.log.set_format(*format);
        }
    }
}
