//! CLI command definitions

use clap::{Parser, Subcommand};

use hwsim_proto::Operation;

/// Manage virtual radios exposed by the mac80211_hwsim kernel module
#[derive(Debug, Parser)]
#[command(name = "hwsimctl", version)]
pub struct Cli {
    /// Milliseconds to wait for the kernel's reply
    #[arg(long, global = true, default_value_t = 2000, value_name = "MS")]
    pub timeout_ms: u64,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new radio
    Create {
        /// Device name; the kernel picks one if omitted
        #[arg(short, long)]
        name: Option<String>,

        /// Number of channels; 0 keeps the module default
        #[arg(short, long, default_value_t = 0)]
        channels: u32,

        /// Do not create a network interface automatically
        #[arg(long)]
        no_vif: bool,

        /// Use channel contexts
        #[arg(long)]
        use_chanctx: bool,

        /// Two-letter regulatory hint, e.g. DE
        #[arg(long, value_name = "CC")]
        reg_alpha2: Option<String>,

        /// Custom regulatory domain index
        #[arg(long, value_name = "IDX", default_value_t = 0)]
        reg_custom: u32,
    },

    /// Delete a radio addressed by id or by name
    Delete {
        /// Numeric radio id
        #[arg(short, long)]
        id: Option<u32>,

        /// Device name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Set the signal strength of a radio
    SetRssi {
        /// Numeric radio id
        radio_id: u32,

        /// Signal strength magnitude in dBm, e.g. 50 for -50 dBm
        #[arg(value_parser = clap::value_parser!(i32).range(1..))]
        rssi_dbm: i32,
    },
}

impl Cli {
    /// Translate the parsed arguments into the operation to run.
    ///
    /// Delete must name exactly one target; that rule and the non-empty
    /// name check live here rather than in the parser.
    pub fn into_operation(self) -> Result<Operation, String> {
        match self.command {
            Command::Create {
                name,
                channels,
                no_vif,
                use_chanctx,
                reg_alpha2,
                reg_custom,
            } => Ok(Operation::CreateRadio {
                name,
                channel_count: channels,
                no_auto_interface: no_vif,
                use_channel_contexts: use_chanctx,
                regulatory_alpha2: reg_alpha2,
                regulatory_domain: reg_custom,
            }),
            Command::Delete { id, name } => match (id, name) {
                (Some(_), Some(_)) => Err("only one of --id and --name is allowed".to_string()),
                (Some(id), None) => Ok(Operation::DeleteById { radio_id: id }),
                (None, Some(name)) => {
                    if name.is_empty() {
                        Err("--name must not be empty".to_string())
                    } else {
                        Ok(Operation::DeleteByName { radio_name: name })
                    }
                }
                (None, None) => Err("one of --id and --name is required".to_string()),
            },
            Command::SetRssi { radio_id, rssi_dbm } => {
                Ok(Operation::SetSignalStrength { radio_id, rssi_dbm })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn create_maps_every_flag() {
        let cli = parse(&[
            "hwsimctl",
            "create",
            "--name",
            "wlan-test",
            "--channels",
            "2",
            "--no-vif",
            "--use-chanctx",
            "--reg-alpha2",
            "DE",
            "--reg-custom",
            "4",
        ]);
        let op = cli.into_operation().unwrap();
        assert_eq!(
            op,
            Operation::CreateRadio {
                name: Some("wlan-test".into()),
                channel_count: 2,
                no_auto_interface: true,
                use_channel_contexts: true,
                regulatory_alpha2: Some("DE".into()),
                regulatory_domain: 4,
            }
        );
    }

    #[test]
    fn bare_create_defaults_every_option() {
        let op = parse(&["hwsimctl", "create"]).into_operation().unwrap();
        assert_eq!(
            op,
            Operation::CreateRadio {
                name: None,
                channel_count: 0,
                no_auto_interface: false,
                use_channel_contexts: false,
                regulatory_alpha2: None,
                regulatory_domain: 0,
            }
        );
    }

    #[test]
    fn delete_requires_exactly_one_target() {
        let both = parse(&["hwsimctl", "delete", "--id", "1", "--name", "radio1"]);
        assert_eq!(
            both.into_operation().unwrap_err(),
            "only one of --id and --name is allowed"
        );

        let neither = parse(&["hwsimctl", "delete"]);
        assert_eq!(
            neither.into_operation().unwrap_err(),
            "one of --id and --name is required"
        );

        let by_id = parse(&["hwsimctl", "delete", "--id", "3"]);
        assert_eq!(
            by_id.into_operation().unwrap(),
            Operation::DeleteById { radio_id: 3 }
        );
    }

    #[test]
    fn set_rssi_takes_a_positive_magnitude() {
        let cli = parse(&["hwsimctl", "set-rssi", "3", "50"]);
        assert_eq!(
            cli.into_operation().unwrap(),
            Operation::SetSignalStrength {
                radio_id: 3,
                rssi_dbm: 50,
            }
        );

        let err = Cli::try_parse_from(["hwsimctl", "set-rssi", "3", "0"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn bare_invocation_is_a_usage_error() {
        let err = Cli::try_parse_from(["hwsimctl"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingSubcommand);
    }

    #[test]
    fn timeout_is_a_global_option() {
        let before = parse(&["hwsimctl", "--timeout-ms", "500", "delete", "--id", "1"]);
        assert_eq!(before.timeout_ms, 500);

        let after = parse(&["hwsimctl", "delete", "--id", "1", "--timeout-ms", "500"]);
        assert_eq!(after.timeout_ms, 500);

        let default = parse(&["hwsimctl", "delete", "--id", "1"]);
        assert_eq!(default.timeout_ms, 2000);
    }
}
