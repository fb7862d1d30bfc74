//! Management tool for simulated radios
//!
//! Thin front end over the control-channel client: parse arguments, run
//! the one requested operation, print its outcome, exit accordingly.

mod cli;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hwsim_ctrl::{CoordinatorConfig, CtrlError};
use hwsim_proto::{OperationKind, Outcome, ENODEV, UNKNOWN_RADIO_ID};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Include all our crates in the default filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hwsimctl=info,hwsim_ctrl=info,hwsim_proto=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms);
    let op = match cli.into_operation() {
        Ok(op) => op,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    let config = CoordinatorConfig {
        reply_timeout: timeout,
        ..CoordinatorConfig::default()
    };

    debug!("Running {:?} with a {:?} reply deadline", op, timeout);
    match hwsim_ctrl::run(&op, &config).await {
        Ok(outcome) => report(op.kind(), &outcome, timeout),
        Err(e) => report_error(&e),
    }
}

fn report(kind: OperationKind, outcome: &Outcome, timeout: Duration) -> ExitCode {
    let message = outcome_message(kind, outcome, timeout);
    if outcome.is_success() {
        println!("{}", message);
        ExitCode::SUCCESS
    } else {
        eprintln!("{}", message);
        ExitCode::FAILURE
    }
}

/// Console line for a terminal outcome
fn outcome_message(kind: OperationKind, outcome: &Outcome, timeout: Duration) -> String {
    match outcome {
        Outcome::Created { radio_id } if *radio_id == UNKNOWN_RADIO_ID => {
            "Created device (kernel reported no id)".to_string()
        }
        Outcome::Created { radio_id } => format!("Created device with ID {}", radio_id),
        Outcome::Deleted => "Successfully deleted device".to_string(),
        Outcome::SignalSet => "Signal strength updated".to_string(),
        Outcome::Failed { kernel_error_code }
            if *kernel_error_code == -ENODEV && kind != OperationKind::Create =>
        {
            "Device not found".to_string()
        }
        Outcome::Failed { kernel_error_code } => format!(
            "Unknown kernel error {}: {}",
            kernel_error_code,
            describe_errno(*kernel_error_code)
        ),
        Outcome::TimedOut => format!(
            "Did not receive netlink event after {} msec; the request may still have been applied",
            timeout.as_millis()
        ),
    }
}

fn describe_errno(code: i32) -> String {
    std::io::Error::from_raw_os_error(code.saturating_abs()).to_string()
}

fn report_error(e: &CtrlError) -> ExitCode {
    match e {
        CtrlError::FamilyNotRegistered(name) => {
            eprintln!(
                "Family {} not registered (is the mac80211_hwsim module loaded?)",
                name
            );
        }
        other => eprintln!("{}", other),
    }
    ExitCode::FAILURE
}
