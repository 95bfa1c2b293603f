//! Run a single shell command against an ADB server.
//!
//! ```text
//! cargo run --example shell -- <host> [port] <command...>
//! cargo run --example shell -- 192.168.1.40 5555 getprop ro.product.model
//! ```
//!
//! The captured output goes to stdout; failures (including a timeout or
//! a mid-stream disconnect) are reported on stderr with a non-zero exit,
//! so an empty result is distinguishable from an error.

use std::process::ExitCode;

use adbwire::{AdbError, Client};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(host) = args.next() else {
        eprintln!("usage: shell <host> [port] <command...>");
        return ExitCode::FAILURE;
    };

    let mut rest: Vec<String> = args.collect();
    let port = match rest.first().and_then(|s| s.parse::<u16>().ok()) {
        Some(port) => {
            rest.remove(0);
            port
        }
        None => 5555,
    };

    if rest.is_empty() {
        eprintln!("usage: shell <host> [port] <command...>");
        return ExitCode::FAILURE;
    }
    let command = rest.join(" ");

    let mut client = Client::builder().host(&host).port(port).build();

    match client.shell(&command).await {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(AdbError::Disconnected { partial }) => {
            eprintln!(
                "error: server disconnected mid-stream ({} bytes received)",
                partial.len()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
