//! Push configuration lines to a router
//!
//! Connects to a CLI that is already logged in (a console server port or a
//! raw TCP session), loads the lines that are missing from the running
//! configuration and optionally saves them.
//!
//! # Usage
//!
//! ```bash
//! # Preview what would be sent
//! cargo run --example push_config -- --host 10.0.0.10:7001 --check \
//!     "ether 1 1 description uplink"
//!
//! # Apply and save on a Yamaha RTX
//! cargo run --example push_config -- --host 10.0.0.10:7002 --platform rtx \
//!     --admin-password secret --save "ip lan1 address 192.168.100.1/24"
//! ```

use std::env;
use std::time::Duration;

use sirconf::task::{ConfigParams, SaveWhen, TaskContext, config};
use sirconf::{Driver, DriverBuilder, Platform, StreamTransport};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.lines.is_empty() {
        eprintln!("Nothing to push; pass configuration lines as arguments");
        std::process::exit(1);
    }

    let platform: Platform = args.platform.parse()?;
    println!("Connecting to {} (platform: {})...", args.host, platform);

    let stream = TcpStream::connect(&args.host).await?;
    let mut builder = DriverBuilder::new()
        .platform(platform)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(password) = &args.admin_password {
        builder = builder.become_password(password);
    }
    let mut driver = builder.build(StreamTransport::new(stream))?;
    driver.open().await?;

    let params = ConfigParams {
        lines: Some(args.lines.clone()),
        save_when: if args.save {
            SaveWhen::Changed
        } else {
            SaveWhen::Never
        },
        ..Default::default()
    };
    let context = TaskContext::new(&args.host).check_mode(args.check);
    let result = config::run(&mut driver, &params, &context).await?;

    println!("changed: {}", result.changed);
    for command in &result.commands {
        println!("  {}", command);
    }
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }

    driver.close().await?;
    Ok(())
}

struct Args {
    host: String,
    platform: String,
    admin_password: Option<String>,
    timeout: u64,
    check: bool,
    save: bool,
    lines: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost:23".to_string();
        let mut platform = "sir".to_string();
        let mut admin_password = env::var("SIRCONF_ADMIN_PASSWORD").ok();
        let mut timeout = 30u64;
        let mut check = false;
        let mut save = false;
        let mut lines = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--platform" => {
                    i += 1;
                    if i < args.len() {
                        platform = args[i].clone();
                    }
                }
                "--admin-password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        admin_password = Some(args[i].clone());
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--check" => check = true,
                "--save" => save = true,
                other => lines.push(other.to_string()),
            }
            i += 1;
        }

        Self {
            host,
            platform,
            admin_password,
            timeout,
            check,
            save,
            lines,
        }
    }
}
