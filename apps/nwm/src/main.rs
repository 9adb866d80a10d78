mod core;
mod ewmh;
mod input;
mod spawn;
mod window;

use anyhow::Context as _;
use clap::Parser;
use nwm_config::Config;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::context::Context;
use crate::window::manager::WindowManager;

#[derive(Parser, Debug)]
#[command(about, long_about = None, disable_version_flag = true, disable_help_flag = true)]
struct Args {
    /// Print the version and exit
    #[arg(short = 'v')]
    version: bool,
}

/// Warn when no locale is configured; titles may then render badly.
fn check_locale() {
    let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()));
    match locale.as_deref() {
        None | Some("C") | Some("POSIX") => warn!("no locale support"),
        Some(_) => {}
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.version {
        println!("nwm-{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting nwm...");
    check_locale();
    let config = Config::load_or_default();
    spawn::ignore_child_signals().context("failed to ignore SIGCHLD")?;

    let ctx = Context::new(None).context("failed to connect to the X server")?;
    info!("Screen: {}, Root Window: {}", ctx.screen_num, ctx.root_window);
    if let Err(e) = ctx.become_wm() {
        error!("{}", e);
        return Err(e.into());
    }
    crate::ewmh::setup::setup_hints(&ctx)?;

    let mut wm = WindowManager::new(ctx, config);
    wm.scan_windows();
    let result = wm.run();
    wm.shutdown();
    if let Err(e) = &result {
        error!("Event loop stopped: {}", e);
    }
    result?;

    info!("nwm exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_version_flag_is_accepted() {
        assert!(Args::try_parse_from(["nwm", "-v"]).unwrap().version);
        assert!(!Args::try_parse_from(["nwm"]).unwrap().version);
        for arg in ["-h", "--help", "--version", "-x", "extra"] {
            assert!(Args::try_parse_from(["nwm", arg]).is_err(), "{arg} accepted");
        }
    }
}
