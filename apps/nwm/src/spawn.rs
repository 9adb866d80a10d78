use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};

use nix::sys::signal::{signal, SigHandler, Signal};
use tracing::info;

/// Let init reap spawned programs so they never linger as zombies.
pub fn ignore_child_signals() -> nix::Result<()> {
    unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }?;
    Ok(())
}

/// Start `argv` detached in its own process group.
pub fn spawn(argv: &[String]) -> io::Result<Child> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    info!("Spawning: {} {:?}", program, args);
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .process_group(0)
        .spawn()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_rejected() {
        let err = spawn(&[]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_spawn_detaches() {
        let mut child = spawn(&["true".to_string()]).unwrap();
        assert!(child.wait().unwrap().success());
    }
}
