use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    SameWindow,
    NewWindow,
}

impl OpenMode {
    fn flag(self) -> &'static str {
        match self {
            Self::SameWindow => "--reuse-window",
            Self::NewWindow => "--new-window",
        }
    }
}

/// Builds the editor invocation. `editor_command` may carry extra arguments
/// (e.g. `"code-insiders --disable-extensions"`).
pub fn build_command(editor_command: &str, path: &Path, mode: OpenMode) -> io::Result<Command> {
    let mut parts = editor_command.split_whitespace();
    let program = parts.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "editor command is empty")
    })?;
    let mut command = Command::new(program);
    command.args(parts).arg(mode.flag()).arg(path);
    Ok(command)
}

/// Opens a project in the editor without waiting for it to exit.
pub fn open_project(editor_command: &str, path: &Path, mode: OpenMode) -> io::Result<()> {
    let mut command = build_command(editor_command, path, mode)?;
    tracing::info!(?mode, path = %path.display(), "opening project");
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_build_command_same_window() {
        let cmd = build_command("code", Path::new("/p/app"), OpenMode::SameWindow).unwrap();
        assert_eq!(cmd.get_program(), OsStr::new("code"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args, [OsStr::new("--reuse-window"), OsStr::new("/p/app")]);
    }

    #[test]
    fn test_build_command_keeps_extra_args() {
        let cmd = build_command("codium --verbose", Path::new("/p"), OpenMode::NewWindow).unwrap();
        assert_eq!(cmd.get_program(), OsStr::new("codium"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args, [OsStr::new("--verbose"), OsStr::new("--new-window"), OsStr::new("/p")]);
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(build_command("   ", Path::new("/p"), OpenMode::SameWindow).is_err());
    }
}
