use once_cell::sync::OnceCell;
use std::env;

/// Which shell grammar a command should be tokenized as.
///
/// `Unknown` matches any dialect when used as an allowlist entry's declared
/// dialect; it is never the *detected* dialect of a live process, only a
/// configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellDialect {
    Posix,
    Cmd,
    PowerShell,
    Unknown,
}

impl ShellDialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Posix => "posix",
            Self::Cmd => "cmd",
            Self::PowerShell => "powershell",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse_name(name: &str) -> Option<Self> {
        match name {
            "posix" => Some(Self::Posix),
            "cmd" => Some(Self::Cmd),
            "powershell" => Some(Self::PowerShell),
            "unknown" | "any" => Some(Self::Unknown),
            _ => None,
        }
    }
}

static DETECTED_DIALECT: OnceCell<ShellDialect> = OnceCell::new();

/// Detects the host's native shell dialect from environment variables.
///
/// A pure function of the environment, memoized for the process lifetime
/// so repeated calls don't redo the detection work.
pub fn detect_dialect() -> ShellDialect {
    *DETECTED_DIALECT.get_or_init(detect_dialect_uncached)
}

fn detect_dialect_uncached() -> ShellDialect {
    if env::var_os("PSModulePath").is_some() {
        return ShellDialect::PowerShell;
    }
    if env::var_os("SHELL").is_some() {
        return ShellDialect::Posix;
    }
    if env::var_os("COMSPEC").is_some() {
        return ShellDialect::Cmd;
    }
    if cfg!(windows) {
        ShellDialect::Cmd
    } else {
        ShellDialect::Posix
    }
}
