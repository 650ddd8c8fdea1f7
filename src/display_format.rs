use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Options shared by every human-readable rendering of pieces, boards and games.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct DisplayFormat {
    /// Ideographs instead of doubled ASCII letters.
    pub chinese: bool,
    /// ANSI colors and highlighting.
    pub effects: bool,
    /// Single line output where supported.
    pub concise: bool,
}

const CHINESE: u8 = 1;
const EFFECTS: u8 = 2;

static DEFAULTS: AtomicU8 = AtomicU8::new(CHINESE | EFFECTS);

impl DisplayFormat {
    /// Full board for a terminal, using the process defaults.
    pub fn pretty() -> Self {
        let flags = DEFAULTS.load(Ordering::Relaxed);
        Self {
            chinese: flags & CHINESE != 0,
            effects: flags & EFFECTS != 0,
            concise: false,
        }
    }

    /// Plain text without escape codes, suitable for logs and protocol lines.
    pub fn string() -> Self {
        Self {
            effects: false,
            concise: true,
            ..Self::pretty()
        }
    }

    /// Letters only, ignoring the process defaults.
    pub fn plain() -> Self {
        Self {
            chinese: false,
            effects: false,
            concise: false,
        }
    }

    pub fn with_concise(&self, concise: bool) -> Self {
        Self { concise, ..*self }
    }

    pub fn with_chinese(&self, chinese: bool) -> Self {
        Self { chinese, ..*self }
    }

    pub fn with_effects(&self, effects: bool) -> Self {
        Self { effects, ..*self }
    }

    /// Changes what `pretty` and `string` use from now on, for every thread.
    pub fn set_defaults(chinese: bool, effects: bool) {
        let flags = if chinese { CHINESE } else { 0 } | if effects { EFFECTS } else { 0 };
        DEFAULTS.store(flags, Ordering::Relaxed);
    }
}

impl Default for DisplayFormat {
    fn default() -> Self {
        Self::pretty()
    }
}

impl FromStr for DisplayFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::pretty()),
            "string" => Ok(Self::string()),
            "plain" => Ok(Self::plain()),
            _ => Err(format!("unknown display format '{s}', expected pretty, string or plain")),
        }
    }
}
