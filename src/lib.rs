//! Navkit library exports for the binary and integration tests

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod core;
pub mod tui;

#[cfg(test)]
pub mod test_support;

/// Platform flavour used to pick default animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Ios,
    Md,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Ios => "ios",
            Mode::Md => "md",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Mode::Ios),
            "md" => Ok(Mode::Md),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
