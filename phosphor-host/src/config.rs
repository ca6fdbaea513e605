//! TOML configuration loading
//!
//! ```toml
//! [display]
//! size = "40x2"
//! brightness = 2
//!
//! [display.wire]
//! WR = "STROBE"
//! PWR_ON = "PAPEROUT"
//!
//! [display.actions]
//! poweron = ["exec('beep')"]
//! poweroff = []
//! ```
//!
//! Signals missing from `[display.wire]` keep their default line.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use phosphor_core::config::{ConfigError, DisplayConfig, DisplaySize, Signal, WiringConfig};
use serde::Deserialize;

/// Configuration loading errors
#[derive(Debug)]
pub enum LoadError {
    /// Not valid TOML, or fields of the wrong type
    Toml(toml::de::Error),
    /// Values rejected by the display configuration
    Config(ConfigError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Toml(e) => write!(f, "invalid configuration: {}", e),
            LoadError::Config(ConfigError::MissingSize) => write!(f, "no 'display.size' entry"),
            LoadError::Config(ConfigError::UnknownSignal(signal)) => {
                write!(f, "signal {} wired to an unknown line", signal.name())
            }
            LoadError::Config(e) => write!(f, "bad display configuration: {:?}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Toml(e) => Some(e),
            LoadError::Config(_) => None,
        }
    }
}

impl From<toml::de::Error> for LoadError {
    fn from(e: toml::de::Error) -> Self {
        LoadError::Toml(e)
    }
}

impl From<ConfigError> for LoadError {
    fn from(e: ConfigError) -> Self {
        LoadError::Config(e)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFile {
    display: RawDisplay,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDisplay {
    #[serde(default)]
    size: String,
    #[serde(default)]
    brightness: u8,
    #[serde(default)]
    wire: RawWiring,
    #[serde(default)]
    actions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWiring {
    #[serde(rename = "WR")]
    wr: Option<String>,
    #[serde(rename = "SEL")]
    select: Option<String>,
    #[serde(rename = "TEST")]
    test: Option<String>,
    #[serde(rename = "PWR_5V")]
    power_5v: Option<String>,
    #[serde(rename = "BUSY")]
    busy: Option<String>,
    #[serde(rename = "PWR_ON")]
    power_on: Option<String>,
}

impl RawWiring {
    fn into_config(self) -> Result<WiringConfig, ConfigError> {
        let mut wiring = WiringConfig::default();
        let entries = [
            (Signal::Wr, self.wr),
            (Signal::Select, self.select),
            (Signal::Test, self.test),
            (Signal::Power5v, self.power_5v),
            (Signal::Busy, self.busy),
            (Signal::PowerOn, self.power_on),
        ];
        for (signal, line) in entries {
            if let Some(line) = line {
                debug!("wiring {} to {}", signal.name(), line);
                wiring.set(signal, &line)?;
            }
        }
        Ok(wiring)
    }
}

/// Parse a configuration document
pub fn load(source: &str) -> Result<DisplayConfig, LoadError> {
    let raw: RawFile = toml::from_str(source)?;
    let display = raw.display;

    let size: DisplaySize = display.size.trim().parse()?;
    let mut config = DisplayConfig::new(size);
    config.brightness = display.brightness;
    config.wiring = display.wire.into_config()?;

    for (name, expressions) in &display.actions {
        for expression in expressions {
            config.add_action(name, expression)?;
        }
    }

    info!(
        "display {}x{}, brightness {}, {} action(s)",
        size.cols,
        size.rows,
        config.brightness,
        config.actions.len()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let config = load(
            r#"
            [display]
            size = "40x2"
            brightness = 2

            [display.wire]
            WR = "AUTOFD"
            PWR_ON = "ACK"

            [display.actions]
            poweron = ["exec('beep')", "led(1)"]
            poweroff = ["led(0)"]
            "#,
        )
        .unwrap();

        assert_eq!(config.size, DisplaySize { cols: 40, rows: 2 });
        assert_eq!(config.brightness, 2);
        assert_eq!(config.wiring.line(Signal::Wr), "AUTOFD");
        assert_eq!(config.wiring.line(Signal::PowerOn), "ACK");
        // Untouched signals keep their defaults
        assert_eq!(config.wiring.line(Signal::Select), "SLCTIN");
        assert_eq!(config.actions.len(), 3);
    }

    #[test]
    fn test_minimal_document_uses_defaults() {
        let config = load("[display]\nsize = \"20x4\"\n").unwrap();
        assert_eq!(config.brightness, 0);
        assert_eq!(config.wiring, WiringConfig::default());
        assert!(config.actions.is_empty());
    }

    #[test]
    fn test_missing_size() {
        let err = load("[display]\nbrightness = 1\n").unwrap_err();
        assert!(matches!(err, LoadError::Config(ConfigError::MissingSize)));
        assert_eq!(err.to_string(), "no 'display.size' entry");
    }

    #[test]
    fn test_bad_size() {
        for size in ["40", "0x2", "axb", "40x2x1"] {
            let doc = format!("[display]\nsize = \"{}\"\n", size);
            assert!(
                matches!(load(&doc), Err(LoadError::Config(ConfigError::BadSize))),
                "{}",
                size
            );
        }
    }

    #[test]
    fn test_oversized_grid() {
        let err = load("[display]\nsize = \"40x8\"\n").unwrap_err();
        assert!(matches!(err, LoadError::Config(ConfigError::DisplayTooLarge)));
    }

    #[test]
    fn test_brightness_out_of_range_is_toml_error() {
        let err = load("[display]\nsize = \"20x2\"\nbrightness = 300\n").unwrap_err();
        assert!(matches!(err, LoadError::Toml(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unknown_signal_name_rejected() {
        let err = load("[display]\nsize = \"20x2\"\n[display.wire]\nCLK = \"STROBE\"\n")
            .unwrap_err();
        assert!(matches!(err, LoadError::Toml(_)));
    }

    #[test]
    fn test_overlong_line_name_rejected() {
        let err = load("[display]\nsize = \"20x2\"\n[display.wire]\nBUSY = \"NOT_A_REAL_LINE\"\n")
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Config(ConfigError::UnknownSignal(Signal::Busy))
        ));
        assert_eq!(err.to_string(), "signal BUSY wired to an unknown line");
    }
}
