//! GPIB bus configuration.
//!
//! A `gpib.conf` file declares one `interface` block per adapter board and any
//! number of `device` blocks, each addressing an instrument on the bus of the
//! board with the same `minor` number:
//!
//! ```text
//! interface {
//!     minor = 0
//!     board_type = "ni_usb_b"
//!     name = "violet"
//!     pad = 0
//!     sad = 0
//!     timeout = T30s
//!     eos = 0x0a
//!     set-reos = no
//!     set-bin = no
//!     set-xeos = no
//!     set-eot = yes
//!     master = yes
//! }
//!
//! device {
//!     minor = 0
//!     name = "sourcemeter"
//!     pad = 24
//!     sad = 0
//! }
//! ```
//!
//! # Example
//! ```no_run
//! use gpib_conf::config::GpibConfig;
//!
//! let config = GpibConfig::load("/etc/gpib.conf")?;
//! let meter = config.device("sourcemeter").expect("configured");
//! println!("sourcemeter at pad {}", meter.pad);
//! # Ok::<(), gpib_conf::error::GpibConfError>(())
//! ```

pub mod lexer;
pub mod parser;
pub mod timeout;
pub mod writer;

pub use parser::parse;
pub use timeout::Timeout;

use crate::error::{ConfResult, GpibConfError};
use crate::validation::{is_not_empty, is_valid_pad, is_valid_sad};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Default end-of-string byte (newline).
pub const DEFAULT_EOS: u8 = 0x0a;

/// Configuration of one GPIB adapter board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Index of the OS device node (`/dev/gpib<minor>`).
    pub minor: u32,
    /// Driver/board identifier, opaque to this crate.
    pub board_type: String,
    /// Optional lookup handle for the board.
    pub name: Option<String>,
    /// Primary address of the board itself.
    pub pad: u8,
    /// Secondary address of the board, 0 if disabled.
    pub sad: u8,
    /// Bus operation timeout.
    pub timeout: Timeout,
    /// End-of-string byte.
    pub eos: u8,
    /// Terminate reads on the EOS byte.
    pub set_reos: bool,
    /// Compare all eight bits of the EOS byte instead of seven.
    pub set_bin: bool,
    /// Assert EOI when the EOS byte is written.
    pub set_xeos: bool,
    /// Assert EOI with the last byte of every write.
    pub set_eot: bool,
    /// Board is the system controller.
    pub master: bool,
}

impl InterfaceConfig {
    /// Creates a board configuration with default bus settings.
    pub fn new(minor: u32, board_type: impl Into<String>, pad: u8) -> Self {
        Self {
            minor,
            board_type: board_type.into(),
            name: None,
            pad,
            sad: 0,
            timeout: Timeout::default(),
            eos: DEFAULT_EOS,
            set_reos: false,
            set_bin: false,
            set_xeos: false,
            set_eot: true,
            master: true,
        }
    }

    /// Sets the lookup name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Short description used in log and error messages.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("interface '{}' (minor {})", name, self.minor),
            None => format!("interface minor {}", self.minor),
        }
    }
}

/// Configuration of one instrument on a board's bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Minor number of the board the device is attached to.
    pub minor: u32,
    /// Lookup handle for the device.
    pub name: String,
    /// Primary address.
    pub pad: u8,
    /// Secondary address, 0 if disabled.
    pub sad: u8,
}

impl DeviceConfig {
    /// Creates a device without secondary addressing.
    pub fn new(minor: u32, name: impl Into<String>, pad: u8) -> Self {
        Self {
            minor,
            name: name.into(),
            pad,
            sad: 0,
        }
    }

    /// Short description used in log and error messages.
    pub fn label(&self) -> String {
        format!("device '{}'", self.name)
    }
}

/// Result of a name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    /// The name belongs to a board.
    Board(&'a InterfaceConfig),
    /// The name belongs to a device, shown with the board it hangs off.
    Device {
        /// The named device.
        device: &'a DeviceConfig,
        /// The board whose minor the device refers to.
        board: &'a InterfaceConfig,
    },
}

impl Entry<'_> {
    /// `(minor, pad, sad)` bus address of the entry.
    pub fn address(&self) -> (u32, u8, u8) {
        match self {
            Entry::Board(board) => (board.minor, board.pad, board.sad),
            Entry::Device { device, .. } => (device.minor, device.pad, device.sad),
        }
    }
}

/// A complete bus configuration: boards and devices in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpibConfig {
    /// Adapter boards
    pub interfaces: Vec<InterfaceConfig>,
    /// Instruments, each attached to a board by `minor`
    pub devices: Vec<DeviceConfig>,
}

impl GpibConfig {
    /// Reads, parses and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading GPIB configuration");
        let text = std::fs::read_to_string(path)?;
        let config: GpibConfig = text.parse()?;
        info!(
            path = %path.display(),
            interfaces = config.interfaces.len(),
            devices = config.devices.len(),
            "Loaded GPIB configuration"
        );
        Ok(config)
    }

    /// Checks the semantic rules a parsed configuration must satisfy.
    ///
    /// Records are checked in file order and the first violation is returned:
    /// per-record values, then unique board minors, then that every device
    /// hangs off a declared board, then unique bus addresses, then unique names.
    pub fn validate(&self) -> ConfResult<()> {
        for board in &self.interfaces {
            let owner = board.label();
            is_not_empty(&board.board_type).map_err(|_| GpibConfError::EmptyValue {
                field: "board_type",
                owner: owner.clone(),
            })?;
            if let Some(name) = &board.name {
                is_not_empty(name).map_err(|_| GpibConfError::EmptyValue {
                    field: "name",
                    owner: owner.clone(),
                })?;
            }
            check_address(board.pad, board.sad, &owner)?;
        }

        for device in &self.devices {
            let owner = device.label();
            is_not_empty(&device.name).map_err(|_| GpibConfError::EmptyValue {
                field: "name",
                owner: format!("device on minor {}", device.minor),
            })?;
            check_address(device.pad, device.sad, &owner)?;
        }

        let mut minors = HashSet::new();
        for board in &self.interfaces {
            if !minors.insert(board.minor) {
                return Err(GpibConfError::DuplicateMinor { minor: board.minor });
            }
        }

        for device in &self.devices {
            if !minors.contains(&device.minor) {
                return Err(GpibConfError::DanglingDevice {
                    name: device.name.clone(),
                    minor: device.minor,
                });
            }
        }

        let mut addresses: HashMap<(u32, u8, u8), String> = HashMap::new();
        let records = self
            .interfaces
            .iter()
            .map(|b| ((b.minor, b.pad, b.sad), b.label()))
            .chain(
                self.devices
                    .iter()
                    .map(|d| ((d.minor, d.pad, d.sad), d.label())),
            );
        for ((minor, pad, sad), label) in records {
            if let Some(first) = addresses.get(&(minor, pad, sad)) {
                return Err(GpibConfError::DuplicateAddress {
                    minor,
                    pad,
                    sad,
                    first: first.clone(),
                    second: label,
                });
            }
            addresses.insert((minor, pad, sad), label);
        }

        let mut names = HashSet::new();
        let all_names = self
            .interfaces
            .iter()
            .filter_map(|b| b.name.as_deref())
            .chain(self.devices.iter().map(|d| d.name.as_str()));
        for name in all_names {
            if !names.insert(name) {
                return Err(GpibConfError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Board with the given minor number.
    pub fn interface(&self, minor: u32) -> Option<&InterfaceConfig> {
        self.interfaces.iter().find(|b| b.minor == minor)
    }

    /// Board with the given name.
    pub fn interface_by_name(&self, name: &str) -> Option<&InterfaceConfig> {
        self.interfaces
            .iter()
            .find(|b| b.name.as_deref() == Some(name))
    }

    /// Device with the given name.
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Devices attached to the board with the given minor number.
    pub fn devices_on(&self, minor: u32) -> impl Iterator<Item = &DeviceConfig> {
        self.devices.iter().filter(move |d| d.minor == minor)
    }

    /// Resolves a name to a board or a device, the way `ibfind` does.
    pub fn find(&self, name: &str) -> Option<Entry<'_>> {
        if let Some(board) = self.interface_by_name(name) {
            return Some(Entry::Board(board));
        }
        let device = self.device(name)?;
        let board = self.interface(device.minor)?;
        Some(Entry::Device { device, board })
    }
}

fn check_address(pad: u8, sad: u8, owner: &str) -> ConfResult<()> {
    is_valid_pad(u32::from(pad)).map_err(|allowed| GpibConfError::AddressOutOfRange {
        field: "pad",
        value: u32::from(pad),
        owner: owner.to_string(),
        allowed,
    })?;
    is_valid_sad(u32::from(sad)).map_err(|allowed| GpibConfError::AddressOutOfRange {
        field: "sad",
        value: u32::from(sad),
        owner: owner.to_string(),
        allowed,
    })
}

impl FromStr for GpibConfig {
    type Err = GpibConfError;

    /// Parses and validates configuration text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config = parse(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench() -> GpibConfig {
        GpibConfig {
            interfaces: vec![InterfaceConfig::new(0, "ni_usb_b", 0).with_name("violet")],
            devices: vec![DeviceConfig::new(0, "sourcemeter", 24)],
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(bench().validate().is_ok());
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(GpibConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_pad_out_of_range() {
        let mut config = bench();
        config.devices[0].pad = 31;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            GpibConfError::AddressOutOfRange { field: "pad", value: 31, .. }
        ));
    }

    #[test]
    fn sad_must_be_zero_or_secondary_range() {
        let mut config = bench();
        for sad in [96, 100, 126] {
            config.devices[0].sad = sad;
            assert!(config.validate().is_ok(), "sad {sad} should be accepted");
        }
        for sad in [1, 95, 127, 255] {
            config.devices[0].sad = sad;
            assert!(config.validate().is_err(), "sad {sad} should be rejected");
        }
    }

    #[test]
    fn rejects_dangling_device() {
        let mut config = bench();
        config.devices.push(DeviceConfig::new(1, "dmm", 5));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, GpibConfError::DanglingDevice { minor: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_minor() {
        let mut config = bench();
        config.interfaces.push(InterfaceConfig::new(0, "agilent_82357a", 1));
        assert!(matches!(
            config.validate().unwrap_err(),
            GpibConfError::DuplicateMinor { minor: 0 }
        ));
    }

    #[test]
    fn rejects_device_on_board_address() {
        let mut config = bench();
        config.devices.push(DeviceConfig::new(0, "clash", 0));
        let err = config.validate().unwrap_err();
        match err {
            GpibConfError::DuplicateAddress { first, second, .. } => {
                assert_eq!(first, "interface 'violet' (minor 0)");
                assert_eq!(second, "device 'clash'");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn same_pad_on_different_boards_is_allowed() {
        let mut config = bench();
        config.interfaces.push(InterfaceConfig::new(1, "ni_pci", 0));
        config.devices.push(DeviceConfig::new(1, "scope", 24));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn same_pad_with_different_sad_is_allowed() {
        let mut config = bench();
        let mut second = DeviceConfig::new(0, "channel2", 24);
        second.sad = 96;
        config.devices.push(second);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut config = bench();
        config.devices.push(DeviceConfig::new(0, "violet", 5));
        assert!(matches!(
            config.validate().unwrap_err(),
            GpibConfError::DuplicateName { name } if name == "violet"
        ));
    }

    #[test]
    fn rejects_empty_board_type() {
        let mut config = bench();
        config.interfaces[0].board_type = "  ".into();
        assert!(matches!(
            config.validate().unwrap_err(),
            GpibConfError::EmptyValue { field: "board_type", .. }
        ));
    }

    #[test]
    fn find_resolves_boards_and_devices() {
        let config = bench();
        match config.find("violet") {
            Some(Entry::Board(board)) => assert_eq!(board.board_type, "ni_usb_b"),
            other => panic!("unexpected lookup result: {other:?}"),
        }
        match config.find("sourcemeter") {
            Some(entry @ Entry::Device { board, .. }) => {
                assert_eq!(board.minor, 0);
                assert_eq!(entry.address(), (0, 24, 0));
            }
            other => panic!("unexpected lookup result: {other:?}"),
        }
        assert!(config.find("nothing").is_none());
    }

    #[test]
    fn devices_on_filters_by_minor() {
        let mut config = bench();
        config.interfaces.push(InterfaceConfig::new(1, "ni_pci", 0));
        config.devices.push(DeviceConfig::new(1, "scope", 3));
        let names: Vec<_> = config.devices_on(1).map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["scope"]);
    }
}
