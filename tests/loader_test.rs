//! Integration tests for loading `gpib.conf` files end to end.

use gpib_conf::config::{parse, Entry, GpibConfig, Timeout};
use gpib_conf::error::{GpibConfError, Position};
use gpib_conf::{DeviceConfig, InterfaceConfig};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing_test::traced_test;

const BENCH_CONF: &str = include_str!("../config/gpib.conf");

fn write_conf(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_bench_configuration_loads() {
    let config: GpibConfig = BENCH_CONF.parse().unwrap();

    assert_eq!(
        config.interfaces,
        vec![InterfaceConfig {
            minor: 0,
            board_type: "ni_usb_b".to_string(),
            name: Some("violet".to_string()),
            pad: 0,
            sad: 0,
            timeout: Timeout::T30s,
            eos: 0x0a,
            set_reos: false,
            set_bin: false,
            set_xeos: false,
            set_eot: true,
            master: true,
        }]
    );
    assert_eq!(
        config.devices,
        vec![DeviceConfig {
            minor: 0,
            name: "sourcemeter".to_string(),
            pad: 24,
            sad: 0,
        }]
    );

    match config.find("sourcemeter") {
        Some(Entry::Device { board, .. }) => assert_eq!(board.name.as_deref(), Some("violet")),
        other => panic!("sourcemeter not associated with a board: {other:?}"),
    }
}

#[test]
fn test_device_without_matching_interface_is_rejected() {
    let text = BENCH_CONF.to_string()
        + r#"
device {
    minor = 1
    name = "dmm"
    pad = 22
    sad = 0
}
"#;
    // Syntactically fine, semantically dangling
    assert!(parse(&text).is_ok());
    let err = text.parse::<GpibConfig>().unwrap_err();
    assert!(matches!(
        err,
        GpibConfError::DanglingDevice { ref name, minor: 1 } if name == "dmm"
    ));
}

#[test]
fn test_round_trip_preserves_values() {
    let original: GpibConfig = BENCH_CONF.parse().unwrap();
    let written = original.to_string();
    let reparsed: GpibConfig = written.parse().unwrap();
    assert_eq!(reparsed, original);
    // Writing is stable once canonical
    assert_eq!(reparsed.to_string(), written);
}

#[test]
fn test_round_trip_of_non_default_settings() {
    let mut board = InterfaceConfig::new(3, "agilent_82357a", 30).with_name("bench \"B\"");
    board.sad = 126;
    board.timeout = Timeout::None;
    board.eos = 0xff;
    board.set_reos = true;
    board.set_bin = true;
    board.set_xeos = true;
    board.set_eot = false;
    board.master = false;
    let mut scope = DeviceConfig::new(3, "scope", 7);
    scope.sad = 96;
    let config = GpibConfig {
        interfaces: vec![board, InterfaceConfig::new(1, "ni_pci", 0)],
        devices: vec![scope, DeviceConfig::new(1, "dmm", 22)],
    };

    let reparsed: GpibConfig = config.to_string().parse().unwrap();
    assert_eq!(reparsed, config);
}

#[test]
fn test_round_trip_of_names_with_control_characters() {
    let config = GpibConfig {
        interfaces: vec![InterfaceConfig::new(0, "ni_pci", 0)],
        devices: vec![DeviceConfig::new(0, "two\nlines", 3)],
    };
    config.validate().unwrap();

    let reparsed = parse(&config.to_string()).unwrap();
    assert_eq!(reparsed, config);
    assert_eq!(reparsed.device("two\nlines").map(|d| d.pad), Some(3));
}

#[test]
fn test_round_trip_through_json() {
    let config: GpibConfig = BENCH_CONF.parse().unwrap();
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"timeout\":\"T30s\""));
    let back: GpibConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
#[traced_test]
fn test_load_from_file_logs_summary() {
    let file = write_conf(BENCH_CONF);
    let config = GpibConfig::load(file.path()).unwrap();
    assert_eq!(config.devices.len(), 1);
    assert!(logs_contain("Loaded GPIB configuration"));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = GpibConfig::load(dir.path().join("gpib.conf")).unwrap_err();
    assert!(matches!(err, GpibConfError::Io(_)));
}

#[test]
fn test_load_reports_syntax_position() {
    let file = write_conf("interface {\n  minor = 0\n  board_type = ni_usb_b\n  pad = 0\n}\n");
    let err = GpibConfig::load(file.path()).unwrap_err();
    assert_eq!(err.position(), Some(Position::new(3, 16)));
    assert!(err.to_string().contains("expected a quoted string"));
}

#[test]
fn test_out_of_range_addresses_are_rejected() {
    for (pad, sad) in [(31, 0), (0, 1), (0, 95), (0, 127)] {
        let text = format!(
            "interface {{ minor = 0 board_type = \"ni_pci\" pad = 0 }}\n\
             device {{ minor = 0 name = \"dev\" pad = {pad} sad = {sad} }}"
        );
        let err = text.parse::<GpibConfig>().unwrap_err();
        assert!(
            matches!(err, GpibConfError::AddressOutOfRange { .. }),
            "pad {pad} sad {sad}: {err}"
        );
    }
}

#[test]
fn test_duplicate_address_tuple_is_rejected() {
    let text = r#"
interface { minor = 0 board_type = "ni_pci" pad = 0 }
device { minor = 0 name = "a" pad = 5 sad = 100 }
device { minor = 0 name = "b" pad = 5 sad = 100 }
"#;
    let err = text.parse::<GpibConfig>().unwrap_err();
    assert!(matches!(
        err,
        GpibConfError::DuplicateAddress { minor: 0, pad: 5, sad: 100, .. }
    ));
}

#[test]
fn test_every_device_minor_has_an_interface() {
    let text = r#"
interface { minor = 0 board_type = "ni_pci" pad = 0 }
interface { minor = 2 board_type = "ni_usb_b" pad = 0 }
device { minor = 2 name = "a" pad = 1 }
device { minor = 0 name = "b" pad = 1 }
device { minor = 2 name = "c" pad = 2 }
"#;
    let config: GpibConfig = text.parse().unwrap();
    for device in &config.devices {
        assert!(config.interface(device.minor).is_some());
    }
    assert_eq!(config.devices_on(2).count(), 2);
}
