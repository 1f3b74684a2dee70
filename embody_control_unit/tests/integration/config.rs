//! Integration test: board configuration files → controller bank.

use std::io::Write;
use std::path::Path;

use embody_common::config::ConfigError;
use embody_common::control_unit::state::{BoardProfile, ControlMode};
use embody_control_unit::config::load_board_config;
use embody_control_unit::state::bank::ControllerBank;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn validation_error(content: &str) -> String {
    let file = write_config(content);
    match load_board_config(file.path()) {
        Err(ConfigError::ValidationError(msg)) => msg,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn shipped_example_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/board.toml");
    let loaded = load_board_config(&path).unwrap();
    assert_eq!(loaded.board.profile, BoardProfile::TorqueSensing);
    assert_eq!(loaded.joint_count(), 4);

    let bank = ControllerBank::with_linear_profile(&loaded.board).unwrap();
    assert_eq!(bank.joint_count(), 4);
    let shoulder = bank.joint(0).unwrap();
    assert_eq!(shoulder.gains.position.output_limit, 1333);
    assert_eq!(shoulder.setpoint.max_velocity, 1280);
    assert_eq!(bank.joint(3).unwrap().params.hard_stop_ticks, 80);
    assert!(bank.statuses().all(|s| s.mode == ControlMode::Idle));
}

#[test]
fn joints_are_ordered_by_id() {
    let file = write_config(
        r#"
[[joints]]
id = 2
name = "c"
max_position = 300

[[joints]]
id = 0
name = "a"
max_position = 100

[[joints]]
id = 1
name = "b"
max_position = 200
"#,
    );
    let loaded = load_board_config(file.path()).unwrap();
    let bank = ControllerBank::with_linear_profile(&loaded.board).unwrap();
    for (j, max) in [100, 200, 300].into_iter().enumerate() {
        assert_eq!(bank.joint(j).unwrap().setpoint.max_position, max);
    }
}

#[test]
fn invalid_configs_are_rejected() {
    let msg = validation_error("[[joints]]\nid = 0\nmin_position = 10\nmax_position = 10\n");
    assert!(msg.contains("joint 0"), "{msg}");

    let msg = validation_error("[[joints]]\nid = 0\n[joints.position]\nkr = 16\n");
    assert!(msg.contains("kr"), "{msg}");

    let msg = validation_error("[[joints]]\nid = 0\nvel_shift = 16\n");
    assert!(msg.contains("vel_shift"), "{msg}");

    let msg = validation_error("[[joints]]\nid = 1\n");
    assert!(msg.contains("joint id"), "{msg}");

    let msg = validation_error("cycle_time_us = 50\n[[joints]]\nid = 0\n");
    assert!(msg.contains("cycle_time_us"), "{msg}");

    let msg = validation_error(
        r#"
profile = "ShoulderTorque"
[decoupling]
joints = [0, 0]
matrix = [[1, 0], [0, 1]]
[[joints]]
id = 0
strain_channel = 0
"#,
    );
    assert!(msg.contains("decoupling"), "{msg}");
}

#[test]
fn missing_file_is_reported() {
    assert!(matches!(
        load_board_config(Path::new("/definitely/not/here.toml")),
        Err(ConfigError::FileNotFound)
    ));
}
