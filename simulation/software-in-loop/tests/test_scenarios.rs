use shared::tcu_hal::{SystemMode, TcuDebugInfo};
use software_in_loop::{
    logging::{SilFrame, SilLog},
    run_scenario,
    scenario::Scenario,
};

fn run(json: &str) -> SilLog {
    let scenario = Scenario::from_json(json).unwrap();
    run_scenario(&scenario).unwrap()
}

fn frame_at(log: &SilLog, time_s: f32) -> &SilFrame {
    let index = (time_s / log.dt).round() as usize;
    &log.frames[index]
}

#[test]
fn drive_and_regen() {
    let log = run(include_str!("../../scenarios/drive_and_regen.json"));

    assert_eq!(log.frames.len(), 3000);
    assert!(log.first_fault().is_none());
    assert!(log.debug_info.is_empty());

    // Nothing pressed falls through to reverse with zero drive
    let idle = frame_at(&log, 0.25);
    assert_eq!(idle.mode, Some(SystemMode::Reverse));
    assert_eq!(idle.throttle_dac_code, 0);
    assert!(!idle.reverse_pin);

    let forward = frame_at(&log, 0.75);
    assert_eq!(forward.mode, Some(SystemMode::Forward));
    assert!((1070..=1080).contains(&forward.throttle_dac_code));
    assert_eq!(forward.regen_dac_code, 0);
    assert!(forward.reverse_pin);

    let full = frame_at(&log, 1.25);
    assert_eq!(full.throttle_dac_code, 4095);

    let regen = frame_at(&log, 1.75);
    assert_eq!(regen.mode, Some(SystemMode::Regen));
    assert_eq!(regen.throttle_dac_code, 0);
    assert!((990..=1030).contains(&regen.regen_dac_code));
    assert!(regen.reverse_pin);

    let reverse = frame_at(&log, 2.25);
    assert_eq!(reverse.mode, Some(SystemMode::Reverse));
    assert!((1070..=1080).contains(&reverse.throttle_dac_code));
    assert_eq!(reverse.regen_dac_code, 0);
    assert!(!reverse.reverse_pin);

    assert_eq!(frame_at(&log, 2.75).throttle_dac_code, 0);
    assert!(log.frames.iter().all(|frame| !frame.fault_led));
}

#[test]
fn never_drives_and_regens_together() {
    let log = run(include_str!("../../scenarios/drive_and_regen.json"));

    for frame in &log.frames {
        assert!(
            frame.throttle_dac_code == 0 || frame.regen_dac_code == 0,
            "{:?}",
            frame
        );
    }
}

#[test]
fn dual_input_latches_fault() {
    let log = run(include_str!("../../scenarios/dual_input_fault.json"));

    let fault = log.first_fault().unwrap();
    assert!((0.499..=0.502).contains(&fault.time_s), "fault at {}", fault.time_s);

    let before_fault: Vec<_> = log.frames.iter().filter(|frame| frame.time_s < 0.499).collect();
    assert!(before_fault.iter().all(|frame| frame.mode == Some(SystemMode::Forward)));
    assert!(before_fault.iter().all(|frame| !frame.fault_led));

    // Latched until power cycle, pedals released or not
    let after_fault: Vec<_> = log
        .frames
        .iter()
        .filter(|frame| frame.time_s >= 0.502)
        .collect();
    for frame in &after_fault {
        assert!(frame.fault_latched);
        assert_eq!(frame.mode, Some(SystemMode::Fault));
        assert_eq!(frame.throttle_dac_code, 0);
        assert_eq!(frame.regen_dac_code, 0);
        assert!(frame.reverse_pin);
    }

    let blink_window: Vec<bool> = log
        .frames
        .iter()
        .filter(|frame| frame.time_s >= 0.6 && frame.time_s < 1.6)
        .map(|frame| frame.fault_led)
        .collect();
    let toggles = blink_window
        .windows(2)
        .filter(|pair| pair[0] != pair[1])
        .count();
    assert!((3..=5).contains(&toggles), "toggled {} times", toggles);
}

#[test]
fn calibration_streams_readouts() {
    let log = run(include_str!("../../scenarios/calibration.json"));

    for frame in &log.frames {
        assert_eq!(frame.mode, None);
        assert_eq!(frame.throttle_dac_code, 0);
        assert_eq!(frame.regen_dac_code, 0);
    }

    assert!(
        (3..=4).contains(&log.debug_info.len()),
        "{} readouts",
        log.debug_info.len()
    );

    for debug_info in &log.debug_info {
        match debug_info {
            TcuDebugInfo::CalibrationReadout {
                forward_input,
                forward_output,
                reverse_output,
                regen_output,
                ..
            } => {
                assert!((forward_input - 266.0 / 1023.0).abs() < 1e-5);
                assert!((forward_output - 0.2624).abs() < 1e-3);
                assert_eq!(*reverse_output, 0.0);
                assert!((regen_output - 0.2467).abs() < 1e-3);
            }
            other => panic!("unexpected data point {:?}", other),
        }
    }
}

#[test]
fn noisy_runs_are_reproducible() {
    let json = include_str!("../../scenarios/noisy_pedals.json");
    let first = run(json);
    let second = run(json);

    assert_eq!(first, second);
    assert!(first.first_fault().is_none());
    assert!(first.time_in_mode(SystemMode::Forward) > 0);
    assert!(first.time_in_mode(SystemMode::Regen) > 0);
}

#[test]
fn log_survives_save_and_load() {
    let log = run(include_str!("../../scenarios/dual_input_fault.json"));
    let path = std::env::temp_dir().join("tcu_sil_dual_input_fault.json");

    log.save(&path).unwrap();
    let loaded = SilLog::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.scenario, log.scenario);
    assert_eq!(loaded.frames.len(), log.frames.len());
    assert_eq!(
        loaded.time_in_mode(SystemMode::Fault),
        log.time_in_mode(SystemMode::Fault)
    );
}
