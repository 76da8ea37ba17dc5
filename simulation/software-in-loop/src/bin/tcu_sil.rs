use std::{env, process};

use shared::tcu_hal::SystemMode;
use software_in_loop::{run_scenario, scenario::Scenario};
use strum::IntoEnumIterator;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <scenario.json> [log.json]", args[0]);
        process::exit(2);
    }

    let scenario = match Scenario::load(&args[1]) {
        Ok(scenario) => scenario,
        Err(error) => {
            eprintln!("Failed to load scenario {}: {:?}", args[1], error);
            process::exit(1);
        }
    };

    let log = match run_scenario(&scenario) {
        Ok(log) => log,
        Err(error) => {
            eprintln!("Scenario '{}' failed: {:?}", scenario.name, error);
            process::exit(1);
        }
    };

    for mode in SystemMode::iter() {
        let steps = log.time_in_mode(mode);
        println!("{:?}: {:.3} s", mode, steps as f32 * log.dt);
    }

    match log.first_fault() {
        Some(frame) => println!("Fault latched at {:.3} s", frame.time_s),
        None => println!("No fault"),
    }

    if let Some(path) = args.get(2) {
        if let Err(error) = log.save(path) {
            eprintln!("Failed to save log to {}: {:?}", path, error);
            process::exit(1);
        }

        println!("Saved {} frames to {}", log.frames.len(), path);
    }
}
