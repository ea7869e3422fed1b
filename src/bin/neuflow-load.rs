//! Thin bytecode loader: reads a file from argv, opens a driver session, resets the device, and
//! streams the file contents to it as raw bytes.
//!
//! Deliberately kept out of the library (spec.md scopes file I/O and argv parsing out of the
//! core): this binary is glue, not part of the driver's public contract.

use std::{env, fs, process::ExitCode};

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: neuflow-load <bytecode-file>");
        return ExitCode::FAILURE;
    };

    let iface = env::var("NEUFLOW_IFACE").ok();

    let bytecode = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("failed to read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(iface.as_deref(), &bytecode) {
        eprintln!("load failed: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(iface: Option<&str>, bytecode: &[u8]) -> neuflow_tbsp::Result<()> {
    let mut driver = neuflow_tbsp::Driver::open(iface, None, None)?;
    driver.reset()?;
    driver.send_bytes(bytecode)?;
    Ok(())
}
