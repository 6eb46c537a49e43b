// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host-side model inspector.
//!
//! Runs the full device load sequence against a `.tflite` file on the host
//! platform with the configured memory budgets, then prints the operators
//! the model needs, the registry contents and the memory report. Exits 1 if
//! the model would fail to load on the device.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use meter_reader::config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    validate_config, ConfigError, MeterReaderConfig,
};
use meter_reader::hal::{HostPlatform, Platform};
use meter_reader::observability::{debug_flags_help, init_logging, parse_debug_flags};
use meter_reader::runtime::{
    survey_operators, MeterReader, ModelBlob, OpResolver, ParsedModel, DEFAULT_RESOLVER_CAPACITY,
};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: inspect_model [<model.tflite>] [--config <path>] [--arena-size <bytes>]\n\
         \x20                    [--placement heap|internal|prefer-internal] [--log-level <level>]\n\
         \x20                    [--debug-all | --debug-<crate>]\n\n\
         The model path defaults to model.path from meter_reader.toml.\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

struct Args {
    config: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

fn parse_args() -> Args {
    let mut config = None;
    let mut overrides = HashMap::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let key = match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                config = Some(PathBuf::from(v));
                continue;
            }
            "--arena-size" => "arena_size",
            "--placement" => "arena_placement",
            "--log-level" => "log_level",
            "-h" | "--help" => usage_and_exit(),
            // Consumed by parse_debug_flags
            other if other.starts_with("--debug-") => continue,
            other if other.starts_with('-') => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
            path => {
                overrides.insert("model_path".to_string(), path.to_string());
                continue;
            }
        };
        let v = args.next().unwrap_or_else(|| usage_and_exit());
        overrides.insert(key.to_string(), v);
    }

    Args { config, overrides }
}

fn resolve_config(args: &Args) -> Result<MeterReaderConfig> {
    if let Some(path) = &args.config {
        return load_config(Some(path), Some(&args.overrides))
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    match find_config_file() {
        Ok(path) => load_config(Some(&path), Some(&args.overrides))
            .with_context(|| format!("Failed to load config {}", path.display())),
        Err(ConfigError::FileNotFound(_)) => {
            let mut config = MeterReaderConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &args.overrides);
            Ok(config)
        }
        Err(e) => Err(e).context("Failed to locate config file"),
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = resolve_config(&args)?;
    validate_config(&config)?;

    init_logging(&parse_debug_flags(), &config.logging.level)?;

    let model = fs::read(&config.model.path)
        .with_context(|| format!("Failed to read model {}", config.model.path.display()))?;
    let arena = config.arena_config()?;

    // Best-effort listing; setup below reports the authoritative outcome
    if let Ok(parsed) = ParsedModel::validate(ModelBlob::new(&model)) {
        println!(
            "Model: {} ({} bytes, schema v{})",
            config.model.path.display(),
            model.len(),
            parsed.version()
        );
        if let Some(description) = parsed.description() {
            println!("  Description: {}", description);
        }
        if let Ok(ops) = survey_operators(&parsed) {
            println!("Required operators ({} invocations):", ops.len());
            for op in ops {
                println!("  - {} ({})", op, op.code());
            }
        }
    }

    let platform = HostPlatform::with_budgets(config.host.heap_bytes, config.host.internal_bytes);
    let mut resolver = OpResolver::<DEFAULT_RESOLVER_CAPACITY>::new();
    let mut reader = MeterReader::new(ModelBlob::new(&model), arena, platform);

    if let Err(err) = reader.setup(&mut resolver) {
        tracing::error!("Model would fail to load on the device: {}", err);
        eprintln!("FAILED [{:?}]: {}", err.kind(), err);
        process::exit(1);
    }

    if let Some(interpreter) = reader.interpreter() {
        let resolver = interpreter.resolver();
        println!("Registered kernels ({}/{}):", resolver.len(), resolver.capacity());
        for registration in resolver.iter() {
            println!("  - {} [{}]", registration.op, registration.kernel.as_str());
        }
        println!(
            "Tensors: {} ({} in arena)",
            interpreter.tensor_count(),
            interpreter.plan().allocations.len()
        );
        println!("Arena region: {}", interpreter.arena().region());
    }

    if let Some(report) = reader.memory_report() {
        println!("Memory on {}:", reader.platform().name());
        println!("  Requested arena: {} B", report.requested);
        println!("  Allocated arena: {} B", report.actual);
        println!("  Used arena:      {} B", report.arena_used);
        println!("  Free heap:       {} B", report.free_heap);
        match report.ratio() {
            Some(ratio) => println!("  Arena/model:     {:.1}x", ratio),
            None => println!("  Arena/model:     n/a"),
        }
    }

    Ok(())
}
