//! CLI command implementations.

use std::fs;

use opvm_common::Program;
use opvm_vm::{validate, Exit, Machine, MachineConfig, Operation, Registry, RuntimeError};

/// Options accepted by `run`.
#[derive(Debug, Default)]
struct RunOptions {
    script: String,
    config: Option<String>,
    choices: Vec<usize>,
    max_steps: Option<u64>,
}

impl RunOptions {
    fn parse(args: &[String]) -> Result<Self, i32> {
        let mut options = RunOptions::default();
        let mut script = None;
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => options.config = Some(flag_value(&mut iter, "--config")?.clone()),
                "--choose" => {
                    let list = flag_value(&mut iter, "--choose")?;
                    options.choices = list
                        .split(',')
                        .map(|c| c.trim().parse::<usize>())
                        .collect::<Result<_, _>>()
                        .map_err(|_| {
                            eprintln!(
                                "error: --choose expects comma-separated indices, got '{list}'"
                            );
                            1
                        })?;
                }
                "--max-steps" => {
                    let value = flag_value(&mut iter, "--max-steps")?;
                    options.max_steps = Some(value.parse().map_err(|_| {
                        eprintln!("error: --max-steps expects a number, got '{value}'");
                        1
                    })?);
                }
                "-v" | "--verbose" => {}
                flag if flag.starts_with('-') => {
                    eprintln!("error: unknown option '{flag}'");
                    return Err(1);
                }
                path if script.is_none() => script = Some(path.to_string()),
                extra => {
                    eprintln!("error: unexpected argument '{extra}'");
                    return Err(1);
                }
            }
        }

        options.script = script.ok_or_else(|| {
            eprintln!("error: run requires a script file");
            eprintln!(
                "Usage: opvm run <script> [--config f.toml] [--choose 0,1] [--max-steps N] [-v]"
            );
            1
        })?;
        Ok(options)
    }
}

fn flag_value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a String, i32> {
    iter.next().ok_or_else(|| {
        eprintln!("error: {flag} requires a value");
        1
    })
}

/// Validate and execute a script.
pub fn run(args: &[String]) -> Result<(), i32> {
    let options = RunOptions::parse(args)?;
    let program = read_script(&options.script)?;
    let registry = builtins()?;

    let mut config = match &options.config {
        Some(path) => read_config(path)?,
        None => MachineConfig::default(),
    };
    if let Some(limit) = options.max_steps {
        config.max_steps = Some(limit);
    }

    let mut machine = Machine::with_config(config);
    for &choice in &options.choices {
        machine.queue_decision(choice);
    }

    match machine.run(&registry, &program) {
        Ok(Exit::Blocked) => {
            println!("{}", machine.store());
            match machine.pending_long_operation() {
                Some(name) => eprintln!("blocked: {name} needs a decision (pass --choose)"),
                None => eprintln!("blocked"),
            }
            Err(4)
        }
        Ok(exit) => {
            tracing::debug!(?exit, steps = machine.steps(), "finished");
            println!("{}", machine.store());
            Ok(())
        }
        Err(RuntimeError::Validation(errors)) => {
            for e in &errors {
                eprintln!("error: {e}");
            }
            Err(2)
        }
        Err(e) => {
            eprintln!("runtime error: {e}");
            Err(3)
        }
    }
}

/// Validate a script without running it.
pub fn check(args: &[String]) -> Result<(), i32> {
    let Some(input) = args.first() else {
        eprintln!("error: check requires a script file");
        eprintln!("Usage: opvm check <script>");
        return Err(1);
    };

    let program = read_script(input)?;
    let registry = builtins()?;

    match validate(&registry, &program) {
        Ok(()) => {
            println!("OK: {input} ({} instructions)", program.len());
            Ok(())
        }
        Err(errors) => {
            for e in &errors {
                eprintln!("error: {e}");
            }
            Err(2)
        }
    }
}

/// List the built-in operations with their operand shapes.
pub fn ops(_args: &[String]) -> Result<(), i32> {
    let registry = builtins()?;
    for (key, _, op) in registry.operations() {
        let shape = op
            .signature()
            .map(|signature| signature.to_string())
            .unwrap_or_else(|| "special".to_string());
        println!("{:<28} {shape}", registry.describe(&key));
    }
    Ok(())
}

fn read_script(path: &str) -> Result<Program, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read '{path}': {e}");
        1
    })?;
    let program = opvm_script::load(&text).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    tracing::debug!(path, instructions = program.len(), "loaded script");
    Ok(program)
}

fn read_config(path: &str) -> Result<MachineConfig, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read '{path}': {e}");
        1
    })?;
    MachineConfig::from_toml_str(&text).map_err(|e| {
        eprintln!("error: {path}: {e}");
        1
    })
}

fn builtins() -> Result<Registry, i32> {
    Registry::with_builtins().map_err(|e| {
        eprintln!("error: {e}");
        1
    })
}
