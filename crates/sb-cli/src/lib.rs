use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use sb_host::{machine_surface, CoreAdapter, MemoryRegionAdapter, EMU_GLOBAL};
use sb_machine::MachineCore;
use walkdir::WalkDir;

mod cli_args;
mod harness;

pub(crate) use cli_args::{Cli, Mode, RunArgs};
pub(crate) use harness::Harness;

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Mode::Run(args) => run_scripts(args),
        Mode::Map => print_memory_map(),
        Mode::Describe => print_machine_surface(),
    }
}

fn collect_scripts(args: &RunArgs) -> anyhow::Result<Vec<PathBuf>> {
    let mut scripts: Vec<PathBuf> = args.scripts.iter().map(PathBuf::from).collect();
    if let Some(dir) = &args.scripts_dir {
        let mut found = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry.with_context(|| format!("scanning {dir}"))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) == Some("rhai") {
                found.push(entry.path().to_path_buf());
            }
        }
        found.sort();
        scripts.extend(found);
    }
    if scripts.is_empty() {
        bail!("no scripts given; use --script or --scripts-dir");
    }
    Ok(scripts)
}

fn run_scripts(args: RunArgs) -> anyhow::Result<i32> {
    let mut harness = Harness::new();
    let scripts = collect_scripts(&args)?;

    let mut loaded = 0usize;
    for path in &scripts {
        match harness.registry.load_script(path) {
            Ok(()) => {
                loaded += 1;
                println!("loaded {}", path.display());
            }
            Err(error) => eprintln!("skipped {}: {error}", path.display()),
        }
    }
    if loaded == 0 {
        bail!("no engine accepted any of the given scripts");
    }

    for _ in 0..args.ticks {
        harness.machine.borrow_mut().run_frame();
        harness.registry.run();
    }

    if let Some(symbol) = &args.symbol {
        match harness.registry.lookup_symbol(symbol) {
            Some(value) => println!("{symbol} = {value:#x}"),
            None => println!("{symbol} is not defined by any loaded script"),
        }
    }

    println!(
        "ran {} tick(s); machine is at frame {}",
        args.ticks,
        harness.machine.borrow().frame_counter()
    );
    Ok(0)
}

fn print_memory_map() -> anyhow::Result<i32> {
    let harness = Harness::new();
    let context = &harness.context;

    let emu = context
        .borrow()
        .global(EMU_GLOBAL)
        .and_then(|value| value.as_object().cloned())
        .context("emu global should be attached")?;
    let inner = emu.borrow();
    let adapter = inner
        .as_any()
        .downcast_ref::<CoreAdapter>()
        .context("emu global should be a core adapter")?;

    println!("{:<8} {:>10} {:>10} {:>12}", "region", "start", "end", "bank window");
    for name in adapter.region_names() {
        let Some(weak) = adapter.region(&name) else {
            continue;
        };
        let Some(value) = context.borrow().access_weakref(weak) else {
            continue;
        };
        let Some(object) = value.as_object() else {
            continue;
        };
        let guard = object.borrow();
        let Some(region) = guard.as_any().downcast_ref::<MemoryRegionAdapter>() else {
            continue;
        };
        let block = region.block();
        let window = match block.segment_start {
            Some(segment_start) => format!("{segment_start:#010x}"),
            None => "-".to_string(),
        };
        println!(
            "{:<8} {:>#10x} {:>#10x} {:>12}",
            block.name, block.start, block.end, window
        );
    }
    Ok(0)
}

fn print_machine_surface() -> anyhow::Result<i32> {
    let harness = Harness::new();
    let platform = harness.machine.borrow().platform().to_string();
    println!("machine surface ({platform}):");
    for method in machine_surface().methods() {
        println!("  {:<44} {}", method.signature(), method.doc);
    }
    Ok(0)
}
