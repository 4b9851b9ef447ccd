//! gen-runner: headless runner for the dynasty genealogy generator.
//!
//! Usage:
//!   gen-runner --seed 12345 --config ./config --names ./names --out roster.json
//!   gen-runner --seed 12345 --format script --out history.txt

use anyhow::Result;
use dynastygen_core::{
    config::SimConfig,
    engine::SimEngine,
    event::event_type_name,
    name_provider::{FileNameProvider, NameProvider, StaticNameProvider},
    progress::{ProgressMessage, ProgressSink},
    roster::Roster,
};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::sync::Arc;

/// Prints every progress notice as it arrives.
struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&mut self, message: ProgressMessage) {
        match message {
            ProgressMessage::Log(text) => println!("  {text}"),
            ProgressMessage::Warning(text) => println!("  warning: {text}"),
            ProgressMessage::Error(text) => eprintln!("  error: {text}"),
            ProgressMessage::Completed => println!("  completed"),
            ProgressMessage::Failed => eprintln!("  FAILED"),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let config_dir = str_arg(&args, "--config").unwrap_or("./config");
    let names_dir = str_arg(&args, "--names");
    let out_path = str_arg(&args, "--out");
    let format = str_arg(&args, "--format").unwrap_or("json");

    println!("dynastygen — gen-runner");
    println!("  seed:    {seed}");
    println!("  config:  {config_dir}");
    println!("  names:   {}", names_dir.unwrap_or("(placeholders)"));
    println!();

    let config = SimConfig::load(config_dir)?;
    let provider: Arc<dyn NameProvider> = match names_dir {
        Some(dir) => match FileNameProvider::load(Path::new(dir)) {
            Ok(loaded) => Arc::new(loaded),
            Err(e) => {
                log::warn!("Falling back to placeholder names: {e}");
                Arc::new(StaticNameProvider::new())
            }
        },
        None => Arc::new(StaticNameProvider::new()),
    };

    let run_id = format!("run-{seed}-{}", chrono::Utc::now().format("%Y%m%d%H%M%S"));
    let mut engine = SimEngine::build(run_id.clone(), seed, config, provider)?;
    let mut sink = StdoutSink;
    engine.seed(&mut sink)?;
    engine.run(&mut sink)?;

    let roster = Roster::from_registry(run_id.clone(), seed, engine.registry());
    print_summary(&engine, &roster);

    let rendered = match format {
        "script" => roster
            .characters
            .iter()
            .map(|c| c.script_block())
            .collect::<String>(),
        _ => serde_json::to_string_pretty(&roster)?,
    };
    match out_path {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("  roster written to {path}");
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn print_summary(engine: &SimEngine, roster: &Roster) {
    let mut tally: BTreeMap<&'static str, usize> = BTreeMap::new();
    for event in engine.event_log() {
        *tally.entry(event_type_name(event)).or_default() += 1;
    }
    let count = |name: &str| tally.get(name).copied().unwrap_or(0);

    let living = roster.characters.iter().filter(|c| c.death.is_none()).count();
    let bastards = roster.characters.iter().filter(|c| c.bastard).count();
    let extinct = roster.dynasties.iter().filter(|d| d.extinct).count();

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:      {}", roster.run_id);
    println!("  final year:  {}", engine.current_year());
    println!("  characters:  {}", roster.characters.len());
    println!("  living:      {living}");
    println!("  bastards:    {bastards}");
    println!("  births:      {}", count("character_born"));
    println!("  marriages:   {}", count("marriage_formed"));
    println!("  deaths:      {}", count("character_died"));
    println!("  dynasties:   {} ({extinct} extinct)", roster.dynasties.len());
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
