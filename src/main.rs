#![warn(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use dialoguer::{Input, Select};
use log::info;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use mips_pipeline::common::{format_word, parse_word};
use mips_pipeline::config::{
    SimConfig, DEFAULT_LOG_SPEC, DEFAULT_MAX_CYCLES, DEFAULT_MEMORY_SIZE, DEFAULT_RUN_DELAY_MS,
};
use mips_pipeline::memory::memory_system::WORD_BYTES;
use mips_pipeline::system::system::System;

const MEMORY_PAGE_WORDS: usize = 16;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct DriverArgs {
    /// Program to load at startup
    program: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE, help = "Data memory size in bytes")]
    memory_size: usize,
    #[arg(long, default_value_t = DEFAULT_MAX_CYCLES, help = "Cycle limit for a single run")]
    max_cycles: usize,
    #[arg(long, short, default_value_t = DEFAULT_RUN_DELAY_MS, help = "Milliseconds between cycles when running")]
    speed: u64,
    #[arg(long, default_value = DEFAULT_LOG_SPEC, help = "Log specification, overridden by RUST_LOG")]
    log: String,
}

impl From<&DriverArgs> for SimConfig {
    fn from(value: &DriverArgs) -> Self {
        SimConfig {
            memory_size: value.memory_size,
            max_cycles: value.max_cycles,
            run_delay: Duration::from_millis(value.speed),
            log_spec: value.log.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
enum MenuAction {
    #[strum(serialize = "Step one cycle")]
    Step,
    #[strum(serialize = "Run until halt (Ctrl-C stops)")]
    Run,
    #[strum(serialize = "Show pipeline")]
    ShowPipeline,
    #[strum(serialize = "Show registers")]
    ShowRegisters,
    #[strum(serialize = "Show memory")]
    ShowMemory,
    #[strum(serialize = "Show program")]
    ShowProgram,
    #[strum(serialize = "Edit register")]
    EditRegister,
    #[strum(serialize = "Edit memory word")]
    EditMemory,
    #[strum(serialize = "Load program")]
    Load,
    #[strum(serialize = "Save baseline")]
    Snapshot,
    #[strum(serialize = "Restore baseline")]
    Restore,
    #[strum(serialize = "Stop")]
    Stop,
    #[strum(serialize = "Reset")]
    Reset,
    Quit,
}

fn print_banner() {
    for word in ["MIPS", "Pipeline"] {
        let rendered = cfonts::render(cfonts::Options {
            text: String::from(word),
            font: cfonts::Fonts::FontBlock,
            colors: vec![cfonts::Colors::Yellow, cfonts::Colors::Blue],
            ..cfonts::Options::default()
        });
        print!("{}", rendered.text);
    }
}

fn load_file(system: &mut System, path: &Path) -> Result<()> {
    let path = path.canonicalize()?;
    info!("Loading program file {}", path.display());
    let source = std::fs::read_to_string(&path)?;
    system.load_source(&source);
    println!("Loaded {} lines from {}", system.program().len(), path.display());
    Ok(())
}

fn prompt_word(prompt: &str) -> Result<u32> {
    let text: String = Input::new().with_prompt(prompt).interact_text()?;
    parse_word(&text).ok_or_else(|| anyhow!("Invalid hex word: {text}"))
}

fn edit_register(system: &mut System) -> Result<()> {
    let num: usize = Input::new().with_prompt("Register number").interact_text()?;
    let data = prompt_word("Value (hex)")?;
    system.write_register(num, data);
    println!("${num:02}: {}", format_word(system.read_register(num)));
    Ok(())
}

fn edit_memory(system: &mut System) -> Result<()> {
    let address = prompt_word("Byte address (hex)")?;
    let data = prompt_word("Value (hex)")?;
    system.write_word(i64::from(address), data)?;
    Ok(())
}

fn show_memory(system: &System) -> Result<()> {
    let address = prompt_word("Start address (hex)")?;
    let start_word = usize::try_from(address)? / WORD_BYTES;
    for row in system.memory().rows(start_word, MEMORY_PAGE_WORDS) {
        println!("{row}");
    }
    Ok(())
}

async fn run(system: &mut System) {
    let handle = system.run_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });
    let delay = system.config().run_delay;
    let mode = system.run(delay).await;
    watcher.abort();
    println!("Run finished after {} cycles: {mode}", system.clock);
}

async fn handle_action(system: &mut System, action: MenuAction) -> Result<()> {
    match action {
        MenuAction::Step => match system.step_once() {
            Some(line) => println!("Cycle {}, last fetched line {line:04X}", system.clock),
            None => println!("Program halted"),
        },
        MenuAction::Run => run(system).await,
        MenuAction::ShowPipeline => println!("{system}"),
        MenuAction::ShowRegisters => {
            print!("{}", system.registers());
            println!("HI:  {}", format_word(system.hi()));
        }
        MenuAction::ShowMemory => show_memory(system)?,
        MenuAction::ShowProgram => {
            let current = system.current_line();
            for line in system.program().iter() {
                let marker = if Some(line.address) == current { ">" } else { " " };
                println!("{marker} {}: {}", line.address_label(), line.instruction);
            }
        }
        MenuAction::EditRegister => edit_register(system)?,
        MenuAction::EditMemory => edit_memory(system)?,
        MenuAction::Load => {
            let path: String = Input::new().with_prompt("Program path").interact_text()?;
            load_file(system, Path::new(&path))?;
        }
        MenuAction::Snapshot => system.snapshot(),
        MenuAction::Restore => system.restore(),
        MenuAction::Stop => system.stop(),
        MenuAction::Reset => system.reset(),
        MenuAction::Quit => {}
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = DriverArgs::parse();
    let _logger = flexi_logger::Logger::try_with_env_or_str(&args.log)?.start()?;

    let mut system = System::new(SimConfig::from(&args))?;
    print_banner();
    if let Some(path) = &args.program {
        load_file(&mut system, path)?;
    }

    let actions: Vec<MenuAction> = MenuAction::iter().collect();
    loop {
        let choice = Select::new()
            .with_prompt(format!("[{}] cycle {}", system.mode(), system.clock))
            .items(&actions)
            .default(0)
            .interact()?;
        let action = actions[choice];
        if action == MenuAction::Quit {
            break;
        }

        // a failed prompt or edit is reported without leaving the menu
        if let Err(e) = handle_action(&mut system, action).await {
            println!("Error: {e}");
        }
        for diagnostic in system.take_diagnostics() {
            println!("{diagnostic}");
        }
    }

    Ok(())
}
