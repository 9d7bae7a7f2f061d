// Terminal progress output for anvil

use std::time::{Duration, Instant};

use colored::*;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use crate::observer::Observer;
use crate::os::OsInfo;
use crate::recipe::Recipe;

#[derive(Default)]
struct State {
    /// Nesting depth of open action brackets
    depth: usize,
    spinner: Option<ProgressBar>,
    started: Option<Instant>,
}

/// Observer that reports progress on the terminal.
///
/// Each command is echoed as `$ command` and its output is indented below
/// it. While a command runs on a TTY a spinner shows the elapsed time.
pub struct TerminalObserver {
    verbose: bool,
    quiet: bool,
    is_tty: bool,
    state: Mutex<State>,
}

impl TerminalObserver {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();

        // Respect NO_COLOR environment variable (https://no-color.org/)
        // Also disable colors if not a TTY
        if std::env::var("NO_COLOR").is_ok() || !is_tty {
            colored::control::set_override(false);
        }

        TerminalObserver {
            verbose,
            quiet,
            is_tty,
            state: Mutex::new(State::default()),
        }
    }

    fn indent(depth: usize) -> String {
        "  ".repeat(depth.saturating_sub(1))
    }

    fn spinner(&self, command: &str) -> Option<ProgressBar> {
        if !self.is_tty || self.quiet {
            return None;
        }

        let style = ProgressStyle::default_spinner()
            .template("    {spinner:.cyan} {msg} {elapsed:.dim}")
            .ok()?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

        let pb = ProgressBar::new_spinner();
        pb.set_style(style);
        pb.set_message(command.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Print above the spinner if one is running
    fn print_line(state: &State, line: String) {
        match state.spinner {
            Some(ref pb) => pb.println(line),
            None => println!("{}", line),
        }
    }
}

impl Observer for TerminalObserver {
    fn on_action_start(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.depth += 1;

        if !self.quiet {
            let prefix = Self::indent(state.depth);
            Self::print_line(
                &state,
                format!("{}{} Starting action...", prefix, "→".cyan().bold()),
            );
        }
        Ok(())
    }

    fn on_action_end(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        Ok(())
    }

    fn on_execution_start(&self, command: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock();

        if !self.quiet {
            let prefix = Self::indent(state.depth);
            Self::print_line(&state, format!("{}  {} {}", prefix, "$".dimmed(), command.bold()));
        }

        state.spinner = self.spinner(command);
        state.started = Some(Instant::now());
        Ok(())
    }

    fn on_execution_output(&self, chunk: &str) -> anyhow::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let state = self.state.lock();
        let prefix = Self::indent(state.depth);
        for line in chunk.lines() {
            Self::print_line(&state, format!("{}    {}", prefix, line.dimmed()));
        }
        Ok(())
    }

    fn on_execution_end(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();

        if let Some(pb) = state.spinner.take() {
            pb.finish_and_clear();
        }

        if let Some(started) = state.started.take() {
            if self.verbose && !self.quiet {
                let prefix = Self::indent(state.depth);
                println!(
                    "{}    {}",
                    prefix,
                    format!("finished in {:.2}s", started.elapsed().as_secs_f64()).dimmed()
                );
            }
        }
        Ok(())
    }
}

impl Drop for TerminalObserver {
    fn drop(&mut self) {
        if let Some(pb) = self.state.get_mut().spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Print the recipe table
pub fn print_recipes(recipes: &[&Recipe]) {
    println!("{}", "Available recipes:".bold());
    for recipe in recipes {
        println!("  {:<20} {}", recipe.name().cyan(), recipe.description());
    }
}

pub fn print_recipe_header(recipe: &Recipe) {
    println!(
        "{} Executing recipe: {}",
        "RECIPE".green().bold(),
        recipe.description()
    );
    println!("{} {}", "Actions:".dimmed(), recipe.actions().len());
    println!("{}", "─".repeat(60).dimmed());
}

pub fn print_os_info(info: &OsInfo) {
    let detected = info
        .detected
        .map(|d| format!("{} ({:?} family)", d, d.family()))
        .unwrap_or_else(|| "unsupported".to_string());

    println!("{:<14} {}", "OS:".bold(), info.pretty_name);
    println!("{:<14} {}", "ID:".bold(), info.id);
    if !info.id_like.is_empty() {
        println!("{:<14} {}", "ID_LIKE:".bold(), info.id_like.join(" "));
    }
    println!("{:<14} {}", "Version:".bold(), info.version);
    println!("{:<14} {}", "Detected:".bold(), detected.green());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str, hint: Option<&str>) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
    if let Some(hint) = hint {
        eprintln!("  {} {}", "hint:".yellow(), hint);
    }
}
