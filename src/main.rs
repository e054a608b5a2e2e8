//! Application entry point — Savora hands-free cooking assistant.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Initialise logging.
//! 3. Load [`AppConfig`] (returns default on first run) and apply overrides.
//! 4. Load the recipe.
//! 5. Build the instruction interpreter from config.
//! 6. Create the session inbox and the terminal speech adapters.
//! 7. Start the session and run its event loop until `/quit` or end of input.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use savora_cook::config::{AppConfig, AppPaths, InterpreterMode};
use savora_cook::interpreter;
use savora_cook::recipe::Recipe;
use savora_cook::session::{self, CookingSession, UserCommand};
use savora_cook::speech::{TerminalListener, TerminalSpeaker};

/// Savora - talk your way through a recipe
#[derive(Parser)]
#[command(name = "savora-cook", version, about)]
struct Cli {
    /// Recipe file (TOML or JSON); bare names are looked up in the recipes dir
    recipe: PathBuf,

    /// Settings file to use instead of the platform default
    #[arg(short, long, env = "SAVORA_CONFIG")]
    config: Option<PathBuf>,

    /// Use the offline keyword interpreter instead of the remote model
    #[arg(long)]
    offline: bool,

    /// Language tag sent to the interpreter (e.g. "fr-FR")
    #[arg(short, long, env = "SAVORA_LANGUAGE")]
    language: Option<String>,

    /// Disable auto-advance after an instruction is read
    #[arg(long)]
    no_auto_advance: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    fn apply_overrides(&self, config: &mut AppConfig) {
        if self.offline {
            config.interpreter.mode = InterpreterMode::Offline;
        }
        if let Some(language) = &self.language {
            config.session.language = language.clone();
        }
        if self.no_auto_advance {
            config.session.auto_advance = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();
    log::info!("Savora cooking assistant starting up");

    // Configuration
    let paths = AppPaths::new();
    let settings_file = cli.config.clone().unwrap_or_else(|| paths.settings_file.clone());
    let mut config = AppConfig::load_from(&settings_file).unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    cli.apply_overrides(&mut config);

    // Recipe
    let recipe_path = paths.resolve_recipe(&cli.recipe);
    let recipe = Recipe::load(&recipe_path)
        .with_context(|| format!("failed to load recipe {}", recipe_path.display()))?;
    log::info!(
        "Loaded {:?} ({} steps) from {}",
        recipe.title(),
        recipe.len(),
        recipe_path.display()
    );

    // Interpreter
    let interpreter = interpreter::from_config(&config.interpreter);

    // Session + terminal adapters
    let channel = session::channel();
    let input = TerminalListener::stdin(channel.handle());
    let output = TerminalSpeaker::new(channel.handle(), config.speech.clone());

    println!("Cooking {}. Type /help for commands.", recipe.title());

    let session = CookingSession::new(
        recipe,
        config.session.clone(),
        interpreter,
        Box::new(input),
        Box::new(output),
        channel,
    );
    session.handle().command(UserCommand::Start);
    session.run().await;

    log::info!("Goodbye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "savora-cook",
            "cookies.toml",
            "--offline",
            "--language",
            "fr-FR",
            "--no-auto-advance",
            "-vv",
        ]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(cli.recipe, PathBuf::from("cookies.toml"));
        assert_eq!(config.interpreter.mode, InterpreterMode::Offline);
        assert_eq!(config.session.language, "fr-FR");
        assert!(!config.session.auto_advance);
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["savora-cook", "cookies.toml"]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.interpreter.mode, InterpreterMode::Api);
        assert!(config.session.auto_advance);
        assert_eq!(cli.log_filter(), "info");
    }
}
