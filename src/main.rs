use anyhow::Context;
use clap::{Parser, Subcommand};
use kiln::{
    CalcCompleter, CalcEvaluator, Console, EditorInput, InputSpec, Kind, KilnConfig, Options,
};
use log::info;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "kiln")]
#[command(about = "An interactive calculator console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Run the given statements and exit
    #[arg(short = 'c', long)]
    command_string: Option<String>,

    /// Execute a script file
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Suppress the welcome banner
    #[arg(long)]
    no_banner: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize kiln configuration
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = KilnConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(Commands::Init { force }) = cli.command {
        config
            .init(force)
            .context("failed to initialize configuration")?;
        println!("configuration written to {}", KilnConfig::default_path().display());
        return Ok(());
    }

    info!("starting kiln v{}", kiln::VERSION);

    let kind = console_kind(&config);
    let mut options = Options::new()
        .processor(CalcCompleter)
        .rescue_errors(config.rescue_errors);
    if cli.no_banner || !config.banner {
        options = options.banner(false);
    }
    options = match (cli.command_string, cli.script) {
        (Some(statements), _) => options.input(statements).banner(false),
        (None, Some(path)) => options.input(InputSpec::File(path)).banner(false),
        (None, None) => {
            // Wire persistent history only when a real terminal is attached;
            // piped input goes through the plain stream path.
            let input = if std::io::stdin().is_terminal() {
                InputSpec::Method(Box::new(EditorInput::with_history(Some(
                    config.history_file.clone(),
                ))))
            } else {
                InputSpec::Stdin
            };
            options.input(input)
        }
    };

    let mut console = Console::new(kind, CalcEvaluator::default(), Options::new())
        .context("failed to build console")?;
    console.run(options).context("console run failed")?;
    Ok(())
}

fn console_kind(config: &KilnConfig) -> Rc<Kind<CalcEvaluator>> {
    let kind = Kind::derive("kiln", &Kind::base());
    kind.set_banner(&format!(">> kiln {} <<", kiln::VERSION));
    if let Some(text) = &config.banner_text {
        kind.set_banner(text);
    }
    if let Some(prompt) = &config.prompt {
        kind.set_prompt(prompt);
    }
    if let Some(prompt) = &config.continuation_prompt {
        kind.set_continuation_prompt(prompt);
    }

    kind.command("help", false, |console, _args| {
        let names = console.kind().command_names().join(", ");
        console.puts("Statements are calculator expressions; `let name = expr` assigns.");
        console.puts(&format!("Commands: {names}"));
        Ok(None)
    });

    kind.command("vars", false, |console, _args| {
        let mut lines = console.namespace().with_ref(|scope| {
            scope
                .names()
                .into_iter()
                .map(|name| {
                    let rendered = scope
                        .get(&name)
                        .map(|value| format!("{value:?}"))
                        .unwrap_or_default();
                    format!("  {name} = {rendered}")
                })
                .collect::<Vec<_>>()
        });
        if lines.is_empty() {
            console.puts("no variables defined");
        } else {
            lines.sort();
            for line in lines {
                console.puts(&line);
            }
        }
        Ok(None)
    });

    kind
}
