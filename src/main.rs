use clap::{Parser, Subcommand};
use reg_gen::{compile, Automaton, Generator, GeneratorConfig, LengthPolicy};
use std::path::PathBuf;

/// Random string generator for regular expressions
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The pattern to generate words from
    #[arg(help = "Regular expression to generate words from")]
    pattern: Option<String>,

    /// Generate from an automaton previously written by `dump`
    #[arg(long, value_name = "FILE", conflicts_with = "pattern")]
    automaton: Option<PathBuf>,

    /// Length of each generated word
    #[arg(short, long, default_value = "8")]
    length: usize,

    /// Seed for reproducible output; word `i` uses `seed + i`
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of words to generate
    #[arg(short = 'n', long, default_value = "1")]
    count: usize,

    /// Fall back to the nearest feasible length instead of failing
    #[arg(long)]
    closest: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a pattern and print its automaton as JSON
    Dump {
        #[arg(help = "Regular expression to compile")]
        pattern: String,

        /// Output file path
        #[arg(help = "Output file path (stdout when omitted)")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(Commands::Dump { pattern, output }) = cli.command {
        let automaton = compile(&pattern)?;
        match output {
            Some(path) => {
                automaton.save(&path)?;
                println!("Wrote automaton for {:?} to {}", pattern, path.display());
            }
            None => println!("{}", automaton.to_json()?),
        }
        return Ok(());
    }

    let loaded;
    let generator_config = GeneratorConfig {
        length_policy: if cli.closest {
            LengthPolicy::Closest
        } else {
            LengthPolicy::Exact
        },
        ..GeneratorConfig::default()
    };
    let generator = match (&cli.pattern, &cli.automaton) {
        (_, Some(path)) => {
            loaded = Automaton::load(path)?;
            Generator::with_config(&loaded, generator_config)?
        }
        (Some(pattern), None) => Generator::with_config(pattern, generator_config)?,
        (None, None) => return Err("A pattern or --automaton file is required".into()),
    };

    for i in 0..cli.count {
        let seed = cli.seed.map(|seed| seed.wrapping_add(i as u64));
        let word = generator.generate(cli.length, seed)?;
        println!("{}", word.text);
    }

    Ok(())
}
