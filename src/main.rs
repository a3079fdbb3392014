use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use sdkbind::lexer::{HeaderScanner, ScanMode};
use sdkbind::{parse_and_transform, Generator, GeneratorConfig, HeaderParser};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sdkbind")]
#[command(version, about = "Generates Rust bindings from C SDK headers", long_about = None)]
struct Args {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Generate the bindings module for the configured headers
    Generate {
        /// JSON configuration file
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,
        /// Directory the headers are read from
        #[arg(long, value_name = "DIR")]
        include_dir: Option<PathBuf>,
        /// Generated Rust module
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
        /// Directory for per-file JSON dumps
        #[arg(long, value_name = "DIR")]
        dump_dir: Option<PathBuf>,
        /// Worker threads for per-file work
        #[arg(short, long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Print the declarations of one header as JSON
    Parse {
        /// Header file to parse
        #[arg(value_name = "HEADER")]
        header: PathBuf,
        /// Skip the transform passes
        #[arg(long)]
        raw: bool,
    },

    /// Print the token stream of one header
    Tokens {
        /// Header file to scan
        #[arg(value_name = "HEADER")]
        header: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_header(path: &Path) -> Result<(String, String)> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((filename, source))
}

/// `generate` flags layered over the configuration file
struct Overrides {
    include_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    dump_dir: Option<PathBuf>,
    jobs: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut GeneratorConfig) {
        if let Some(dir) = self.include_dir {
            config.include_dir = dir;
        }
        if let Some(out) = self.output {
            config.output = out;
        }
        if let Some(dir) = self.dump_dir {
            config.dump_dir = Some(dir);
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
    }
}

fn run(command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Generate {
            config,
            include_dir,
            output,
            dump_dir,
            jobs,
        } => {
            let mut config = match config {
                Some(path) => GeneratorConfig::load(&path)
                    .with_context(|| format!("invalid configuration {}", path.display()))?,
                None => GeneratorConfig::default(),
            };
            Overrides {
                include_dir,
                output,
                dump_dir,
                jobs,
            }
            .apply(&mut config);

            let report = Generator::new(config)
                .run()
                .map_err(|e| anyhow::anyhow!("{} failed: {}", e.stage(), e))?;
            writeln!(
                out,
                "Generated {} ({} declarations from {} files)",
                report.output.display(),
                report.declarations,
                report.files
            )?;
        }

        Command::Parse { header, raw } => {
            let (filename, source) = read_header(&header)?;
            let rules = GeneratorConfig::default().rules;
            let file = if raw {
                HeaderParser::new(&filename, &source, &rules).parse()
            } else {
                parse_and_transform(&filename, &source, &rules, false)
            }
            .map_err(|e| anyhow::anyhow!("{} failed: {}", e.stage(), e))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&file)?)?;
        }

        Command::Tokens { header } => {
            let (filename, source) = read_header(&header)?;
            let tokens = HeaderScanner::new(filename, &source)
                .scan_tokens(ScanMode::Tokens)
                .context("scan failed")?;
            for token in tokens {
                writeln!(
                    out,
                    "{:>5}:{:<4} {:<12} {}",
                    token.line,
                    token.column,
                    token.kind.to_string(),
                    token.lexeme
                )?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args.command, &mut std::io::stdout().lock())
}
