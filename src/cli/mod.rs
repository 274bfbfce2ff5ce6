use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::engine::{Engine, EngineOptions};
use crate::exit::ExitCode;
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "macready",
    version,
    about = "macOSのApple Silicon移行準備を診断し、互換性の所見をレポートする（読み取り専用）"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,
    #[arg(long, global = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Scan(ScanArgs),
    Report(ReportArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[arg(long)]
    pub exclude: Vec<String>,
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long = "no-report-file")]
    pub no_report_file: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(long)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::platform::effective_home_dir()?;

    let env_config_path = std::env::var_os("MACREADY_CONFIG").map(std::path::PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Scan(args) => {
            let exclude = merge_excludes(&cfg.scan.exclude, args.exclude)?;
            let engine = Engine::new(EngineOptions {
                timeout: Duration::from_secs(cli.timeout),
                verbose: cli.verbose,
                test_mode: cli.test,
                exclude,
                show_progress: ui_cfg.stderr_is_tty && !cli.quiet && !cli.json,
            })?;

            let report = engine.scan()?;

            if cli.json {
                write_json(&report)?;
            } else {
                crate::ui::print_scan(&report, &ui_cfg);
            }

            if cfg.report.write_file && !args.no_report_file {
                let dir = args
                    .output
                    .unwrap_or_else(|| PathBuf::from(cfg.report.dir.clone()));
                let started_at = OffsetDateTime::parse(&report.generated_at, &Rfc3339)
                    .unwrap_or_else(|_| OffsetDateTime::now_utc());
                let markdown = crate::report::render_markdown(&report);
                let path = crate::report::write_report_file(&dir, started_at, &markdown)?;
                if !ui_cfg.quiet && !cli.json {
                    println!("レポート: {}", path.display());
                }
            }

            Ok(scan_exit_code(&report))
        }
        Commands::Report(args) => {
            let exclude = merge_excludes(&cfg.scan.exclude, args.exclude)?;
            let engine = Engine::new(EngineOptions {
                timeout: Duration::from_secs(cli.timeout),
                verbose: cli.verbose,
                test_mode: cli.test,
                exclude,
                show_progress: ui_cfg.stderr_is_tty && !cli.quiet && !cli.json,
            })?;

            let report = engine.scan()?;

            if cli.json {
                write_json(&report)?;
            } else {
                write_stdout(&crate::report::render_markdown(&report))?;
            }

            Ok(scan_exit_code(&report))
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "macready", &mut out);
            Ok(ExitCode::Success)
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    let stdout = std::io::stdout();
                    serde_json::to_writer_pretty(stdout.lock(), &cfg)?;
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: `macready config --show` を使用してください");
            }
            Ok(ExitCode::Success)
        }
    }
}

fn scan_exit_code(report: &crate::core::Report) -> ExitCode {
    if report.has_critical() {
        ExitCode::CriticalFindings
    } else {
        ExitCode::Success
    }
}

fn merge_excludes(from_config: &[String], from_args: Vec<String>) -> Result<Vec<String>> {
    let mut exclude = from_config.to_vec();
    exclude.extend(from_args);
    exclude.sort();
    exclude.dedup();
    crate::rules::build_exclude_set(&exclude).map_err(crate::exit::invalid_args_err)?;
    Ok(exclude)
}

fn write_json(report: &crate::core::Report) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(report)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn write_stdout(s: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(s.as_bytes()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "未対応のシェルです: {other}（bash|zsh|fish を指定してください）"
        ))),
    }
}
