use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qerase_core::display::{human_size, short_path};
use qerase_core::lock::{is_locked, ProcessInspector};
use qerase_core::process::SystemInspector;
use qerase_core::{validate, BatchReport, BatchState, Engine, EngineConfig, EraseEvent, EraseRequest, Standard};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod logging;

const EXIT_FAILED: u8 = 1;
const EXIT_ITEM_ERRORS: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "qerase", version, about = "qerase v0.3.0: overwrite files, then delete them")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Overwrite and delete files and folders
    Erase {
        /// single, dod3, dod7-ece, vsitr or gutmann
        #[arg(long, default_value = "single")]
        standard: Standard,
        /// JSON engine config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        progress_interval_ms: Option<u64>,
        #[arg(long)]
        terminate_timeout_ms: Option<u64>,
        /// Never terminate processes holding a file
        #[arg(long, default_value_t = false)]
        no_kill: bool,
        /// Skip the rm -rf / rmdir /s fallback for folders
        #[arg(long, default_value_t = false)]
        no_fallback_command: bool,
        #[arg(long)]
        lang: Option<String>,
        /// One JSON object per event on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Do not ask for confirmation
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List the erasure standards
    Standards {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show whether a file is locked and which processes hold it
    Holders { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = logging::init_logging();
    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.cmd {
        Cmd::Erase {
            standard,
            config,
            chunk_size,
            progress_interval_ms,
            terminate_timeout_ms,
            no_kill,
            no_fallback_command,
            lang,
            json,
            yes,
            paths,
        } => {
            let mut cfg = match &config {
                Some(p) => EngineConfig::load(p)?,
                None => EngineConfig::default(),
            };
            if let Some(v) = chunk_size {
                cfg.chunk_size = v;
            }
            if let Some(v) = progress_interval_ms {
                cfg.progress_interval_ms = v;
            }
            if let Some(v) = terminate_timeout_ms {
                cfg.terminate_timeout_ms = v;
            }
            if no_kill {
                cfg.terminate_holders = false;
            }
            if no_fallback_command {
                cfg.fallback_command = false;
            }
            if let Some(l) = lang {
                cfg.language = l;
            }
            erase(cfg, standard, paths, json, yes)
        }
        Cmd::Standards { json } => {
            standards(json)?;
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Holders { path } => {
            holders(&path)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn erase(cfg: EngineConfig, standard: Standard, paths: Vec<PathBuf>, json: bool, yes: bool) -> Result<ExitCode> {
    let engine = Engine::new(cfg)?;
    let request = EraseRequest::new(paths, standard);

    if !yes && !confirm(&request)? {
        eprintln!("aborted, nothing was touched");
        return Ok(ExitCode::from(EXIT_FAILED));
    }

    let handle = engine.submit(request)?;
    let token = handle.cancel_token();
    ctrlc::set_handler(move || token.cancel()).context("installing Ctrl-C handler")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for ev in handle.events().iter() {
        if json {
            write_json(&mut out, &ev)?;
        } else {
            write_text(&mut out, &ev)?;
        }
    }
    let report = handle.wait()?;

    if json {
        let line = serde_json::json!({ "ts": timestamp(), "report": report });
        writeln!(out, "{line}")?;
    } else {
        write_summary(&mut out, &report)?;
    }
    out.flush()?;

    Ok(match report.state {
        BatchState::Finished if report.had_item_errors() => ExitCode::from(EXIT_ITEM_ERRORS),
        BatchState::Finished => ExitCode::SUCCESS,
        BatchState::Cancelled => ExitCode::from(EXIT_CANCELLED),
        _ => ExitCode::from(EXIT_FAILED),
    })
}

fn confirm(request: &EraseRequest) -> Result<bool> {
    let sizing = validate::measure(request.paths());
    let standard = request.standard();
    eprintln!(
        "About to erase {} path(s), {} of file data, with {} ({} passes).",
        request.paths().len(),
        human_size(sizing.bytes),
        standard.label(),
        standard.pass_count()
    );
    eprint!("This cannot be undone. Continue? [y/N] ");
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer).context("reading confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

fn write_json(out: &mut impl Write, ev: &EraseEvent) -> Result<()> {
    let mut v = serde_json::to_value(ev)?;
    if let Some(obj) = v.as_object_mut() {
        obj.insert("ts".into(), serde_json::Value::String(timestamp()));
    }
    writeln!(out, "{v}")?;
    Ok(())
}

fn write_text(out: &mut impl Write, ev: &EraseEvent) -> Result<()> {
    match ev {
        EraseEvent::Progress(p) => writeln!(out, "[{p:>3}%]")?,
        EraseEvent::Status(s) => writeln!(out, "{s}")?,
        EraseEvent::FolderCompleted(p) => writeln!(out, "removed {}", short_path(p))?,
        EraseEvent::Error(e) => eprintln!("error: {e}"),
        EraseEvent::Finished | EraseEvent::Cancelled => {}
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, r: &BatchReport) -> Result<()> {
    writeln!(
        out,
        "{:?}: {} file(s) erased, {} folder(s) removed, {} written, {} skipped, {} failed",
        r.state,
        r.files_destroyed,
        r.folders_removed,
        human_size(r.bytes_written),
        r.paths_skipped,
        r.files_failed + r.folders_failed
    )?;
    Ok(())
}

fn standards(json: bool) -> Result<()> {
    if json {
        let list: Vec<_> = Standard::ALL
            .iter()
            .map(|s| serde_json::json!({ "id": s.id(), "passes": s.pass_count(), "label": s.label() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }
    for s in Standard::ALL {
        println!("{:<10} {:>2}  {}", s.id(), s.pass_count(), s.label());
    }
    Ok(())
}

fn holders(path: &Path) -> Result<()> {
    std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    let locked = is_locked(path);
    println!("{}: {}", short_path(path), if locked { "locked" } else { "not locked" });
    let found = SystemInspector.list_holders(path);
    if found.is_empty() {
        println!("no holding processes found");
    }
    for h in found {
        println!("{:>8}  {}", h.pid, h.name);
    }
    Ok(())
}
