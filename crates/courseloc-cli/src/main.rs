use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use courseloc_domain::ItemType;
use courseloc_schema::StaticSchemaIndex;
use courseloc_services::{ExportFormat, ExportOptions, ImportOptions};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "courseloc", version, about = "Localization toolkit for hierarchical course content")]
struct Cli {
    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate _id/_parentId integrity of one language tree
    CheckIds {
        #[arg(short, long)]
        root: PathBuf,
        #[arg(long)]
        lang: Option<String>,
    },

    /// Assign or strip dense tracking ids on items of one type
    Tracking {
        #[arg(short, long)]
        root: PathBuf,
        #[arg(long)]
        lang: Option<String>,
        /// Item type that receives the ids
        #[arg(long = "type")]
        item_type: Option<ItemType>,
        /// Strip tracking ids instead of assigning them
        #[arg(long, default_value_t = false)]
        remove: bool,
    },

    /// Duplicate a language tree under a new locale name, preserving ids
    CopyLang {
        #[arg(short, long)]
        root: PathBuf,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Fill schema defaults into every item of a language (gaps only)
    ApplyDefaults {
        #[arg(short, long)]
        root: PathBuf,
        #[arg(long)]
        lang: Option<String>,
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Extract translatable text and write interchange file(s)
    Export {
        #[arg(short, long)]
        root: PathBuf,
        /// Master language to extract from
        #[arg(long)]
        lang: Option<String>,
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// csv | json | xliff
        #[arg(long)]
        format: Option<ExportFormat>,
        /// Single-character delimiter for the csv format
        #[arg(long)]
        delimiter: Option<String>,
        /// Locale recorded as the XLIFF target language
        #[arg(long)]
        target_lang: Option<String>,
    },

    /// Merge translated interchange file(s) into a target language
    Import {
        #[arg(short, long)]
        root: PathBuf,
        /// Target language to merge into
        #[arg(long)]
        lang: Option<String>,
        /// Interchange file, or the directory holding it
        #[arg(long)]
        input: PathBuf,
        /// csv | json | xliff
        #[arg(long)]
        format: Option<ExportFormat>,
        #[arg(long)]
        delimiter: Option<String>,
        /// Overwrite values already translated in the target
        #[arg(long, default_value_t = false)]
        replace_existing: bool,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value_t = false)]
        backup: bool,
    },
}

fn parse_delimiter(raw: Option<&str>) -> Result<Option<u8>> {
    match raw {
        None => Ok(None),
        Some(s) if s.len() == 1 && s.is_ascii() => Ok(Some(s.as_bytes()[0])),
        Some(s) => Err(eyre!("delimiter must be a single ASCII character, got `{s}`")),
    }
}

fn load_schema(path: &Path) -> Result<StaticSchemaIndex> {
    if path.is_dir() {
        StaticSchemaIndex::load_dir(path)
    } else {
        StaticSchemaIndex::load_file(path)
    }
}

fn require<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| eyre!("missing --{flag} (not set on the command line or in courseloc.toml)"))
}

trait Runnable {
    fn run(self, use_color: bool) -> Result<()>;
}

impl Runnable for Commands {
    fn run(self, use_color: bool) -> Result<()> {
        let cmd_name = format!("{:?}", self);
        info!("starting command: {}", cmd_name);
        let cfg = courseloc_config::load_config()?;

        let result = match self {
            Commands::CheckIds { root, lang } => {
                let lang = require(lang.or(cfg.master_lang), "lang")?;
                debug!("check-ids: root={:?} lang={}", root, lang);
                let tree = courseloc_content::load_language_unchecked(&root, &lang)?;
                let violations = courseloc_content::check_ids(&tree);
                if violations.is_empty() {
                    println!("✔ no identifier violations in `{lang}`");
                } else {
                    for v in &violations {
                        let id = v.item_id.as_deref().unwrap_or("-");
                        if use_color {
                            use owo_colors::OwoColorize;
                            println!("✖ [{}] {}: {}", v.kind.red(), id.green(), v.message);
                        } else {
                            println!("[{}] {}: {}", v.kind, id, v.message);
                        }
                    }
                    return Err(eyre!("{} identifier violation(s) found", violations.len()));
                }
                Ok(())
            }

            Commands::Tracking { root, lang, item_type, remove } => {
                let lang = require(lang.or(cfg.master_lang), "lang")?;
                let ty = match item_type {
                    Some(ty) => ty,
                    None => cfg
                        .tracking_type
                        .as_deref()
                        .unwrap_or("block")
                        .parse()
                        .map_err(|e: String| eyre!(e))?,
                };
                debug!("tracking: root={:?} lang={} type={} remove={}", root, lang, ty, remove);
                let mut tree = courseloc_content::load_language(&root, &lang)?;
                if remove {
                    let n = courseloc_content::remove_tracking_ids(&mut tree);
                    courseloc_content::save_language(&root, &tree)?;
                    println!("✔ removed {n} tracking id(s)");
                } else {
                    let n = courseloc_content::add_tracking_ids(&mut tree, ty);
                    courseloc_content::save_language(&root, &tree)?;
                    println!("✔ assigned {n} tracking id(s) to `{ty}` items");
                }
                Ok(())
            }

            Commands::CopyLang { root, from, to } => {
                debug!("copy-lang: root={:?} {} -> {}", root, from, to);
                let tree = courseloc_content::load_language(&root, &from)?;
                let copy = courseloc_content::copy_language(&tree, &to);
                courseloc_content::save_language(&root, &copy)?;
                println!("✔ copied `{from}` to `{to}` ({} items)", copy.len());
                Ok(())
            }

            Commands::ApplyDefaults { root, lang, schema } => {
                let lang = require(lang.or(cfg.master_lang), "lang")?;
                let schema_path = require(
                    schema.or(cfg.schema.and_then(|s| s.path.map(PathBuf::from))),
                    "schema",
                )?;
                let index = load_schema(&schema_path)?;
                let mut tree = courseloc_content::load_language(&root, &lang)?;
                courseloc_schema::apply_defaults(&mut tree, &index);
                courseloc_content::save_language(&root, &tree)?;
                println!("✔ defaults applied to `{lang}`");
                Ok(())
            }

            Commands::Export { root, lang, schema, out_dir, format, delimiter, target_lang } => {
                let export_cfg = cfg.export.unwrap_or_default();
                let lang = require(lang.or(cfg.master_lang), "lang")?;
                let schema_path = require(
                    schema.or(cfg.schema.and_then(|s| s.path.map(PathBuf::from))),
                    "schema",
                )?;
                let out_dir = require(
                    out_dir.or(export_cfg.out_dir.map(PathBuf::from)),
                    "out-dir",
                )?;
                let format = match format {
                    Some(f) => f,
                    None => export_cfg
                        .format
                        .as_deref()
                        .unwrap_or("csv")
                        .parse()
                        .map_err(|e: String| eyre!(e))?,
                };
                let delimiter =
                    parse_delimiter(delimiter.as_deref().or(export_cfg.delimiter.as_deref()))?
                        .unwrap_or(b',');
                let target_lang = target_lang.or(cfg.target_lang).unwrap_or_default();
                debug!("export: root={:?} lang={} format={} out={:?}", root, lang, format, out_dir);

                let index = load_schema(&schema_path)?;
                let stats = courseloc_services::export_language(
                    &root,
                    &lang,
                    &index,
                    &out_dir,
                    &ExportOptions { format, delimiter, target_lang },
                )?;
                println!("✔ exported {} unit(s) to {} file(s)", stats.units, stats.files.len());
                for f in &stats.files {
                    println!("  {f}");
                }
                Ok(())
            }

            Commands::Import {
                root,
                lang,
                input,
                format,
                delimiter,
                replace_existing,
                dry_run,
                backup,
            } => {
                let import_cfg = cfg.import.unwrap_or_default();
                let lang = require(lang.or(cfg.target_lang), "lang")?;
                let format = match format {
                    Some(f) => f,
                    None => cfg
                        .export
                        .unwrap_or_default()
                        .format
                        .as_deref()
                        .unwrap_or("csv")
                        .parse()
                        .map_err(|e: String| eyre!(e))?,
                };
                let opts = ImportOptions {
                    format,
                    delimiter: parse_delimiter(delimiter.as_deref())?,
                    replace_existing: replace_existing
                        || import_cfg.replace_existing.unwrap_or(false),
                    dry_run,
                    backup: backup || import_cfg.backup.unwrap_or(false),
                };
                debug!("import: root={:?} lang={} input={:?} opts={:?}", root, lang, input, opts);

                let outcome = courseloc_services::import_language(&root, &lang, &input, &opts)?;
                let r = &outcome.report;
                if dry_run {
                    println!(
                        "DRY-RUN: would apply {} unit(s), skip {} existing, {} dangling",
                        r.applied, r.skipped_existing, r.dangling
                    );
                } else {
                    println!(
                        "✔ applied {} unit(s), skipped {} existing, {} dangling",
                        r.applied, r.skipped_existing, r.dangling
                    );
                }
                for w in &outcome.unit_warnings {
                    eprintln!("warning: {w}");
                }
                for w in &r.warnings {
                    debug!("merge warning [{}] {} {}: {}", w.kind, w.item_id, w.field_path, w.message);
                }
                Ok(())
            }
        };

        match &result {
            Ok(_) => info!("finished command: {}", cmd_name),
            Err(e) => error!("command {} failed: {:?}", cmd_name, e),
        }

        result
    }
}

fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "courseloc.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let _log_guard = init_tracing();

    let cli = Cli::parse();

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    cli.cmd.run(use_color)
}
