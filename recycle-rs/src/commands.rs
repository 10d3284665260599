//! Subcommands and their dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Subcommand;
use recycle_core::prelude::*;
use recycle_core::SweepHandle;

use crate::{output, prompt};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Move files or directories into the recycle bin.
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List recycled items.
    List {
        /// name, date, size or none.
        #[arg(long, default_value = "none")]
        sort: SortKey,
        #[arg(long)]
        reverse: bool,
        /// Show every stored field.
        #[arg(long)]
        detailed: bool,
    },
    /// Restore an item by id or by part of its name.
    Restore {
        selector: String,
        /// overwrite, rename or cancel; asked interactively when omitted.
        #[arg(long)]
        on_conflict: Option<ConflictChoice>,
    },
    /// Find items by name and deletion date.
    Search {
        name: Option<String>,
        /// Inclusive, YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS".
        #[arg(long)]
        date_from: Option<String>,
        #[arg(long)]
        date_to: Option<String>,
        #[arg(long)]
        detailed: bool,
    },
    /// Permanently delete items after confirmation.
    Empty {
        #[arg(long, conflicts_with = "pattern")]
        id: Option<String>,
        /// Case-insensitive match against any stored field.
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Show the start of a recycled file.
    Preview { id: String },
    /// Usage statistics.
    Stats,
    /// Remove items older than the retention period.
    Cleanup {
        #[arg(long)]
        dry_run: bool,
    },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Report payloads without records and records without payloads.
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Show,
    /// Set MAX_SIZE_MB or RETENTION_DAYS.
    Set { key: String, value: String },
}

struct Env {
    config: Config,
    fs: Arc<dyn FileSystem>,
}

impl Env {
    fn open() -> anyhow::Result<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let paths = TrashPaths::from_env()?;
        let config = Config::load(fs.as_ref(), paths)?;
        LifecycleEngine::new(config.clone(), fs.clone())
            .init()
            .with_context(|| format!("cannot initialize {}", config.paths.root.display()))?;
        tracing::debug!(root = %config.paths.root.display(), "recycle bin ready");
        Ok(Self { config, fs })
    }

    fn engine(&self) -> LifecycleEngine {
        LifecycleEngine::new(self.config.clone(), self.fs.clone())
    }

    fn queries(&self) -> QueryEngine {
        QueryEngine::new(self.config.clone(), self.fs.clone())
    }
}

impl Command {
    pub fn run(self) -> anyhow::Result<ExitStatusLike> {
        let env = Env::open()?;
        match self {
            Self::Delete { paths } => delete(&env, &paths),
            Self::List {
                sort,
                reverse,
                detailed,
            } => {
                match env.queries().list(sort, reverse)? {
                    ListResult::Empty => println!("The recycle bin is empty."),
                    ListResult::Items(listing) => print!("{}", output::listing(&listing, detailed)),
                }
                Ok(ExitStatusLike::Ok)
            }
            Self::Restore {
                selector,
                on_conflict,
            } => restore(&env, &selector, on_conflict),
            Self::Search {
                name,
                date_from,
                date_to,
                detailed,
            } => {
                let criteria = SearchCriteria {
                    name,
                    date_from,
                    date_to,
                };
                match env.queries().search(&criteria)? {
                    SearchResult::NoCriteria => bail!(CoreError::missing("search needs a name, --date-from or --date-to")),
                    SearchResult::NoMatches(miss) => println!("{}", output::search_miss(miss)),
                    SearchResult::Matches(found) => {
                        print!("{}", output::records(&found, detailed));
                        println!("{} match(es)", found.len());
                    }
                }
                Ok(ExitStatusLike::Ok)
            }
            Self::Empty { id, pattern } => {
                let scope = match (id, pattern) {
                    (Some(id), _) => PurgeScope::Id(id),
                    (None, Some(pattern)) => PurgeScope::Pattern(pattern),
                    (None, None) => PurgeScope::All,
                };
                empty(&env, &scope)
            }
            Self::Preview { id } => {
                print!("{}", output::preview(&env.queries().preview(&id)?));
                Ok(ExitStatusLike::Ok)
            }
            Self::Stats => {
                print!("{}", output::statistics(&env.queries().statistics()?));
                Ok(ExitStatusLike::Ok)
            }
            Self::Cleanup { dry_run } => {
                print!("{}", output::sweep(&env.engine().sweep(dry_run)?));
                Ok(ExitStatusLike::Ok)
            }
            Self::Config { action } => configure(env, action),
            Self::Doctor => {
                let report = env.queries().check_consistency()?;
                print!("{}", output::consistency(&report));
                Ok(if report.is_clean() {
                    ExitStatusLike::Ok
                } else {
                    ExitStatusLike::Error
                })
            }
        }
    }
}

fn delete(env: &Env, paths: &[PathBuf]) -> anyhow::Result<ExitStatusLike> {
    let (report, sweep) = env.engine().delete_and_sweep(paths);
    print!("{}", output::delete_report(&report));
    finish_sweep(sweep);

    if report.trashed().next().is_none() && report.skipped_count() > 0 {
        return Ok(ExitStatusLike::Error);
    }
    Ok(ExitStatusLike::Ok)
}

fn finish_sweep(handle: SweepHandle) {
    match handle.wait() {
        Some(Ok(report)) => {
            if let Some(summary) = report.summary.filter(|s| s.count > 0) {
                tracing::info!(
                    count = summary.count,
                    bytes = summary.bytes_freed,
                    cutoff = %report.cutoff,
                    "expired items removed"
                );
            }
        }
        Some(Err(err)) => tracing::warn!(error = %err, "retention sweep failed"),
        None => tracing::warn!("retention sweep ended without a result"),
    }
}

fn restore(env: &Env, selector: &str, on_conflict: Option<ConflictChoice>) -> anyhow::Result<ExitStatusLike> {
    let engine = env.engine();
    let record = match engine.find_restore_candidates(selector)? {
        RestoreMatch::Single(record) => record,
        RestoreMatch::Ambiguous(candidates) => {
            println!("Several items match '{selector}':");
            print!("{}", output::choices(&candidates));
            let answer = prompt::ask("Number to restore (anything else cancels): ")?;
            match prompt::pick(&answer, candidates.len()) {
                Some(index) => candidates[index].clone(),
                None => {
                    println!("Restore cancelled.");
                    return Ok(ExitStatusLike::Ok);
                }
            }
        }
    };

    let outcome = match engine.restore(&record.id, on_conflict) {
        Err(CoreError::Conflict(reason)) if on_conflict.is_none() => {
            println!("{reason}");
            let answer = prompt::ask("[o]verwrite, [r]ename or [c]ancel? ")?;
            let choice = answer.parse::<ConflictChoice>().unwrap_or(ConflictChoice::Cancel);
            engine.restore(&record.id, Some(choice))?
        }
        other => other?,
    };

    match outcome {
        RestoreOutcome::Restored { destination, .. } => println!("Restored to {}", destination.display()),
        RestoreOutcome::Cancelled { id } => println!("Restore of {id} cancelled."),
    }
    Ok(ExitStatusLike::Ok)
}

fn empty(env: &Env, scope: &PurgeScope) -> anyhow::Result<ExitStatusLike> {
    let engine = env.engine();
    let candidates = engine.purge_candidates(scope)?;
    if candidates.is_empty() {
        println!("Nothing to delete.");
        return Ok(ExitStatusLike::Ok);
    }

    print!("{}", output::table(&candidates));
    let answer = prompt::ask(&format!(
        "Permanently delete {} item(s)? Type 'yes' to confirm: ",
        candidates.len()
    ))?;
    if !is_affirmative(&answer) {
        println!("Cancelled.");
        return Ok(ExitStatusLike::Ok);
    }

    print!("{}", output::purge_summary(&engine.purge(&candidates)?));
    Ok(ExitStatusLike::Ok)
}

fn configure(env: Env, action: ConfigAction) -> anyhow::Result<ExitStatusLike> {
    match action {
        ConfigAction::Show => {
            println!("# root: {}", env.config.paths.root.display());
            print!("{}", env.config.render());
        }
        ConfigAction::Set { key, value } => {
            let mut config = env.config;
            config.set(&key, &value)?;
            config.save(env.fs.as_ref())?;
            println!("{key}={value}");
        }
    }
    Ok(ExitStatusLike::Ok)
}
