use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use finsync_core::{Config, CoverageSet, Profile};
use finsync_ofx::SystemClock;
use finsync_storage::StatementStore;
use finsync_sync::{fix_name, sync_institution, InstitutionReport, RenameOutcome};
use tokio::task::JoinSet;

use crate::SyncArgs;

pub async fn sync(args: SyncArgs) -> anyhow::Result<bool> {
    let profiles = select_profiles(&args)?;
    if profiles.is_empty() {
        bail!("No profiles selected; pass --profile, --all or --spec");
    }

    // Institutions run concurrently; accounts within one run sequentially.
    let mut tasks = JoinSet::new();
    for (name, profile) in profiles {
        tasks.spawn(async move {
            let result = sync_institution(&profile, SystemClock).await;
            (name, result)
        });
    }

    let mut all_ok = true;
    while let Some(joined) = tasks.join_next().await {
        let (name, result) = joined.context("sync task failed")?;
        match result {
            Ok(report) => {
                print!("{}", render_institution(&name, &report));
                all_ok &= report.is_success();
            }
            Err(e) => {
                tracing::error!("Profile {name}: {e}");
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

fn select_profiles(args: &SyncArgs) -> anyhow::Result<Vec<(String, Profile)>> {
    if let Some(json) = &args.spec {
        let profile = Profile::from_json(json).context("Invalid --spec profile")?;
        return Ok(vec![(profile.ofx.org.clone(), profile)]);
    }

    let path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config =
        Config::load(&path).with_context(|| format!("Failed to load config {}", path.display()))?;
    if args.all {
        return Ok(config.profiles.into_iter().collect());
    }
    args.profiles
        .iter()
        .map(|name| -> anyhow::Result<(String, Profile)> {
            Ok((name.clone(), config.profile(name)?.clone()))
        })
        .collect()
}

fn default_config_path() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "finsync")
        .context("Could not determine the config directory; pass --config")?;
    Ok(dirs.config_dir().join("config.toml"))
}

fn render_institution(name: &str, report: &InstitutionReport) -> String {
    let mut out = String::new();
    for synced in &report.synced {
        let _ = writeln!(
            out,
            "{name}: {} -> {}: {} ({} new file(s), {} request(s))",
            synced.account,
            synced.directory.display(),
            synced.outcome,
            synced.files_written.len(),
            synced.requests
        );
    }
    for (account, e) in &report.failed {
        let _ = writeln!(out, "{name}: {account}: FAILED: {e}");
    }
    out
}

pub fn rename(paths: &[PathBuf], dry_run: bool) -> anyhow::Result<bool> {
    let mut all_ok = true;
    for path in expand_paths(paths)? {
        match fix_name(&path, dry_run) {
            Ok(RenameOutcome::Renamed { from, to }) => {
                let verb = if dry_run { "would rename" } else { "renamed" };
                println!("{verb} {} -> {}", from.display(), to.display());
            }
            Ok(RenameOutcome::Conflict { to }) => {
                println!("conflict {} -> {}", path.display(), to.display());
                all_ok = false;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("{}: {e}", path.display());
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

/// Directories are replaced by their (sorted) entries, one level deep.
fn expand_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for path in paths {
        if !path.is_dir() {
            expanded.push(path.clone());
            continue;
        }
        let mut entries = std::fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to list {}", path.display()))?;
        entries.retain(|p| p.is_file());
        entries.sort();
        expanded.extend(entries);
    }
    Ok(expanded)
}

pub fn coverage(dir: &Path) -> anyhow::Result<bool> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let store = StatementStore::open_dir(dir)?;
    let set = store.load_coverage()?;
    print!("{}", render_coverage(&set));
    Ok(true)
}

fn render_coverage(set: &CoverageSet) -> String {
    if set.is_empty() {
        return "no statements\n".to_string();
    }
    let mut out = String::new();
    for interval in set.iter() {
        let _ = writeln!(out, "{interval} ({} days)", interval.span_days());
    }
    for gap in set.gaps() {
        let _ = writeln!(out, "missing {gap}");
    }
    out
}
