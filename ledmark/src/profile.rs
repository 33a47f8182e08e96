use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use anyhow::{bail, Context, Result};
use walkdir::WalkDir;
use shared::protocol::PLACES_FILE_NAME;

/// Picks one profile database out of several candidates
pub trait Selector {
    /// Returns None when the user made no selection
    fn select(&self, candidates: &[PathBuf]) -> Result<Option<PathBuf>>;
}

/// Pipes the candidate list to an interactive picker such as fzf
pub struct ExternalPicker {
    program: String,
}

impl ExternalPicker {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Selector for ExternalPicker {
    fn select(&self, candidates: &[PathBuf]) -> Result<Option<PathBuf>> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start picker '{}'", self.program))?;

        let input = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .context("Failed to send candidates to picker")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for picker")?;

        if !output.status.success() {
            return Ok(None);
        }

        let chosen = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!chosen.is_empty()).then(|| PathBuf::from(chosen)))
    }
}

/// All places.sqlite files under `root` whose path contains none of `excluded`
pub fn find_places_databases(root: &Path, excluded: &[String]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == PLACES_FILE_NAME)
        .map(|entry| entry.into_path())
        .filter(|path| {
            let text = path.to_string_lossy();
            !excluded.iter().any(|keyword| text.contains(keyword.as_str()))
        })
        .collect();

    found.sort();
    found
}

/// Locate the profile database to work on, asking `selector` when there
/// is more than one candidate.
pub fn locate_places_db(
    root: &Path,
    excluded: &[String],
    selector: &dyn Selector,
) -> Result<PathBuf> {
    let mut candidates = find_places_databases(root, excluded);

    match candidates.len() {
        0 => bail!("No valid {} found under {}", PLACES_FILE_NAME, root.display()),
        1 => {
            let path = candidates.remove(0);
            tracing::info!("Found {} at {}", PLACES_FILE_NAME, path.display());
            Ok(path)
        }
        n => {
            tracing::info!("Found {} browser profiles, asking for a selection", n);
            match selector.select(&candidates)? {
                Some(path) => {
                    tracing::info!("Selected {}", path.display());
                    Ok(path)
                }
                None => bail!("No profile selected"),
            }
        }
    }
}
