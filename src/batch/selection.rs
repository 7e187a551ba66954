use crate::config::{Config, SourceEntry};
use crate::source::{SourceKind, SourcePlan};
use crate::Result;

/// Which sources a batch runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every configured source except opt-in ones, plus the opt-in ones named here
    All { include: Vec<String> },

    /// Exactly the named sources, in the order given
    Named(Vec<String>),
}

impl Default for Selection {
    fn default() -> Self {
        Self::All {
            include: Vec::new(),
        }
    }
}

/// Resolved batch plan
#[derive(Debug, Default)]
pub struct SourceSelection {
    pub plans: Vec<SourcePlan>,

    /// Requested names that match no source
    pub unknown: Vec<String>,

    /// Opt-in sources left out of an "everything" batch
    pub skipped: Vec<String>,
}

fn entry_for(entries: &[SourceEntry], kind: SourceKind) -> Option<&SourceEntry> {
    entries
        .iter()
        .find(|entry| SourceKind::from_name(&entry.kind) == Some(kind))
}

/// Resolves a selection against the configured sources
///
/// A named built-in source that is not configured runs with default settings.
/// Unknown names are collected, never fatal.
pub fn select_sources(config: &Config, selection: &Selection) -> Result<SourceSelection> {
    let entries = config.effective_sources();
    let mut resolved = SourceSelection::default();

    match selection {
        Selection::All { include } => {
            let mut included = Vec::new();
            for name in include {
                match SourceKind::from_name(name) {
                    Some(kind) => included.push(kind),
                    None => resolved.unknown.push(name.clone()),
                }
            }

            for entry in &entries {
                let Some(kind) = SourceKind::from_name(&entry.kind) else {
                    resolved.unknown.push(entry.kind.clone());
                    continue;
                };
                if entry.opt_in && !included.contains(&kind) {
                    resolved.skipped.push(kind.name().to_string());
                    continue;
                }
                resolved.plans.push(SourcePlan::from_entry(entry)?);
            }

            for kind in included {
                if entry_for(&entries, kind).is_none() {
                    resolved
                        .plans
                        .push(SourcePlan::from_entry(&SourceEntry::new(kind.name()))?);
                }
            }
        }
        Selection::Named(names) => {
            let mut seen = Vec::new();
            for name in names {
                let Some(kind) = SourceKind::from_name(name) else {
                    resolved.unknown.push(name.clone());
                    continue;
                };
                if seen.contains(&kind) {
                    continue;
                }
                seen.push(kind);

                let plan = match entry_for(&entries, kind) {
                    Some(entry) => SourcePlan::from_entry(entry)?,
                    None => SourcePlan::from_entry(&SourceEntry::new(kind.name()))?,
                };
                resolved.plans.push(plan);
            }
        }
    }

    for name in &resolved.unknown {
        tracing::warn!("Unknown source '{}' ignored", name);
    }

    Ok(resolved)
}
