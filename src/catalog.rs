//! Rollup catalog
//!
//! Built once at startup from a source snapshot and served read-only afterwards. Rollups and
//! their execution environments are enumerated from the specification filenames
//! (`<rollup>.json` or `<rollup>_<env>.json`); each pair is combined with the rollup's
//! documentation page into a [`RollupRecord`].

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::chain_spec::{load_chain_spec, ChainSpec, ChainSpecElement, ElementMap};
use crate::config::Config;
use crate::error::{CatalogError, SourceError};
use crate::markdown::{load_doc_page, DocPage, MarkdownFields};
use crate::snapshot::SnapshotSource;

/// Environment assumed for specification files without a suffix
pub const DEFAULT_EXEC_ENV: &str = "evm";

/// Alternative names rollups are commonly referred to by
const ROLLUP_ALIASES: &[(&str, &str)] = &[
    ("arbitrum", "arbitrum-one"),
    ("world", "world-chain"),
    ("zksync", "zksync-era"),
    ("zkevm", "polygon-zkevm"),
];

/// An execution environment found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    pub id: String,
    /// Whether the specification filename carries the `_<env>` suffix
    pub suffixed: bool,
}

impl ExecutionEnvironment {
    fn file_suffix(&self) -> Option<&str> {
        self.suffixed.then_some(self.id.as_str())
    }
}

/// Opcode, precompile or system contract with its code inlined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementEntry {
    pub code: String,
    #[serde(flatten)]
    pub element: ChainSpecElement,
}

fn entries(map: ElementMap) -> Vec<ElementEntry> {
    map.into_iter()
        .map(|(code, element)| ElementEntry { code, element })
        .collect()
}

/// Everything known about one rollup in one execution environment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupRecord {
    pub chain_id: Option<u64>,
    pub description: Option<String>,
    pub opcodes: Vec<ElementEntry>,
    pub precompiles: Vec<ElementEntry>,
    pub system_contracts: Vec<ElementEntry>,
    #[serde(flatten)]
    pub fields: MarkdownFields,
}

impl RollupRecord {
    pub fn new(spec: ChainSpec, fields: MarkdownFields) -> Self {
        Self {
            chain_id: spec.chain_id,
            description: spec.description,
            opcodes: entries(spec.opcodes),
            precompiles: entries(spec.precompiles),
            system_contracts: entries(spec.system_contracts),
            fields,
        }
    }
}

/// A rollup and its records keyed by environment
#[derive(Debug, Clone)]
pub struct RollupEntry {
    pub title: Option<String>,
    pub description: Option<String>,
    pub environments: IndexMap<String, RollupRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupSummary {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSummary {
    pub env: String,
    pub description: Option<String>,
}

/// Which extractor a diagnostic came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ChainSpec,
    DocPage,
}

/// A source file that could not be used while building the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDiagnostic {
    pub rollup: String,
    pub exec_env: Option<String>,
    pub source: SourceKind,
    pub error: &'static str,
    pub message: String,
}

impl SourceDiagnostic {
    fn new(rollup: &str, exec_env: Option<&str>, source: SourceKind, err: &SourceError) -> Self {
        Self {
            rollup: rollup.to_string(),
            exec_env: exec_env.map(str::to_string),
            source,
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of looking up a record
#[derive(Debug, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a RollupRecord),
    NotFound,
    /// No environment was given and the rollup has several
    AmbiguousEnvironment(Vec<&'a str>),
}

/// Lowercase, trim and replace spaces with dashes.
pub fn normalize_rollup_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Group specification files by rollup.
///
/// Files are visited in filename order; the environment is whatever follows the first `_`
/// in the file stem, or [`DEFAULT_EXEC_ENV`] if there is none. When two files name the same
/// environment (`foo.json` and `foo_evm.json`) the first one wins.
pub fn list_rollups_from_specs(
    specs_dir: &Path,
) -> Result<IndexMap<String, Vec<ExecutionEnvironment>>, CatalogError> {
    let unreadable = |source: std::io::Error| CatalogError::SpecsDirUnreadable {
        dir: specs_dir.to_path_buf(),
        source,
    };

    let mut stems: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(specs_dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();

    let mut rollups: IndexMap<String, Vec<ExecutionEnvironment>> = IndexMap::new();
    for stem in stems {
        let (name, env) = match stem.split_once('_') {
            Some((name, env)) => (
                name,
                ExecutionEnvironment {
                    id: env.to_string(),
                    suffixed: true,
                },
            ),
            None => (
                stem.as_str(),
                ExecutionEnvironment {
                    id: DEFAULT_EXEC_ENV.to_string(),
                    suffixed: false,
                },
            ),
        };
        let envs = rollups.entry(name.to_string()).or_default();
        if envs.iter().any(|known| known.id == env.id) {
            warn!(rollup = %name, env = %env.id, file = %stem, "duplicate execution environment, skipping");
            continue;
        }
        envs.push(env);
    }

    if rollups.is_empty() {
        return Err(CatalogError::NoRollupsFound {
            dir: specs_dir.to_path_buf(),
        });
    }

    Ok(rollups)
}

/// Immutable mapping from rollup to its records
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    rollups: IndexMap<String, RollupEntry>,
    diagnostics: Vec<SourceDiagnostic>,
}

impl Catalog {
    /// Build the catalog from a specifications directory and a documentation directory.
    ///
    /// Unusable individual files degrade to empty data and are recorded in
    /// [`Catalog::diagnostics`].
    ///
    /// # Errors
    ///
    /// Fails if the specifications directory cannot be listed or holds no specifications.
    pub fn build(specs_dir: &Path, docs_dir: &Path) -> Result<Self, CatalogError> {
        let listing = list_rollups_from_specs(specs_dir)?;
        let mut catalog = Catalog::default();

        for (name, envs) in listing {
            let page = load_doc_page(docs_dir, &name).unwrap_or_else(|e| {
                warn!(rollup = %name, error = %e, "documentation page unavailable");
                catalog
                    .diagnostics
                    .push(SourceDiagnostic::new(&name, None, SourceKind::DocPage, &e));
                DocPage::default()
            });

            let mut environments = IndexMap::new();
            for env in envs {
                let spec = load_chain_spec(specs_dir, &name, env.file_suffix()).unwrap_or_else(|e| {
                    warn!(rollup = %name, env = %env.id, error = %e, "chain spec unavailable");
                    catalog.diagnostics.push(SourceDiagnostic::new(
                        &name,
                        Some(&env.id),
                        SourceKind::ChainSpec,
                        &e,
                    ));
                    ChainSpec::default()
                });
                debug!(rollup = %name, env = %env.id, opcodes = spec.opcodes.len(), "loaded chain spec");
                environments.insert(env.id, RollupRecord::new(spec, page.fields.clone()));
            }

            catalog.rollups.insert(
                name,
                RollupEntry {
                    title: page.front_matter.title,
                    description: page.front_matter.subtitle,
                    environments,
                },
            );
        }

        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.rollups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rollups.is_empty()
    }

    pub fn diagnostics(&self) -> &[SourceDiagnostic] {
        &self.diagnostics
    }

    pub fn rollup_names(&self) -> Vec<&str> {
        self.rollups.keys().map(String::as_str).collect()
    }

    /// Every environment id used by any rollup, in first-seen order
    pub fn environment_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.rollups.values().flat_map(|r| r.environments.keys()) {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        ids
    }

    /// Map a user-supplied rollup name onto a catalog key.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        let normalized = normalize_rollup_name(name);
        if let Some((key, _)) = self.rollups.get_key_value(&normalized) {
            return Some(key.as_str());
        }

        let (_, target) = ROLLUP_ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)?;
        self.rollups.get_key_value(*target).map(|(key, _)| key.as_str())
    }

    fn entry(&self, name: &str) -> Option<&RollupEntry> {
        self.resolve_name(name).and_then(|key| self.rollups.get(key))
    }

    pub fn list_rollups(&self) -> Vec<RollupSummary> {
        self.rollups
            .iter()
            .map(|(name, entry)| RollupSummary {
                name: name.clone(),
                title: entry.title.clone(),
                description: entry.description.clone(),
            })
            .collect()
    }

    /// Environments supported by a rollup, or `None` if the rollup is unknown.
    pub fn list_execution_environments(&self, rollup: &str) -> Option<Vec<EnvironmentSummary>> {
        let entry = self.entry(rollup)?;
        Some(
            entry
                .environments
                .iter()
                .map(|(env, record)| EnvironmentSummary {
                    env: env.clone(),
                    description: record.description.clone(),
                })
                .collect(),
        )
    }

    /// Find the record for a rollup and optional environment.
    ///
    /// Without an environment, a rollup with a single environment resolves to it and a
    /// rollup with several is reported as ambiguous.
    pub fn lookup(&self, rollup: &str, exec_env: Option<&str>) -> Lookup<'_> {
        let Some(entry) = self.entry(rollup) else {
            return Lookup::NotFound;
        };

        match exec_env {
            Some(env) => entry
                .environments
                .get(env)
                .map_or(Lookup::NotFound, Lookup::Found),
            None if entry.environments.len() == 1 => entry
                .environments
                .values()
                .next()
                .map_or(Lookup::NotFound, Lookup::Found),
            None => Lookup::AmbiguousEnvironment(
                entry.environments.keys().map(String::as_str).collect(),
            ),
        }
    }
}

/// Fetch a snapshot, build the catalog from it and release the snapshot.
///
/// # Errors
///
/// Fails if the snapshot cannot be fetched or the catalog cannot be built.
pub fn initialize_catalog(source: &dyn SnapshotSource, config: &Config) -> Result<Catalog> {
    info!(source = %source.describe(), "fetching snapshot");
    let snapshot = source
        .fetch_snapshot()
        .with_context(|| format!("Failed to fetch snapshot from {}", source.describe()))?;

    let specs_dir: PathBuf = snapshot.root().join(&config.specs_dir);
    let docs_dir: PathBuf = snapshot.root().join(&config.docs_dir);
    let built = Catalog::build(&specs_dir, &docs_dir);

    snapshot.close()?;
    let catalog = built.context("Failed to build rollup catalog")?;

    info!(
        rollups = catalog.len(),
        environments = catalog.environment_ids().len(),
        diagnostics = catalog.diagnostics().len(),
        "catalog ready"
    );
    Ok(catalog)
}
