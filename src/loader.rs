//! Concurrent loading of locale sources into a [`Catalog`]
//!
//! Every source is read and decoded on its own task. Results land in a slot
//! owned by the source's position, so aggregation needs no shared collection;
//! slots are merged in source order once the fan-in completes.
//!
//! Dropping the future returned by [`load`] cancels the load: the pending
//! tasks are aborted and nothing read so far is merged anywhere.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::catalog::{Catalog, LocaleId, LocaleTable, SharedCatalog};
use crate::decoder::{SourceFormat, decode_source};
use crate::error::LoadError;
use crate::source::LocaleSource;

/// How a load is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    reference: LocaleId,
    timeout: Option<Duration>,
    required_successes: Option<usize>,
    format: SourceFormat,
}

impl LoadOptions {
    pub fn new(reference: LocaleId) -> Self {
        LoadOptions {
            reference,
            timeout: None,
            required_successes: None,
            format: SourceFormat::Auto,
        }
    }

    /// Stop waiting after `timeout`; unfinished sources are reported as timed out.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Partial-result mode: return as soon as `count` sources have loaded successfully.
    pub fn with_partial_results(mut self, count: usize) -> Self {
        self.required_successes = Some(count);
        self
    }

    /// Decoder used for sources that do not pick one themselves.
    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn reference(&self) -> &LocaleId {
        &self.reference
    }
}

/// A best-effort catalog and every problem met while building it.
#[derive(Debug)]
pub struct LoadOutcome {
    pub catalog: Catalog,
    pub errors: Vec<LoadError>,
}

impl LoadOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

type Slot = Option<Result<(LocaleId, LocaleTable), LoadError>>;

struct FanIn {
    names: Vec<String>,
    slots: Vec<Slot>,
    timed_out: bool,
}

async fn load_one(
    source: LocaleSource,
    default_format: SourceFormat,
) -> Result<(LocaleId, LocaleTable), LoadError> {
    let name = source.reader.name();
    let bytes = source.reader.read().await.map_err(|error| LoadError::Io {
        source_name: name.clone(),
        error,
    })?;

    let format = match source.format {
        SourceFormat::Auto => default_format,
        explicit => explicit,
    };
    let decoded = decode_source(format, &name, source.reader.extension().as_deref(), &bytes)?;

    let code = source
        .locale
        .or(decoded.locale)
        .or_else(|| source.reader.implied_locale())
        .unwrap_or_default();
    let locale = LocaleId::parse(&code).ok_or_else(|| LoadError::InvalidLocale {
        source_name: name.clone(),
        locale: code.clone(),
    })?;

    let mut table = LocaleTable::from_messages(decoded.entries);
    if let Some(metadata) = decoded.metadata {
        table.with_metadata(metadata);
    }
    tracing::debug!(source = %name, locale = %locale, keys = table.len(), "decoded locale source");
    Ok((locale, table))
}

async fn fan_in(
    sources: Vec<LocaleSource>,
    default_format: SourceFormat,
    timeout: Option<Duration>,
    required_successes: Option<usize>,
) -> FanIn {
    let names: Vec<String> = sources.iter().map(LocaleSource::name).collect();
    let mut slots: Vec<Slot> = names.iter().map(|_| None).collect();
    let mut task_slots = HashMap::new();
    let mut tasks = JoinSet::new();

    for (index, source) in sources.into_iter().enumerate() {
        let handle = tasks.spawn(async move { (index, load_one(source, default_format).await) });
        task_slots.insert(handle.id(), index);
    }

    let deadline = timeout.map(|timeout| Instant::now() + timeout);
    let mut successes = 0;
    let mut timed_out = false;

    loop {
        if required_successes.is_some_and(|required| successes >= required) {
            break;
        }
        let next = match deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, tasks.join_next_with_id()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                }
            }
            None => tasks.join_next_with_id().await,
        };
        let Some(joined) = next else {
            break;
        };
        match joined {
            Ok((_, (index, result))) => {
                if result.is_ok() {
                    successes += 1;
                }
                slots[index] = Some(result);
            }
            Err(join_error) => {
                if let Some(&index) = task_slots.get(&join_error.id()) {
                    slots[index] = Some(Err(LoadError::TaskFailed {
                        source_name: names[index].clone(),
                        reason: join_error.to_string(),
                    }));
                }
            }
        }
    }
    tasks.abort_all();

    FanIn {
        names,
        slots,
        timed_out,
    }
}

/// Load every source concurrently and build a catalog from the ones that succeed.
///
/// Never fails as a whole: each source either contributes its table or one
/// [`LoadError`]. When two sources resolve to the same locale the earlier
/// source wins and the later one is reported as a duplicate.
pub async fn load(sources: Vec<LocaleSource>, options: &LoadOptions) -> LoadOutcome {
    let source_count = sources.len();
    let FanIn {
        names,
        slots,
        timed_out,
    } = fan_in(
        sources,
        options.format,
        options.timeout,
        options.required_successes,
    )
    .await;

    let mut builder = Catalog::builder(options.reference.clone());
    let mut first_source: HashMap<LocaleId, String> = HashMap::new();
    let mut errors = Vec::new();

    for (slot, name) in slots.into_iter().zip(names) {
        match slot {
            Some(Ok((locale, table))) => {
                if builder.insert(locale.clone(), table).is_ok() {
                    first_source.insert(locale, name);
                } else {
                    errors.push(LoadError::DuplicateLocale {
                        source_name: name,
                        locale: locale.to_string(),
                        first_source: first_source.get(&locale).cloned().unwrap_or_default(),
                    });
                }
            }
            Some(Err(error)) => errors.push(error),
            None if timed_out => errors.push(LoadError::TimedOut { source_name: name }),
            None => errors.push(LoadError::Abandoned { source_name: name }),
        }
    }

    for error in &errors {
        tracing::warn!(source = %error.source_name(), "{}", error);
    }
    let catalog = builder.build();
    tracing::info!(
        sources = source_count,
        locales = catalog.len(),
        failures = errors.len(),
        "locale load finished"
    );

    LoadOutcome { catalog, errors }
}

/// Outcome of checking a source without building a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Valid,
    /// A language document with an unsupported version
    Incompatible,
    Invalid,
}

/// Check whether each source is a loadable locale table, in source order.
pub async fn check_sources(
    sources: Vec<LocaleSource>,
    format: SourceFormat,
) -> Vec<(String, SourceStatus)> {
    let FanIn { names, slots, .. } = fan_in(sources, format, None, None).await;
    names
        .into_iter()
        .zip(slots)
        .map(|(name, slot)| {
            let status = match slot {
                Some(Ok(_)) => SourceStatus::Valid,
                Some(Err(LoadError::IncompatibleVersion { .. })) => SourceStatus::Incompatible,
                _ => SourceStatus::Invalid,
            };
            (name, status)
        })
        .collect()
}

impl SharedCatalog {
    /// Load a fresh catalog and swap it in, returning the load problems.
    ///
    /// Readers holding a snapshot of the previous catalog keep it untouched.
    pub async fn reload(&self, sources: Vec<LocaleSource>, options: &LoadOptions) -> Vec<LoadError> {
        let LoadOutcome { catalog, errors } = load(sources, options).await;
        self.replace(catalog);
        errors
    }
}
