//! Artifact resolution
//!
//! Narrows a partial name to exactly one artifact:
//!
//! 1. name search
//! 2. file-type filter
//! 3. property filter, then latest-wins among the survivors
//! 4. metadata fetch for the winner
//!
//! A single candidate is returned without checking its properties. With more
//! than one candidate and required properties, only candidates carrying every
//! required `key=value` pair stay in the running. The newest creation date
//! breaks any remaining tie; equal dates go to the greatest URI so the
//! outcome does not depend on the order the search returned.

use crate::error::{ArtifError, ResolveStage, Result};
use crate::metadata;
use crate::search;
use crate::store::ArtifactStore;
use artif_types::{ArtifactRef, Properties, PropertyFilter, ResolvedArtifact};
use chrono::{DateTime, FixedOffset};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What to resolve
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// Partial artifact name
    pub name: String,
    /// Extension filter; blank means `.vmxt`
    #[serde(default)]
    pub file_type: String,
    /// Pairs the chosen artifact must carry when there is a choice
    #[serde(default)]
    pub properties: PropertyFilter,
}

impl ResolveRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key, value);
        self
    }
}

/// Candidate counts seen at each stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub name_matches: usize,
    /// `None` until the type filter has run
    pub type_matches: Option<usize>,
    /// `None` when the property filter was skipped
    pub shortlisted: Option<usize>,
    /// `None` when no tie-break was needed
    pub dated: Option<usize>,
}

/// Successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub artifact: ResolvedArtifact,
    pub selected: ArtifactRef,
    pub report: ResolutionReport,
}

/// Run `fut` unless `cancel` fires first
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ArtifError::Cancelled),
        result = fut => result,
    }
}

/// Picks one artifact from a candidate list
pub struct Resolver<'a> {
    store: &'a dyn ArtifactStore,
    cancel: CancellationToken,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn ArtifactStore) -> Self {
        Self {
            store,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reduce `candidates` to exactly one artifact
    ///
    /// Errors carry the stage (property filter or tie-break) and the number
    /// of candidates that entered it.
    pub async fn resolve_one(
        &self,
        candidates: &[ArtifactRef],
        required: &PropertyFilter,
    ) -> Result<ArtifactRef> {
        let mut report = ResolutionReport::default();
        self.select(candidates, required, &mut report).await
    }

    async fn select(
        &self,
        candidates: &[ArtifactRef],
        required: &PropertyFilter,
        report: &mut ResolutionReport,
    ) -> Result<ArtifactRef> {
        match candidates {
            [] => {
                let stage = if required.is_empty() {
                    ResolveStage::TieBreak
                } else {
                    ResolveStage::PropertyFilter
                };
                Err(ArtifError::NotFound("no candidates to choose from".to_string())
                    .at_stage(stage, 0))
            }
            [only] => {
                if !required.is_empty() {
                    debug!("Single candidate {}, properties not checked", only);
                }
                Ok(only.clone())
            }
            _ if required.is_empty() => {
                report.dated = Some(candidates.len());
                self.latest(candidates.to_vec())
                    .await
                    .map_err(|e| e.at_stage(ResolveStage::TieBreak, candidates.len()))
            }
            _ => {
                let mut shortlist = self
                    .shortlist(candidates, required)
                    .await
                    .map_err(|e| e.at_stage(ResolveStage::PropertyFilter, candidates.len()))?;
                report.shortlisted = Some(shortlist.len());

                match shortlist.len() {
                    0 => Err(ArtifError::NotFound(format!(
                        "no candidate carries all of {}",
                        required.to_tokens().join(", ")
                    ))
                    .at_stage(ResolveStage::PropertyFilter, candidates.len())),
                    1 => Ok(shortlist.remove(0)),
                    n => {
                        report.dated = Some(n);
                        self.latest(shortlist)
                            .await
                            .map_err(|e| e.at_stage(ResolveStage::TieBreak, n))
                    }
                }
            }
        }
    }

    /// Candidates carrying every required pair, in input order
    async fn shortlist(
        &self,
        candidates: &[ArtifactRef],
        required: &PropertyFilter,
    ) -> Result<Vec<ArtifactRef>> {
        let fetched: Vec<Result<Properties>> = join_all(
            candidates
                .iter()
                .map(|c| cancellable(&self.cancel, self.store.get_properties(&c.uri, &[]))),
        )
        .await;

        let mut shortlist = Vec::new();
        for (candidate, result) in candidates.iter().zip(fetched) {
            match result {
                Ok(props) => {
                    let matched = required.matched_count(&props);
                    debug!("{} matches {}/{} properties", candidate, matched, required.len());
                    if matched == required.len() {
                        shortlist.push(candidate.clone());
                    }
                }
                Err(ArtifError::Cancelled) => return Err(ArtifError::Cancelled),
                Err(e) => warn!("Excluding {}: property fetch failed: {}", candidate, e),
            }
        }

        Ok(shortlist)
    }

    /// Newest candidate by creation date
    async fn latest(&self, candidates: Vec<ArtifactRef>) -> Result<ArtifactRef> {
        let fetched: Vec<Result<String>> = join_all(
            candidates
                .iter()
                .map(|c| cancellable(&self.cancel, metadata::created_date(self.store, c))),
        )
        .await;

        let mut dated = Vec::with_capacity(candidates.len());
        for (candidate, result) in candidates.into_iter().zip(fetched) {
            match result {
                Ok(created) => dated.push((candidate, created)),
                Err(ArtifError::Cancelled) => return Err(ArtifError::Cancelled),
                Err(e) => warn!("Excluding {} from tie-break: {}", candidate, e),
            }
        }

        pick_latest(dated).ok_or_else(|| {
            ArtifError::unavailable("no candidate creation date could be read")
        })
    }
}

/// Ordering key for latest-wins: parsed instant, raw text, URI
///
/// Unparseable timestamps sort below every parseable one.
fn recency_key<'a>(
    artifact: &'a ArtifactRef,
    created: &'a str,
) -> (Option<DateTime<FixedOffset>>, &'a str, &'a str) {
    (
        DateTime::parse_from_rfc3339(created.trim()).ok(),
        created,
        artifact.uri.as_str(),
    )
}

fn pick_latest(dated: Vec<(ArtifactRef, String)>) -> Option<ArtifactRef> {
    dated
        .into_iter()
        .max_by(|(a, a_created), (b, b_created)| {
            recency_key(a, a_created).cmp(&recency_key(b, b_created))
        })
        .map(|(artifact, _)| artifact)
}

/// Resolve `request` to one artifact and its download address
pub async fn resolve_artifact(
    store: &dyn ArtifactStore,
    request: &ResolveRequest,
    cancel: &CancellationToken,
) -> Result<Resolution> {
    let mut report = ResolutionReport::default();

    let found = cancellable(cancel, search::search_by_name(store, &request.name))
        .await
        .map_err(|e| e.at_stage(ResolveStage::NameSearch, 0))?;
    report.name_matches = found.len();

    let typed = search::filter_by_extension(&found, &request.file_type);
    report.type_matches = Some(typed.len());
    if typed.is_empty() {
        return Err(ArtifError::NotFound(format!(
            "no artifact matching '{}' has extension {}",
            request.name,
            artif_types::FileType::new(&request.file_type)
        ))
        .at_stage(ResolveStage::TypeFilter, found.len()));
    }

    let resolver = Resolver::new(store).with_cancellation(cancel.clone());
    let selected = resolver
        .select(&typed, &request.properties, &mut report)
        .await?;

    let meta = cancellable(cancel, metadata::get_metadata(store, &selected))
        .await
        .map_err(|e| e.at_stage(ResolveStage::Metadata, 1))?;
    if meta.download_uri.trim().is_empty() {
        return Err(ArtifError::NotFound(format!("{} has no download URI", selected))
            .at_stage(ResolveStage::Metadata, 1));
    }

    info!(
        "Resolved '{}' to {} ({} name match(es), {} of type)",
        request.name,
        selected,
        report.name_matches,
        typed.len()
    );

    Ok(Resolution {
        artifact: ResolvedArtifact {
            name: selected.stem().to_string(),
            created: meta.created,
            artifact_uri: selected.uri.clone(),
            download_uri: meta.download_uri,
        },
        selected,
        report,
    })
}
