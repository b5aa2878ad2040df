use std::path::PathBuf;
use std::sync::Arc;

use cuncun_embed::Embedder;
use cuncun_vecstore::{Match, VecIndex};
use tracing::{debug, error, info, warn};

use crate::error::MatchError;
use crate::normalize::normalize;
use crate::segment::segment;

/// Empirically tuned cosine-distance cutoff for the bge voice library.
/// A fragment matches only when its nearest clip is strictly closer.
pub const DEFAULT_THRESHOLD: f32 = 0.48;

/// Fragments shorter than this (in characters) are not embedded.
pub const DEFAULT_MIN_FRAGMENT_CHARS: usize = 2;

/// Tuning knobs and the voice-library location.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Directory that clip filenames are resolved against.
    pub voice_lib: PathBuf,
    pub threshold: f32,
    pub min_fragment_chars: usize,
}

impl MatchConfig {
    pub fn new(voice_lib: impl Into<PathBuf>) -> Self {
        Self {
            voice_lib: voice_lib.into(),
            threshold: DEFAULT_THRESHOLD,
            min_fragment_chars: DEFAULT_MIN_FRAGMENT_CHARS,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_fragment_chars(mut self, n: usize) -> Self {
        self.min_fragment_chars = n;
        self
    }
}

/// The accepted fragment and the clip it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceMatch {
    pub fragment: String,
    pub filename: String,
    pub distance: f32,
    /// `voice_lib` joined with `filename`. Existence is not checked.
    pub path: PathBuf,
}

/// Outcome of asking the embedder for one fragment.
enum Embedding {
    Vector(Vec<f32>),
    Unavailable,
}

/// Outcome of a nearest-neighbour query for one fragment.
enum Nearest {
    Found(Match),
    Empty,
}

/// Matches reply text against the voice library.
///
/// Both collaborators are optional. Without an index every call returns
/// `None`; without an embedder every fragment is treated as unavailable and
/// the index is never queried.
pub struct VoiceMatcher {
    embedder: Option<Arc<dyn Embedder>>,
    index: Option<Arc<dyn VecIndex>>,
    config: MatchConfig,
}

impl VoiceMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            embedder: None,
            index: None,
            config,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_index(mut self, index: Arc<dyn VecIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Number of clips in the library, or `None` when no index is loaded.
    pub fn library_size(&self) -> Option<usize> {
        self.index.as_ref().map(|idx| idx.len())
    }

    /// Path of the clip matching `reply`, if any. Never fails.
    pub async fn match_voice(&self, reply: &str) -> Option<PathBuf> {
        self.find(reply).await.map(|m| m.path)
    }

    /// Like [`Self::match_voice`] but keeps the fragment and distance.
    pub async fn find(&self, reply: &str) -> Option<VoiceMatch> {
        match self.try_find(reply).await {
            Ok(found) => found,
            Err(err) => {
                error!(error = %err, "voicematch: matching aborted");
                None
            }
        }
    }

    /// Run the pipeline, surfacing an index failure instead of logging it.
    pub async fn try_find(&self, reply: &str) -> Result<Option<VoiceMatch>, MatchError> {
        let Some(index) = self.index.as_deref() else {
            debug!("voicematch: no voice index configured");
            return Ok(None);
        };

        let fragments = segment(&normalize(reply), self.config.min_fragment_chars);
        if fragments.is_empty() {
            warn!(
                preview = %preview(reply, 20),
                "voicematch: no usable fragments after cleaning"
            );
            return Ok(None);
        }

        info!(fragments = fragments.len(), "voicematch: searching fragments");
        let found = self.first_match(index, &fragments).await?;
        if found.is_none() {
            warn!("voicematch: no fragment cleared the threshold");
        }
        Ok(found)
    }

    /// Walk fragments in order and stop at the first one under the threshold.
    /// A later, closer fragment never displaces an earlier accepted one.
    async fn first_match(
        &self,
        index: &dyn VecIndex,
        fragments: &[String],
    ) -> Result<Option<VoiceMatch>, MatchError> {
        let mut found = None;
        let mut pending = fragments.iter();

        while found.is_none() {
            let Some(fragment) = pending.next() else {
                break;
            };

            let vector = match self.embed(fragment, index.dimension()).await {
                Embedding::Vector(v) => v,
                Embedding::Unavailable => continue,
            };

            let nearest = match nearest(index, &vector) {
                Ok(n) => n,
                Err(source) => {
                    return Err(MatchError::Index {
                        fragment: fragment.clone(),
                        source,
                    });
                }
            };

            found = match nearest {
                Nearest::Empty => {
                    debug!(fragment = %fragment, "voicematch: index returned no candidates");
                    None
                }
                Nearest::Found(m) => self.accept(fragment, m),
            };
        }

        Ok(found)
    }

    /// An empty vector, or one whose length differs from the index
    /// dimension, counts as unavailable.
    async fn embed(&self, fragment: &str, dim: Option<usize>) -> Embedding {
        let Some(embedder) = &self.embedder else {
            return Embedding::Unavailable;
        };
        match embedder.embed(fragment).await {
            Ok(v) if v.is_empty() => {
                warn!(fragment = %fragment, "voicematch: embedder returned an empty vector");
                Embedding::Unavailable
            }
            Ok(v) if dim.is_some_and(|d| d != v.len()) => {
                warn!(
                    fragment = %fragment,
                    got = v.len(),
                    want = dim.unwrap_or_default(),
                    "voicematch: embedding dimension differs from index"
                );
                Embedding::Unavailable
            }
            Ok(v) => Embedding::Vector(v),
            Err(err) => {
                warn!(fragment = %fragment, error = %err, "voicematch: embedding unavailable");
                Embedding::Unavailable
            }
        }
    }

    fn accept(&self, fragment: &str, m: Match) -> Option<VoiceMatch> {
        if m.distance < self.config.threshold {
            info!(
                fragment = %fragment,
                filename = %m.id,
                distance = m.distance,
                "voicematch: hit"
            );
            Some(VoiceMatch {
                fragment: fragment.to_string(),
                path: self.config.voice_lib.join(&m.id),
                filename: m.id,
                distance: m.distance,
            })
        } else {
            info!(
                fragment = %fragment,
                distance = m.distance,
                threshold = self.config.threshold,
                "voicematch: closest clip above threshold"
            );
            None
        }
    }
}

fn nearest(index: &dyn VecIndex, vector: &[f32]) -> Result<Nearest, cuncun_vecstore::VecError> {
    let mut matches = index.search(vector, 1)?;
    Ok(if matches.is_empty() {
        Nearest::Empty
    } else {
        Nearest::Found(matches.swap_remove(0))
    })
}

fn preview(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}
