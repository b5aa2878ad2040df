//! End-to-end matching against an in-memory voice library.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cuncun_embed::{EmbedError, Embedder};
use cuncun_vecstore::{MemoryIndex, VecIndex};
use cuncun_voicematch::{MatchConfig, VoiceMatcher};

/// Maps known phrases onto fixed unit-ish vectors.
struct PhraseEmbedder(HashMap<&'static str, Vec<f32>>);

#[async_trait::async_trait]
impl Embedder for PhraseEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.0.get(text).cloned().ok_or(EmbedError::EmptyInput)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn model(&self) -> &str {
        "phrase"
    }
}

fn library() -> Arc<MemoryIndex> {
    let idx = MemoryIndex::new();
    idx.insert("design_praise.opus", &[1.0, 0.0, 0.0]).unwrap();
    idx.insert("good_morning.opus", &[0.0, 1.0, 0.0]).unwrap();
    Arc::new(idx)
}

fn embedder() -> Arc<PhraseEmbedder> {
    Arc::new(PhraseEmbedder(HashMap::from([
        // cos distance to design_praise ≈ 0.005
        ("你那些设计稿", vec![1.0, 0.1, 0.0]),
        // roughly equidistant from both clips
        ("挺好的", vec![0.5, 0.5, 0.7]),
        ("早上好呀", vec![0.05, 1.0, 0.0]),
    ])))
}

fn matcher(root: &Path) -> VoiceMatcher {
    VoiceMatcher::new(MatchConfig::new(root))
        .with_embedder(embedder())
        .with_index(library())
}

#[tokio::test]
async fn resolves_under_library_root() {
    let root = PathBuf::from("/srv/cuncun/voices");
    let m = matcher(&root);

    let path = m.match_voice("哈？你那些设计稿...挺好的。").await.unwrap();
    assert_eq!(path, root.join("design_praise.opus"));
    assert!(path.starts_with(&root));
}

#[tokio::test]
async fn far_fragments_do_not_match() {
    let m = matcher(Path::new("/voices"));
    assert_eq!(m.match_voice("挺好的").await, None);
    assert_eq!(m.library_size(), Some(2));
}

#[tokio::test]
async fn later_fragment_can_match_when_earlier_fails() {
    let m = matcher(Path::new("/voices"));
    let found = m.find("挺好的！早上好呀").await.unwrap();
    assert_eq!(found.fragment, "早上好呀");
    assert_eq!(found.filename, "good_morning.opus");
    assert!(found.distance < 0.48);
}

#[tokio::test]
async fn repeated_calls_agree() {
    let m = matcher(Path::new("/voices"));
    let reply = "（眨眼）早上好呀，你那些设计稿";
    assert_eq!(m.find(reply).await, m.find(reply).await);
}

#[tokio::test]
async fn empty_library_never_matches() {
    let m = VoiceMatcher::new(MatchConfig::new("/voices"))
        .with_embedder(embedder())
        .with_index(Arc::new(MemoryIndex::new()));
    assert_eq!(m.match_voice("你那些设计稿").await, None);
}

#[tokio::test]
async fn malformed_embedding_skips_only_that_fragment() {
    let embedder = Arc::new(PhraseEmbedder(HashMap::from([
        ("甲甲", vec![]),
        ("丙丙", vec![1.0, 0.0]),
        ("早上好呀", vec![0.05, 1.0, 0.0]),
    ])));
    let m = VoiceMatcher::new(MatchConfig::new("/v"))
        .with_embedder(embedder)
        .with_index(library());

    // Empty vector, then a vector of the wrong dimension, then a hit.
    let found = m.find("甲甲，丙丙，早上好呀").await.unwrap();
    assert_eq!(found.fragment, "早上好呀");
    assert_eq!(found.path, PathBuf::from("/v/good_morning.opus"));

    assert_eq!(m.match_voice("甲甲").await, None);
}
