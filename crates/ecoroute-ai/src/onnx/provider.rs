use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use super::{Embedder, NliClassifier};
use crate::error::ProviderError;
use crate::provider::{Capability, ClassificationResult, Embedding, Provider};

pub const DEFAULT_EMBEDDING_MODEL: &str = "models/all-MiniLM-L6-v2";
pub const DEFAULT_NLI_MODEL: &str = "models/nli-deberta-v3-xsmall";
pub const DEFAULT_HYPOTHESIS_TEMPLATE: &str = "This example is {}.";

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    pub embedding_model: PathBuf,
    pub nli_model: PathBuf,
    /// Hypothesis pattern for zero-shot scoring; `{}` is the label.
    pub hypothesis_template: String,
}

impl Default for OnnxConfig {
    fn default() -> Self {
        Self {
            embedding_model: PathBuf::from(DEFAULT_EMBEDDING_MODEL),
            nli_model: PathBuf::from(DEFAULT_NLI_MODEL),
            hypothesis_template: DEFAULT_HYPOTHESIS_TEMPLATE.to_string(),
        }
    }
}

/// Provider backed by local ONNX models.
///
/// Each model is loaded on first use, at most once, off the async runtime.
/// Inference runs on the blocking pool with one model instance per kind.
pub struct OnnxProvider {
    config: OnnxConfig,
    embedder: OnceCell<Arc<Mutex<Embedder>>>,
    nli: OnceCell<Arc<Mutex<NliClassifier>>>,
}

impl OnnxProvider {
    pub fn new(config: OnnxConfig) -> Self {
        Self {
            config,
            embedder: OnceCell::new(),
            nli: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &OnnxConfig {
        &self.config
    }

    async fn embedder(&self) -> Result<Arc<Mutex<Embedder>>, ProviderError> {
        self.embedder
            .get_or_try_init(|| async {
                let dir = self.config.embedding_model.clone();
                info!(model = %dir.display(), "loading embedding model");
                let embedder = load_blocking(move || Embedder::load(&dir)).await?;
                Ok::<_, ProviderError>(Arc::new(Mutex::new(embedder)))
            })
            .await
            .cloned()
    }

    async fn nli(&self) -> Result<Arc<Mutex<NliClassifier>>, ProviderError> {
        self.nli
            .get_or_try_init(|| async {
                let dir = self.config.nli_model.clone();
                info!(model = %dir.display(), "loading zero-shot model");
                let nli = load_blocking(move || NliClassifier::load(&dir)).await?;
                Ok::<_, ProviderError>(Arc::new(Mutex::new(nli)))
            })
            .await
            .cloned()
    }
}

impl Default for OnnxProvider {
    fn default() -> Self {
        Self::new(OnnxConfig::default())
    }
}

async fn load_blocking<T, F>(load: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(load)
        .await
        .map_err(|e| ProviderError::Load(e.to_string()))?
        .map_err(|e| ProviderError::Load(format!("{e:#}")))
}

/// Run `f` on the blocking pool with exclusive access to `model`.
async fn infer<M, T, F>(model: Arc<Mutex<M>>, f: F) -> Result<T, ProviderError>
where
    M: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut M) -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut model = model
            .lock()
            .map_err(|_| ProviderError::Inference("model lock poisoned".into()))?;
        f(&mut *model).map_err(|e| ProviderError::Inference(format!("{e:#}")))
    })
    .await
    .map_err(|e| ProviderError::Inference(e.to_string()))?
}

#[async_trait]
impl Provider for OnnxProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        let embedder = self.embedder().await?;
        let texts = texts.to_vec();
        let n = texts.len();
        let embeddings = infer(embedder, move |e| {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            e.embed_batch(&refs)
        })
        .await?;

        if embeddings.len() != n {
            return Err(ProviderError::CountMismatch {
                expected: n,
                got: embeddings.len(),
            });
        }
        Ok(embeddings)
    }

    async fn classify(
        &self,
        text: &str,
        labels: &[String],
        multi_label: bool,
    ) -> Result<ClassificationResult, ProviderError> {
        let nli = self.nli().await?;
        let text = text.to_string();
        let owned = labels.to_vec();
        let template = self.config.hypothesis_template.clone();
        let scores = infer(nli, move |m| m.classify(&text, &owned, &template, multi_label)).await?;

        if scores.len() != labels.len() {
            return Err(ProviderError::CountMismatch {
                expected: labels.len(),
                got: scores.len(),
            });
        }
        Ok(labels.iter().cloned().zip(scores).collect())
    }

    async fn ensure_ready(&self, capability: Capability) -> Result<(), ProviderError> {
        match capability {
            Capability::Embedding => self.embedder().await.map(drop),
            Capability::Classification => self.nli().await.map(drop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_models() -> OnnxProvider {
        let dir = tempfile::tempdir().unwrap();
        OnnxProvider::new(OnnxConfig {
            embedding_model: dir.path().join("no-embedder"),
            nli_model: dir.path().join("no-nli"),
            ..Default::default()
        })
    }

    #[test]
    fn defaults_point_at_bundled_model_dirs() {
        let config = OnnxConfig::default();
        assert!(config.embedding_model.ends_with("all-MiniLM-L6-v2"));
        assert!(config.nli_model.ends_with("nli-deberta-v3-xsmall"));
        assert_eq!(config.hypothesis_template, "This example is {}.");
    }

    #[tokio::test]
    async fn missing_embedding_model_is_a_load_error() {
        let provider = missing_models();
        let err = provider.ensure_ready(Capability::Embedding).await.unwrap_err();
        assert!(matches!(&err, ProviderError::Load(msg) if msg.contains("model.onnx")), "{err}");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn missing_nli_model_fails_classify() {
        let provider = missing_models();
        let err = provider
            .classify("x", &["a".to_string(), "b".to_string()], false)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Load(_)));
    }

    #[tokio::test]
    #[ignore = "needs models/all-MiniLM-L6-v2"]
    async fn embedder_loads_once() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/all-MiniLM-L6-v2");
        let provider = OnnxProvider::new(OnnxConfig {
            embedding_model: dir,
            ..Default::default()
        });

        provider.ensure_ready(Capability::Embedding).await.unwrap();
        let first = provider.embedder().await.unwrap();
        provider.ensure_ready(Capability::Embedding).await.unwrap();
        let second = provider.embedder().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let out = provider
            .embed(&["preload".to_string(), "ocean acidification".to_string()])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
    }
}
