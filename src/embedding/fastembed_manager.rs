use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Independently locked copies of a model. A call takes the first idle
/// copy, or waits on one picked round-robin when all are busy.
struct ModelPool<T> {
    slots: Vec<Mutex<T>>,
    next: AtomicUsize,
}

impl<T> ModelPool<T> {
    fn new(models: Vec<T>) -> Self {
        Self {
            slots: models.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        for slot in &self.slots {
            if let Ok(mut model) = slot.try_lock() {
                return Ok(f(&mut model));
            }
        }

        let slot = self
            .slots
            .get(self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len().max(1))
            .ok_or_else(|| EmbeddingError::InitializationFailed("empty model pool".to_string()))?;
        let mut model = slot
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;
        Ok(f(&mut model))
    }
}

/// Local ONNX embedding model served by fastembed. Each loaded copy runs
/// one embedding call at a time, so parallelism is bounded by the number
/// of instances.
pub struct FastEmbedManager {
    models: ModelPool<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

/// Models selectable by name, with their output dimension
const MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
];

fn lookup(name: &str) -> Option<(&'static str, EmbeddingModel, usize)> {
    MODELS
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(name))
        .map(|(known, model, dim)| (*known, model.clone(), *dim))
}

impl FastEmbedManager {
    /// Create a manager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::from_model_name("all-MiniLM-L6-v2")
    }

    /// Create a manager from a configured model name
    pub fn from_model_name(name: &str) -> Result<Self> {
        Self::with_instances(name, 1)
    }

    /// Create a manager holding `instances` copies of the named model
    pub fn with_instances(name: &str, instances: usize) -> Result<Self> {
        let (canonical, model, dimension) = lookup(name).ok_or_else(|| {
            EmbeddingError::InitializationFailed(format!(
                "unknown model '{}', expected one of: {}",
                name,
                MODELS.iter().map(|(n, _, _)| *n).collect::<Vec<_>>().join(", ")
            ))
        })?;
        let instances = instances.max(1);
        tracing::info!("Initializing FastEmbed model: {} ({} instances)", canonical, instances);

        let mut models = Vec::with_capacity(instances);
        for _ in 0..instances {
            let mut options = InitOptions::default();
            options.model_name = model.clone();
            options.show_download_progress = models.is_empty();

            let embedding_model = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::InitializationFailed(e.to_string()))
                .context("Failed to initialize FastEmbed model")?;
            models.push(embedding_model);
        }

        Ok(Self {
            models: ModelPool::new(models),
            dimension,
            model_name: canonical.to_string(),
        })
    }

    /// Output dimension of a known model name
    pub fn dimension_for(name: &str) -> Option<usize> {
        lookup(name).map(|(_, _, dim)| dim)
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let embeddings = self
            .models
            .with(|model| model.embed(texts, None))?
            .map_err(|e| EmbeddingError::GenerationFailed(e.to_string()))?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_for_known_models() {
        assert_eq!(FastEmbedManager::dimension_for("all-MiniLM-L6-v2"), Some(384));
        assert_eq!(FastEmbedManager::dimension_for("ALL-MINILM-L12-V2"), Some(384));
        assert_eq!(FastEmbedManager::dimension_for("bge-base-en-v1.5"), Some(768));
        assert_eq!(FastEmbedManager::dimension_for("text-embedding-3-large"), None);
    }

    #[test]
    fn test_pool_prefers_an_idle_instance() {
        let pool = ModelPool::new(vec![0u32, 0u32]);
        {
            let _busy = pool.slots[0].lock().unwrap();
            pool.with(|calls| *calls += 1).unwrap();
        }
        pool.with(|calls| *calls += 10).unwrap();

        assert_eq!(*pool.slots[0].lock().unwrap(), 10);
        assert_eq!(*pool.slots[1].lock().unwrap(), 1);
    }

    #[test]
    fn test_pool_of_one_serializes_calls() {
        let pool = std::sync::Arc::new(ModelPool::new(vec![Vec::<usize>::new()]));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pool = pool.clone();
                std::thread::spawn(move || pool.with(|log| log.push(i)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(pool.slots[0].lock().unwrap().len(), 4);
    }

    #[test]
    fn test_unknown_model_fails_before_download() {
        let err = FastEmbedManager::from_model_name("no-such-model").err().unwrap();
        assert!(format!("{:#}", err).contains("unknown model 'no-such-model'"));
    }

    #[test]
    #[ignore = "downloads the embedding model"]
    fn test_embedding_generation() {
        let manager = FastEmbedManager::new().unwrap();
        let texts = vec![
            "fn main() { println!(\"Hello, world!\"); }".to_string(),
            "pub struct Vector { x: f32, y: f32 }".to_string(),
        ];

        let embeddings = manager.embed_batch(texts).unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 384);
        assert_eq!(manager.model_name(), "all-MiniLM-L6-v2");
    }

    #[test]
    #[ignore = "downloads the embedding model"]
    fn test_empty_batch() {
        let manager = FastEmbedManager::new().unwrap();
        assert!(manager.embed_batch(vec![]).unwrap().is_empty());
    }
}
