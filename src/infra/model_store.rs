// ============================================================
// Layer 6 — Model Store
// ============================================================
// Finds, loads, and caches the T5 model for the whole process.
//
// Where the files come from:
//   - a local directory (--model-dir), or
//   - the HuggingFace hub (model id + revision), downloaded
//     once into the hub cache by hf-hub
//
//   <model dir or hub snapshot>/
//     config.json        ← T5 architecture (d_model, layers, ids)
//     tokenizer.json     ← SentencePiece tokenizer, HF format
//     model.safetensors  ← weights
//
// SharedModel is the process-wide cache: one Mutex around an
// Option<Arc<…>>. The first acquire() loads while holding the
// lock, so concurrent first calls wait for that one load
// instead of racing. A failed load leaves the slot empty and
// the next call tries again. initialize() is the same call
// under an explicit name, used to preload before serving.
//
// Reference: hf-hub crate docs (sync Api)
//            candle-transformers T5 example (VarBuilder loading)

use anyhow::{anyhow, bail, Context, Result};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::t5::{self, T5ForConditionalGeneration};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Instant,
};

use crate::domain::traits::{AnswerGenerator, ModelProvider};
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::generator::{GenerationSettings, T5Generator};

pub const DEFAULT_MODEL_ID: &str = "google/flan-t5-base";
pub const DEFAULT_REVISION: &str = "main";

// ─── ModelSource ──────────────────────────────────────────────────────────────
/// Where to find the model files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSource {
    pub model_id:  String,
    pub revision:  String,
    /// When set, files are read from here and the hub is never contacted
    pub local_dir: Option<PathBuf>,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self {
            model_id:  DEFAULT_MODEL_ID.to_string(),
            revision:  DEFAULT_REVISION.to_string(),
            local_dir: None,
        }
    }
}

/// Resolved paths of the three files a T5 model needs
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub config:    PathBuf,
    pub tokenizer: PathBuf,
    pub weights:   PathBuf,
}

impl ModelSource {
    /// Locate the model files, downloading them if needed
    pub fn resolve(&self) -> Result<ModelFiles> {
        match &self.local_dir {
            Some(dir) => Self::resolve_local(dir),
            None      => self.resolve_hub(),
        }
    }

    fn resolve_local(dir: &Path) -> Result<ModelFiles> {
        let files = ModelFiles {
            config:    dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights:   dir.join("model.safetensors"),
        };
        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.exists() {
                bail!("Model file '{}' not found", path.display());
            }
        }
        Ok(files)
    }

    fn resolve_hub(&self) -> Result<ModelFiles> {
        tracing::info!("Fetching '{}' ({}) from the hub", self.model_id, self.revision);
        let api  = Api::new().context("Cannot initialise hf-hub client")?;
        let repo = api.repo(Repo::with_revision(
            self.model_id.clone(),
            RepoType::Model,
            self.revision.clone(),
        ));

        let get = |file: &str| {
            repo.get(file)
                .with_context(|| format!("Cannot fetch '{file}' from '{}'", self.model_id))
        };
        Ok(ModelFiles {
            config:    get("config.json")?,
            tokenizer: get("tokenizer.json")?,
            weights:   get("model.safetensors")?,
        })
    }
}

/// Build a ready-to-use T5Generator from a model source.
pub fn load_generator(source: &ModelSource, settings: GenerationSettings) -> Result<T5Generator> {
    let files  = source.resolve()?;
    let device = Device::cuda_if_available(0)?;

    // ── Step 1: architecture ──────────────────────────────────────────────────
    let config_json = fs::read_to_string(&files.config)
        .with_context(|| format!("Cannot read '{}'", files.config.display()))?;
    let mut config: t5::Config = serde_json::from_str(&config_json)
        .with_context(|| format!("Invalid T5 config '{}'", files.config.display()))?;
    // Beam search re-feeds the whole prefix each step
    config.use_cache = false;

    // ── Step 2: tokenizer with the input truncation policy ────────────────────
    let tokenizer = TokenizerStore::new(&files.tokenizer).load(settings.max_input_tokens)?;

    // ── Step 3: weights ───────────────────────────────────────────────────────
    let weights = fs::read(&files.weights)
        .with_context(|| format!("Cannot read '{}'", files.weights.display()))?;
    let vb    = VarBuilder::from_buffered_safetensors(weights, DType::F32, &device)?;
    let model = T5ForConditionalGeneration::load(vb, &config)
        .with_context(|| format!("Cannot build T5 from '{}'", files.weights.display()))?;

    tracing::info!("Model '{}' ready on {:?}", source.model_id, device);
    Ok(T5Generator::new(model, &config, tokenizer, device, settings))
}

// ─── SharedModel ──────────────────────────────────────────────────────────────
type Loader = Box<dyn Fn() -> Result<Arc<dyn AnswerGenerator>> + Send + Sync>;

/// Process-wide, load-once handle to the answer generator.
pub struct SharedModel {
    slot:   Mutex<Option<Arc<dyn AnswerGenerator>>>,
    loader: Loader,
}

impl SharedModel {
    /// Lazily load a T5 model from `source` on first use
    pub fn new(source: ModelSource, settings: GenerationSettings) -> Self {
        Self::with_loader(move || {
            let generator: Arc<dyn AnswerGenerator> =
                Arc::new(load_generator(&source, settings.clone())?);
            Ok(generator)
        })
    }

    /// Use any loader; the result is cached exactly like the T5 model
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn AnswerGenerator>> + Send + Sync + 'static,
    {
        Self { slot: Mutex::new(None), loader: Box::new(loader) }
    }

    /// Load the model now if it is not loaded yet, and return it
    pub fn initialize(&self) -> Result<Arc<dyn AnswerGenerator>> {
        let mut slot = self.slot
            .lock()
            .map_err(|_| anyhow!("model cache lock poisoned"))?;

        if let Some(generator) = slot.as_ref() {
            return Ok(Arc::clone(generator));
        }

        let started   = Instant::now();
        let generator = (self.loader)()?;
        tracing::info!("Model loaded in {:.1}s", started.elapsed().as_secs_f32());

        *slot = Some(Arc::clone(&generator));
        Ok(generator)
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl ModelProvider for SharedModel {
    fn acquire(&self) -> Result<Arc<dyn AnswerGenerator>> {
        self.initialize()
    }
}
