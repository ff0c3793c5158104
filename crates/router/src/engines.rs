use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::llm::{ChatEngine, LlmClient, QueryEngine};

/// Generation parameters that participate in the cache key. Two requests
/// with the same model but different parameters must not share a handle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineOptions {
    pub temperature: f32,
    pub num_ctx: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { temperature: 0.0, num_ctx: 2048 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct EngineKey {
    model: String,
    temperature_bits: u32,
    num_ctx: u32,
}

impl EngineKey {
    fn new(model: &str, options: &EngineOptions) -> Self {
        Self {
            model: model.to_string(),
            temperature_bits: options.temperature.to_bits(),
            num_ctx: options.num_ctx,
        }
    }
}

/// Constructs the expensive handles. Injected so the server wires real
/// transports and tests count constructions.
pub trait EngineFactory: Send + Sync {
    fn completion_client(&self, model: &str, options: &EngineOptions) -> Result<Arc<dyn LlmClient>>;
    fn chat_engine(&self, model: &str, options: &EngineOptions) -> Result<Arc<dyn ChatEngine>>;
    fn query_engine(&self, model: &str, options: &EngineOptions) -> Result<Arc<dyn QueryEngine>>;
}

struct Slot<T: ?Sized> {
    key: EngineKey,
    handle: Arc<T>,
    last_used: u64,
}

/// Bounded reuse of constructed model-client and retrieval-engine handles.
/// One shard per operation kind; each shard is a fixed-capacity LRU list.
/// Lookup-or-construct runs under the shard lock, so at most one handle is
/// ever constructed per distinct key while that key remains cached.
pub struct EngineCache {
    capacity: usize,
    clock: AtomicU64,
    factory: Arc<dyn EngineFactory>,
    completion: Mutex<Vec<Slot<dyn LlmClient>>>,
    chat: Mutex<Vec<Slot<dyn ChatEngine>>>,
    query: Mutex<Vec<Slot<dyn QueryEngine>>>,
}

impl EngineCache {
    pub fn new(capacity: usize, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            factory,
            completion: Mutex::new(Vec::new()),
            chat: Mutex::new(Vec::new()),
            query: Mutex::new(Vec::new()),
        }
    }

    pub fn completion_client(
        &self,
        model: &str,
        options: &EngineOptions,
    ) -> Result<Arc<dyn LlmClient>> {
        let factory = Arc::clone(&self.factory);
        self.lookup_or_construct(&self.completion, EngineKey::new(model, options), || {
            factory.completion_client(model, options)
        })
    }

    pub fn chat_engine(&self, model: &str, options: &EngineOptions) -> Result<Arc<dyn ChatEngine>> {
        let factory = Arc::clone(&self.factory);
        self.lookup_or_construct(&self.chat, EngineKey::new(model, options), || {
            factory.chat_engine(model, options)
        })
    }

    pub fn query_engine(&self, model: &str, options: &EngineOptions) -> Result<Arc<dyn QueryEngine>> {
        let factory = Arc::clone(&self.factory);
        self.lookup_or_construct(&self.query, EngineKey::new(model, options), || {
            factory.query_engine(model, options)
        })
    }

    fn lookup_or_construct<T: ?Sized>(
        &self,
        shard: &Mutex<Vec<Slot<T>>>,
        key: EngineKey,
        build: impl FnOnce() -> Result<Arc<T>>,
    ) -> Result<Arc<T>> {
        let mut guard = shard.lock().expect("engine cache lock poisoned");
        let tick = self.clock.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(slot) = guard.iter_mut().find(|slot| slot.key == key) {
            slot.last_used = tick;
            return Ok(Arc::clone(&slot.handle));
        }

        // Construction stays under the lock: concurrent requests for the
        // same key must observe exactly one handle.
        let handle = build()?;

        if guard.len() >= self.capacity {
            if let Some(evict_index) = guard
                .iter()
                .enumerate()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(index, _)| index)
            {
                guard.remove(evict_index);
            }
        }

        guard.push(Slot { key, handle: Arc::clone(&handle), last_used: tick });
        Ok(handle)
    }
}
