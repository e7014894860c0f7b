//! Снимки графа injector-ов для отладки и визуализации
//!
//! Observer передается явно (builder или `InjectorConfig::profile`) и
//! наследуется дочерними injector-ами. Каждый injector отдает один снимок
//! после загрузки своих модулей.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::providers::Provider;
use crate::token::Token;

/// Получает снимок каждого созданного injector-а
pub trait InjectorObserver: Send + Sync {
    fn injector_created(&self, snapshot: &InjectorSnapshot);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySnapshot {
    /// id токена; `None` для параметра без токена
    pub token: Option<String>,
    pub is_promise: bool,
    pub is_lazy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSnapshot {
    pub id: String,
    pub name: String,
    pub is_promise: bool,
    pub dependencies: Vec<DependencySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectorSnapshot {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub providers: BTreeMap<String, ProviderSnapshot>,
}

impl InjectorSnapshot {
    pub(crate) fn capture(
        id: u64,
        name: &str,
        parent_id: Option<u64>,
        providers: &HashMap<Token, Arc<Provider>>,
    ) -> Self {
        let mut snapshots = BTreeMap::new();

        // Injector всегда может предоставить сам себя
        let injector = Token::injector();
        snapshots.insert(
            injector.id().to_string(),
            ProviderSnapshot {
                id: injector.id().to_string(),
                name: injector.name().to_string(),
                is_promise: false,
                dependencies: Vec::new(),
            },
        );

        for (token, provider) in providers {
            let snapshot = ProviderSnapshot {
                id: token.id().to_string(),
                name: token.name().to_string(),
                is_promise: provider.is_promise,
                dependencies: provider
                    .params
                    .iter()
                    .map(|param| DependencySnapshot {
                        token: param.token.as_ref().map(|t| t.id().to_string()),
                        is_promise: param.is_promise,
                        is_lazy: param.is_lazy,
                    })
                    .collect(),
            };
            snapshots.insert(snapshot.id.clone(), snapshot);
        }

        Self {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: parent_id.map(|id| id.to_string()),
            providers: snapshots,
        }
    }
}

/// Собирает снимки в памяти
#[derive(Debug, Default)]
pub struct GraphRecorder {
    injectors: Mutex<Vec<InjectorSnapshot>>,
}

impl GraphRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<InjectorSnapshot> {
        self.injectors.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.injectors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.injectors.lock().is_empty()
    }

    /// Весь граф одним JSON документом
    pub fn to_json(&self) -> serde_json::Result<String> {
        let injectors = self.injectors.lock();
        serde_json::to_string_pretty(&serde_json::json!({ "injectors": &*injectors }))
    }
}

impl InjectorObserver for GraphRecorder {
    fn injector_created(&self, snapshot: &InjectorSnapshot) {
        self.injectors.lock().push(snapshot.clone());
    }
}

/// Пишет снимки в tracing (target `di::profiler`)
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl InjectorObserver for TracingObserver {
    fn injector_created(&self, snapshot: &InjectorSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(json) => debug!(target: "di::profiler", injector = %snapshot.name, "{}", json),
            Err(e) => warn!(target: "di::profiler", "Failed to serialize injector snapshot: {}", e),
        }
    }
}
