//! Аргументы конструктора: разрешенные зависимости в порядке объявления

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::errors::{DIResult, InjectError};
use crate::instance::{Instance, Promise, Resolved};
use crate::lazy::LazyFactory;
use crate::providers::SuperConstructor;

/// Разрешенные аргументы, передаваемые конструктору или фабрике
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Resolved>,
}

impl Args {
    pub fn new(values: Vec<Resolved>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resolved> {
        self.values.iter()
    }

    /// Аргумент как есть
    pub fn resolved(&self, index: usize) -> DIResult<&Resolved> {
        self.values
            .get(index)
            .ok_or_else(|| InjectError::invalid_argument(index, "an argument"))
    }

    pub fn instance(&self, index: usize) -> DIResult<Instance> {
        self.resolved(index)?
            .as_instance()
            .cloned()
            .ok_or_else(|| InjectError::invalid_argument(index, "an instance"))
    }

    /// Экземпляр, приведенный к типу `T`
    pub fn get<T>(&self, index: usize) -> DIResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.instance(index)?
            .downcast::<T>()
            .map_err(|_| InjectError::invalid_argument(index, type_name::<T>()))
    }

    /// Promise-зависимость.
    ///
    /// При отложенной инстанциации все зависимости приходят уже разрешенными,
    /// поэтому готовый экземпляр тоже отдается как promise.
    pub fn promise(&self, index: usize) -> DIResult<Promise> {
        match self.resolved(index)? {
            Resolved::Promise(promise) => Ok(promise.clone()),
            Resolved::Instance(instance) => Ok(Promise::ready(instance.clone())),
            Resolved::Lazy(_) => Err(InjectError::invalid_argument(index, "a promise")),
        }
    }

    pub fn lazy(&self, index: usize) -> DIResult<LazyFactory> {
        self.resolved(index)?
            .clone()
            .into_lazy()
            .ok_or_else(|| InjectError::invalid_argument(index, "a lazy factory"))
    }

    /// Связанный конструктор родительского класса
    pub fn super_constructor(&self, index: usize) -> DIResult<SuperConstructor> {
        let instance = self.instance(index)?;
        instance
            .downcast::<SuperConstructor>()
            .map(|ctor| (*ctor).clone())
            .map_err(|_| InjectError::invalid_argument(index, "a super constructor"))
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}
