//! Результаты разрешения: готовый экземпляр, promise или lazy фабрика

use std::any::{type_name, Any};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::errors::{DIResult, InjectError};
use crate::lazy::LazyFactory;

/// Экземпляр в кэше injector-а
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Отложенный экземпляр.
///
/// Clone-able shared future: все клоны получают один и тот же результат.
/// Как и любой future, начинает выполняться при первом poll.
#[derive(Clone)]
pub struct Promise {
    inner: Shared<BoxFuture<'static, DIResult<Instance>>>,
}

impl Promise {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = DIResult<Instance>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Обернуть пользовательский future; ошибка превращается в `Rejected`
    pub fn from_future<T, F>(future: F) -> Self
    where
        T: Any + Send + Sync,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::new(async move {
            match future.await {
                Ok(value) => Ok(Arc::new(value) as Instance),
                Err(e) => Err(InjectError::rejected(format!("{:#}", e))),
            }
        })
    }

    /// Уже разрешенный promise
    pub fn ready(instance: Instance) -> Self {
        Self::new(futures::future::ready(Ok(instance)))
    }

    pub fn rejected(error: InjectError) -> Self {
        Self::new(futures::future::ready(Err(error)))
    }

    /// Дождаться значения и привести к типу `T`
    pub async fn downcast<T>(self) -> DIResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let instance = self.await?;
        instance
            .downcast::<T>()
            .map_err(|_| InjectError::type_mismatch("promise value", type_name::<T>()))
    }

    /// Результат уже доступен
    pub fn is_settled(&self) -> bool {
        self.inner.peek().is_some()
    }
}

impl Future for Promise {
    type Output = DIResult<Instance>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// То, что возвращает полная форма `Injector::resolve`
#[derive(Clone)]
pub enum Resolved {
    Instance(Instance),
    Promise(Promise),
    Lazy(LazyFactory),
}

impl Resolved {
    /// Обернуть значение в экземпляр
    pub fn value<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Resolved::Instance(Arc::new(value))
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Resolved::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Resolved::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn into_promise(self) -> Option<Promise> {
        match self {
            Resolved::Promise(promise) => Some(promise),
            _ => None,
        }
    }

    pub fn into_lazy(self) -> Option<LazyFactory> {
        match self {
            Resolved::Lazy(lazy) => Some(lazy),
            _ => None,
        }
    }

    pub fn is_promise(&self) -> bool {
        matches!(self, Resolved::Promise(_))
    }

    /// Привести готовый экземпляр к типу `T`
    pub fn downcast<T>(self) -> DIResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        match self {
            Resolved::Instance(instance) => instance
                .downcast::<T>()
                .map_err(|_| InjectError::type_mismatch("instance", type_name::<T>())),
            other => Err(InjectError::type_mismatch(other.kind(), type_name::<T>())),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Resolved::Instance(_) => "instance",
            Resolved::Promise(_) => "promise",
            Resolved::Lazy(_) => "lazy factory",
        }
    }

    /// Результат promise-провайдера всегда promise
    pub(crate) fn into_promise_value(self) -> Promise {
        match self {
            Resolved::Instance(instance) => Promise::ready(instance),
            Resolved::Promise(promise) => promise,
            Resolved::Lazy(lazy) => Promise::ready(Arc::new(lazy)),
        }
    }

    /// Результат синхронного провайдера всегда экземпляр: promise или lazy,
    /// возвращенные таким провайдером, становятся обычным значением
    pub(crate) fn into_sync_value(self) -> Resolved {
        match self {
            Resolved::Instance(instance) => Resolved::Instance(instance),
            Resolved::Promise(promise) => Resolved::Instance(Arc::new(promise)),
            Resolved::Lazy(lazy) => Resolved::Instance(Arc::new(lazy)),
        }
    }

    /// Дождаться promise; экземпляры и lazy фабрики проходят как есть
    pub(crate) async fn settle(self) -> DIResult<Resolved> {
        match self {
            Resolved::Promise(promise) => promise.await.map(Resolved::Instance),
            other => Ok(other),
        }
    }
}

impl From<Instance> for Resolved {
    fn from(instance: Instance) -> Self {
        Resolved::Instance(instance)
    }
}

impl From<Promise> for Resolved {
    fn from(promise: Promise) -> Self {
        Resolved::Promise(promise)
    }
}

impl From<LazyFactory> for Resolved {
    fn from(lazy: LazyFactory) -> Self {
        Resolved::Lazy(lazy)
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Instance(_) => f.write_str("Resolved::Instance(..)"),
            Resolved::Promise(promise) => write!(f, "Resolved::{:?}", promise),
            Resolved::Lazy(lazy) => write!(f, "Resolved::{:?}", lazy),
        }
    }
}
