//! Injector: реестр провайдеров, кэш экземпляров и ссылка на родителя
//!
//! На каждый токен в одном injector-е существует не более одного
//! экземпляра. Реестр заполняется при создании и дальше меняется только
//! при продвижении провайдера по умолчанию (класс или фабрика, которые
//! никто не зарегистрировал явно).
//!
//! Блокировки реестра и кэша никогда не удерживаются во время вызова
//! пользовательского кода или рекурсивного разрешения.

use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::InjectorConfig;
use crate::errors::{DIResult, InjectError, ResolvingChain};
use crate::instance::{Instance, Promise, Resolved};
use crate::lazy::LazyFactory;
use crate::module::Module;
use crate::profiler::{InjectorObserver, InjectorSnapshot, TracingObserver};
use crate::providers::Provider;
use crate::token::{next_id, Scope, Token};

/// Закэшированный результат вместе с типом провайдера, который его создал
struct CachedInstance {
    value: Resolved,
    is_promise: bool,
}

struct InjectorInner {
    id: u64,
    name: String,
    parent: Option<Injector>,
    providers: RwLock<HashMap<Token, Arc<Provider>>>,
    cache: RwLock<HashMap<Token, CachedInstance>>,
    /// Scope маркеры, экземпляры которых этот injector создает сам
    scopes: Vec<Scope>,
    observer: Option<Arc<dyn InjectorObserver>>,
}

/// Контейнер зависимостей одного уровня жизни.
///
/// Дешево клонируется: все клоны указывают на один и тот же узел.
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

/// Статистика injector-а
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectorStats {
    pub name: String,
    pub provider_count: usize,
    pub cached_instances: usize,
    /// Число предков
    pub depth: usize,
}

impl Injector {
    /// Корневой injector с заданными модулями
    pub fn new(modules: Vec<Module>) -> DIResult<Self> {
        Self::builder().modules(modules).build()
    }

    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::default()
    }

    fn create(
        name: Option<String>,
        parent: Option<Injector>,
        mut providers: HashMap<Token, Arc<Provider>>,
        scopes: Vec<Scope>,
        modules: Vec<Module>,
        observer: Option<Arc<dyn InjectorObserver>>,
    ) -> DIResult<Self> {
        let id = next_id();
        let name = match (name, &parent) {
            (Some(name), _) => name,
            (None, Some(parent)) => format!("{}/{}", parent.name(), id),
            (None, None) => InjectorConfig::default().name,
        };

        let mut loaded = HashSet::new();
        for module in modules {
            let (token, provider) = module.into_provider()?;
            if !loaded.insert(token.clone()) {
                warn!("Token {} is already registered in {}, overwriting", token, name);
            }
            debug!("Registered {} in {}", token, name);
            providers.insert(token, Arc::new(provider));
        }

        if let Some(observer) = &observer {
            let parent_id = parent.as_ref().map(Injector::id);
            observer.injector_created(&InjectorSnapshot::capture(id, &name, parent_id, &providers));
        }

        debug!(
            "Created injector {} with {} providers and {} forced scopes",
            name,
            providers.len(),
            scopes.len()
        );

        Ok(Self {
            inner: Arc::new(InjectorInner {
                id,
                name,
                parent,
                providers: RwLock::new(providers),
                cache: RwLock::new(HashMap::new()),
                scopes,
                observer,
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Injector> {
        self.inner.parent.as_ref()
    }

    /// Зарегистрирован ли провайдер для токена здесь или в одном из предков
    pub fn has_provider_for(&self, token: &Token) -> bool {
        if self.inner.providers.read().contains_key(token) {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .map(|parent| parent.has_provider_for(token))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> InjectorStats {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(injector) = current {
            depth += 1;
            current = injector.parent();
        }

        InjectorStats {
            name: self.inner.name.clone(),
            provider_count: self.inner.providers.read().len(),
            cached_instances: self.inner.cache.read().len(),
            depth,
        }
    }

    /// Синхронно получить экземпляр
    pub fn get(&self, token: &Token) -> DIResult<Instance> {
        self.resolve(Some(token), &mut Vec::new(), false, false)?
            .into_instance()
            .ok_or_else(|| InjectError::type_mismatch(token.name(), "instance"))
    }

    /// Получить экземпляр, приведенный к типу `T`
    pub fn get_as<T>(&self, token: &Token) -> DIResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.get(token)?
            .downcast::<T>()
            .map_err(|_| InjectError::type_mismatch(token.name(), type_name::<T>()))
    }

    /// Получить экземпляр как promise; работает и для синхронных провайдеров
    pub fn get_promise(&self, token: &Token) -> DIResult<Promise> {
        self.resolve(Some(token), &mut Vec::new(), true, false)?
            .into_promise()
            .ok_or_else(|| InjectError::type_mismatch(token.name(), "promise"))
    }

    /// Lazy фабрика для токена
    pub fn lazy(&self, token: &Token) -> LazyFactory {
        LazyFactory::new(self.clone(), token.clone(), false)
    }

    /// Полная форма разрешения.
    ///
    /// `path` - токены, которые сейчас находятся в процессе создания; при
    /// успешном возврате он восстанавливается в исходное состояние.
    pub fn resolve(
        &self,
        token: Option<&Token>,
        path: &mut Vec<Token>,
        want_promise: bool,
        want_lazy: bool,
    ) -> DIResult<Resolved> {
        let Some(token) = token else {
            return Err(InjectError::InvalidToken {
                chain: ResolvingChain::with_missing(path),
            });
        };

        if token.is_injector() {
            let injector: Instance = Arc::new(self.clone());
            return Ok(if want_promise {
                Resolved::Promise(Promise::ready(injector))
            } else {
                Resolved::Instance(injector)
            });
        }

        if want_lazy {
            return Ok(Resolved::Lazy(LazyFactory::new(self.clone(), token.clone(), want_promise)));
        }

        if let Some(resolved) = self.from_cache(token, path, want_promise)? {
            return Ok(resolved);
        }

        let provider = self.inner.providers.read().get(token).cloned();
        let Some(provider) = provider else {
            if token.is_constructible() && !self.has_provider_for(token) {
                if let Some(provider) = Provider::from_token(token)? {
                    return self.instantiate_default_provider(
                        Arc::new(provider),
                        token,
                        path,
                        want_promise,
                        want_lazy,
                    );
                }
            }

            return match &self.inner.parent {
                Some(parent) => parent.resolve(Some(token), path, want_promise, want_lazy),
                None => Err(InjectError::NoProviderFound {
                    token: token.name().to_string(),
                    chain: ResolvingChain::with_token(path, token),
                }),
            };
        };

        if path.contains(token) {
            return Err(InjectError::CyclicDependency {
                chain: ResolvingChain::with_token(path, token),
            });
        }

        path.push(token.clone());

        let deferred = want_promise && provider.params.iter().any(|param| !param.is_promise);
        let mut args = Vec::with_capacity(provider.params.len());
        for param in &provider.params {
            let want = deferred || param.is_promise;
            match self.resolve(param.token.as_ref(), path, want, param.is_lazy) {
                Ok(arg) => args.push(arg),
                Err(e) => {
                    path.pop();
                    return Err(e);
                }
            }
        }

        let chain = ResolvingChain::from_path(path);
        path.pop();

        if deferred {
            debug!("Deferring instantiation of {} until dependencies settle", token);
            let injector = self.clone();
            let token = token.clone();
            return Ok(Resolved::Promise(Promise::new(async move {
                let args = try_join_all(args.into_iter().map(Resolved::settle)).await?;
                let created = injector.create_and_cache(&provider, &token, args, &chain)?;
                created.into_promise_value().await
            })));
        }

        let created = self.create_and_cache(&provider, token, args, &chain)?;

        if provider.is_promise && !want_promise {
            return Err(InjectError::SyncOnPromiseProvider {
                token: token.name().to_string(),
                chain,
            });
        }

        Ok(match created {
            Resolved::Instance(instance) if want_promise => {
                Resolved::Promise(Promise::ready(instance))
            }
            other => other,
        })
    }

    fn from_cache(
        &self,
        token: &Token,
        path: &[Token],
        want_promise: bool,
    ) -> DIResult<Option<Resolved>> {
        let cache = self.inner.cache.read();
        let Some(cached) = cache.get(token) else {
            return Ok(None);
        };
        trace!("Cache hit for {} in {}", token, self.inner.name);

        if cached.is_promise && !want_promise {
            return Err(InjectError::SyncOnPromiseProvider {
                token: token.name().to_string(),
                chain: ResolvingChain::with_token(path, token),
            });
        }

        let value = cached.value.clone();
        Ok(Some(if want_promise {
            Resolved::Promise(value.into_promise_value())
        } else {
            value
        }))
    }

    /// Зарегистрировать провайдер по умолчанию в корне или в ближайшем
    /// injector-е, который принудительно создает экземпляры его scope
    fn instantiate_default_provider(
        &self,
        provider: Arc<Provider>,
        token: &Token,
        path: &mut Vec<Token>,
        want_promise: bool,
        want_lazy: bool,
    ) -> DIResult<Resolved> {
        if let Some(parent) = &self.inner.parent {
            let forced = self.inner.scopes.iter().any(|scope| provider.has_scope(scope));
            if !forced {
                return parent.instantiate_default_provider(
                    provider,
                    token,
                    path,
                    want_promise,
                    want_lazy,
                );
            }
        }

        debug!(
            "Using default provider {} ({} constructors) in {}",
            provider.name(),
            provider.constructor_count(),
            self.inner.name
        );
        self.inner.providers.write().insert(token.clone(), provider);
        self.resolve(Some(token), path, want_promise, want_lazy)
    }

    fn create_and_cache(
        &self,
        provider: &Provider,
        token: &Token,
        args: Vec<Resolved>,
        chain: &ResolvingChain,
    ) -> DIResult<Resolved> {
        let created = provider.create(args).map_err(|e| {
            debug!("Failed to instantiate {}: {:#}", token, e);
            InjectError::Instantiation {
                token: token.name().to_string(),
                chain: chain.clone(),
                original: format!("{:#}", e),
            }
        })?;

        if provider.is_transient() {
            debug!("Skipping cache for transient {}", token);
        } else {
            self.inner.cache.write().insert(
                token.clone(),
                CachedInstance {
                    value: created.clone(),
                    is_promise: provider.is_promise,
                },
            );
            debug!("Instantiated {} in {}", token, self.inner.name);
        }

        Ok(created)
    }

    /// Дочерний injector с дополнительными модулями.
    ///
    /// Провайдеры, помеченные одним из `force_new_instances_of` (и всегда
    /// transient), копируются в дочерний реестр, поэтому ребенок создает
    /// свои экземпляры вместо общих экземпляров предков.
    pub fn create_child(
        &self,
        modules: Vec<Module>,
        force_new_instances_of: &[Scope],
    ) -> DIResult<Injector> {
        let mut scopes = force_new_instances_of.to_vec();
        scopes.push(Scope::transient());

        let mut forced = HashMap::new();
        self.collect_providers_with_annotation(&scopes, &mut forced);

        Injector::create(
            None,
            Some(self.clone()),
            forced,
            scopes,
            modules,
            self.inner.observer.clone(),
        )
    }

    /// Собрать провайдеры с любым из scope маркеров, от ближнего к дальнему
    fn collect_providers_with_annotation(
        &self,
        scopes: &[Scope],
        collected: &mut HashMap<Token, Arc<Provider>>,
    ) {
        {
            let providers = self.inner.providers.read();
            for (token, provider) in providers.iter() {
                if !collected.contains_key(token)
                    && scopes.iter().any(|scope| provider.has_scope(scope))
                {
                    collected.insert(token.clone(), provider.clone());
                }
            }
        }

        if let Some(parent) = &self.inner.parent {
            parent.collect_providers_with_annotation(scopes, collected);
        }
    }
}

impl PartialEq for Injector {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Injector {}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("providers", &self.inner.providers.read().len())
            .field("scopes", &self.inner.scopes)
            .finish()
    }
}

/// Builder корневого (или явно привязанного к родителю) injector-а
#[derive(Default)]
pub struct InjectorBuilder {
    name: Option<String>,
    profile: bool,
    modules: Vec<Module>,
    parent: Option<Injector>,
    observer: Option<Arc<dyn InjectorObserver>>,
}

impl InjectorBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn config(mut self, config: InjectorConfig) -> Self {
        self.name = Some(config.name);
        self.profile = config.profile;
        self
    }

    pub fn module(mut self, module: impl Into<Module>) -> Self {
        self.modules.push(module.into());
        self
    }

    pub fn modules(mut self, modules: impl IntoIterator<Item = Module>) -> Self {
        self.modules.extend(modules);
        self
    }

    /// Родитель без принудительных scope (как `new Injector(modules, parent)`)
    pub fn parent(mut self, parent: &Injector) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn observer(mut self, observer: Arc<dyn InjectorObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> DIResult<Injector> {
        let observer = self
            .observer
            .or_else(|| self.parent.as_ref().and_then(|p| p.inner.observer.clone()))
            .or_else(|| {
                self.profile
                    .then(|| Arc::new(TracingObserver) as Arc<dyn InjectorObserver>)
            });

        Injector::create(
            self.name,
            self.parent,
            HashMap::new(),
            Vec::new(),
            self.modules,
            observer,
        )
    }
}
