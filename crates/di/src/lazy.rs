//! Lazy зависимость: разрешение откладывается до вызова
//!
//! Вызов с локальными парами `(token, value)` создает короткоживущий
//! дочерний injector, в котором эти пары зарегистрированы как обычные
//! value-модули, и разрешает токен уже в нем.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::DIResult;
use crate::injector::Injector;
use crate::instance::Resolved;
use crate::module::Module;
use crate::token::Token;

/// Фабрика, разрешающая токен по требованию
#[derive(Clone)]
pub struct LazyFactory {
    injector: Injector,
    token: Token,
    want_promise: bool,
}

impl LazyFactory {
    pub(crate) fn new(injector: Injector, token: Token, want_promise: bool) -> Self {
        Self {
            injector,
            token,
            want_promise,
        }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Разрешить без локальных переопределений
    pub fn get(&self) -> DIResult<Resolved> {
        self.call(Vec::new())
    }

    /// Разрешить и привести к типу `T` (только для синхронных lazy)
    pub fn get_as<T>(&self) -> DIResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.get()?.downcast::<T>()
    }

    /// Разрешить с локальными значениями для указанных токенов.
    ///
    /// Каждый вызов начинается с пустого пути разрешения: к этому моменту
    /// класс, запросивший lazy зависимость, уже создан.
    pub fn call<I>(&self, locals: I) -> DIResult<Resolved>
    where
        I: IntoIterator<Item = (Token, Resolved)>,
    {
        let modules: Vec<Module> = locals
            .into_iter()
            .map(|(token, value)| Module::provide(&token).use_resolved(value))
            .collect();

        if modules.is_empty() {
            return self
                .injector
                .resolve(Some(&self.token), &mut Vec::new(), self.want_promise, false);
        }

        debug!(
            "Lazy {} resolves with {} local overrides",
            self.token,
            modules.len()
        );
        let injector = self.injector.create_child(modules, &[])?;
        injector.resolve(Some(&self.token), &mut Vec::new(), self.want_promise, false)
    }
}

impl fmt::Debug for LazyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFactory")
            .field("token", &self.token)
            .field("want_promise", &self.want_promise)
            .finish()
    }
}
