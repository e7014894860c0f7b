//! Описание зависимостей классов и фабрик
//!
//! Вместо декораторов и reflection - таблица дескрипторов, привязанная к
//! токену класса/фабрики:
//!
//! - `provide` - под каким токеном класс регистрирует себя и является ли он
//!   promise-провайдером;
//! - `params` - упорядоченный список зависимостей конструктора;
//! - `scopes` - маркеры scope (transient, пользовательские).
//!
//! # Пример
//!
//! ```ignore
//! static CONFIG: Lazy<Token> = Lazy::new(|| create_token("config"));
//!
//! static SERVICE: Lazy<Token> = Lazy::new(|| {
//!     Token::class("Service")
//!         .inject(&CONFIG)
//!         .construct(|args| Ok(Service { config: args.get::<Config>(0)? }))
//! });
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::args::Args;
use crate::instance::Resolved;
use crate::token::{Scope, Token, TokenKind};

/// Конструктор класса или тело фабрики
pub(crate) type Constructor = Arc<dyn Fn(&Args) -> anyhow::Result<Resolved> + Send + Sync>;

/// Описание одного параметра конструктора
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    /// `None` - токен не указан, разрешение упадет с `InvalidToken`
    pub token: Option<Token>,
    pub is_promise: bool,
    pub is_lazy: bool,
}

impl ParamDescriptor {
    pub fn inject(token: &Token) -> Self {
        Self {
            token: Some(token.clone()),
            is_promise: false,
            is_lazy: false,
        }
    }

    pub fn promise(token: &Token) -> Self {
        Self {
            token: Some(token.clone()),
            is_promise: true,
            is_lazy: false,
        }
    }

    pub fn lazy(token: &Token) -> Self {
        Self {
            token: Some(token.clone()),
            is_promise: false,
            is_lazy: true,
        }
    }

    /// Параметр без токена
    pub fn missing() -> Self {
        Self {
            token: None,
            is_promise: false,
            is_lazy: false,
        }
    }

    pub fn is_super_constructor(&self) -> bool {
        self.token
            .as_ref()
            .map(Token::is_super_constructor)
            .unwrap_or(false)
    }
}

/// Токен, под которым класс предоставляет себя
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvideAnnotation {
    pub token: Option<Token>,
    pub is_promise: bool,
}

/// Собранные аннотации класса или фабрики
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    pub provide: ProvideAnnotation,
    pub params: Vec<ParamDescriptor>,
    pub scopes: Vec<Scope>,
}

impl Annotations {
    pub fn has_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }
}

/// Описание класса: аннотации, родитель и конструктор
pub(crate) struct ClassDef {
    pub name: String,
    pub annotations: Annotations,
    pub parent: Option<Token>,
    pub constructor: Constructor,
}

/// Описание фабрики
pub(crate) struct FactoryDef {
    pub name: String,
    pub annotations: Annotations,
    pub factory: Constructor,
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("annotations", &self.annotations)
            .field("parent", &self.parent)
            .finish()
    }
}

impl fmt::Debug for FactoryDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryDef")
            .field("name", &self.name)
            .field("annotations", &self.annotations)
            .finish()
    }
}

/// Прочитать аннотации токена. Для токенов без рецепта - пустые
pub fn read_annotations(token: &Token) -> Annotations {
    if let Some(def) = token.class_def() {
        return def.annotations.clone();
    }
    if let Some(def) = token.factory_def() {
        return def.annotations.clone();
    }
    Annotations::default()
}

/// Помечен ли класс/фабрика данным scope
pub fn has_annotation(token: &Token, scope: &Scope) -> bool {
    if let Some(def) = token.class_def() {
        return def.annotations.has_scope(scope);
    }
    if let Some(def) = token.factory_def() {
        return def.annotations.has_scope(scope);
    }
    false
}

fn wrap_value<T, F>(f: F) -> Constructor
where
    T: Any + Send + Sync,
    F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
{
    Arc::new(move |args| Ok(Resolved::value(f(args)?)))
}

/// Builder описания класса
pub struct ClassBuilder {
    name: String,
    annotations: Annotations,
    parent: Option<Token>,
}

impl ClassBuilder {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Annotations::default(),
            parent: None,
        }
    }

    pub fn inject(self, token: &Token) -> Self {
        self.param(ParamDescriptor::inject(token))
    }

    pub fn inject_promise(self, token: &Token) -> Self {
        self.param(ParamDescriptor::promise(token))
    }

    pub fn inject_lazy(self, token: &Token) -> Self {
        self.param(ParamDescriptor::lazy(token))
    }

    /// Запросить конструктор родительского класса
    pub fn inject_super(self) -> Self {
        self.param(ParamDescriptor::inject(&Token::super_constructor()))
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.annotations.params.push(param);
        self
    }

    pub fn provide(mut self, token: &Token) -> Self {
        self.annotations.provide = ProvideAnnotation {
            token: Some(token.clone()),
            is_promise: false,
        };
        self
    }

    pub fn provide_promise(mut self, token: &Token) -> Self {
        self.annotations.provide = ProvideAnnotation {
            token: Some(token.clone()),
            is_promise: true,
        };
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.annotations.scopes.push(scope);
        self
    }

    /// Родительский класс (для `inject_super`)
    pub fn extends(mut self, parent: &Token) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Конструктор, возвращающий новый экземпляр
    pub fn construct<T, F>(self, f: F) -> Token
    where
        T: Any + Send + Sync,
        F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.finish(wrap_value(f))
    }

    /// Конструктор, явно возвращающий результат (другой объект или promise)
    pub fn construct_with<F>(self, f: F) -> Token
    where
        F: Fn(&Args) -> anyhow::Result<Resolved> + Send + Sync + 'static,
    {
        self.finish(Arc::new(f))
    }

    fn finish(self, constructor: Constructor) -> Token {
        let def = ClassDef {
            name: self.name.clone(),
            annotations: self.annotations,
            parent: self.parent,
            constructor,
        };
        Token::with_kind(self.name, TokenKind::Class(Arc::new(def)))
    }
}

/// Builder описания фабрики
pub struct FactoryBuilder {
    name: String,
    annotations: Annotations,
}

impl FactoryBuilder {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Annotations::default(),
        }
    }

    pub fn inject(self, token: &Token) -> Self {
        self.param(ParamDescriptor::inject(token))
    }

    pub fn inject_promise(self, token: &Token) -> Self {
        self.param(ParamDescriptor::promise(token))
    }

    pub fn inject_lazy(self, token: &Token) -> Self {
        self.param(ParamDescriptor::lazy(token))
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.annotations.params.push(param);
        self
    }

    pub fn provide_promise(mut self, token: &Token) -> Self {
        self.annotations.provide = ProvideAnnotation {
            token: Some(token.clone()),
            is_promise: true,
        };
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.annotations.scopes.push(scope);
        self
    }

    pub fn construct<T, F>(self, f: F) -> Token
    where
        T: Any + Send + Sync,
        F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.finish(wrap_value(f))
    }

    pub fn construct_with<F>(self, f: F) -> Token
    where
        F: Fn(&Args) -> anyhow::Result<Resolved> + Send + Sync + 'static,
    {
        self.finish(Arc::new(f))
    }

    fn finish(self, factory: Constructor) -> Token {
        let def = FactoryDef {
            name: self.name.clone(),
            annotations: self.annotations,
            factory,
        };
        Token::with_kind(self.name, TokenKind::Factory(Arc::new(def)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Engine;

    #[test]
    fn test_read_provide() {
        let list = Token::new("UserList");
        let fetch = Token::class("FetchUsers")
            .provide_promise(&list)
            .construct(|_| Ok(Engine));

        let annotations = read_annotations(&fetch);
        assert_eq!(annotations.provide.token, Some(list));
        assert!(annotations.provide.is_promise);
        assert!(annotations.params.is_empty());
    }

    #[test]
    fn test_read_params_in_order() {
        let a = Token::new("A");
        let b = Token::new("B");
        let c = Token::new("C");
        let class = Token::class("Consumer")
            .inject(&a)
            .inject_promise(&b)
            .inject_lazy(&c)
            .construct(|_| Ok(Engine));

        let params = read_annotations(&class).params;
        assert_eq!(
            params,
            vec![
                ParamDescriptor::inject(&a),
                ParamDescriptor::promise(&b),
                ParamDescriptor::lazy(&c),
            ]
        );
        assert!(read_annotations(&class).provide.token.is_none());
    }

    #[test]
    fn test_has_annotation() {
        let request = Scope::new("RequestScope");
        let factory = Token::factory("make_engine")
            .scope(request.clone())
            .construct(|_| Ok(Engine));

        assert!(has_annotation(&factory, &request));
        assert!(!has_annotation(&factory, &Scope::transient()));
        assert!(!has_annotation(&Token::new("plain"), &request));
        assert!(read_annotations(&Token::new("plain")).params.is_empty());
    }

    #[test]
    fn test_super_param_detection() {
        assert!(ParamDescriptor::inject(&Token::super_constructor()).is_super_constructor());
        assert!(!ParamDescriptor::missing().is_super_constructor());
    }
}
