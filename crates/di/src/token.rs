//! Токены и маркеры scope
//!
//! Токен - непрозрачная identity, по которой injector ищет провайдера и
//! кэширует экземпляр. Сравнение только по identity (уникальный id),
//! два токена с одинаковым именем - разные токены.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use once_cell::sync::Lazy;

use crate::annotations::{ClassBuilder, ClassDef, FactoryBuilder, FactoryDef};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Общий счетчик id для токенов, scope маркеров и injector-ов
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

static INJECTOR_TOKEN: Lazy<Token> = Lazy::new(|| Token::with_kind("Injector", TokenKind::Injector));

static SUPER_CONSTRUCTOR_TOKEN: Lazy<Token> =
    Lazy::new(|| Token::with_kind("SuperConstructor", TokenKind::SuperConstructor));

static TRANSIENT_SCOPE: Lazy<Scope> = Lazy::new(|| Scope::new("TransientScope"));

pub(crate) enum TokenKind {
    /// Синтетический токен без рецепта
    Marker,
    Injector,
    SuperConstructor,
    Class(Arc<ClassDef>),
    Factory(Arc<FactoryDef>),
}

struct TokenInner {
    id: u64,
    name: String,
    kind: TokenKind,
}

/// Ключ для регистрации и разрешения зависимостей
#[derive(Clone)]
pub struct Token {
    inner: Arc<TokenInner>,
}

impl Token {
    /// Создать синтетический токен (без рецепта по умолчанию)
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, TokenKind::Marker)
    }

    pub(crate) fn with_kind(name: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                id: next_id(),
                name: name.into(),
                kind,
            }),
        }
    }

    /// Начать описание класса
    pub fn class(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// Начать описание фабрики
    pub fn factory(name: impl Into<String>) -> FactoryBuilder {
        FactoryBuilder::new(name)
    }

    /// Встроенный токен: сам injector
    pub fn injector() -> Token {
        INJECTOR_TOKEN.clone()
    }

    /// Встроенный токен: конструктор родительского класса
    pub fn super_constructor() -> Token {
        SUPER_CONSTRUCTOR_TOKEN.clone()
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_injector(&self) -> bool {
        matches!(self.inner.kind, TokenKind::Injector)
    }

    pub fn is_super_constructor(&self) -> bool {
        matches!(self.inner.kind, TokenKind::SuperConstructor)
    }

    /// Токен сам по себе умеет создавать экземпляр (класс или фабрика)
    pub fn is_constructible(&self) -> bool {
        matches!(self.inner.kind, TokenKind::Class(_) | TokenKind::Factory(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self.inner.kind, TokenKind::Class(_))
    }

    pub(crate) fn class_def(&self) -> Option<&Arc<ClassDef>> {
        match &self.inner.kind {
            TokenKind::Class(def) => Some(def),
            _ => None,
        }
    }

    pub(crate) fn factory_def(&self) -> Option<&Arc<FactoryDef>> {
        match &self.inner.kind {
            TokenKind::Factory(def) => Some(def),
            _ => None,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.id.cmp(&other.inner.id)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}#{})", self.inner.name, self.inner.id)
    }
}

/// Маркер scope: помечает классы/фабрики, которые дочерний injector
/// может принудительно пересоздать (см. `Injector::create_child`)
#[derive(Clone)]
pub struct Scope {
    id: u64,
    name: Arc<str>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: next_id(),
            name: Arc::from(name.into()),
        }
    }

    /// Встроенный scope: никогда не кэшировать
    pub fn transient() -> Scope {
        TRANSIENT_SCOPE.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_transient(&self) -> bool {
        self.id == TRANSIENT_SCOPE.id
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({})", self.name)
    }
}

/// Создать непрозрачный токен для значений, которые не являются классами
/// (например, конфигурация).
///
/// Токен - фабрика, которая всегда падает: если значение для него не было
/// зарегистрировано, разрешение завершится ошибкой
/// `No provider defined for key "<key>"`.
///
/// ```ignore
/// let config = create_token("config.token");
/// let injector = Injector::new(vec![Module::provide(&config).use_value(settings)])?;
/// ```
pub fn create_token(key: &str) -> Token {
    let key = key.to_string();
    Token::factory(key.clone()).construct_with(move |_| Err(anyhow!(no_provider_message(&key))))
}

/// Сообщение об ошибке непрозрачного токена без значения
pub fn no_provider_message(key: &str) -> String {
    format!("No provider defined for key \"{}\"", key)
}
