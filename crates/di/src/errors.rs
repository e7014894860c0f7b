//! Ошибки DI контейнера
//!
//! Все ошибки разрешения собраны в одном enum [`InjectError`]. Ошибки должны
//! быть `Clone`: они проходят через shared futures ([`crate::Promise`]),
//! где один и тот же результат получают все ожидающие.
//!
//! Каждое сообщение, для которого известен путь разрешения, заканчивается
//! цепочкой вида ` (A -> B -> C)`, чтобы было видно, где именно в глубоком
//! графе произошла ошибка.

use std::fmt;

use thiserror::Error;

use crate::token::Token;

/// Результат операций DI контейнера
pub type DIResult<T> = std::result::Result<T, InjectError>;

/// Цепочка разрешения: токены от запрошенного до упавшего
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvingChain(Vec<String>);

impl ResolvingChain {
    /// Цепочка из текущего пути разрешения
    pub fn from_path(path: &[Token]) -> Self {
        Self(path.iter().map(|token| token.name().to_string()).collect())
    }

    /// Путь разрешения плюс запрошенный токен в конце
    pub fn with_token(path: &[Token], token: &Token) -> Self {
        let mut chain = Self::from_path(path);
        chain.0.push(token.name().to_string());
        chain
    }

    /// Путь разрешения плюс отсутствующий токен
    pub(crate) fn with_missing(path: &[Token]) -> Self {
        let mut chain = Self::from_path(path);
        chain.0.push(MISSING_TOKEN.to_string());
        chain
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResolvingChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Одиночный токен не несет информации о пути
        if self.0.len() > 1 {
            write!(f, " ({})", self.0.join(" -> "))?;
        }
        Ok(())
    }
}

const MISSING_TOKEN: &str = "None";

/// Основной error type для всех операций разрешения
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InjectError {
    /// Запрошен отсутствующий токен (параметр без токена)
    #[error("Invalid token \"None\" requested!{chain}")]
    InvalidToken { chain: ResolvingChain },

    /// Некорректный модуль или описание класса/фабрики
    #[error("{message}")]
    Configuration { message: String },

    /// Ни один injector в цепочке предков не знает токен
    #[error("No provider for {token}!{chain}")]
    NoProviderFound { token: String, chain: ResolvingChain },

    /// Токен уже находится на пути разрешения
    #[error("Cannot instantiate cyclic dependency!{chain}")]
    CyclicDependency { chain: ResolvingChain },

    /// Promise-провайдер запрошен синхронно
    #[error("Cannot instantiate {token} synchronously. It is provided as a promise!{chain}")]
    SyncOnPromiseProvider { token: String, chain: ResolvingChain },

    /// Пользовательский конструктор или фабрика вернули ошибку
    #[error("Error during instantiation of {token}!{chain}\nORIGINAL ERROR: {original}")]
    Instantiation {
        token: String,
        chain: ResolvingChain,
        original: String,
    },

    /// Promise, возвращенный провайдером, завершился ошибкой
    #[error("{message}")]
    Rejected { message: String },

    /// Экземпляр не удалось привести к запрошенному типу
    #[error("Cannot cast {token} to {expected}")]
    TypeMismatch { token: String, expected: String },

    /// Конструктор прочитал аргумент не тем способом
    #[error("Invalid argument #{index}: expected {expected}")]
    InvalidArgument { index: usize, expected: String },
}

impl InjectError {
    /// Create configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        InjectError::Configuration {
            message: message.into(),
        }
    }

    /// Create rejection error from a failed provider future
    pub fn rejected(message: impl Into<String>) -> Self {
        InjectError::Rejected {
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(token: impl Into<String>, expected: &str) -> Self {
        InjectError::TypeMismatch {
            token: token.into(),
            expected: expected.to_string(),
        }
    }

    pub(crate) fn invalid_argument(index: usize, expected: &str) -> Self {
        InjectError::InvalidArgument {
            index,
            expected: expected.to_string(),
        }
    }

    /// Цепочка разрешения, если она известна
    pub fn chain(&self) -> Option<&ResolvingChain> {
        match self {
            InjectError::InvalidToken { chain }
            | InjectError::NoProviderFound { chain, .. }
            | InjectError::CyclicDependency { chain }
            | InjectError::SyncOnPromiseProvider { chain, .. }
            | InjectError::Instantiation { chain, .. } => Some(chain),
            _ => None,
        }
    }

    /// Get error category for monitoring/alerting
    pub fn category(&self) -> &'static str {
        match self {
            InjectError::InvalidToken { .. } => "invalid_token",
            InjectError::Configuration { .. } => "configuration",
            InjectError::NoProviderFound { .. } => "no_provider",
            InjectError::CyclicDependency { .. } => "cyclic_dependency",
            InjectError::SyncOnPromiseProvider { .. } => "sync_on_promise",
            InjectError::Instantiation { .. } => "instantiation",
            InjectError::Rejected { .. } => "rejected",
            InjectError::TypeMismatch { .. } | InjectError::InvalidArgument { .. } => "type",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_formatting() {
        let a = Token::new("A");
        let b = Token::new("B");

        assert_eq!(ResolvingChain::from_path(&[a.clone()]).to_string(), "");
        assert_eq!(
            ResolvingChain::with_token(&[a.clone(), b], &a).to_string(),
            " (A -> B -> A)"
        );
        assert_eq!(
            ResolvingChain::with_missing(&[a]).to_string(),
            " (A -> None)"
        );
    }

    #[test]
    fn test_instantiation_message() {
        let error = InjectError::Instantiation {
            token: "Engine".to_string(),
            chain: ResolvingChain::from_path(&[Token::new("Car"), Token::new("Engine")]),
            original: "boom".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Error during instantiation of Engine! (Car -> Engine)\nORIGINAL ERROR: boom"
        );
        assert_eq!(error.category(), "instantiation");
        assert_eq!(error.chain().map(ResolvingChain::len), Some(2));
    }

    #[test]
    fn test_error_conversions() {
        let error = InjectError::configuration("Invalid module!");
        assert_eq!(error.category(), "configuration");
        assert!(error.chain().is_none());

        let anyhow_err: anyhow::Error = error.into();
        assert_eq!(anyhow_err.to_string(), "Invalid module!");
    }
}
