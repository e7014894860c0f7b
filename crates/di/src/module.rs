//! Модули: декларативные привязки токенов к рецептам
//!
//! - bare класс: `Module::from(&class)` == `provide: class, use_class: class`;
//! - `Module::provide(&token).use_value(..)` / `.use_resolved(..)` / `.use_promise(..)`;
//! - `Module::provide(&token).use_factory(&factory)`;
//! - `Module::provide(&token).use_class(&class)`;
//! - `.promise()` помечает привязку как promise-провайдер.

use std::any::Any;

use crate::errors::{DIResult, InjectError};
use crate::instance::{Promise, Resolved};
use crate::providers::Provider;
use crate::token::Token;

/// Рецепт привязки
#[derive(Debug, Clone)]
pub enum Recipe {
    Value(Resolved),
    Factory(Token),
    Class(Token),
}

/// Модуль, передаваемый injector-у при создании
#[derive(Debug, Clone)]
pub enum Module {
    /// Класс, предоставляющий сам себя
    Type(Token),
    Binding {
        provide: Token,
        recipe: Recipe,
        is_promise: bool,
    },
}

impl Module {
    pub fn provide(token: &Token) -> BindingBuilder {
        BindingBuilder {
            provide: token.clone(),
        }
    }

    /// Пометить привязку как promise-провайдер
    pub fn promise(self) -> Module {
        match self {
            Module::Type(class) => Module::Binding {
                provide: class.clone(),
                recipe: Recipe::Class(class),
                is_promise: true,
            },
            Module::Binding {
                provide, recipe, ..
            } => Module::Binding {
                provide,
                recipe,
                is_promise: true,
            },
        }
    }

    /// Токен, под которым модуль будет зарегистрирован: для классов
    /// объявленный токен класса важнее поля `provide`
    pub fn token(&self) -> &Token {
        let (provide, class) = match self {
            Module::Type(class) => (class, Some(class)),
            Module::Binding {
                provide,
                recipe: Recipe::Class(class),
                ..
            } => (provide, Some(class)),
            Module::Binding { provide, .. } => (provide, None),
        };

        class
            .and_then(Token::class_def)
            .and_then(|def| def.annotations.provide.token.as_ref())
            .unwrap_or(provide)
    }

    /// Превратить модуль в провайдера и токен, под которым он регистрируется
    pub(crate) fn into_provider(self) -> DIResult<(Token, Provider)> {
        let (provide, recipe, is_promise) = match self {
            Module::Type(class) => (class.clone(), Recipe::Class(class), false),
            Module::Binding {
                provide,
                recipe,
                is_promise,
            } => (provide, recipe, is_promise),
        };

        match recipe {
            Recipe::Value(value) => {
                let provider = Provider::value(provide.name(), value, is_promise);
                Ok((provide, provider))
            }
            Recipe::Factory(factory) => {
                let def = factory
                    .factory_def()
                    .ok_or_else(|| invalid_module(&factory, "is not a factory"))?;
                let is_promise = is_promise || def.annotations.provide.is_promise;
                Ok((provide, Provider::factory(def, is_promise)?))
            }
            Recipe::Class(class) => {
                let def = class
                    .class_def()
                    .ok_or_else(|| invalid_module(&class, "is not a class"))?;
                let is_promise = is_promise || def.annotations.provide.is_promise;
                // Объявленный токен класса важнее поля provide
                let token = def.annotations.provide.token.clone().unwrap_or(provide);
                Ok((token, Provider::class(def, is_promise)?))
            }
        }
    }
}

impl From<&Token> for Module {
    fn from(class: &Token) -> Self {
        Module::Type(class.clone())
    }
}

fn invalid_module(token: &Token, reason: &str) -> InjectError {
    InjectError::configuration(format!("Invalid module! {} {}", token, reason))
}

/// Builder привязки для `Module::provide`
pub struct BindingBuilder {
    provide: Token,
}

impl BindingBuilder {
    fn bind(self, recipe: Recipe) -> Module {
        Module::Binding {
            provide: self.provide,
            recipe,
            is_promise: false,
        }
    }

    pub fn use_value<T>(self, value: T) -> Module
    where
        T: Any + Send + Sync,
    {
        self.bind(Recipe::Value(Resolved::value(value)))
    }

    /// Готовый результат; promise регистрируется как promise-провайдер
    pub fn use_resolved(self, value: Resolved) -> Module {
        let is_promise = value.is_promise();
        let module = self.bind(Recipe::Value(value));
        if is_promise {
            module.promise()
        } else {
            module
        }
    }

    /// Значение, доступное только асинхронно
    pub fn use_promise(self, promise: Promise) -> Module {
        self.bind(Recipe::Value(Resolved::Promise(promise))).promise()
    }

    pub fn use_factory(self, factory: &Token) -> Module {
        self.bind(Recipe::Factory(factory.clone()))
    }

    pub fn use_class(self, class: &Token) -> Module {
        self.bind(Recipe::Class(class.clone()))
    }
}
