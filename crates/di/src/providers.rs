//! Провайдеры: знают, как создать экземпляр из уже разрешенных аргументов
//!
//! Injector сначала читает `params` провайдера, разрешает эти зависимости
//! (как сам посчитает нужным), затем вызывает `create(args)`.
//!
//! Class провайдер нормализует зависимости всех конструкторов иерархии в
//! один плоский массив, чтобы injector не думал о наследовании. Каждый
//! уровень иерархии получает свой срез `[start, end)` этого массива.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use crate::annotations::{ClassDef, Constructor, FactoryDef, ParamDescriptor};
use crate::args::Args;
use crate::errors::{DIResult, InjectError};
use crate::instance::Resolved;
use crate::token::{Scope, Token};

/// Уровень иерархии: класс и его срез плоского массива аргументов
struct Frame {
    class: Arc<ClassDef>,
    start: usize,
    end: usize,
}

enum ProviderKind {
    Value(Resolved),
    Factory(Constructor),
    Class(Arc<[Frame]>),
}

/// Неизменяемый рецепт создания экземпляра
pub(crate) struct Provider {
    name: String,
    kind: ProviderKind,
    scopes: Vec<Scope>,
    pub is_promise: bool,
    pub params: Vec<ParamDescriptor>,
}

impl Provider {
    pub fn value(name: impl Into<String>, value: Resolved, is_promise: bool) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::Value(value),
            scopes: Vec::new(),
            is_promise,
            params: Vec::new(),
        }
    }

    pub fn factory(def: &Arc<FactoryDef>, is_promise: bool) -> DIResult<Self> {
        if def.annotations.params.iter().any(ParamDescriptor::is_super_constructor) {
            return Err(InjectError::configuration(format!(
                "{} is not a class. Only classes with a parent can ask for SuperConstructor!",
                def.name
            )));
        }

        Ok(Self {
            name: def.name.clone(),
            kind: ProviderKind::Factory(def.factory.clone()),
            scopes: def.annotations.scopes.clone(),
            is_promise,
            params: def.annotations.params.clone(),
        })
    }

    pub fn class(def: &Arc<ClassDef>, is_promise: bool) -> DIResult<Self> {
        let mut params = Vec::new();
        let mut frames = vec![Frame {
            class: def.clone(),
            start: 0,
            end: 0,
        }];

        flatten_params(def, &mut params, &mut frames)?;
        frames[0].end = params.len();

        Ok(Self {
            name: def.name.clone(),
            kind: ProviderKind::Class(frames.into()),
            scopes: def.annotations.scopes.clone(),
            is_promise,
            params,
        })
    }

    /// Провайдер по умолчанию: токен сам является классом или фабрикой
    pub fn from_token(token: &Token) -> DIResult<Option<Self>> {
        if let Some(def) = token.class_def() {
            return Self::class(def, def.annotations.provide.is_promise).map(Some);
        }
        if let Some(def) = token.factory_def() {
            return Self::factory(def, def.annotations.provide.is_promise).map(Some);
        }
        Ok(None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Помечен ли subject провайдера данным scope
    pub fn has_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }

    pub fn is_transient(&self) -> bool {
        self.has_scope(&Scope::transient())
    }

    /// Число конструкторов в цепочке (1 для фабрик и значений)
    pub fn constructor_count(&self) -> usize {
        match &self.kind {
            ProviderKind::Class(frames) => frames.len(),
            _ => 1,
        }
    }

    /// Создать экземпляр.
    ///
    /// Результат promise-провайдера всегда `Resolved::Promise`, результат
    /// синхронного - всегда `Resolved::Instance`.
    pub fn create(&self, args: Vec<Resolved>) -> anyhow::Result<Resolved> {
        if args.len() != self.params.len() {
            return Err(anyhow!(
                "{} expects {} arguments, got {}",
                self.name,
                self.params.len(),
                args.len()
            ));
        }

        let created = match &self.kind {
            ProviderKind::Value(value) => value.clone(),
            ProviderKind::Factory(factory) => factory(&Args::new(args))?,
            ProviderKind::Class(frames) => SuperConstructor {
                frames: frames.clone(),
                level: 0,
                args: args.into(),
            }
            .call()?,
        };

        Ok(if self.is_promise {
            Resolved::Promise(created.into_promise_value())
        } else {
            created.into_sync_value()
        })
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            ProviderKind::Value(_) => "value",
            ProviderKind::Factory(_) => "factory",
            ProviderKind::Class(_) => "class",
        };
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("is_promise", &self.is_promise)
            .field("params", &self.params)
            .finish()
    }
}

/// Развернуть параметры класса и всех родителей, запрошенных через
/// SuperConstructor, в один плоский массив.
///
/// `frames` получает по одному уровню на каждый запрошенный родительский
/// конструктор, в порядке от потомка к предку.
fn flatten_params(
    class: &Arc<ClassDef>,
    flat: &mut Vec<ParamDescriptor>,
    frames: &mut Vec<Frame>,
) -> DIResult<()> {
    let mut super_requested = false;

    for param in &class.annotations.params {
        if !param.is_super_constructor() {
            flat.push(param.clone());
            continue;
        }

        if super_requested {
            return Err(InjectError::configuration(format!(
                "{} asks for SuperConstructor more than once!",
                class.name
            )));
        }
        super_requested = true;

        let parent_token = class.parent.as_ref().ok_or_else(|| {
            InjectError::configuration(format!(
                "{} does not have a parent constructor. Only classes with a parent can ask for SuperConstructor!",
                class.name
            ))
        })?;
        let parent = parent_token.class_def().ok_or_else(|| {
            InjectError::configuration(format!(
                "{} extends {}, which is not a class!",
                class.name, parent_token
            ))
        })?;

        let index = frames.len();
        frames.push(Frame {
            class: parent.clone(),
            start: flat.len(),
            end: flat.len(),
        });
        flatten_params(parent, flat, frames)?;
        frames[index].end = flat.len();
    }

    Ok(())
}

/// Конструктор родительского класса, связанный со своим срезом аргументов.
///
/// Приходит аргументом в конструктор потомка, запросившего
/// `Token::super_constructor()`. Вызов создает экземпляр родителя.
#[derive(Clone)]
pub struct SuperConstructor {
    frames: Arc<[Frame]>,
    level: usize,
    args: Arc<[Resolved]>,
}

impl SuperConstructor {
    fn frame(&self) -> &Frame {
        &self.frames[self.level]
    }

    pub fn class_name(&self) -> &str {
        &self.frame().class.name
    }

    /// Аргументы текущего уровня; место запроса SuperConstructor занимает
    /// связанный конструктор следующего уровня
    fn bind(&self) -> Args {
        let frame = self.frame();
        let Some(next) = self.frames.get(self.level + 1) else {
            return Args::new(self.args[frame.start..frame.end].to_vec());
        };

        let mut values = Vec::new();
        values.extend_from_slice(&self.args[frame.start..next.start]);
        values.push(Resolved::value(SuperConstructor {
            frames: self.frames.clone(),
            level: self.level + 1,
            args: self.args.clone(),
        }));
        values.extend_from_slice(&self.args[next.end..frame.end]);
        Args::new(values)
    }

    /// Вызвать конструктор; возвращает то, что вернул конструктор
    pub fn call(&self) -> anyhow::Result<Resolved> {
        let args = self.bind();
        (self.frame().class.constructor)(&args)
    }

    /// Вызвать конструктор и привести результат к типу `T`
    pub fn call_as<T>(&self) -> anyhow::Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Ok(self.call()?.into_sync_value().downcast::<T>()?)
    }
}

impl fmt::Debug for SuperConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperConstructor")
            .field("class", &self.class_name())
            .field("level", &self.level)
            .finish()
    }
}
