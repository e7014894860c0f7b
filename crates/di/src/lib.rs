//! Token-keyed dependency injection
//!
//! Классы и фабрики описывают свои зависимости через builder токена,
//! injector разрешает токен в экземпляр, рекурсивно создавая и кэшируя
//! граф зависимостей. Поддерживаются:
//! - value / factory / class провайдеры;
//! - дочерние injector-ы с принудительными scope;
//! - promise провайдеры и отложенная инстанциация;
//! - lazy зависимости с локальными переопределениями;
//! - конструкторы родительских классов (`Token::super_constructor()`).
//!
//! ```ignore
//! let engine = Token::class("Engine").construct(|_| Ok(Engine));
//! let car = Token::class("Car")
//!     .inject(&engine)
//!     .construct(|args| Ok(Car { engine: args.get::<Engine>(0)? }));
//!
//! let injector = Injector::new(vec![])?;
//! let car = injector.get_as::<Car>(&car)?;
//! ```

mod annotations;
mod args;
mod config;
mod errors;
mod injector;
mod instance;
mod lazy;
mod module;
pub mod profiler;
mod providers;
mod token;

pub use annotations::{
    has_annotation, read_annotations, Annotations, ClassBuilder, FactoryBuilder, ParamDescriptor,
    ProvideAnnotation,
};
pub use args::Args;
pub use config::InjectorConfig;
pub use errors::{DIResult, InjectError, ResolvingChain};
pub use injector::{Injector, InjectorBuilder, InjectorStats};
pub use instance::{Instance, Promise, Resolved};
pub use lazy::LazyFactory;
pub use module::{BindingBuilder, Module, Recipe};
pub use providers::SuperConstructor;
pub use token::{create_token, no_provider_message, Scope, Token};

// Observer графа
pub use profiler::{GraphRecorder, InjectorObserver, InjectorSnapshot, TracingObserver};
