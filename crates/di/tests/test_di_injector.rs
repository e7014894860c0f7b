//! Базовое разрешение: singleton, значения, auto-construct, ошибки

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;

use di::{
    create_token, Injector, InjectError, Module, ParamDescriptor, Resolved, Token,
};

static INIT_TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();
});

#[derive(Debug)]
struct Engine {
    cylinders: u32,
}

struct Car {
    engine: Arc<Engine>,
}

struct Config {
    url: String,
}

fn engine_and_car() -> (Token, Token) {
    let engine = Token::class("Engine").construct(|_| Ok(Engine { cylinders: 4 }));
    let car = Token::class("Car")
        .inject(&engine)
        .construct(|args| Ok(Car { engine: args.get::<Engine>(0)? }));
    (engine, car)
}

#[test]
fn test_singleton_per_injector() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let (engine, car) = engine_and_car();
    let injector = Injector::new(vec![Module::from(&car)])?;

    let first = injector.get_as::<Car>(&car)?;
    let second = injector.get_as::<Car>(&car)?;
    assert!(Arc::ptr_eq(&first, &second));

    // зависимость создана один раз и разделяется
    let engine = injector.get_as::<Engine>(&engine)?;
    assert!(Arc::ptr_eq(&first.engine, &engine));
    assert_eq!(engine.cylinders, 4);
    Ok(())
}

#[test]
fn test_unregistered_class_is_auto_constructed() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let (engine, car) = engine_and_car();
    let injector = Injector::new(Vec::new())?;

    assert!(!injector.has_provider_for(&car));
    let car_instance = injector.get_as::<Car>(&car)?;

    assert!(injector.has_provider_for(&car));
    assert!(injector.has_provider_for(&engine));
    assert!(Arc::ptr_eq(&car_instance, &injector.get_as::<Car>(&car)?));
    assert_eq!(injector.stats().cached_instances, 2);
    Ok(())
}

#[test]
fn test_value_injected_by_identity() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let config_token = create_token("config");
    let consumer = Token::class("Consumer")
        .inject(&config_token)
        .construct(|args| Ok(args.get::<Config>(0)?));

    let config = Arc::new(Config {
        url: "postgres://localhost".to_string(),
    });
    let injector = Injector::new(vec![
        Module::provide(&config_token).use_resolved(Resolved::Instance(config.clone())),
    ])?;

    let injected = injector.get_as::<Arc<Config>>(&consumer)?;
    assert!(Arc::ptr_eq(&*injected, &config));
    assert_eq!(injected.url, "postgres://localhost");
    Ok(())
}

#[test]
fn test_factory_module_uses_declared_params() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let port = Token::new("port");
    let address = Token::new("address");
    let make_address = Token::factory("makeAddress")
        .inject(&port)
        .construct(|args| Ok(format!("127.0.0.1:{}", args.get::<u16>(0)?)));

    let injector = Injector::new(vec![
        Module::provide(&port).use_value(8080u16),
        Module::provide(&address).use_factory(&make_address),
    ])?;

    assert_eq!(*injector.get_as::<String>(&address)?, "127.0.0.1:8080");
    Ok(())
}

#[test]
fn test_use_class_registers_under_provide_token() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let storage = Token::new("Storage");
    let memory = Token::class("MemoryStorage").construct(|_| Ok("memory"));
    let injector = Injector::new(vec![Module::provide(&storage).use_class(&memory)])?;

    assert_eq!(*injector.get_as::<&str>(&storage)?, "memory");
    Ok(())
}

#[test]
fn test_last_module_wins() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let level = Token::new("level");
    let injector = Injector::new(vec![
        Module::provide(&level).use_value("info"),
        Module::provide(&level).use_value("debug"),
    ])?;

    assert_eq!(*injector.get_as::<&str>(&level)?, "debug");
    assert_eq!(injector.stats().provider_count, 1);
    Ok(())
}

#[test]
fn test_cyclic_dependency() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let a = Token::new("A");
    let b = Token::new("B");
    let make_a = Token::factory("makeA").inject(&b).construct(|_| Ok(1u8));
    let make_b = Token::factory("makeB").inject(&a).construct(|_| Ok(2u8));
    let injector = Injector::new(vec![
        Module::provide(&a).use_factory(&make_a),
        Module::provide(&b).use_factory(&make_b),
    ])?;

    let error = injector.get(&a).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Cannot instantiate cyclic dependency! (A -> B -> A)"
    );
    assert_eq!(error.category(), "cyclic_dependency");
    Ok(())
}

#[test]
fn test_no_provider() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let missing = Token::new("Database");
    let repository = Token::class("Repository")
        .inject(&missing)
        .construct(|_| Ok(()));
    let injector = Injector::new(Vec::new())?;

    let error = injector.get(&missing).unwrap_err();
    assert_eq!(error.to_string(), "No provider for Database!");

    let error = injector.get(&repository).unwrap_err();
    assert_eq!(
        error.to_string(),
        "No provider for Database! (Repository -> Database)"
    );
    Ok(())
}

#[test]
fn test_invalid_token() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let broken = Token::class("Broken")
        .param(ParamDescriptor::missing())
        .construct(|_| Ok(()));
    let injector = Injector::new(Vec::new())?;

    let error = injector.get(&broken).unwrap_err();
    assert_eq!(error.to_string(), "Invalid token \"None\" requested! (Broken -> None)");

    let error = injector.resolve(None, &mut Vec::new(), false, false).unwrap_err();
    assert_eq!(error.to_string(), "Invalid token \"None\" requested!");
    Ok(())
}

#[test]
fn test_instantiation_error_wraps_original() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let engine = Token::class("Engine").construct(|_| -> Result<Engine> {
        Err(anyhow!("no fuel"))
    });
    let car = Token::class("Car")
        .inject(&engine)
        .construct(|args| Ok(Car { engine: args.get::<Engine>(0)? }));
    let injector = Injector::new(Vec::new())?;

    let error = injector.get(&car).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Error during instantiation of Engine! (Car -> Engine)\nORIGINAL ERROR: no fuel"
    );
    assert!(matches!(error, InjectError::Instantiation { .. }));
    Ok(())
}

#[test]
fn test_opaque_token_without_value() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let token = create_token("api.key");
    let injector = Injector::new(Vec::new())?;

    let error = injector.get(&token).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Error during instantiation of api.key!\nORIGINAL ERROR: No provider defined for key \"api.key\""
    );

    let provided = Injector::new(vec![Module::provide(&token).use_value("secret")])?;
    assert_eq!(*provided.get_as::<&str>(&token)?, "secret");
    Ok(())
}

#[test]
fn test_constructor_returning_other_object() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let shared = Arc::new(Config {
        url: "shared".to_string(),
    });
    let returned = shared.clone();
    let facade = Token::class("Facade").construct_with(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Resolved::Instance(returned.clone()))
    });
    let injector = Injector::new(Vec::new())?;

    let first = injector.get_as::<Config>(&facade)?;
    let second = injector.get_as::<Config>(&facade)?;
    assert!(Arc::ptr_eq(&first, &shared));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_injector_injects_itself() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let locator = Token::class("Locator")
        .inject(&Token::injector())
        .construct(|args| Ok(args.get::<Injector>(0)?));
    let injector = Injector::new(Vec::new())?;

    let captured = injector.get_as::<Arc<Injector>>(&locator)?;
    assert_eq!(**captured, injector);
    Ok(())
}

#[test]
fn test_type_mismatch() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let level = Token::new("level");
    let injector = Injector::new(vec![Module::provide(&level).use_value(3u8)])?;

    let error = injector.get_as::<String>(&level).unwrap_err();
    assert_eq!(error.category(), "type");
    Ok(())
}
