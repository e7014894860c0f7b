//! Дочерние injector-ы, принудительные scope и transient

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;

use di::{has_annotation, Injector, Module, Scope, Token};

static INIT_TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();
});

static REQUEST_SCOPE: Lazy<Scope> = Lazy::new(|| Scope::new("RequestScope"));

#[derive(Debug)]
struct Counter {
    serial: usize,
}

/// Класс, каждый экземпляр которого получает следующий номер
fn counting_class(name: &str, scope: Option<Scope>) -> Token {
    let serial = Arc::new(AtomicUsize::new(0));
    let builder = Token::class(name);
    let builder = match scope {
        Some(scope) => builder.scope(scope),
        None => builder,
    };
    builder.construct(move |_| {
        Ok(Counter {
            serial: serial.fetch_add(1, Ordering::SeqCst),
        })
    })
}

#[test]
fn test_child_shares_parent_instances() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let service = counting_class("Service", None);
    let root = Injector::new(vec![Module::from(&service)])?;
    let child = root.create_child(Vec::new(), &[])?;

    let from_child = child.get_as::<Counter>(&service)?;
    let from_root = root.get_as::<Counter>(&service)?;

    assert!(Arc::ptr_eq(&from_child, &from_root));
    assert_eq!(child.stats().cached_instances, 0);
    Ok(())
}

#[test]
fn test_child_modules_do_not_leak_to_parent() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let level = Token::new("level");
    let local = Token::new("local");
    let root = Injector::new(vec![Module::provide(&level).use_value(1u8)])?;
    let child = root.create_child(
        vec![
            Module::provide(&level).use_value(2u8),
            Module::provide(&local).use_value("child only"),
        ],
        &[],
    )?;

    assert_eq!(*child.get_as::<u8>(&level)?, 2);
    assert_eq!(*root.get_as::<u8>(&level)?, 1);
    assert!(root.get(&local).is_err());
    assert!(!root.has_provider_for(&local));
    assert!(child.has_provider_for(&level));
    Ok(())
}

#[test]
fn test_forced_scope_creates_new_instance_in_child() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let request = counting_class("RequestContext", Some(REQUEST_SCOPE.clone()));
    assert!(has_annotation(&request, &REQUEST_SCOPE));

    let root = Injector::new(vec![Module::from(&request)])?;
    let child = root.create_child(Vec::new(), &[REQUEST_SCOPE.clone()])?;

    let in_root = root.get_as::<Counter>(&request)?;
    let in_child = child.get_as::<Counter>(&request)?;

    assert!(!Arc::ptr_eq(&in_root, &in_child));
    assert!(Arc::ptr_eq(&in_child, &child.get_as::<Counter>(&request)?));
    assert!(Arc::ptr_eq(&in_root, &root.get_as::<Counter>(&request)?));

    // без принудительного scope ребенок разделяет экземпляр родителя
    let plain_child = root.create_child(Vec::new(), &[])?;
    assert!(Arc::ptr_eq(&in_root, &plain_child.get_as::<Counter>(&request)?));
    Ok(())
}

#[test]
fn test_forced_instance_depends_on_shared_parent_instance() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let database = counting_class("Database", None);
    let handler = Token::class("Handler")
        .scope(REQUEST_SCOPE.clone())
        .inject(&database)
        .construct(|args| Ok(args.get::<Counter>(0)?));
    let root = Injector::new(vec![Module::from(&database), Module::from(&handler)])?;

    let first = root.create_child(Vec::new(), &[REQUEST_SCOPE.clone()])?;
    let second = root.create_child(Vec::new(), &[REQUEST_SCOPE.clone()])?;

    let a = first.get_as::<Arc<Counter>>(&handler)?;
    let b = second.get_as::<Arc<Counter>>(&handler)?;

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&*a, &*b));
    assert_eq!(a.serial, 0);
    Ok(())
}

#[test]
fn test_transient_never_cached() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let transient = counting_class("Transient", Some(Scope::transient()));
    let root = Injector::new(vec![Module::from(&transient)])?;

    let first = root.get_as::<Counter>(&transient)?;
    let second = root.get_as::<Counter>(&transient)?;
    assert_eq!((first.serial, second.serial), (0, 1));
    assert_eq!(root.stats().cached_instances, 0);

    // каждый ребенок получает провайдер transient автоматически
    let child = root.create_child(Vec::new(), &[])?;
    assert!(child.stats().provider_count >= 1);
    assert_eq!(child.get_as::<Counter>(&transient)?.serial, 2);
    Ok(())
}

#[test]
fn test_default_provider_placed_in_forcing_child() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let scoped = counting_class("ScopedUnregistered", Some(REQUEST_SCOPE.clone()));
    let shared = counting_class("SharedUnregistered", None);
    let root = Injector::new(Vec::new())?;
    let child = root.create_child(Vec::new(), &[REQUEST_SCOPE.clone()])?;
    let grandchild = child.create_child(Vec::new(), &[])?;

    // ближайший injector, который принудительно создает RequestScope
    grandchild.get(&scoped)?;
    assert!(child.has_provider_for(&scoped));
    assert!(!root.has_provider_for(&scoped));
    assert_eq!(child.stats().cached_instances, 1);

    // без подходящего scope провайдер уходит в корень
    let from_grandchild = grandchild.get_as::<Counter>(&shared)?;
    assert!(root.has_provider_for(&shared));
    assert!(Arc::ptr_eq(&from_grandchild, &root.get_as::<Counter>(&shared)?));
    Ok(())
}

#[test]
fn test_forced_providers_collected_nearest_first() -> Result<()> {
    Lazy::force(&INIT_TRACING);
    let storage = Token::new("Storage");
    let disk = Token::class("DiskStorage")
        .scope(REQUEST_SCOPE.clone())
        .construct(|_| Ok("disk"));
    let memory = Token::class("MemoryStorage")
        .scope(REQUEST_SCOPE.clone())
        .construct(|_| Ok("memory"));

    let root = Injector::new(vec![Module::provide(&storage).use_class(&disk)])?;
    let middle = root.create_child(vec![Module::provide(&storage).use_class(&memory)], &[])?;
    let leaf = middle.create_child(Vec::new(), &[REQUEST_SCOPE.clone()])?;

    assert_eq!(*leaf.get_as::<&str>(&storage)?, "memory");
    assert_eq!(*root.get_as::<&str>(&storage)?, "disk");
    assert_eq!(middle.stats().cached_instances, 0);
    Ok(())
}
