//! Behavior tests for extension-point composition and its partial-failure
//! policy.

use portico_api::{
    Contribution, ContributionItem, ErrorKind, ModuleFactory, ScriptModule, factory_fn,
};
use portico_core::{HostBuilder, ModuleDescriptor, ModuleIdentifier, ScriptHost};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

struct MenuContribution {
    point: String,
    entry: String,
}

impl Contribution for MenuContribution {
    fn point(&self) -> &str {
        &self.point
    }

    fn items(&self) -> Vec<ContributionItem> {
        vec![
            ContributionItem::new(self.entry.clone(), self.entry.clone())
                .with_data(serde_json::json!({ "menu": self.entry })),
        ]
    }
}

struct ContributingModule {
    contribution: Arc<dyn Contribution>,
}

impl ScriptModule for ContributingModule {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn contribution(&self) -> Option<Arc<dyn Contribution>> {
        Some(Arc::clone(&self.contribution))
    }
}

/// A module with no contribution at all.
struct PlainModule;

impl ScriptModule for PlainModule {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn contributing_factory(point: &str, entry: &str) -> Arc<dyn ModuleFactory> {
    let point = point.to_string();
    let entry = entry.to_string();
    factory_fn(move || {
        Ok(Arc::new(ContributingModule {
            contribution: Arc::new(MenuContribution {
                point: point.clone(),
                entry: entry.clone(),
            }),
        }))
    })
}

fn ident(raw: &str) -> ModuleIdentifier {
    ModuleIdentifier::parse(raw).unwrap()
}

fn register_menu_extension(builder: &HostBuilder, location: &str, entry: &str, order: i32) {
    builder
        .register_module(ModuleDescriptor::new(
            ident(location),
            contributing_factory("menu", entry),
        ))
        .unwrap();
    builder
        .register_extension("menu", location, order)
        .unwrap();
}

fn entries(host: &ScriptHost, point: &str) -> Vec<String> {
    let mut scope = host.create_scope();
    let loaded = host
        .load_extensions(&mut scope, point, &CancellationToken::new())
        .unwrap();
    assert!(loaded.is_complete());
    loaded
        .capabilities
        .iter()
        .flat_map(|c| c.items())
        .map(|item| item.id)
        .collect()
}

#[tokio::test]
async fn broken_descriptor_degrades_instead_of_failing() {
    let builder = HostBuilder::new();
    builder.register_point("menu").unwrap();
    register_menu_extension(&builder, "ext/first", "first", 0);
    builder
        .register_extension("menu", "ext/missing", 0)
        .unwrap();
    register_menu_extension(&builder, "ext/third", "third", 0);
    let host = builder.build();

    let mut scope = host.create_scope();
    let loaded = host
        .load_extensions(&mut scope, "menu", &CancellationToken::new())
        .unwrap();

    assert_eq!(loaded.capabilities.len(), 2);
    assert_eq!(loaded.skipped(), 1);
    let diagnostic = &loaded.diagnostics[0];
    assert_eq!(diagnostic.location.as_deref(), Some("ext/missing"));
    assert_eq!(diagnostic.error.kind(), ErrorKind::ModuleNotFound);
}

#[tokio::test]
async fn tied_orders_keep_registration_sequence() {
    let builder = HostBuilder::new();
    builder.register_point("menu").unwrap();
    register_menu_extension(&builder, "ext/late", "late", 5);
    register_menu_extension(&builder, "ext/a", "a", 1);
    register_menu_extension(&builder, "ext/b", "b", 1);
    let host = builder.build();

    assert_eq!(entries(&host, "menu"), ["a", "b", "late"]);

    let descriptors = host.extensions_of("menu").unwrap();
    let locations: Vec<_> = descriptors.iter().map(|d| d.location.as_str()).collect();
    assert_eq!(locations, ["ext/a", "ext/b", "ext/late"]);
}

#[tokio::test]
async fn empty_point_loads_to_empty_sequence() {
    let builder = HostBuilder::new();
    builder.register_point("menu").unwrap();
    let host = builder.build();

    let mut scope = host.create_scope();
    let loaded = host
        .load_extensions(&mut scope, "menu", &CancellationToken::new())
        .unwrap();
    assert!(loaded.capabilities.is_empty());
    assert!(loaded.is_complete());
}

#[tokio::test]
async fn unknown_point_is_an_error() {
    let builder = HostBuilder::new();
    let host = builder.build();

    let mut scope = host.create_scope();
    let err = host
        .load_extensions(&mut scope, "missing", &CancellationToken::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownPoint);

    let err = host.extensions_of("missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownPoint);
}

#[tokio::test]
async fn duplicate_point_is_an_error() {
    let builder = HostBuilder::new();
    builder.register_point("menu").unwrap();
    let err = builder.register_point("menu").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicatePoint);

    let err = builder
        .register_extension("unregistered", "ext/a", 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownPoint);
}

#[tokio::test]
async fn invalid_capability_shape_is_skipped_with_reason() {
    let builder = HostBuilder::new();
    builder.register_point("menu").unwrap();

    // No contribution at all.
    builder
        .register_module(ModuleDescriptor::new(
            ident("ext/plain"),
            factory_fn(|| Ok(Arc::new(PlainModule))),
        ))
        .unwrap();
    builder.register_extension("menu", "ext/plain", 0).unwrap();

    // Contribution targeting a different point.
    builder
        .register_module(ModuleDescriptor::new(
            ident("ext/wrong"),
            contributing_factory("toolbar", "wrong"),
        ))
        .unwrap();
    builder.register_extension("menu", "ext/wrong", 1).unwrap();

    register_menu_extension(&builder, "ext/good", "good", 2);
    let host = builder.build();

    let mut scope = host.create_scope();
    let loaded = host
        .load_extensions(&mut scope, "menu", &CancellationToken::new())
        .unwrap();

    assert_eq!(loaded.capabilities.len(), 1);
    assert_eq!(loaded.capabilities[0].items()[0].id, "good");
    assert_eq!(loaded.skipped(), 2);
    for diagnostic in &loaded.diagnostics {
        assert_eq!(
            diagnostic.error.kind(),
            ErrorKind::ExtensionValidationFailed
        );
    }
}

#[tokio::test]
async fn cancellation_returns_partial_composition() {
    let cancel = CancellationToken::new();

    let builder = HostBuilder::new();
    builder.register_point("menu").unwrap();
    // The first module's construction trips the token, simulating a caller
    // timeout while a descriptor is being loaded.
    let tripping = {
        let cancel = cancel.clone();
        factory_fn(move || {
            cancel.cancel();
            Ok(Arc::new(ContributingModule {
                contribution: Arc::new(MenuContribution {
                    point: "menu".to_string(),
                    entry: "slow".to_string(),
                }),
            }))
        })
    };
    builder
        .register_module(ModuleDescriptor::new(ident("ext/slow"), tripping))
        .unwrap();
    builder.register_extension("menu", "ext/slow", 0).unwrap();
    register_menu_extension(&builder, "ext/b", "b", 1);
    register_menu_extension(&builder, "ext/c", "c", 2);
    let host = builder.build();

    let mut scope = host.create_scope();
    let loaded = host.load_extensions(&mut scope, "menu", &cancel).unwrap();

    assert_eq!(loaded.capabilities.len(), 1);
    // One cancellation diagnostic stands in for both unattempted descriptors.
    assert_eq!(loaded.diagnostics.len(), 1);
    assert_eq!(loaded.skipped(), 2);
    let diagnostic = &loaded.diagnostics[0];
    assert!(diagnostic.location.is_none());
    match diagnostic.error {
        portico_api::HostError::LoadCancelled { remaining } => assert_eq!(remaining, 2),
        ref other => panic!("expected LoadCancelled, got {other}"),
    }
}

#[tokio::test]
async fn extension_modules_are_memoized_per_scope() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let factory = {
        let constructions = Arc::clone(&constructions);
        factory_fn(move || {
            constructions.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ContributingModule {
                contribution: Arc::new(MenuContribution {
                    point: "menu".to_string(),
                    entry: "counted".to_string(),
                }),
            }))
        })
    };

    let builder = HostBuilder::new();
    builder.register_point("menu").unwrap();
    builder
        .register_module(ModuleDescriptor::new(ident("ext/counted"), factory))
        .unwrap();
    builder
        .register_extension("menu", "ext/counted", 0)
        .unwrap();
    let host = builder.build();

    let mut scope = host.create_scope();
    let cancel = CancellationToken::new();
    host.load_extensions(&mut scope, "menu", &cancel).unwrap();
    host.load_extensions(&mut scope, "menu", &cancel).unwrap();
    assert_eq!(constructions.load(Ordering::SeqCst), 1);

    // A fresh scope constructs its own instance.
    let mut other = host.create_scope();
    host.load_extensions(&mut other, "menu", &cancel).unwrap();
    assert_eq!(constructions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn points_are_listed_in_registration_order() {
    let builder = HostBuilder::new();
    builder.register_point("menu").unwrap();
    builder.register_point("artefacts").unwrap();
    builder.register_point("jobs").unwrap();
    let host = builder.build();

    assert_eq!(host.extension_points(), ["menu", "artefacts", "jobs"]);
}
