//! Core container behavior
//!
//! These tests verify:
//! 1. Lifetime semantics (singleton identity, transient freshness,
//!    per-request sharing within one resolve tree)
//! 2. Parent/child scoping (inheritance, shadowing, shared singletons)
//! 3. Failure diagnostics (cycle paths, missing bindings, sync/async
//!    mismatch, type mismatch)
//! 4. The interface-name registry's tree-wide idempotence

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use wirebox::{Container, DiError, Token};

struct Config {
	name: String,
}

#[test]
fn singleton_resolves_to_the_identical_instance() {
	let container = Container::new();
	let token = Token::<Config>::new("config");
	container.bind_value(&token, Config {
		name: "app".to_string(),
	});

	let first = container.resolve(&token).unwrap();
	let second = container.resolve(&token).unwrap();

	assert_eq!(first.name, "app");
	assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn transient_factory_produces_fresh_instances() {
	struct Numbered {
		id: u32,
	}

	let container = Container::new();
	let token = Token::<Numbered>::new("numbered");
	let counter = Arc::new(AtomicU32::new(0));
	let factory_counter = counter.clone();
	container.bind_factory(&token, move |_| {
		Ok(Numbered {
			id: factory_counter.fetch_add(1, Ordering::SeqCst) + 1,
		})
	});

	let a = container.resolve(&token).unwrap();
	let b = container.resolve(&token).unwrap();
	let c = container.resolve(&token).unwrap();

	assert_eq!((a.id, b.id, c.id), (1, 2, 3));
	assert!(!Arc::ptr_eq(&a, &b));
	assert!(!Arc::ptr_eq(&b, &c));
}

struct RequestId(u32);

struct LeftBranch {
	request: Arc<RequestId>,
}

struct RightBranch {
	request: Arc<RequestId>,
}

struct TreeRoot {
	left: Arc<LeftBranch>,
	right: Arc<RightBranch>,
}

fn bind_request_tree(container: &Container) -> (Token<TreeRoot>, Arc<AtomicU32>) {
	let request_token = Token::<RequestId>::new("request-id");
	let left_token = Token::<LeftBranch>::new("left");
	let right_token = Token::<RightBranch>::new("right");
	let root_token = Token::<TreeRoot>::new("root");

	let created = Arc::new(AtomicU32::new(0));
	let factory_created = created.clone();
	container.bind_factory_with(
		&request_token,
		move |_| Ok(RequestId(factory_created.fetch_add(1, Ordering::SeqCst))),
		wirebox::BindOptions::per_request(),
	);

	let request_for_left = request_token.clone();
	container.bind_factory(&left_token, move |resolver| {
		Ok(LeftBranch {
			request: resolver.resolve(&request_for_left)?,
		})
	});
	let request_for_right = request_token.clone();
	container.bind_factory(&right_token, move |resolver| {
		Ok(RightBranch {
			request: resolver.resolve(&request_for_right)?,
		})
	});
	let left_dep = left_token.clone();
	let right_dep = right_token.clone();
	container.bind_factory(&root_token, move |resolver| {
		Ok(TreeRoot {
			left: resolver.resolve(&left_dep)?,
			right: resolver.resolve(&right_dep)?,
		})
	});

	(root_token, created)
}

#[test]
fn per_request_instance_is_shared_within_one_resolve_tree() {
	let container = Container::new();
	let (root_token, created) = bind_request_tree(&container);

	let root = container.resolve(&root_token).unwrap();

	assert!(Arc::ptr_eq(&root.left.request, &root.right.request));
	assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn per_request_instances_differ_across_resolve_trees() {
	let container = Container::new();
	let (root_token, created) = bind_request_tree(&container);

	let first = container.resolve(&root_token).unwrap();
	let second = container.resolve(&root_token).unwrap();

	assert!(!Arc::ptr_eq(&first.left.request, &second.left.request));
	assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn mutual_factories_report_a_circular_dependency() {
	#[derive(Debug)]
	struct ServiceA;
	struct ServiceB;

	let container = Container::new();
	let a_token = Token::<ServiceA>::new("service-a");
	let b_token = Token::<ServiceB>::new("service-b");

	let b_dep = b_token.clone();
	container.bind_factory(&a_token, move |resolver| {
		resolver.resolve(&b_dep)?;
		Ok(ServiceA)
	});
	let a_dep = a_token.clone();
	container.bind_factory(&b_token, move |resolver| {
		resolver.resolve(&a_dep)?;
		Ok(ServiceB)
	});

	let err = container.resolve(&a_token).unwrap_err();
	match err {
		DiError::CircularDependency { ref path } => {
			let rendered = path.to_string();
			assert!(rendered.contains("service-a"), "path was: {rendered}");
			assert!(rendered.contains("service-b"), "path was: {rendered}");
			assert_eq!(path.segments().first(), path.segments().last());
		}
		other => panic!("expected CircularDependency, got {other:?}"),
	}
}

#[test]
fn missing_binding_error_names_the_token() {
	#[derive(Debug)]
	struct Missing;

	let container = Container::new();
	let token = Token::<Missing>::new("missing-service");

	let err = container.resolve(&token).unwrap_err();
	assert!(matches!(err, DiError::BindingNotFound { .. }));
	assert!(err.to_string().contains("missing-service"));
}

#[test]
fn missing_dependency_error_carries_the_resolution_path() {
	#[derive(Debug)]
	struct Outer;
	struct Inner;

	let container = Container::new();
	let outer_token = Token::<Outer>::new("outer");
	let inner_token = Token::<Inner>::new("inner-missing");

	let inner_dep = inner_token.clone();
	container.bind_factory(&outer_token, move |resolver| {
		resolver.resolve(&inner_dep)?;
		Ok(Outer)
	});

	let err = container.resolve(&outer_token).unwrap_err();
	let message = err.to_string();
	assert!(message.contains("inner-missing"), "message was: {message}");
	assert!(message.contains("outer"), "message was: {message}");
}

#[test]
fn child_binding_shadows_the_parent() {
	let parent = Container::new();
	let token = Token::<u32>::new("port");
	parent.bind_value(&token, 8080u32);

	let child = parent.create_child();
	child.bind_value(&token, 9090u32);

	assert_eq!(*child.resolve(&token).unwrap(), 9090);
	assert_eq!(*parent.resolve(&token).unwrap(), 8080);
}

#[test]
fn child_resolves_the_parents_cached_singleton() {
	let parent = Container::new();
	let token = Token::<Config>::new("shared-config");
	parent.bind_value(&token, Config {
		name: "shared".to_string(),
	});

	let child = parent.create_child();
	let from_child = child.resolve(&token).unwrap();
	let from_parent = parent.resolve(&token).unwrap();

	assert!(Arc::ptr_eq(&from_child, &from_parent));
}

#[test]
fn child_inherits_bindings_added_to_the_parent_later() {
	let parent = Container::new();
	let child = parent.create_child();

	let token = Token::<u32>::new("late");
	parent.bind_value(&token, 7u32);

	assert_eq!(*child.resolve(&token).unwrap(), 7);
}

#[test]
fn sync_resolve_of_an_async_factory_is_an_error() {
	#[derive(Debug)]
	struct Remote;

	let container = Container::new();
	let token = Token::<Remote>::new("remote");
	container.bind_async_factory(&token, |_resolver| async { Ok(Remote) });

	let err = container.resolve(&token).unwrap_err();
	assert!(matches!(err, DiError::SyncAsyncMismatch { .. }));
	assert!(err.to_string().contains("resolve_async"));
}

#[tokio::test]
async fn async_factory_resolves_through_the_async_path() {
	struct Remote {
		endpoint: String,
	}

	let container = Container::new();
	let token = Token::<Remote>::new("remote");
	container.bind_async_factory(&token, |_resolver| async {
		Ok(Remote {
			endpoint: "https://example.invalid".to_string(),
		})
	});

	let remote = container.resolve_async(&token).await.unwrap();
	assert_eq!(remote.endpoint, "https://example.invalid");
}

#[tokio::test]
async fn async_singleton_is_cached_like_a_sync_one() {
	struct Session(u32);

	let container = Container::new();
	let token = Token::<Session>::new("session");
	let counter = Arc::new(AtomicU32::new(0));
	let factory_counter = counter.clone();
	container.bind_async_factory_with(
		&token,
		move |_resolver| {
			let counter = factory_counter.clone();
			async move { Ok(Session(counter.fetch_add(1, Ordering::SeqCst))) }
		},
		wirebox::BindOptions::singleton(),
	);

	let first = container.resolve_async(&token).await.unwrap();
	let second = container.resolve_async(&token).await.unwrap();

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(counter.load(Ordering::SeqCst), 1);
	assert_eq!(first.0, 0);
}

#[tokio::test]
async fn class_binding_awaits_async_dependencies_in_declaration_order() {
	#[derive(Debug)]
	struct Conn(&'static str);
	#[derive(Debug)]
	struct Pool {
		primary: Arc<Conn>,
		replica: Arc<Conn>,
	}

	let container = Container::new();
	let primary_token = Token::<Conn>::new("primary");
	let replica_token = Token::<Conn>::new("replica");
	let pool_token = Token::<Pool>::new("pool");

	container.bind_async_factory(&primary_token, |_| async { Ok(Conn("primary")) });
	container.bind_async_factory(&replica_token, |_| async { Ok(Conn("replica")) });
	container.bind_class(
		&pool_token,
		wirebox::ConstructorMeta::new("Pool", &["primary", "replica"]),
		vec![primary_token.raw().clone(), replica_token.raw().clone()],
		|args| {
			Ok(Pool {
				primary: args.get::<Conn>(0)?,
				replica: args.get::<Conn>(1)?,
			})
		},
		wirebox::BindOptions::default(),
	);

	let err = container.resolve(&pool_token).unwrap_err();
	assert!(matches!(err, DiError::SyncAsyncMismatch { .. }));

	let pool = container.resolve_async(&pool_token).await.unwrap();
	assert_eq!(pool.primary.0, "primary");
	assert_eq!(pool.replica.0, "replica");
}

#[test]
fn class_dependencies_resolve_in_declaration_order() {
	struct Dep(&'static str);
	struct Combined;

	let container = Container::new();
	let first_token = Token::<Dep>::new("first-dep");
	let second_token = Token::<Dep>::new("second-dep");
	let combined_token = Token::<Combined>::new("combined");

	let order = Arc::new(std::sync::Mutex::new(Vec::new()));
	let order_first = order.clone();
	container.bind_factory(&first_token, move |_| {
		order_first.lock().unwrap().push("first");
		Ok(Dep("first"))
	});
	let order_second = order.clone();
	container.bind_factory(&second_token, move |_| {
		order_second.lock().unwrap().push("second");
		Ok(Dep("second"))
	});
	container.bind_class(
		&combined_token,
		wirebox::ConstructorMeta::new("Combined", &["first", "second"]),
		vec![first_token.raw().clone(), second_token.raw().clone()],
		|args| {
			assert_eq!(args.get::<Dep>(0)?.0, "first");
			assert_eq!(args.get::<Dep>(1)?.0, "second");
			Ok(Combined)
		},
		wirebox::BindOptions::default(),
	);

	container.resolve(&combined_token).unwrap();
	assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn zero_dependency_class_bindings_stay_transient() {
	struct Stamp(u32);

	let container = Container::new();
	let token = Token::<Stamp>::new("stamp");
	let counter = Arc::new(AtomicU32::new(0));
	let ctor_counter = counter.clone();
	container.bind_class(
		&token,
		wirebox::ConstructorMeta::parameterless("Stamp"),
		Vec::new(),
		move |_args| Ok(Stamp(ctor_counter.fetch_add(1, Ordering::SeqCst))),
		wirebox::BindOptions::default(),
	);

	let a = container.resolve(&token).unwrap();
	let b = container.resolve(&token).unwrap();

	assert_ne!(a.0, b.0);
	assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn try_resolve_distinguishes_missing_from_failing() {
	struct Broken;

	let container = Container::new();
	let unbound = Token::<u32>::new("unbound");
	assert!(container.try_resolve(&unbound).unwrap().is_none());

	let bound = Token::<u32>::new("bound");
	container.bind_value(&bound, 5u32);
	assert_eq!(*container.try_resolve(&bound).unwrap().unwrap(), 5);

	let broken = Token::<Broken>::new("broken");
	container.bind_factory(&broken, |_| {
		Err::<Broken, _>(DiError::factory("boom"))
	});
	assert!(container.try_resolve(&broken).is_err());
}

#[test]
fn has_binding_walks_the_ancestor_chain() {
	let parent = Container::new();
	let child = parent.create_child();
	let token = Token::<u32>::new("present");

	assert!(!child.has_binding(token.raw()));
	parent.bind_value(&token, 1u32);
	assert!(child.has_binding(token.raw()));
}

#[test]
fn interface_tokens_are_idempotent_across_the_tree() {
	let parent = Container::new();
	let child = parent.create_child();
	let grandchild = child.create_child();

	// Minted through a leaf, visible identically everywhere.
	let from_grandchild = grandchild.interface_token("IMailer");
	let from_parent = parent.interface_token("IMailer");
	let from_child = child.interface_token("IMailer");

	assert_eq!(from_grandchild.id(), from_parent.id());
	assert_eq!(from_child.id(), from_parent.id());
}

#[test]
fn interface_resolution_is_string_keyed() {
	struct Mailer {
		from: String,
	}

	let container = Container::new();
	let mut builder = wirebox::ContainerBuilder::new();
	builder
		.register_value(Mailer {
			from: "noreply@example.invalid".to_string(),
		})
		.as_interface("IMailer");
	let built = builder.build_child(&container).unwrap();

	let mailer = built.resolve_interface::<Mailer>("IMailer").unwrap();
	assert_eq!(mailer.from, "noreply@example.invalid");

	// The parent minted nothing; the name still maps to one token tree-wide.
	assert_eq!(
		container.interface_token("IMailer").id(),
		built.interface_token("IMailer").id()
	);
}

#[test]
fn resolve_interface_mismatch_reports_the_expected_type() {
	struct Actual;
	#[derive(Debug)]
	struct Wanted;

	let container = Container::new();
	let mut builder = wirebox::ContainerBuilder::new();
	builder.register_value(Actual).as_interface("IService");
	let built = builder.build_child(&container).unwrap();

	let err = built.resolve_interface::<Wanted>("IService").unwrap_err();
	match err {
		DiError::TypeMismatch { expected, .. } => assert!(expected.contains("Wanted")),
		other => panic!("expected TypeMismatch, got {other:?}"),
	}
}

#[test]
fn rebinding_a_token_replaces_the_binding_locally() {
	let container = Container::new();
	let token = Token::<u32>::new("replaceable");

	container.bind_value(&token, 1u32);
	assert_eq!(*container.resolve(&token).unwrap(), 1);

	container.bind_value(&token, 2u32);
	assert_eq!(*container.resolve(&token).unwrap(), 2);
}
