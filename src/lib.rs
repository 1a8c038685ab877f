//! # wirebox
//!
//! Token-based dependency injection for Rust.
//!
//! ## Features
//!
//! - **Token identity**: dependencies are addressed by unique tokens, not by
//!   type alone, so the same type can be bound many ways
//! - **Lifetimes**: singleton, transient and per-request instance policies
//! - **Scoped**: child containers inherit and shadow parent bindings
//! - **Cycle detection**: deterministic, with the full dependency path in
//!   the error
//! - **Sync and async**: factories may be plain closures or async; the sync
//!   path refuses async bindings instead of hanging
//! - **Autowiring**: constructor arguments resolved by positional metadata,
//!   explicit maps, or parameter-name conventions
//! - **Fast paths**: steady-state singleton lookups and zero-dependency
//!   transient constructions skip the resolution machinery entirely
//!
//! ## Quick start
//!
//! ```
//! use wirebox::{Container, Token};
//!
//! struct Database {
//! 	url: String,
//! }
//!
//! struct UserService {
//! 	db: std::sync::Arc<Database>,
//! }
//!
//! let container = Container::new();
//! let db_token = Token::<Database>::new("database");
//! let users_token = Token::<UserService>::new("user-service");
//!
//! container.bind_value(&db_token, Database {
//! 	url: "postgres://localhost".to_string(),
//! });
//! let db_dep = db_token.clone();
//! container.bind_factory(&users_token, move |resolver| {
//! 	Ok(UserService {
//! 		db: resolver.resolve(&db_dep)?,
//! 	})
//! });
//!
//! let users = container.resolve(&users_token).unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Builder and interface names
//!
//! The [`ContainerBuilder`] offers a declarative surface where registrations
//! are addressed by interface-name strings and compiled onto a container in
//! one deterministic pass. Constructor parameters are autowired by matching
//! their declared names against the interface-name registry (trying `name`,
//! `Name`, then `IName`):
//!
//! ```
//! use wirebox::{ConstructorMeta, ContainerBuilder};
//!
//! struct Logger;
//!
//! struct Auditor {
//! 	logger: std::sync::Arc<Logger>,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register_value(Logger).as_interface("ILogger");
//! builder.register_type(
//! 	ConstructorMeta::from_signature("Auditor", "logger: Logger"),
//! 	|args| {
//! 		Ok(Auditor {
//! 			logger: args.get::<Logger>(0)?,
//! 		})
//! 	},
//! );
//!
//! let container = builder.build().unwrap();
//! let auditor = container.resolve_interface::<Auditor>("Auditor").unwrap();
//! let logger = container.resolve_interface::<Logger>("ILogger").unwrap();
//! assert!(std::sync::Arc::ptr_eq(&auditor.logger, &logger));
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton**: one instance per owning container, disposed in reverse
//!   creation order by [`Container::dispose`]
//! - **Transient**: a fresh instance per resolution
//! - **Per-request**: one instance per top-level resolve call tree; every
//!   branch of the tree observes the same instance

mod autowire;
mod binding;
mod builder;
mod container;
mod context;
mod dispose;
mod error;
mod signature;
mod token;

pub use autowire::{ArgResolver, AutowireOptions, AutowireStrategy, PositionSpec, ResolvedArgs};
pub use binding::{AnyArc, BindOptions, BindingKey, Lifetime};
pub use builder::{ContainerBuilder, Registration};
pub use container::{Container, Resolver};
pub use dispose::{Dispose, DisposeHook};
pub use error::{DiError, DiResult, ResolutionPath};
pub use signature::ConstructorMeta;
pub use token::{RawToken, Token, TokenId, create_token};
