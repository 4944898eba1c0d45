#![warn(missing_docs)]

//! `oplower` lowers operator graphs into target programs.
//!
//! Each operator type is served by an [`OpBuilder`](builder::OpBuilder). Builders are stored in
//! an [`OpBuilderRegistrations`](registry::OpBuilderRegistrations), which maps operator type names
//! to builder instances and shares one instance between operator types lowered the same way.
//! [`lower_graph`](lower::lower_graph) validates every node of a graph against its builder and
//! then lowers the whole graph into a [`ModelBuilder`](target::ModelBuilder).
//!
//! ```ignore
//! let graph = OperatorGraph::load("model.json")?;
//! let registrations = OpBuilderRegistrations::new();
//! let program = compile(&graph, &registrations, &LoweringConfig::default())?;
//! println!("{program}");
//! ```

#[macro_use]
extern crate derive_new;

/// Operator builders and the capability interface they implement.
pub mod builder;

/// Lowering configuration.
pub mod config;

/// Error types.
pub mod error;

/// Logging setup for binaries.
pub mod logger;

/// The graph lowering driver.
pub mod lower;

/// Registry of operator builders.
pub mod registry;

/// Target model builders and the programs they produce.
pub mod target;

pub use config::LoweringConfig;
pub use error::{BuildError, Error, LoweringError};
pub use lower::{LoweredGraph, compile, lower_graph};
pub use registry::OpBuilderRegistrations;
pub use target::{ModelBuilder, Program, ProgramBuilder, TargetFormat};

pub use oplower_ir as ir;
