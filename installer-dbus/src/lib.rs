// SPDX-License-Identifier: GPL-3.0-only

//! Bus-facing plumbing for the installer services.
//!
//! This crate is the layer every module handler is built on:
//!
//! - **wire**: the closed set of wire type tags and the tagged variant that
//!   pairs a value with its tag
//! - **structure**: self-describing records convertible to and from
//!   string-to-variant maps
//! - **introspect**: declarative interface descriptions rendered to
//!   introspection XML, with inheritance merging and collision detection
//! - **properties**: the property-change cache with batched flush semantics
//! - **task**: cancellable units of work with progress reporting

pub mod introspect;
pub mod properties;
pub mod structure;
pub mod task;
pub mod wire;

pub use introspect::{
    Access, Arg, GeneratedObject, InterfaceDecl, Member, ObjectDecl, generate_introspection,
    is_exportable, property_mapping, standard_interfaces,
};
pub use properties::{PropertiesChangedBatch, PropertyChangeCache, PropertySource, changed_reporter};
pub use structure::{DbusStructure, FieldSpec, StructureError, StructureMap, WireConvert, tagged};
pub use task::{InstallationTask, TaskContext, TaskEvent, TaskFailure, TaskOutcome, TaskRunner};
pub use wire::{TaggedVariant, TypeHint, WireData, WireError};
