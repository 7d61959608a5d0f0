// SPDX-License-Identifier: GPL-3.0-only

//! Procedural macros for installer module handlers.
//!
//! This crate provides the `#[emits_properties_changed]` macro that flushes
//! the handler's property-change cache after a mutator returns.
//!
//! # Usage
//!
//! Apply `#[emits_properties_changed]` to async methods of a type exposing
//! `fn flush_property_changes(&mut self)`:
//!
//! ```rust,ignore
//! impl UsersHandler {
//!     #[emits_properties_changed]
//!     async fn set_root_account_locked(&mut self, locked: bool) {
//!         if self.root_locked != locked {
//!             self.root_locked = locked;
//!             self.report_changed("IsRootAccountLocked");
//!         }
//!     }
//! }
//! ```
//!
//! The macro will:
//! 1. Execute the original method body
//! 2. Call `flush_property_changes` on the receiver, even when the body
//!    reported nothing
//! 3. Return the body's value unchanged

mod emit;
mod transform;

use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

use transform::transform_method;

/// Attribute macro for state-mutating handler methods.
///
/// Changed properties recorded during the body are flushed into batched
/// properties-changed emissions after the body completes.
#[proc_macro_attribute]
pub fn emits_properties_changed(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let method = parse_macro_input!(item as ItemFn);

    let expanded = transform_method(&method);

    expanded.into()
}
