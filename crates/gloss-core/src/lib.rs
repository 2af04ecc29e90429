//! Gloss Core Types
//!
//! This crate provides the types shared by the gloss parser, resolver and
//! exporters:
//!
//! - **Identifiers**: string-interned symbol names ([`identifier::Id`])
//! - **Documents**: the resolved, renderable model ([`document::Document`], [`document::Field`])
//! - **References**: pending symbol lookups ([`reference::Reference`])

pub mod document;
pub mod identifier;
pub mod reference;
