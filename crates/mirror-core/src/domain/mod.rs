//! Domain entities for InputMirror.
//!
//! This module contains pure logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from OS APIs, network libraries or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Here the domain consists of two ideas: how a pointer position on the
//! sender's desktop is mapped onto the receiver's absolute-pointer coordinate
//! space, and which states a mirroring session moves through.

/// Absolute-pointer coordinate normalization over the virtual desktop.
pub mod geometry;

/// Session states, roles and user-visible status.
pub mod session;
