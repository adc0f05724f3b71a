//! Domain layer: entities, parameter schemas and the traits infrastructure implements.
//!
//! - [`entities`] - links, dispatch results, analytics records
//! - [`params`] - typed, validated parameters per action
//! - [`gateways`] - the payment capability the dispatcher consumes
//! - [`repositories`] - the analytics sink contract
//!
//! Nothing here depends on `crate::infrastructure`.

pub mod entities;
pub mod gateways;
pub mod params;
pub mod repositories;
