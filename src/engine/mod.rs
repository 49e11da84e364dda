//! Engine integration layer.
//!
//! Tunables live in [`config`]; [`plugin`] exposes the battlefield to an
//! ECS app as a shared resource driven by events.

pub mod config;
pub mod plugin;

pub use config::EngineConfig;
pub use plugin::{
    BattlefieldResource, BattlescapePlugin, ExplosionRequested, ExplosionResolved, FovRequested,
    ReactionCheckRequested, ReactionFired,
};
