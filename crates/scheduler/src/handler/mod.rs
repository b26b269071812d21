//! Task handler: owns every task, time-slices execution and relays terminal
//! statuses to observers.
//!
//! Split into focused submodules:
//! - `core`: handler struct, task arena, check-out protocol, accessors
//! - `lifecycle`: run, bind, halt, resume and removal
//! - `update`: the time-sliced scheduling pass
//! - `events`: routing of game events to subscribed tasks

mod core;
mod events;
mod lifecycle;
mod update;

pub use self::core::TaskHandler;
