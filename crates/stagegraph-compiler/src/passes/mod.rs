//! Compiler passes, in the order the compiler runs them.
//!
//! Analysis:
//!
//! - [`access_paths`]: bind reference fields, find parent-access fields
//! - [`nodes`]: discover stages and method nodes, bind members
//! - [`mutation`]: reject writes to stage fields outside their stage
//! - [`linking`]: add dependency edges from field reads and calls
//! - [`ordering`]: reject cycles, number nodes topologically
//!
//! Transformation:
//!
//! - [`guarding`]: route cross-stage accesses through guarded entry points
//! - [`lifecycle`]: synthesize predicates, closes and initializer wrappers
//! - [`references`]: rewrite reference-field accesses into tree paths
//! - [`global_close`]: add the root's `close()`
//! - [`merging`]: fold extension chains and compositions into one type
//! - [`renaming`]: retarget type and owner names at merged types
//! - [`layout`]: key members by topological position
//! - [`finals`]: order final field initialization, add final accessors
//! - [`emit`]: strip markers and sort members

pub mod access_paths;
pub mod emit;
pub mod finals;
pub mod global_close;
pub mod guarding;
pub mod layout;
pub mod lifecycle;
pub mod linking;
pub mod merging;
pub mod mutation;
pub mod nodes;
pub mod ordering;
pub mod references;
pub mod renaming;

pub use access_paths::{AccessPathOutput, AccessPathPass};
pub use emit::EmitPass;
pub use finals::{FinalsOutput, FinalsPass};
pub use global_close::{GLOBAL_CLOSE, GlobalCloseOutput, GlobalClosePass};
pub use guarding::{GuardingOutput, GuardingPass};
pub use layout::{LayoutOutput, LayoutPass};
pub use lifecycle::{LifecycleOutput, LifecyclePass};
pub use linking::{LinkingOutput, LinkingPass};
pub use merging::{MergeOutput, MergePass};
pub use mutation::{MutationCheckOutput, MutationCheckPass};
pub use nodes::{NodeDiscoveryOutput, NodeDiscoveryPass};
pub use ordering::{OrderingOutput, OrderingPass};
pub use references::{ReferenceOutput, ReferencePass};
pub use renaming::{RenameOutput, RenamePass};
