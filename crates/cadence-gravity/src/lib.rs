//! Tree gravity for the Cadence time-advancement core.
//!
//! Each rank builds an arena octree over its owned particles and
//! aggregates traceless Cartesian quadrupole moments bottom-up
//! ("upsweep"). The finished trees are exchanged between ranks so every
//! rank can traverse the whole decomposition; traversal applies the
//! Barnes-Hut opening-angle test per owned particle and accumulates
//! acceleration, potential and interaction counts.
//!
//! The [`MultipoleHolder`] trait is the seam the propagator calls.
//! [`HostMultipoleHolder`] traverses serially; [`AcceleratedMultipoleHolder`]
//! traverses on the rayon pool against the device-resident store.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod holder;
pub mod multipole;
pub mod octree;

pub use holder::{
    AcceleratedMultipoleHolder, HostMultipoleHolder, MultipoleHolder, OctreeMultipoles,
};
pub use multipole::{p2p, Multipole};
pub use octree::{Interaction, NodeId, Octree, OctreeNode, Target};
