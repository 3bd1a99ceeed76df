//! Particle domains for the Cadence time-advancement core.
//!
//! A [`Domain`] owns the communicator of its rank and decides, on every
//! [`sync`](Domain::sync), which contiguous index range `[first, last)`
//! of the particle arrays this rank owns and how many halo slots surround
//! it. Conserved fields are laid out as `[left halo | owned | right halo]`;
//! dependent fields are resized to the same length and left as scratch.
//!
//! - [`LocalDomain`]: one rank, fixed padding, no exchange.
//! - [`SfcDomain`]: ranks ordered along a Morton curve; each rank
//!   receives halo particles from its curve neighbours.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bbox;
pub mod domain;
mod layout;
pub mod local;
pub mod sfc;
pub mod sfc_domain;

pub use bbox::BoundingBox;
pub use domain::Domain;
pub use local::LocalDomain;
pub use sfc::{morton_key, KEY_BITS_PER_DIM};
pub use sfc_domain::SfcDomain;
