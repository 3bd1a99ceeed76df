//! Collective coordination between cooperating ranks.
//!
//! The [`Communicator`] trait is the only way ranks interact outside the
//! domain halo exchange. Implementations supply ordered point-to-point
//! transport; barrier, reduction and gather are provided on top of it
//! and behave identically for every transport.
//!
//! - [`SerialComm`]: a single rank, every collective is local.
//! - [`ThreadComm`]: `n` in-process ranks connected by crossbeam channels.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod communicator;
pub mod op;
pub mod serial;
pub mod thread;

pub use communicator::Communicator;
pub use op::{ReduceOp, ReduceTarget, Reducible, Scalar};
pub use serial::SerialComm;
pub use thread::ThreadComm;
