//! Sortable 64-bit unique ids for fleets of independent hosts, inspired by
//! [Twitter's Snowflake], with no coordination service.
//!
//! Every id packs four fields, most significant first: a zero sign bit, a
//! three-bit [`Plane`] chosen by the caller, the wall-clock time, and a host
//! number and per-time-unit sequence in the order given by the [`Layout`].
//! Two layouts ship ready-made:
//!
//! | layout              | unit | time | host | sequence | order            |
//! |---------------------|------|------|------|----------|------------------|
//! | [`Layout::MILLIS`]  | ms   | 42   | 8    | 10       | time-host-seq    |
//! | [`Layout::SECONDS`] | s    | 34   | 8    | 18       | time-seq-host    |
//!
//! ## Quickstart
//!
//! ```
//! use planeflake::{Plane, Snowflake};
//!
//! let sf = Snowflake::builder().host_id(&|| Ok(7)).finalize().unwrap();
//! let id = sf.next_id(Plane::A).unwrap();
//! let parts = sf.decompose(id);
//! assert_eq!(parts.plane, Some(Plane::A));
//! assert_eq!(parts.host, 7);
//! ```
//!
//! ## Concurrent use
//!
//! Snowflake is thread safe. `clone` it before moving to another thread; all
//! clones share one stream:
//! ```
//! use planeflake::{Plane, Snowflake};
//! use std::thread;
//!
//! let sf = Snowflake::builder().host_id(&|| Ok(1)).finalize().unwrap();
//!
//! let mut children = Vec::new();
//! for _ in 0..10 {
//!     let thread_sf = sf.clone();
//!     children.push(thread::spawn(move || {
//!         println!("{}", thread_sf.next_id(Plane::B).unwrap());
//!     }));
//! }
//!
//! for child in children {
//!     child.join().unwrap();
//! }
//! ```
//!
//! ## Groups
//!
//! A [`Registry`] hands out one independent stream per group name:
//! ```
//! use planeflake::{Layout, Plane, Snowflake};
//!
//! let registry = Snowflake::builder()
//!     .layout(Layout::SECONDS)
//!     .host_id(&|| Ok(3))
//!     .build_registry()
//!     .unwrap();
//! let order = registry.next_id("orders", Plane::C).unwrap();
//! let user = registry.next_id("users", Plane::C).unwrap();
//! assert!(registry.verify(order) && registry.verify(user));
//! ```
//!
//! ## Clock regression
//!
//! A clock observed behind the last issued time unit is fatal: the generator
//! returns [`Error::ClockMovedBackwards`] once and [`Error::Poisoned`] forever
//! after, rather than risk issuing a duplicate.
//!
//! [Twitter's Snowflake]: https://blog.twitter.com/2010/announcing-snowflake

mod builder;
mod clock;
mod error;
pub mod host;
mod layout;
mod registry;
mod snowflake;

pub use crate::snowflake::*;
pub use builder::*;
pub use clock::*;
pub use error::*;
pub use host::{HostSource, HostSources, ResolvedHost};
pub use layout::*;
pub use registry::*;
