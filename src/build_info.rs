//! Build-time metadata generated by the `built` crate, the source for
//! the `MONITORBUILT`/`VERSION_*` shell variables a board integration
//! passes into [`crate::shell::vars::Startup`] (spec.md §4.J).

#![allow(clippy::unreadable_literal)]

include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// A `MONITORBUILT`-shaped string: `"<date> <time> UTC"`, matching the
/// original's link-time stamp.
pub fn monitor_built() -> alloc::string::String {
    alloc::format!("{BUILT_TIME_UTC}")
}
