//! CPU-neutral core of the uMon embedded boot monitor.
//!
//! This crate implements the protocol stack, script runtime, transfer
//! engines and frame-buffer console that make up the bulk of uMon's
//! engineering surface. It never touches reset/vector code, pin-mux or
//! clock setup, the flash driver, the TFS storage engine, the UART
//! register layout or a line editor — those are supplied by a board
//! integration through the traits in [`board`].
#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
extern crate log;

#[cfg(feature = "atags")]
pub mod atags;
pub mod board;
#[cfg(feature = "board-info")]
pub mod board_info;
pub mod build_info;
pub mod config;
#[cfg(feature = "fb-console")]
pub mod console;
pub mod error;
pub mod net;
pub mod retransmit;
pub mod shell;
pub mod status;
pub mod time;
#[cfg(feature = "xmodem")]
pub mod xmodem;

pub use config::Config;
pub use error::Error;
pub use status::Status;
