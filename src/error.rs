//! Error kind taxonomy (spec.md §7) and the top-level error type that
//! aggregates every module's `thiserror` error into one value a command
//! function can propagate with `?` before mapping to a [`crate::Status`]
//! at the dispatcher boundary.

#[cfg(feature = "atags")]
use crate::atags::AtagsError;
use crate::board::{FlashError, TfsError};
#[cfg(feature = "board-info")]
use crate::board_info::BoardInfoError;
#[cfg(feature = "fb-console")]
use crate::console::bmp::BmpError;
use crate::net::arp::ArpError;
#[cfg(feature = "dhcp")]
use crate::net::dhcp::DhcpError;
#[cfg(feature = "dns")]
use crate::net::dns::DnsError;
#[cfg(feature = "tftp")]
use crate::net::tftp::TftpError;
use crate::shell::script::ScriptError;
use crate::shell::struct_editor::StructError;
use crate::status::Status;
#[cfg(feature = "xmodem")]
use crate::xmodem::XmodemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input the user typed: bad IP, unknown option letter.
    Parse,
    /// A resolvable network condition: ARP miss, TFTP/DHCP timeout.
    Transient,
    /// A malformed or unexpected packet from the network.
    Protocol,
    /// Flash/TFS write failed.
    Storage,
    /// The remote peer itself reported an error (TFTP ERR, NAK/CAN).
    Host,
    /// An internal invariant broke (script return-stack under/overflow).
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Arp(#[from] ArpError),
    #[cfg(feature = "dhcp")]
    #[error("{0}")]
    Dhcp(#[from] DhcpError),
    #[cfg(feature = "tftp")]
    #[error("{0}")]
    Tftp(#[from] TftpError),
    #[cfg(feature = "dns")]
    #[error("{0}")]
    Dns(#[from] DnsError),
    #[error("{0}")]
    Script(#[from] ScriptError),
    #[error("{0}")]
    Struct(#[from] StructError),
    #[cfg(feature = "xmodem")]
    #[error("{0}")]
    Xmodem(#[from] XmodemError),
    #[error("{0}")]
    Flash(#[from] FlashError),
    #[error("{0}")]
    Tfs(#[from] TfsError),
    #[cfg(feature = "fb-console")]
    #[error("{0}")]
    Bmp(#[from] BmpError),
    #[cfg(feature = "board-info")]
    #[error("{0}")]
    BoardInfo(#[from] BoardInfoError),
    #[cfg(feature = "atags")]
    #[error("{0}")]
    Atags(#[from] AtagsError),
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::Arp(e) => e.kind(),
            #[cfg(feature = "dhcp")]
            Error::Dhcp(e) => e.kind(),
            #[cfg(feature = "tftp")]
            Error::Tftp(e) => e.kind(),
            #[cfg(feature = "dns")]
            Error::Dns(e) => e.kind(),
            Error::Script(e) => e.kind(),
            Error::Struct(_) => ErrorKind::Parse,
            #[cfg(feature = "xmodem")]
            Error::Xmodem(e) => e.kind(),
            Error::Flash(_) => ErrorKind::Storage,
            Error::Tfs(_) => ErrorKind::Storage,
            #[cfg(feature = "fb-console")]
            Error::Bmp(_) => ErrorKind::Parse,
            #[cfg(feature = "board-info")]
            Error::BoardInfo(e) => e.kind(),
            #[cfg(feature = "atags")]
            Error::Atags(e) => e.kind(),
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::Parse => Status::ParamError,
            ErrorKind::Transient | ErrorKind::Protocol | ErrorKind::Host => Status::Failure,
            ErrorKind::Storage => Status::Failure,
            ErrorKind::Fatal => Status::LineError,
        }
    }
}
