//! Command return codes (spec.md §6).

use alloc::string::String;

/// The six outcomes every command function returns, plus a
/// success-with-output variant used by the dispatcher's reply buffering
/// (spec.md §4.I).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    ParamError,
    LineError,
    UlvlDenied,
    NotFound,
    MonrcDenied,
}

impl Status {
    /// The integer code spec.md §6 assigns each status (0, -1 .. -6).
    pub const fn code(&self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Failure => -1,
            Status::ParamError => -2,
            Status::LineError => -3,
            Status::UlvlDenied => -4,
            Status::NotFound => -5,
            Status::MonrcDenied => -6,
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Status::Success => "SUCCESS",
            Status::Failure => "FAILURE",
            Status::ParamError => "PARAM_ERROR",
            Status::LineError => "LINE_ERROR",
            Status::UlvlDenied => "ULVL_DENIED",
            Status::NotFound => "NOT_FOUND",
            Status::MonrcDenied => "MONRC_DENIED",
        };
        f.write_str(s)
    }
}

/// What a successful command produced, if anything worth printing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply(pub Option<String>);

impl Reply {
    pub const fn empty() -> Self {
        Reply(None)
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply(Some(s))
    }
}

pub type CmdResult = Result<Reply, Status>;
