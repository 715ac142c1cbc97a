//! The interactive/scripted command surface (spec.md §4.I, §4.J, §4.K,
//! §6; grounded on `hermit-os-kernel`'s `shell/shell.rs` dispatcher).

pub mod commands;
pub mod script;
pub mod struct_editor;
pub mod vars;

use alloc::string::String;

use crate::board::NicDriver;
#[cfg(feature = "remote-cmd")]
use crate::net::remote_cmd::ClientAddr;
use crate::net::NetStack;
use crate::status::{CmdResult, Status};

use commands::CommandTable;
use vars::VarStore;

/// The state every command function runs against: the shell-variable
/// store, the network stack, and the command table itself (so `help`
/// can enumerate it).
pub struct Dispatcher<N: NicDriver> {
    pub vars: VarStore,
    pub net: NetStack<N>,
    pub commands: CommandTable<N>,
    #[cfg(feature = "remote-cmd")]
    pub last_client: Option<ClientAddr>,
}

impl<N: NicDriver> Dispatcher<N> {
    pub fn new(vars: VarStore, net: NetStack<N>) -> Self {
        Dispatcher {
            vars,
            net,
            commands: CommandTable::default(),
            #[cfg(feature = "remote-cmd")]
            last_client: None,
        }
    }

    /// Tokenize and run one command line, returning the same
    /// `{SUCCESS, FAILURE, PARAM_ERROR, ...}` taxonomy the CLI table
    /// in spec.md §6 specifies.
    pub fn dispatch_line(&mut self, line: &str) -> CmdResult {
        let tokens = commands::tokenize(line)?;
        let Some((name, args)) = tokens.split_first() else {
            return Ok(crate::status::Reply::empty());
        };
        match self.commands.lookup(name) {
            Some(cmd) => (cmd.func)(self, args),
            None => Err(Status::NotFound),
        }
    }
}

/// Render a [`CmdResult`] as the exit code spec.md §6 specifies
/// (0, -1 .. -6).
pub fn exit_code(result: &CmdResult) -> i32 {
    match result {
        Ok(_) => Status::Success.code(),
        Err(status) => status.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    struct FakeNic;
    impl NicDriver for FakeNic {
        fn mac_address(&self) -> [u8; 6] {
            [1, 2, 3, 4, 5, 6]
        }
        fn get_xmit_buffer(&mut self, _len: usize) -> Option<&mut [u8]> {
            None
        }
        fn send_buffer(&mut self, _len: usize) {}
        fn poll_receive(&mut self) -> Option<&[u8]> {
            None
        }
    }

    #[test]
    fn set_and_retrieve_a_variable() {
        let net = NetStack::new(FakeNic, Config::default(), 0);
        let mut dispatcher = Dispatcher::new(VarStore::new(), net);
        assert!(dispatcher.dispatch_line("set FOO=1").is_ok());
        let reply = dispatcher.dispatch_line("set FOO").unwrap();
        assert_eq!(reply.0.as_deref(), Some("1"));
    }

    #[test]
    fn unknown_command_is_not_found() {
        let net = NetStack::new(FakeNic, Config::default(), 0);
        let mut dispatcher = Dispatcher::new(VarStore::new(), net);
        assert_eq!(dispatcher.dispatch_line("frobnicate"), Err(Status::NotFound));
    }
}
