//! The command dispatch table (spec.md §6 CLI grammar; grounded on
//! `hermit-os-kernel`'s `shell/shell.rs` `{help, func, aliases}` table
//! pattern). Each entry's `func` receives the shared [`super::Dispatcher`]
//! and the tokenized argument vector and returns a [`CmdResult`].

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::board::NicDriver;
use crate::status::{CmdResult, Reply, Status};

use super::Dispatcher;

pub struct Command<N: NicDriver> {
    pub help: &'static str,
    pub func: fn(&mut Dispatcher<N>, &[String]) -> CmdResult,
    pub aliases: &'static [&'static str],
}

pub struct CommandTable<N: NicDriver> {
    commands: BTreeMap<&'static str, Command<N>>,
}

impl<N: NicDriver> Default for CommandTable<N> {
    fn default() -> Self {
        let mut table = CommandTable { commands: BTreeMap::new() };
        table.register("set", Command { help: "get/set shell variables", func: cmd_set, aliases: &[] });
        table.register("arp", Command { help: "address resolution protocol", func: cmd_arp, aliases: &[] });
        table.register("help", Command { help: "list commands", func: cmd_help, aliases: &["?"] });
        table
    }
}

impl<N: NicDriver> CommandTable<N> {
    pub fn register(&mut self, name: &'static str, command: Command<N>) {
        self.commands.insert(name, command);
    }

    /// Resolve `name` to a registered command, following aliases.
    pub fn lookup(&self, name: &str) -> Option<&Command<N>> {
        if let Some(cmd) = self.commands.get(name) {
            return Some(cmd);
        }
        self.commands.values().find(|c| c.aliases.contains(&name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }
}

/// Tokenize a command line the way both the interactive dispatcher and
/// the script runner do (spec.md §4.J, §4.K), reusing `shell-words` the
/// same way the teacher's CLI splitter does for its boot command line.
pub fn tokenize(line: &str) -> Result<Vec<String>, Status> {
    shell_words::split(line).map_err(|_| Status::ParamError)
}

fn cmd_set<N: NicDriver>(dispatcher: &mut Dispatcher<N>, args: &[String]) -> CmdResult {
    match args.first() {
        None => Ok(Reply::from(dispatcher.vars.getenvp())),
        Some(assignment) => match assignment.split_once('=') {
            Some((name, value)) => {
                dispatcher.vars.set(name, value);
                Ok(Reply::empty())
            }
            None => match dispatcher.vars.get(assignment) {
                Some(value) => Ok(Reply::from(String::from(value))),
                None => Err(Status::NotFound),
            },
        },
    }
}

fn cmd_arp<N: NicDriver>(dispatcher: &mut Dispatcher<N>, args: &[String]) -> CmdResult {
    if args.is_empty() {
        let mut out = String::new();
        for (ip, mac) in dispatcher.net.arp_cache.iter() {
            out.push_str(&alloc::format!(
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x} = {}.{}.{}.{}\n",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5], ip[0], ip[1], ip[2], ip[3]
            ));
        }
        return Ok(Reply::from(out));
    }
    if args[0] == "-f" {
        dispatcher.net.arp_cache.flush();
        return Ok(Reply::empty());
    }
    Err(Status::ParamError)
}

fn cmd_help<N: NicDriver>(dispatcher: &mut Dispatcher<N>, _args: &[String]) -> CmdResult {
    let mut out = String::new();
    for name in dispatcher.commands.names() {
        if let Some(cmd) = dispatcher.commands.lookup(name) {
            out.push_str(name);
            out.push_str(" - ");
            out.push_str(cmd.help);
            out.push('\n');
        }
    }
    Ok(Reply::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_respects_quoting() {
        let tokens = tokenize("set FOO=\"a b\"").unwrap();
        assert_eq!(tokens, alloc::vec!["set".to_string(), "FOO=a b".to_string()]);
    }
}
