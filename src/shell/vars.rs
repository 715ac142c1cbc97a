//! Shell-variable store (spec.md §4.J), backed by a hashbrown table the
//! way `env.rs` backs the boot command line (grounded on
//! `hermit-os-kernel`'s `env.rs`/`environment.rs`).

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use ahash::RandomState;
use hashbrown::HashMap;

/// Pre-populated at startup (spec.md §4.J): platform/build identity
/// and the reset/compare pointers a board integration fills in.
pub struct Startup<'a> {
    pub prompt: &'a str,
    pub appram_base: u32,
    pub bootrom_base: u32,
    pub platform: &'a str,
    pub monitor_built: &'a str,
    pub version_maj: &'a str,
    pub version_min: &'a str,
    pub version_tgt: &'a str,
    pub loops_per_ms: Option<u32>,
}

#[derive(Debug, Default)]
pub struct VarStore {
    vars: HashMap<String, String, RandomState>,
}

impl VarStore {
    pub fn new() -> Self {
        VarStore {
            vars: HashMap::with_hasher(RandomState::with_seeds(0, 0, 0, 0)),
        }
    }

    pub fn with_startup(startup: &Startup<'_>) -> Self {
        let mut store = Self::new();
        store.set("PROMPT", startup.prompt);
        store.set("APPRAMBASE", &format!("0x{:08x}", startup.appram_base));
        store.set("BOOTROMBASE", &format!("0x{:08x}", startup.bootrom_base));
        store.set("PLATFORM", startup.platform);
        store.set("MONITORBUILT", startup.monitor_built);
        store.set("VERSION_MAJ", startup.version_maj);
        store.set("VERSION_MIN", startup.version_min);
        store.set("VERSION_TGT", startup.version_tgt);
        if let Some(lpm) = startup.loops_per_ms {
            store.set("LOOPSPERMSEC", &lpm.to_string());
        }
        store
    }

    /// `set(name, value)`; a `None`/empty value removes the binding
    /// (spec.md §4.J).
    pub fn set(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.vars.remove(name);
        } else {
            self.vars.insert(name.to_string(), value.to_string());
        }
    }

    pub fn unset(&mut self, name: &str) {
        self.vars.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn sprintf_to(&mut self, name: &str, formatted: String) {
        self.set(name, &formatted);
    }

    /// Render the whole environment as a newline-separated
    /// `NAME=VALUE` blob (`getenvp()` in spec.md §4.J).
    pub fn getenvp(&self) -> String {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        let mut out = String::new();
        for name in names {
            out.push_str(name);
            out.push('=');
            out.push_str(self.vars.get(name).unwrap());
            out.push('\n');
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_with_empty_value_removes_binding() {
        let mut store = VarStore::new();
        store.set("FOO", "1");
        assert_eq!(store.get("FOO"), Some("1"));
        store.set("FOO", "");
        assert_eq!(store.get("FOO"), None);
    }

    #[test]
    fn getenvp_renders_sorted_name_value_pairs() {
        let mut store = VarStore::new();
        store.set("B", "2");
        store.set("A", "1");
        assert_eq!(store.getenvp(), "A=1\nB=2\n");
    }

    #[test]
    fn startup_prepopulates_platform_identity() {
        let startup = Startup {
            prompt: "uMon> ",
            appram_base: 0x2000_0000,
            bootrom_base: 0,
            platform: "generic-arm",
            monitor_built: "2026-07-31",
            version_maj: "1",
            version_min: "0",
            version_tgt: "0",
            loops_per_ms: Some(1000),
        };
        let store = VarStore::with_startup(&startup);
        assert_eq!(store.get("PLATFORM"), Some("generic-arm"));
        assert_eq!(store.get("LOOPSPERMSEC"), Some("1000"));
    }
}
