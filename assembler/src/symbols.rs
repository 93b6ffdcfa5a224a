use std::collections::HashMap;

use log::{trace, warn};

const RAM_BASE: u16 = 16;
pub const SCREEN: u16 = 16384;
pub const KBD: u16 = 24576;

/// Name to address bindings. A name is bound at most once.
pub struct SymbolTable {
    table: HashMap<String, u16>,
    ram_alloc: u16,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = HashMap::new();
        for i in 0..=15u16 {
            table.insert(format!("R{}", i), i);
        }
        table.insert("SP".to_string(), 0);
        table.insert("LCL".to_string(), 1);
        table.insert("ARG".to_string(), 2);
        table.insert("THIS".to_string(), 3);
        table.insert("THAT".to_string(), 4);
        table.insert("SCREEN".to_string(), SCREEN);
        table.insert("KBD".to_string(), KBD);
        Self {
            table,
            ram_alloc: RAM_BASE,
        }
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.table.get(name).copied()
    }

    /// Binds a label; returns false if the name is already bound.
    pub fn define_label(&mut self, name: &str, addr: u16) -> bool {
        if self.table.contains_key(name) {
            return false;
        }
        trace!("label {} = {}", name, addr);
        self.table.insert(name.to_string(), addr);
        true
    }

    /// Address of `name`, allocating the next free RAM cell on first use.
    pub fn resolve(&mut self, name: &str) -> u16 {
        if let Some(addr) = self.get(name) {
            return addr;
        }
        let addr = self.ram_alloc;
        if addr == SCREEN {
            warn!("variable {} allocated inside the screen memory map", name);
        }
        trace!("variable {} = {}", name, addr);
        self.ram_alloc = self.ram_alloc.saturating_add(1);
        self.table.insert(name.to_string(), addr);
        addr
    }

    pub fn variable_count(&self) -> usize {
        (self.ram_alloc - RAM_BASE) as usize
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
