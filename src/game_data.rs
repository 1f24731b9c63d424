//! Per-game state: live memory, frame history, named variables and the
//! action table.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::actions::ActionTable;
use crate::address_space::AddressSpace;
use crate::config::DataConfig;
use crate::datum::{Datum, DatumMut};
use crate::error::{Error, Result};
use crate::manifest::{self, Manifest};
use crate::metrics;
use crate::snapshots::FrameHistory;
use crate::variable::{Variable, Variant};

#[derive(Debug, Default)]
pub struct GameData {
    config: DataConfig,
    mem: AddressSpace,
    history: FrameHistory,
    vars: BTreeMap<String, Variable>,
    custom_vars: BTreeMap<String, Variant>,
    buttons: Vec<String>,
    actions: ActionTable,
}

fn not_found(name: &str) -> Error {
    Error::NotFound {
        name: name.to_string(),
    }
}

impl GameData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DataConfig) -> Self {
        GameData {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    /// Merge the variables of the manifest at `path` into the table.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                metrics::record_manifest_load(false, &[]);
                return Err(err.into());
            }
        };
        self.load_reader(BufReader::new(file))
    }

    /// Merge the variables of a manifest document into the table. Bad
    /// entries are skipped; a malformed document or one without `info`
    /// fails and leaves the table untouched.
    pub fn load_reader<R: Read>(&mut self, reader: R) -> Result<()> {
        let manifest = match Manifest::from_reader(reader) {
            Ok(manifest) => manifest,
            Err(err) => {
                metrics::record_manifest_load(false, &[]);
                return Err(err);
            }
        };
        metrics::record_manifest_load(true, &manifest.skipped);
        self.vars.extend(manifest.variables);
        metrics::set_variable_count(self.vars.len());
        Ok(())
    }

    /// Load `game`'s manifest from the configured data directory.
    pub fn load_game(&mut self, game: &str) -> Result<()> {
        let path = self
            .config
            .manifest_path(game)
            .ok_or_else(|| not_found(game))?;
        self.load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn save_writer<W: Write>(&self, writer: W) -> Result<()> {
        manifest::write_variables(writer, &self.vars)
    }

    /// Forget everything loaded for the current game.
    pub fn reset(&mut self) {
        self.mem.reset();
        self.history.clear();
        self.vars.clear();
        self.custom_vars.clear();
        self.buttons.clear();
        self.actions.clear();
        metrics::set_variable_count(0);
    }

    /// Drop derived variables, keeping memory, variables and actions.
    pub fn restart(&mut self) {
        self.custom_vars.clear();
    }

    pub fn address_space(&self) -> &AddressSpace {
        &self.mem
    }

    pub fn address_space_mut(&mut self) -> &mut AddressSpace {
        &mut self.mem
    }

    /// Push the live memory into the frame history. Call once per frame,
    /// before any [`lookup_delta`](Self::lookup_delta) for that frame.
    pub fn update_ram(&mut self) -> Result<()> {
        self.history.record(&self.mem)?;
        metrics::record_frame();
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.history.frames()
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }

    pub fn set_buttons(&mut self, buttons: Vec<String>) {
        self.buttons = buttons;
    }

    pub fn buttons(&self) -> &[String] {
        &self.buttons
    }

    /// Replace the button list and action table. On error neither changes.
    pub fn set_actions<S: AsRef<str>>(&mut self, buttons: &[S], groups: &[Vec<Vec<S>>]) -> Result<()> {
        self.actions = ActionTable::build(buttons, groups)?;
        self.buttons = buttons.iter().map(|b| b.as_ref().to_string()).collect();
        Ok(())
    }

    pub fn valid_actions(&self) -> &BTreeMap<u64, BTreeSet<u64>> {
        self.actions.groups()
    }

    pub fn action_table(&self) -> &ActionTable {
        &self.actions
    }

    pub fn filter_action(&self, action: u64) -> u64 {
        metrics::record_action_filtered();
        self.actions.filter(action)
    }

    /// Current value of `name`, preferring derived variables over memory.
    pub fn lookup_value(&self, name: &str) -> Result<i64> {
        Ok(self.lookup_datum(name)?.get())
    }

    pub fn lookup_datum(&self, name: &str) -> Result<Datum<'_>> {
        if let Some(variant) = self.custom_vars.get(name) {
            metrics::record_lookup("custom");
            return Ok(Datum::variant(variant));
        }
        if let Some(var) = self.vars.get(name) {
            metrics::record_lookup("memory");
            return self.mem.datum(var);
        }
        metrics::record_lookup("missing");
        Err(not_found(name))
    }

    pub fn lookup_datum_mut(&mut self, name: &str) -> Result<DatumMut<'_>> {
        if self.custom_vars.contains_key(name) {
            let variant = self.custom_vars.get_mut(name).ok_or_else(|| not_found(name))?;
            return Ok(DatumMut::variant(variant));
        }
        let var = *self.vars.get(name).ok_or_else(|| not_found(name))?;
        self.mem.datum_mut(&var)
    }

    /// Every variable's current value, derived variables shadowing memory
    /// variables of the same name.
    pub fn lookup_all_values(&self) -> Result<BTreeMap<String, i64>> {
        let mut values = BTreeMap::new();
        for (name, var) in &self.vars {
            values.insert(name.clone(), self.mem.read(var)?);
        }
        for (name, variant) in &self.custom_vars {
            values.insert(name.clone(), variant.to_i64());
        }
        Ok(values)
    }

    /// Change in memory variable `name` over the last recorded frame; 0 when
    /// the name is unknown or fewer than two frames have been recorded.
    pub fn lookup_delta(&self, name: &str) -> i64 {
        self.vars
            .get(name)
            .and_then(|var| self.history.delta(var))
            .unwrap_or(0)
    }

    pub fn set_value(&mut self, name: &str, value: i64) -> Result<()> {
        self.set_variant(name, Variant::Int(value))
    }

    /// Update a derived variable, else a memory variable, else create a new
    /// derived variable.
    pub fn set_variant(&mut self, name: &str, value: Variant) -> Result<()> {
        if let Some(slot) = self.custom_vars.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        if let Some(var) = self.vars.get(name).copied() {
            return self.mem.write(&var, value.to_i64());
        }
        self.custom_vars.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get_variable(&self, name: &str) -> Result<&Variable> {
        self.vars.get(name).ok_or_else(|| not_found(name))
    }

    pub fn set_variable(&mut self, name: &str, var: Variable) {
        self.vars.insert(name.to_string(), var);
        metrics::set_variable_count(self.vars.len());
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        let removed = self.vars.remove(name);
        metrics::set_variable_count(self.vars.len());
        removed
    }

    pub fn list_variables(&self) -> &BTreeMap<String, Variable> {
        &self.vars
    }

    pub fn custom_variables(&self) -> &BTreeMap<String, Variant> {
        &self.custom_vars
    }
}
