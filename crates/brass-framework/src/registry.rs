//! The handler registry.
//!
//! Message commands are stored under their canonical key
//! ([`normalize`](brass_core::normalize::normalize) of the declared name);
//! aliases map canonical keys to a primary key. Slash commands are stored by
//! their exact name.
//!
//! Invariants held after every insertion:
//!
//! - every alias points at an existing primary entry;
//! - no alias key equals a primary key;
//! - a key belongs to exactly one command.
//!
//! Collisions are resolved with "last registration wins" and logged at `warn`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use brass_core::normalize::normalize;
use brass_core::similarity::similarity;
use brass_core::SlashCommandData;
use tracing::{debug, warn};

use crate::descriptor::{CommandDescriptor, SlashCommandDescriptor};

/// Counts of registered handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub commands: usize,
    pub aliases: usize,
    pub slash_commands: usize,
    pub events: usize,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} commands ({} aliases), {} slash commands, {} events",
            self.commands, self.aliases, self.slash_commands, self.events
        )
    }
}

/// A "did you mean" candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Declared name of the suggested command.
    pub name: String,
    pub score: f64,
}

/// Name → handler lookup tables.
#[derive(Default)]
pub struct Registry {
    commands: HashMap<String, Arc<CommandDescriptor>>,
    aliases: HashMap<String, String>,
    slash_commands: BTreeMap<String, Arc<SlashCommandDescriptor>>,
    event_bindings: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Message commands ────────────────────────────────────────────────────

    /// Registers a message command under its canonical key.
    ///
    /// Returns the key, or `None` when the name has no canonical form.
    pub fn insert_command(&mut self, command: CommandDescriptor) -> Option<String> {
        let key = normalize(&command.name);
        if key.is_empty() {
            warn!(name = %command.name, "Command name has no canonical form, skipped");
            return None;
        }

        if let Some(previous) = self.commands.get(&key) {
            warn!(
                key = %key,
                previous = %previous.name,
                replacement = %command.name,
                "Duplicate command name, last registration wins"
            );
            self.aliases.retain(|_, target| target != &key);
        }

        if let Some(target) = self.aliases.remove(&key) {
            warn!(
                key = %key,
                alias_of = %target,
                command = %command.name,
                "Command name shadows an existing alias, alias removed"
            );
        }

        for alias in &command.aliases {
            let alias_key = normalize(alias);
            if alias_key.is_empty() || alias_key == key {
                debug!(command = %command.name, alias = %alias, "Ignoring redundant alias");
                continue;
            }
            if self.commands.contains_key(&alias_key) {
                warn!(
                    command = %command.name,
                    alias = %alias,
                    "Alias collides with a command name, alias dropped"
                );
                continue;
            }
            if let Some(previous) = self.aliases.insert(alias_key, key.clone()) {
                if previous != key {
                    warn!(
                        alias = %alias,
                        previous = %previous,
                        replacement = %command.name,
                        "Alias reassigned, last registration wins"
                    );
                }
            }
        }

        self.commands.insert(key.clone(), Arc::new(command));
        Some(key)
    }

    /// Resolves a typed token: canonical name first, then canonical alias.
    pub fn resolve(&self, token: &str) -> Option<Arc<CommandDescriptor>> {
        let key = normalize(token);
        if key.is_empty() {
            return None;
        }
        if let Some(command) = self.commands.get(&key) {
            return Some(Arc::clone(command));
        }
        let target = self.aliases.get(&key)?;
        self.commands.get(target).cloned()
    }

    /// Finds the command closest to `token`, if it scores at least `threshold`.
    ///
    /// Only used to phrase a "did you mean" hint, never to pick a handler.
    pub fn suggest(&self, token: &str, threshold: f64) -> Option<Suggestion> {
        let key = normalize(token);
        if key.is_empty() {
            return None;
        }

        let candidates = self
            .commands
            .keys()
            .map(|name| (name, name))
            .chain(self.aliases.iter());

        let mut best: Option<(&String, f64)> = None;
        for (candidate, target) in candidates {
            let score = similarity(&key, candidate);
            let better = match best {
                Some((_, best_score)) => score > best_score,
                None => true,
            };
            if better {
                best = Some((target, score));
            }
        }

        let (target, score) = best.filter(|(_, score)| *score >= threshold)?;
        let command = self.commands.get(target)?;
        Some(Suggestion {
            name: command.name.clone(),
            score,
        })
    }

    /// Looks up a command by canonical key.
    pub fn command(&self, key: &str) -> Option<&Arc<CommandDescriptor>> {
        self.commands.get(key)
    }

    pub fn commands(&self) -> impl Iterator<Item = (&str, &Arc<CommandDescriptor>)> {
        self.commands.iter().map(|(key, command)| (key.as_str(), command))
    }

    /// Alias key → primary key pairs.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
    }

    // ─── Slash commands ──────────────────────────────────────────────────────

    /// Registers a slash command under its exact name.
    pub fn insert_slash_command(&mut self, command: SlashCommandDescriptor) {
        let name = command.data.name.clone();
        if self.slash_commands.contains_key(&name) {
            warn!(name = %name, "Duplicate slash command name, last registration wins");
        }
        self.slash_commands.insert(name, Arc::new(command));
    }

    pub fn slash_command(&self, name: &str) -> Option<Arc<SlashCommandDescriptor>> {
        self.slash_commands.get(name).cloned()
    }

    pub fn slash_commands(&self) -> impl Iterator<Item = &Arc<SlashCommandDescriptor>> {
        self.slash_commands.values()
    }

    /// Registration payload for every slash command, ordered by name.
    pub fn slash_command_data(&self) -> Vec<SlashCommandData> {
        self.slash_commands
            .values()
            .map(|command| command.data.clone())
            .collect()
    }

    // ─── Events ──────────────────────────────────────────────────────────────

    pub(crate) fn record_event_binding(&mut self) {
        self.event_bindings += 1;
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            commands: self.commands.len(),
            aliases: self.aliases.len(),
            slash_commands: self.slash_commands.len(),
            events: self.event_bindings,
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("stats", &self.stats())
            .finish()
    }
}
