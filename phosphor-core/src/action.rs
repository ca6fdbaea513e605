//! Action hooks
//!
//! Named hooks fired on driver events ("poweron", "poweroff"). Each hook
//! carries an expression that an external evaluator runs; the evaluator
//! owns error handling, so triggering can never fail.

use heapless::Vec;

use crate::config::{ActionConfig, MAX_ACTIONS};

/// Runs hook expressions
///
/// Implementations handle and log their own failures. Nothing is
/// reported back to the caller.
pub trait Evaluator {
    fn evaluate(&mut self, expression: &str);
}

impl<F: FnMut(&str)> Evaluator for F {
    fn evaluate(&mut self, expression: &str) {
        self(expression)
    }
}

/// Hook table, built once from configuration
#[derive(Debug, Clone, Default)]
pub struct Actions {
    hooks: Vec<ActionConfig, MAX_ACTIONS>,
}

impl Actions {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from configured hooks
    ///
    /// Only hooks whose name is one of `names` are kept; the rest belong to
    /// some other consumer of the same configuration.
    pub fn from_config(names: &[&str], entries: &[ActionConfig]) -> Self {
        let mut hooks = Vec::new();
        for entry in entries {
            if !names.contains(&entry.name.as_str()) {
                debug!("ignoring action '{}'", entry.name.as_str());
                continue;
            }
            // Same capacity as the configuration list
            let _ = hooks.push(entry.clone());
        }
        Self { hooks }
    }

    /// Number of hooks
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Check if there are no hooks
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Evaluate every hook registered under `name`, in configuration order
    ///
    /// Returns how many hooks ran. An unknown name runs nothing.
    pub fn trigger<E>(&self, name: &str, evaluator: &mut E) -> usize
    where
        E: Evaluator + ?Sized,
    {
        let mut fired = 0;
        for hook in self.hooks.iter().filter(|h| h.name.as_str() == name) {
            evaluator.evaluate(hook.expression.as_str());
            fired += 1;
        }
        fired
    }

    /// Drop every hook
    pub fn clear(&mut self) {
        self.hooks.clear();
    }
}
