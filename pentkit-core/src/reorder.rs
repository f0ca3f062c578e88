//! Batch reordering of categories and commands
//!
//! Each entry of a batch is written as its own point update. A failing entry
//! stops the batch and the entries before it stay applied.

use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{OrderUpdate, Phase};

impl Catalog {
    /// Writes the given order values to categories
    pub fn reorder_categories(&self, updates: &[OrderUpdate]) -> CatalogResult<()> {
        if updates.is_empty() {
            return Err(CatalogError::validation("No categories provided for reordering"));
        }

        for (applied, update) in updates.iter().enumerate() {
            if !self.backend().set_category_order(&update.id, update.order)? {
                warn!(id = %update.id, applied, "reorder stopped at unknown category");
                return Err(CatalogError::not_found(format!(
                    "Category {} not found",
                    update.id
                )));
            }
        }

        info!(count = updates.len(), "categories reordered");
        Ok(())
    }

    /// Writes the given order values to commands
    ///
    /// The (category, phase) scope is taken from the first entry. Entries
    /// outside it are still written.
    pub fn reorder_commands(&self, updates: &[OrderUpdate]) -> CatalogResult<()> {
        let first = updates
            .first()
            .ok_or_else(|| CatalogError::validation("No commands provided for reordering"))?;
        let first_command = self
            .backend()
            .get_command(&first.id)?
            .ok_or_else(|| CatalogError::not_found("Command not found"))?;
        let scope = (first_command.category, first_command.phase);

        let scopes: HashMap<Uuid, (Uuid, Phase)> = self
            .backend()
            .list_commands()?
            .into_iter()
            .map(|c| (c.id, (c.category, c.phase)))
            .collect();

        for (applied, update) in updates.iter().enumerate() {
            match scopes.get(&update.id) {
                Some(entry_scope) if *entry_scope != scope => {
                    warn!(
                        id = %update.id,
                        category = %entry_scope.0,
                        phase = %entry_scope.1,
                        "reorder entry outside the batch scope"
                    );
                }
                _ => {}
            }

            if !self.backend().set_command_order(&update.id, update.order)? {
                warn!(id = %update.id, applied, "reorder stopped at unknown command");
                return Err(CatalogError::not_found(format!(
                    "Command {} not found",
                    update.id
                )));
            }
        }

        info!(
            count = updates.len(),
            category = %scope.0,
            phase = %scope.1,
            "commands reordered"
        );
        Ok(())
    }
}

/// Moves the element at `from` to position `to`, shifting the rest
///
/// Out-of-range positions leave the slice unchanged.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() || to >= items.len() || from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Assigns orders 0..N-1 following the slice order
pub fn contiguous_orders(ids: &[Uuid]) -> Vec<OrderUpdate> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| OrderUpdate {
            id: *id,
            order: index as i64,
        })
        .collect()
}
