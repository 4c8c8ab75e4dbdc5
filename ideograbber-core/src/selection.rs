//! Selection bookkeeping: which items go to which destinations.
//!
//! A [`SelectionModel`] holds the candidate catalogs and the user's current choice. The
//! choice is captured as an ordered [`SelectionSet`] on [`SelectionModel::commit`]; the
//! order of both sequences is the order in which replication attempts (and report
//! entries) are made.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::contract::Destination;
use crate::item::Item;

/// Select menus on the platform accept at most 25 values.
pub const MAX_SELECTION: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTarget {
    Items,
    Destinations,
}

impl fmt::Display for SelectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionTarget::Items => f.write_str("items"),
            SelectionTarget::Destinations => f.write_str("destinations"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("selected {requested} {target}, at most {max} are allowed")]
    TooMany {
        target: SelectionTarget,
        requested: usize,
        max: usize,
    },
}

/// The committed choice: ordered items and ordered destinations.
#[derive(Clone, Default)]
pub struct SelectionSet {
    pub items: Vec<Item>,
    pub destinations: Vec<Arc<dyn Destination>>,
}

impl SelectionSet {
    pub fn new(items: Vec<Item>, destinations: Vec<Arc<dyn Destination>>) -> Self {
        Self {
            items,
            destinations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() || self.destinations.is_empty()
    }
}

impl fmt::Debug for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionSet")
            .field("items", &self.items)
            .field(
                "destinations",
                &self.destinations.iter().map(|d| d.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub struct SelectionModel {
    items: Vec<Item>,
    item_index: HashMap<u64, usize>,
    destinations: Vec<Arc<dyn Destination>>,
    destination_index: HashMap<u64, usize>,
    selected_items: Vec<usize>,
    selected_destinations: Vec<usize>,
}

impl SelectionModel {
    /// Builds the catalogs. When ids repeat, the first entry wins.
    pub fn new(items: Vec<Item>, destinations: Vec<Arc<dyn Destination>>) -> Self {
        let (items, item_index) = index_by(items, Item::id);
        let (destinations, destination_index) = index_by(destinations, |d| d.id());
        Self {
            items,
            item_index,
            destinations,
            destination_index,
            selected_items: Vec::new(),
            selected_destinations: Vec::new(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn destinations(&self) -> &[Arc<dyn Destination>] {
        &self.destinations
    }

    pub fn has_item(&self, id: u64) -> bool {
        self.item_index.contains_key(&id)
    }

    pub fn has_destination(&self, id: u64) -> bool {
        self.destination_index.contains_key(&id)
    }

    /// Replaces the selected items. Repeated ids collapse to their first occurrence.
    ///
    /// On [`SelectionError::TooMany`] the previous selection is kept.
    ///
    /// # Panics
    ///
    /// Panics if an id is not in the item catalog; check with [`SelectionModel::has_item`].
    pub fn set_selected_items(&mut self, ids: &[u64]) -> Result<(), SelectionError> {
        let picked = resolve(ids, &self.item_index, SelectionTarget::Items)?;
        debug!(count = picked.len(), "[SELECT] Items selected");
        self.selected_items = picked;
        Ok(())
    }

    /// Replaces the selected destinations. Same rules as [`SelectionModel::set_selected_items`].
    ///
    /// # Panics
    ///
    /// Panics if an id is not in the destination catalog.
    pub fn set_selected_destinations(&mut self, ids: &[u64]) -> Result<(), SelectionError> {
        let picked = resolve(ids, &self.destination_index, SelectionTarget::Destinations)?;
        debug!(count = picked.len(), "[SELECT] Destinations selected");
        self.selected_destinations = picked;
        Ok(())
    }

    /// Selects every catalog entry, in catalog order.
    pub fn select_all(&mut self) -> Result<(), SelectionError> {
        let item_ids: Vec<u64> = self.items.iter().map(Item::id).collect();
        let destination_ids: Vec<u64> = self.destinations.iter().map(|d| d.id()).collect();
        self.set_selected_items(&item_ids)?;
        self.set_selected_destinations(&destination_ids)
    }

    /// Captures the current selection. The model keeps its state.
    pub fn commit(&self) -> SelectionSet {
        SelectionSet {
            items: self
                .selected_items
                .iter()
                .map(|&i| self.items[i].clone())
                .collect(),
            destinations: self
                .selected_destinations
                .iter()
                .map(|&i| Arc::clone(&self.destinations[i]))
                .collect(),
        }
    }
}

fn index_by<T>(entries: Vec<T>, id: impl Fn(&T) -> u64) -> (Vec<T>, HashMap<u64, usize>) {
    let mut kept = Vec::with_capacity(entries.len());
    let mut index = HashMap::with_capacity(entries.len());
    for entry in entries {
        let key = id(&entry);
        if index.contains_key(&key) {
            continue;
        }
        index.insert(key, kept.len());
        kept.push(entry);
    }
    (kept, index)
}

fn resolve(
    ids: &[u64],
    index: &HashMap<u64, usize>,
    target: SelectionTarget,
) -> Result<Vec<usize>, SelectionError> {
    let mut seen = HashSet::with_capacity(ids.len());
    let distinct: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if distinct.len() > MAX_SELECTION {
        return Err(SelectionError::TooMany {
            target,
            requested: distinct.len(),
            max: MAX_SELECTION,
        });
    }
    Ok(distinct
        .into_iter()
        .map(|id| match index.get(&id) {
            Some(&position) => position,
            None => panic!("{target} id {id} is not in the catalog"),
        })
        .collect())
}
