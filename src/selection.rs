use crate::err::{self, Error};
use crate::source::{format_bytes, FileHandle};
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// One dismissible token per chosen file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct SelectionItem {
    /// Index of the file in the pick that created this item. Unaffected by dismissals.
    pub id: usize,
    /// File name
    pub label: String,
    /// Human-readable size
    pub label_tag: String,
    pub description: String,
}

/// The files the user has chosen but not yet uploaded.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    items: Vec<SelectionItem>,
    files: Vec<FileHandle>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole selection with `files`, in order.
    pub fn choose(&mut self, files: Vec<FileHandle>) -> &[SelectionItem] {
        self.items = files
            .iter()
            .enumerate()
            .map(|(id, file)| SelectionItem {
                id,
                label: file.name.clone(),
                label_tag: format_bytes(file.size),
                description: format!("File type: {}", file.mime_type),
            })
            .collect();
        self.files = files;
        &self.items
    }

    /// Remove the item at `index`. Later items move down one position.
    pub fn dismiss(&mut self, index: usize) -> Result<SelectionItem, Error> {
        snafu::ensure!(
            index < self.items.len(),
            err::NoSuchSelectionItem {
                index,
                len: self.items.len(),
            }
        );
        Ok(self.items.remove(index))
    }

    pub fn items(&self) -> &[SelectionItem] {
        &self.items
    }

    /// The chosen file an item refers to.
    pub fn file(&self, item: &SelectionItem) -> Option<&FileHandle> {
        self.files.get(item.id)
    }

    /// Remaining files, in selection order.
    pub fn files(&self) -> impl Iterator<Item = &FileHandle> {
        self.items.iter().filter_map(move |item| self.file(item))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
