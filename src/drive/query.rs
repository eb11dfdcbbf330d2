// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Typed search queries rendered to Drive `q` syntax

use super::{DriveFile, FOLDER_MIME_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Folder,
    File,
}

/// A file search. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    /// Exact name
    pub name: Option<String>,
    /// Name contains at least one of these
    pub name_contains: Vec<String>,
    /// Direct parent folder id
    pub parent: Option<String>,
    pub kind: Option<FileKind>,
    pub include_trashed: bool,
}

impl FileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name_contains_any<I, T>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.name_contains.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn in_folder(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn folders_only(mut self) -> Self {
        self.kind = Some(FileKind::Folder);
        self
    }

    pub fn files_only(mut self) -> Self {
        self.kind = Some(FileKind::File);
        self
    }

    /// Render as a Drive v3 `q` parameter
    pub fn to_drive_query(&self) -> String {
        let mut clauses = Vec::new();

        if let Some(ref name) = self.name {
            clauses.push(format!("name='{}'", escape(name)));
        }

        match self.name_contains.len() {
            0 => {}
            1 => clauses.push(format!("name contains '{}'", escape(&self.name_contains[0]))),
            _ => {
                let any: Vec<String> = self
                    .name_contains
                    .iter()
                    .map(|p| format!("name contains '{}'", escape(p)))
                    .collect();
                clauses.push(format!("({})", any.join(" or ")));
            }
        }

        match self.kind {
            Some(FileKind::Folder) => clauses.push(format!("mimeType='{}'", FOLDER_MIME_TYPE)),
            Some(FileKind::File) => clauses.push(format!("mimeType!='{}'", FOLDER_MIME_TYPE)),
            None => {}
        }

        if let Some(ref parent) = self.parent {
            clauses.push(format!("'{}' in parents", escape(parent)));
        }

        if !self.include_trashed {
            clauses.push("trashed=false".to_string());
        }

        clauses.join(" and ")
    }

    /// Evaluate against file metadata. Name containment is a plain substring
    /// test.
    pub fn matches(&self, file: &DriveFile, trashed: bool) -> bool {
        if trashed && !self.include_trashed {
            return false;
        }
        if let Some(ref name) = self.name {
            if &file.name != name {
                return false;
            }
        }
        if !self.name_contains.is_empty()
            && !self.name_contains.iter().any(|p| file.name.contains(p.as_str()))
        {
            return false;
        }
        match self.kind {
            Some(FileKind::Folder) if !file.is_folder() => return false,
            Some(FileKind::File) if file.is_folder() => return false,
            _ => {}
        }
        if let Some(ref parent) = self.parent {
            if !file.parents.iter().any(|p| p == parent) {
                return false;
            }
        }
        true
    }
}

/// Escape a string literal for the `q` grammar
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
