use crate::check::CheckDescriptor;
use crate::level::CheckLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single finding produced while tracking reference state.
#[derive(Debug, Clone)]
#[must_use]
pub struct Diagnostic {
    pub check: &'static CheckDescriptor,
    pub level: CheckLevel,
    pub loc: Option<FileLoc>,
    pub message: String,
    /// Provenance notes, usually rendered from a history chain.
    pub notes: Vec<Note>,
}

/// Secondary message attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub loc: Option<FileLoc>,
    pub message: String,
}

/// Identifier of a source file as assigned by the front end.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct FileId(pub u32);

/// Position in a C source file (1-based line/column).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct FileLoc {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

impl FileLoc {
    pub const fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Location in file 0, convenient for single-file drivers.
    pub const fn at(line: u32, column: u32) -> Self {
        Self::new(FileId(0), line, column)
    }
}

impl fmt::Display for FileLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file{}:{}:{}", self.file.0, self.line, self.column)
    }
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.level == CheckLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = self.loc {
            write!(f, "{loc}: ")?;
        }
        write!(
            f,
            "{}[{}]: {}",
            self.level.as_str(),
            self.check.name,
            self.message
        )?;
        for note in &self.notes {
            match note.loc {
                Some(loc) => write!(f, "\n   {loc}: {}", note.message)?,
                None => write!(f, "\n   {}", note.message)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::NULL_DEREF;

    #[test]
    fn renders_notes_under_message() {
        let diag = Diagnostic {
            check: &NULL_DEREF,
            level: CheckLevel::Warn,
            loc: Some(FileLoc::at(4, 3)),
            message: "Dereference of possibly null pointer p".to_string(),
            notes: vec![Note {
                loc: Some(FileLoc::at(2, 1)),
                message: "Storage p becomes null".to_string(),
            }],
        };
        insta::assert_snapshot!(diag.to_string(), @r"
        file0:4:3: warning[nullderef]: Dereference of possibly null pointer p
           file0:2:1: Storage p becomes null
        ");
    }
}
