//! Template resources - read-once character sources
//!
//! A resource pairs a diagnostic name with one of three content shapes:
//! an in-memory string, an in-memory slice with explicit offset/length,
//! or a streaming reader. Reading consumes the resource; the read-once
//! contract is enforced by taking `self` by value.

use std::io::Read;

use crate::error::{InputError, TemplateError};

/// A named, read-once template source.
pub enum Resource {
    /// Full in-memory content
    String { name: String, content: String },
    /// In-memory content restricted to `[offset, offset + len)` (byte
    /// offsets; both ends must fall on char boundaries)
    Slice {
        name: String,
        content: String,
        offset: usize,
        len: usize,
    },
    /// Streaming character source
    Reader {
        name: String,
        reader: Box<dyn Read>,
    },
}

impl Resource {
    /// Build a resource from an in-memory string.
    pub fn from_string(name: impl Into<String>, content: impl Into<String>) -> Self {
        Resource::String {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Build a resource over a sub-range of an in-memory string.
    pub fn from_slice(
        name: impl Into<String>,
        content: impl Into<String>,
        offset: usize,
        len: usize,
    ) -> Self {
        Resource::Slice {
            name: name.into(),
            content: content.into(),
            offset,
            len,
        }
    }

    /// Build a resource from a streaming reader.
    pub fn from_reader(name: impl Into<String>, reader: Box<dyn Read>) -> Self {
        Resource::Reader {
            name: name.into(),
            reader,
        }
    }

    /// The diagnostic name of this resource.
    pub fn name(&self) -> &str {
        match self {
            Resource::String { name, .. } => name,
            Resource::Slice { name, .. } => name,
            Resource::Reader { name, .. } => name,
        }
    }

    /// Consume the resource and produce its character content.
    ///
    /// Slice bounds outside the content, or bounds that split a UTF-8
    /// character, are a contract violation. Reader failures surface as
    /// template input errors carrying the resource name.
    pub(crate) fn read(self) -> Result<String, TemplateError> {
        match self {
            Resource::String { content, .. } => Ok(content),
            Resource::Slice {
                name,
                content,
                offset,
                len,
            } => {
                let end = offset.checked_add(len).ok_or_else(|| {
                    TemplateError::Contract(format!(
                        "resource \"{name}\": slice bounds overflow (offset {offset}, len {len})"
                    ))
                })?;
                if end > content.len()
                    || !content.is_char_boundary(offset)
                    || !content.is_char_boundary(end)
                {
                    return Err(TemplateError::Contract(format!(
                        "resource \"{name}\": slice bounds [{offset}, {end}) invalid for \
                         content of {} bytes",
                        content.len()
                    )));
                }
                Ok(content[offset..end].to_string())
            }
            Resource::Reader { name, mut reader } => {
                let mut content = String::new();
                reader.read_to_string(&mut content).map_err(|e| {
                    TemplateError::Input(InputError {
                        template: name,
                        line: None,
                        col: None,
                        message: format!("failed to read template content: {e}"),
                    })
                })?;
                Ok(content)
            }
        }
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::String { name, .. } => write!(f, "Resource::String({name:?})"),
            Resource::Slice {
                name, offset, len, ..
            } => write!(f, "Resource::Slice({name:?}, offset={offset}, len={len})"),
            Resource::Reader { name, .. } => write!(f, "Resource::Reader({name:?})"),
        }
    }
}
