/// Upper bound on headline and description entries.
pub const MAX_FIELDS: usize = 10;

/// Errors raised when editing a field array.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("index {index} is out of range for {len} entries")]
    OutOfRange { index: usize, len: usize },
    #[error("the first entry cannot be removed while it is the only one")]
    LastEntry,
    #[error("at most {MAX_FIELDS} entries are allowed, got {count}")]
    TooMany { count: usize },
}

/// Ordered, editable text entries holding between 1 and [`MAX_FIELDS`] values.
///
/// Blank entries are tolerated while editing and only dropped by
/// [`FieldArray::to_submission_list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldArray {
    entries: Vec<String>,
}

impl Default for FieldArray {
    fn default() -> Self {
        Self {
            entries: vec![String::new()],
        }
    }
}

impl FieldArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the array from existing values. An empty input yields one blank entry.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, FieldError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries.into_iter().map(Into::into).collect();
        if entries.len() > MAX_FIELDS {
            return Err(FieldError::TooMany {
                count: entries.len(),
            });
        }
        if entries.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: an array keeps at least one entry. Present to pair with `len`
    /// for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_FIELDS
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// The required entry, as typed.
    pub fn first(&self) -> &str {
        self.entries.first().map(String::as_str).unwrap_or_default()
    }

    /// Append a blank entry. Returns `false` without changing anything when full.
    pub fn add_entry(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(String::new());
        true
    }

    /// Remove and return the entry at `index`, shifting later entries down.
    pub fn remove_entry(&mut self, index: usize) -> Result<String, FieldError> {
        self.check_index(index)?;
        if self.entries.len() == 1 {
            return Err(FieldError::LastEntry);
        }
        Ok(self.entries.remove(index))
    }

    pub fn set_entry(&mut self, index: usize, value: impl Into<String>) -> Result<(), FieldError> {
        self.check_index(index)?;
        self.entries[index] = value.into();
        Ok(())
    }

    /// Trimmed, non-blank entries in their original order.
    pub fn to_submission_list(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), FieldError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(FieldError::OutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }
}
