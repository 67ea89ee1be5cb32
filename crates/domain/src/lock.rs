/// Management lock levels understood by the resource provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockLevel {
    /// Resource may be read and modified but not deleted.
    CannotDelete,
    /// Resource may only be read.
    ReadOnly,
}

impl LockLevel {
    /// Returns the provider wire value for the level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CannotDelete => "CanNotDelete",
            Self::ReadOnly => "ReadOnly",
        }
    }
}
