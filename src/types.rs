/// Raw key bytes.
pub type Key = Vec<u8>;

/// Raw value bytes.
pub type Value = Vec<u8>;

/// Index of a numbered database inside a [`crate::DB`].
pub type DbIndex = usize;

/// Opaque identifier of a connected client.
pub type ClientId = u64;

/// Which end of a list an operation works on.
///
/// Head is the left side (index 0), Tail the right side (index -1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum End {
    Head,
    Tail,
}

impl End {
    /// The opposite end.
    pub fn flip(self) -> End {
        match self {
            End::Head => End::Tail,
            End::Tail => End::Head,
        }
    }
}

/// Where to place a value relative to an existing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
}
