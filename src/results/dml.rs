/// Outcome of an INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertResult {
    affected_rows: u64,
    last_insert_id: i64,
}

impl InsertResult {
    #[must_use]
    pub fn new(affected_rows: u64, last_insert_id: i64) -> Self {
        Self {
            affected_rows,
            last_insert_id,
        }
    }

    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Id of the first row inserted by the statement.
    ///
    /// For a multi-row insert this is the id of the first row, not the last.
    #[must_use]
    pub fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }
}

/// Outcome of an UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    affected_rows: u64,
}

impl UpdateResult {
    #[must_use]
    pub fn new(affected_rows: u64) -> Self {
        Self { affected_rows }
    }

    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }
}

/// Outcome of a DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    affected_rows: u64,
}

impl DeleteResult {
    #[must_use]
    pub fn new(affected_rows: u64) -> Self {
        Self { affected_rows }
    }

    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }
}
