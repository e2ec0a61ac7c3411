/// Row paging applied after full materialization; the engine has no
/// cursor-relative skip.

use super::result::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSpec {
    pub limit: usize,
    pub offset: usize,
}

impl LimitSpec {
    pub const fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Row range `[offset, offset + limit)` clamped to `len`.
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(len);
        let end = self.offset.saturating_add(self.limit).min(len);
        start..end
    }

    /// Slices `result`, keeping its declared columns.
    pub fn apply(&self, result: QueryResult) -> QueryResult {
        let range = self.range(result.rows.len());
        let QueryResult { columns, mut rows } = result;
        rows.truncate(range.end);
        rows.drain(..range.start);
        QueryResult::new(columns, rows)
    }
}
