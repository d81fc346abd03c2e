// implements operations defined in Transaction.cs

use super::*;

impl LiteEngine {
    /// Runs `f` inside a single transaction: every engine call `f` makes on
    /// `self` (insert, update, delete, ensure_index, ...) joins the same
    /// thread-local transaction via `auto_transaction` instead of opening
    /// its own, and only this call commits or rolls it back.
    pub fn with_transaction<R>(&self, f: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
        self.auto_transaction(false, |_transaction| f(self))
    }
}
