//! Ordered undo stack for multi-step transactions.
//!
//! Every completed step pushes the action that reverses it. On failure the
//! stack is unwound newest-first against the transaction's target; on
//! success it is committed and the actions are discarded.

type UndoFn<'a, T> = Box<dyn FnOnce(&mut T) + 'a>;

#[must_use = "an undo stack must be either unwound or committed"]
pub(crate) struct UndoStack<'a, T> {
    steps: Vec<(&'static str, UndoFn<'a, T>)>,
}

impl<'a, T> UndoStack<'a, T> {
    pub(crate) fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub(crate) fn push(&mut self, label: &'static str, undo: impl FnOnce(&mut T) + 'a) {
        self.steps.push((label, Box::new(undo)));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    /// Run every recorded undo action in reverse completion order.
    pub(crate) fn unwind(self, target: &mut T) {
        for (label, undo) in self.steps.into_iter().rev() {
            tracing::debug!(step = label, "rolling back");
            undo(target);
        }
    }

    pub(crate) fn commit(self) {}
}
