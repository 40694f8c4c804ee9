//! Grouping of document edits into one undoable user action.

/// A consumer that can treat a run of edits as a single undo step.
///
/// Calls are always balanced: every `begin_user_action` is followed by exactly
/// one `end_user_action`.
pub trait EditGroup {
    fn begin_user_action(&self);
    fn end_user_action(&self);
}

/// Opens a user action on creation and closes it when dropped.
///
/// With no group attached both ends are no-ops.
pub struct UserActionGuard<'a> {
    group: Option<&'a dyn EditGroup>,
}

impl<'a> UserActionGuard<'a> {
    pub fn begin(group: Option<&'a dyn EditGroup>) -> Self {
        if let Some(group) = group {
            group.begin_user_action();
        }
        Self { group }
    }
}

impl Drop for UserActionGuard<'_> {
    fn drop(&mut self) {
        if let Some(group) = self.group {
            group.end_user_action();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Journal(RefCell<Vec<&'static str>>);

    impl EditGroup for Journal {
        fn begin_user_action(&self) {
            self.0.borrow_mut().push("begin");
        }
        fn end_user_action(&self) {
            self.0.borrow_mut().push("end");
        }
    }

    #[test]
    fn guard_brackets_scope() {
        let journal = Journal::default();
        {
            let _guard = UserActionGuard::begin(Some(&journal));
            journal.0.borrow_mut().push("edit");
        }
        assert_eq!(*journal.0.borrow(), vec!["begin", "edit", "end"]);
    }

    #[test]
    fn guard_without_group_is_inert() {
        let _guard = UserActionGuard::begin(None);
    }
}
