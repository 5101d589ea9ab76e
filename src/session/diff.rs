use tracing::trace;

/// How a single input change was classified against the target text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    AppendMatch,
    AppendMismatch,
    Backspace,
    NoOp,
}

/// Everything the classifier needs from the session, borrowed for one call.
#[derive(Clone, Copy, Debug)]
pub struct EditContext<'a> {
    pub target: &'a [char],
    /// Input value as of the last accepted edit.
    pub accepted_input: &'a str,
    pub cursor: usize,
    pub highlight_errors: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditResult {
    pub kind: EditKind,
    pub cursor: usize,
    pub errors_added: usize,
    /// Value the input widget must show after this edit. Rejected edits
    /// revert to the previously accepted input.
    pub input: String,
}

impl EditResult {
    pub fn accepted(&self) -> bool {
        matches!(self.kind, EditKind::AppendMatch | EditKind::Backspace)
    }

    fn rejected(kind: EditKind, ctx: &EditContext<'_>, errors_added: usize) -> Self {
        Self {
            kind,
            cursor: ctx.cursor,
            errors_added,
            input: ctx.accepted_input.to_string(),
        }
    }
}

/// Classify one raw input change. Only single-step progress is ever applied:
/// a multi-character insertion is judged on its first new character and the
/// rest is dropped, and any shrink counts as one backspace.
pub fn apply_edit(ctx: &EditContext<'_>, raw: &str) -> EditResult {
    debug_assert!(ctx.cursor <= ctx.target.len());

    let prev_len = ctx.accepted_input.chars().count();
    let new_len = raw.chars().count();

    let result = if new_len > prev_len {
        append(ctx, raw, prev_len, new_len)
    } else if new_len < prev_len && ctx.cursor > 0 {
        let mut input = ctx.accepted_input.to_string();
        input.pop();
        EditResult {
            kind: EditKind::Backspace,
            cursor: ctx.cursor - 1,
            errors_added: 0,
            input,
        }
    } else {
        EditResult::rejected(EditKind::NoOp, ctx, 0)
    };

    trace!(kind = ?result.kind, cursor = result.cursor, "edit classified");
    result
}

fn append(ctx: &EditContext<'_>, raw: &str, prev_len: usize, new_len: usize) -> EditResult {
    let Some(&expected) = ctx.target.get(ctx.cursor) else {
        return EditResult::rejected(EditKind::NoOp, ctx, 0);
    };

    // A single keystroke is judged by the last character, a paste by the
    // first character it inserted.
    let typed = if new_len == prev_len + 1 {
        raw.chars().last()
    } else {
        raw.chars().nth(prev_len)
    };
    let Some(typed) = typed else {
        return EditResult::rejected(EditKind::NoOp, ctx, 0);
    };

    if typed == expected {
        let mut input = ctx.accepted_input.to_string();
        input.push(typed);
        EditResult {
            kind: EditKind::AppendMatch,
            cursor: ctx.cursor + 1,
            errors_added: 0,
            input,
        }
    } else {
        let errors_added = usize::from(ctx.highlight_errors);
        EditResult::rejected(EditKind::AppendMismatch, ctx, errors_added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn ctx<'a>(target: &'a [char], accepted: &'a str, highlight: bool) -> EditContext<'a> {
        EditContext {
            target,
            accepted_input: accepted,
            cursor: accepted.chars().count(),
            highlight_errors: highlight,
        }
    }

    #[test]
    fn test_matching_append_advances() {
        let t = target("cat");
        let result = apply_edit(&ctx(&t, "c", true), "ca");
        assert_eq!(result.kind, EditKind::AppendMatch);
        assert_eq!(result.cursor, 2);
        assert_eq!(result.errors_added, 0);
        assert_eq!(result.input, "ca");
        assert!(result.accepted());
    }

    #[test]
    fn test_mismatch_reverts_and_counts_when_highlighting() {
        let t = target("cat");
        let result = apply_edit(&ctx(&t, "c", true), "cx");
        assert_eq!(result.kind, EditKind::AppendMismatch);
        assert_eq!(result.cursor, 1);
        assert_eq!(result.errors_added, 1);
        assert_eq!(result.input, "c");
        assert!(!result.accepted());
    }

    #[test]
    fn test_mismatch_is_silent_without_highlighting() {
        let t = target("cat");
        let result = apply_edit(&ctx(&t, "c", false), "cx");
        assert_eq!(result.kind, EditKind::AppendMismatch);
        assert_eq!(result.errors_added, 0);
        assert_eq!(result.cursor, 1);
    }

    #[test]
    fn test_backspace_steps_back_one() {
        let t = target("cat");
        let result = apply_edit(&ctx(&t, "ca", true), "c");
        assert_eq!(result.kind, EditKind::Backspace);
        assert_eq!(result.cursor, 1);
        assert_eq!(result.input, "c");
        assert_eq!(result.errors_added, 0);
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let t = target("cat");
        let result = apply_edit(&ctx(&t, "", true), "");
        assert_eq!(result.kind, EditKind::NoOp);
        assert_eq!(result.cursor, 0);
        assert!(!result.accepted());
    }

    #[test]
    fn test_selection_delete_counts_as_single_backspace() {
        let t = target("cat");
        let result = apply_edit(&ctx(&t, "cat", true), "c");
        assert_eq!(result.kind, EditKind::Backspace);
        assert_eq!(result.cursor, 2);
        assert_eq!(result.input, "ca");
    }

    #[test]
    fn test_paste_judged_on_first_new_char_only() {
        let t = target("cat");
        let result = apply_edit(&ctx(&t, "", true), "cat");
        assert_eq!(result.kind, EditKind::AppendMatch);
        assert_eq!(result.cursor, 1);
        assert_eq!(result.input, "c");

        let result = apply_edit(&ctx(&t, "", true), "xat");
        assert_eq!(result.kind, EditKind::AppendMismatch);
        assert_eq!(result.cursor, 0);
        assert_eq!(result.input, "");
    }

    #[test]
    fn test_same_length_change_is_noop() {
        let t = target("cat");
        let result = apply_edit(&ctx(&t, "c", true), "x");
        assert_eq!(result.kind, EditKind::NoOp);
        assert_eq!(result.input, "c");
    }

    #[test]
    fn test_append_past_end_is_noop() {
        let t = target("ab");
        let result = apply_edit(&ctx(&t, "ab", true), "abc");
        assert_eq!(result.kind, EditKind::NoOp);
        assert_eq!(result.cursor, 2);
        assert_eq!(result.errors_added, 0);
    }

    #[test]
    fn test_multibyte_chars_compare_by_code_point() {
        let t = target("né");
        let result = apply_edit(&ctx(&t, "n", true), "né");
        assert_eq!(result.kind, EditKind::AppendMatch);
        assert_eq!(result.input, "né");

        let result = apply_edit(&ctx(&t, "n", true), "ne");
        assert_eq!(result.kind, EditKind::AppendMismatch);
    }
}
