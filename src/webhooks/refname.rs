//! Validation of the `branch` query parameter.

/// Characters git forbids anywhere in a ref name.
const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

/// Whether `name` is plausible as a branch name for checkout and push.
///
/// This is a subset of `git check-ref-format`: enough to keep the value from
/// being read as an option or a revision expression.
pub fn is_valid_branch_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.contains("..")
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c))
}
