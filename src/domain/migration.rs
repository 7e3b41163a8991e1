//! Versioned, idempotent text migrations for generated source files.

use std::path::PathBuf;

/// Replaces every occurrence of `pattern` with `replacement` in one file.
///
/// Pending while the pattern is present; once applied the pattern is gone and
/// re-running is a no-op. `replacement` must not contain `pattern`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMigration {
    pub id: &'static str,
    /// Path relative to the install root.
    pub file: PathBuf,
    pub pattern: &'static str,
    pub replacement: &'static str,
}

impl TextMigration {
    /// Modal removed `Function.lookup` in favour of `Function.from_name`.
    pub fn modal_lookup(script: impl Into<PathBuf>) -> Self {
        Self {
            id: "modal-lookup-v1",
            file: script.into(),
            pattern: "modal.Function.lookup(",
            replacement: "modal.Function.from_name(",
        }
    }

    pub fn is_pending(&self, content: &str) -> bool {
        content.contains(self.pattern)
    }

    /// Returns the migrated content and the number of replacements made.
    pub fn apply(&self, content: &str) -> (String, usize) {
        let count = content.matches(self.pattern).count();
        (content.replace(self.pattern, self.replacement), count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STALE: &str = "fn = modal.Function.lookup(APP_NAME, \"generate_logo_svg\")\n";

    #[test]
    fn apply_rewrites_every_occurrence() {
        let migration = TextMigration::modal_lookup("discord_logo_bot.py");
        let content = format!("{STALE}{STALE}");

        let (migrated, count) = migration.apply(&content);

        assert_eq!(count, 2);
        assert!(migrated.contains("modal.Function.from_name(APP_NAME"));
        assert!(!migration.is_pending(&migrated));
    }

    #[test]
    fn applying_twice_is_a_no_op() {
        let migration = TextMigration::modal_lookup("discord_logo_bot.py");
        let (once, _) = migration.apply(STALE);
        let (twice, count) = migration.apply(&once);

        assert_eq!(once, twice);
        assert_eq!(count, 0);
    }

    #[test]
    fn replacement_does_not_reintroduce_pattern() {
        let migration = TextMigration::modal_lookup("bot.py");
        assert!(!migration.replacement.contains(migration.pattern));
    }
}
