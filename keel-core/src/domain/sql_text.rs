//! Trigger block extraction and statement splitting
//!
//! Trigger and procedure bodies contain `;` internally, so migration files
//! wrap them in a custom delimiter block:
//!
//! ```sql
//! CREATE TABLE players (id INT);
//! DELIMITER |
//! CREATE TRIGGER ondelete_players BEFORE DELETE ON players FOR EACH ROW BEGIN
//!     DELETE FROM guilds WHERE ownerid = OLD.id;
//! END |
//! DELIMITER ;
//! ```
//!
//! The block is pulled out first and its bodies are kept verbatim. Only the
//! remaining text is split on `;`.

use super::migration_file::NormalizedSql;

pub const DELIMITER_START: &str = "DELIMITER |";
pub const DELIMITER_END: &str = "DELIMITER ;";
pub const TRIGGER_SEPARATOR: char = '|';
pub const STATEMENT_TERMINATOR: char = ';';

/// Outcome of pulling trigger bodies out of migration text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerExtraction {
    /// Trigger bodies in file order, trimmed
    pub triggers: Vec<String>,
    /// Content with the delimiter block removed
    pub remainder: String,
    /// Set when a start marker had no matching end marker
    pub warning: Option<String>,
}

/// Extract the first `DELIMITER |` ... `DELIMITER ;` block.
///
/// An unterminated block is a soft failure: no triggers are returned, the
/// content is left as-is and a warning is recorded.
pub fn extract_triggers(content: &str) -> TriggerExtraction {
    let Some(start) = content.find(DELIMITER_START) else {
        return TriggerExtraction {
            triggers: Vec::new(),
            remainder: content.to_string(),
            warning: None,
        };
    };

    let body_start = start + DELIMITER_START.len();
    let Some(end_offset) = content[body_start..].find(DELIMITER_END) else {
        return TriggerExtraction {
            triggers: Vec::new(),
            remainder: content.to_string(),
            warning: Some(format!(
                "found '{}' at offset {} without a matching '{}'",
                DELIMITER_START, start, DELIMITER_END
            )),
        };
    };
    let end = body_start + end_offset;

    let triggers = content[body_start..end]
        .trim()
        .split(TRIGGER_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let remainder = format!(
        "{} {}",
        &content[..start],
        &content[end + DELIMITER_END.len()..]
    );

    TriggerExtraction {
        triggers,
        remainder: remainder.trim().to_string(),
        warning: None,
    }
}

/// Split text on the statement terminator, dropping empty statements.
///
/// This is a plain textual split; trigger blocks must be extracted first.
pub fn split_statements(content: &str) -> Vec<String> {
    content
        .split(STATEMENT_TERMINATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A migration file fully parsed into executable pieces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMigration {
    pub statements: Vec<String>,
    pub triggers: Vec<String>,
    pub warnings: Vec<String>,
}

impl ParsedMigration {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.triggers.is_empty()
    }
}

/// Run trigger extraction then statement splitting over normalized text
pub fn parse_migration(sql: &NormalizedSql) -> ParsedMigration {
    let extraction = extract_triggers(sql.as_str());
    let statements = split_statements(&extraction.remainder);

    ParsedMigration {
        statements,
        triggers: extraction.triggers,
        warnings: extraction.warning.into_iter().collect(),
    }
}
