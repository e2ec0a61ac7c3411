//! Table names known to a connection, and resolution of user-written names
//! against them.

use log::debug;

use crate::engine::Session;

/// Strips one pair of surrounding double quotes.
pub fn normalize_identifier(identifier: &str) -> &str {
    let trimmed = identifier.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Splits a dotted name, leaving dots inside quotes alone.
fn split_parts(identifier: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in identifier.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                parts.push(identifier[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < identifier.len() {
        parts.push(identifier[start..].trim());
    }
    parts
}

/// The name itself, then each dotted suffix: `a.b.c`, `b.c`, `c`.
fn candidates(name: &str) -> Vec<String> {
    let mut out = vec![name.to_string()];
    let parts = split_parts(name);
    for i in 1..parts.len() {
        let suffix = parts[i..]
            .iter()
            .map(|p| normalize_identifier(p))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        if !suffix.is_empty() && !out.contains(&suffix) {
            out.push(suffix);
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct KnownTables {
    names: Vec<String>,
}

impl KnownTables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn register(&mut self, name: &str) {
        let name = normalize_identifier(name);
        if !name.is_empty() && !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    pub fn forget(&mut self, name: &str) {
        let name = normalize_identifier(name);
        self.names.retain(|n| !n.eq_ignore_ascii_case(name));
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    /// Adds every table the engine lists. Listing failures are not fatal.
    pub fn refresh(&mut self, session: &Session) {
        match session.list_table_names() {
            Ok(names) => names.iter().for_each(|n| self.register(n)),
            Err(e) => debug!("listing tables failed: {e}"),
        }
    }

    fn find(&self, candidates: &[String]) -> Option<&str> {
        candidates
            .iter()
            .find_map(|c| self.names.iter().find(|n| *n == c))
            .or_else(|| {
                candidates
                    .iter()
                    .find_map(|c| self.names.iter().find(|n| n.eq_ignore_ascii_case(c)))
            })
            .map(String::as_str)
    }

    /// Engine spelling of `name`: exact match, then ignoring case, then the
    /// same for each dotted suffix. Refreshes once from the engine on a miss
    /// and falls back to the unquoted input.
    pub fn resolve(&mut self, session: &Session, name: &str) -> String {
        let probe = normalize_identifier(name);
        if probe.is_empty() {
            return name.to_string();
        }
        let candidates = candidates(probe);
        if let Some(found) = self.find(&candidates) {
            return found.to_string();
        }
        self.refresh(session);
        self.find(&candidates).unwrap_or(probe).to_string()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let name = normalize_identifier(name);
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FileEngine;
    use tempfile::TempDir;

    #[test]
    fn test_candidates_cover_suffixes() {
        assert_eq!(candidates("db.\"my.schema\".Parcel"), vec!["db.\"my.schema\".Parcel", "my.schema.Parcel", "Parcel"]);
        assert_eq!(normalize_identifier(" \"Quoted\" "), "Quoted");
    }

    #[test]
    fn test_resolve_refreshes_once_and_matches_case() {
        let temp = TempDir::new().unwrap();
        let mut s = Session::open(Box::new(FileEngine::new()), &temp.path().join("k.gdb"), true).unwrap();
        s.exec_sql("CREATE TABLE Parcel (id INTEGER)").unwrap();

        let mut known = KnownTables::new();
        assert_eq!(known.resolve(&s, "PARCEL"), "Parcel");
        assert_eq!(known.resolve(&s, "public.\"parcel\""), "Parcel");
        assert_eq!(known.resolve(&s, "\"missing\""), "missing");
        assert!(known.contains("gdb_items"));

        known.forget("parcel");
        assert!(!known.contains("Parcel"));
    }
}
