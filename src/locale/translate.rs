use std::collections::HashMap;

use serde_json::Value;

use super::Locale;

/// Nested translation tables, one JSON object per locale.
///
/// Catalog contents come from the modules; the shell only walks them.
#[derive(Debug, Clone, Default)]
pub struct Translations {
    tables: HashMap<Locale, Value>,
}

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, locale: Locale, table: Value) -> Self {
        self.insert(locale, table);
        self
    }

    pub fn insert(&mut self, locale: Locale, table: Value) {
        self.tables.insert(locale, table);
    }

    /// Walk `key` ("a.b.c") through the table for `locale`.
    ///
    /// Only string leaves count as found.
    pub fn lookup(&self, locale: Locale, key: &str) -> Option<&str> {
        let mut node = self.tables.get(&locale)?;
        for segment in key.split('.') {
            node = node.get(segment)?;
        }
        node.as_str()
    }
}

/// Replace every `{{name}}` with its value from `params`.
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    out
}
