const MAX_NAME_CHARS: usize = 31;
const SUFFIXED_BASE_CHARS: usize = 28;
const FALLBACK_NAME: &str = "Table";

fn is_illegal(ch: char) -> bool {
    matches!(ch, '[' | ']' | ':' | '*' | '?' | '/' | '\\')
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Hands out unique, length-bounded table names within one document.
#[derive(Debug, Default)]
pub struct TableNamer {
    assigned: Vec<String>,
}

impl TableNamer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, title: &str) -> String {
        let stripped = title.chars().filter(|ch| !is_illegal(*ch)).collect::<String>();
        let mut name = truncate_chars(stripped.trim(), MAX_NAME_CHARS);
        if name.is_empty() {
            name = FALLBACK_NAME.to_string();
        }

        if self.is_taken(&name) {
            let base = truncate_chars(&name, SUFFIXED_BASE_CHARS);
            let mut counter = 1_usize;
            while self.is_taken(&format!("{base}_{counter}")) {
                counter += 1;
            }
            name = format!("{base}_{counter}");
        }

        self.assigned.push(name.clone());
        name
    }

    /// Names become file names, so `Prices` and `PRICES` collide.
    fn is_taken(&self, name: &str) -> bool {
        self.assigned
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn assigned(&self) -> &[String] {
        &self.assigned
    }
}
