/// Splits a text run into cells at tabs and at runs of two or more spaces.
pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    let mut push_current = |current: &mut String| {
        if !current.trim().is_empty() {
            cells.push(current.trim().to_string());
        }
        current.clear();
    };

    for ch in trimmed.chars() {
        if ch == '\t' {
            push_current(&mut current);
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                push_current(&mut current);
            } else {
                current.push(' ');
            }
            continue;
        }

        whitespace_run = 0;
        current.push(ch);
    }
    push_current(&mut current);

    cells
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

pub(crate) fn looks_like_sentence(line: &str) -> bool {
    ['.', '!', '?']
        .iter()
        .any(|punctuation| line.trim_end().ends_with(*punctuation))
}

#[cfg(test)]
mod tests {
    use super::{looks_like_sentence, soft_split_line_into_cells, split_line_into_cells};

    #[test]
    fn splits_double_space_separated_cells() {
        let cells = split_line_into_cells("May-25  40.1  35.2");
        assert_eq!(cells, vec!["May-25", "40.1", "35.2"]);
    }

    #[test]
    fn splits_tab_separated_cells() {
        let cells = split_line_into_cells("A\tB\tC");
        assert_eq!(cells, vec!["A", "B", "C"]);
    }

    #[test]
    fn keeps_single_spaces_inside_a_cell() {
        let cells = split_line_into_cells("  Survey Round   Current Perception ");
        assert_eq!(cells, vec!["Survey Round", "Current Perception"]);
    }

    #[test]
    fn soft_splits_single_space_cells() {
        let cells = soft_split_line_into_cells("May-25 40.1 35.2");
        assert_eq!(cells, vec!["May-25", "40.1", "35.2"]);
    }

    #[test]
    fn recognises_sentences() {
        assert!(looks_like_sentence("Responses were collected in 19 cities."));
        assert!(!looks_like_sentence("Current Perception"));
    }
}
