/// Column letters for a 1-based column number (1 -> "A", 27 -> "AA").
#[must_use]
pub fn index_to_col_name(index: usize) -> String {
    let mut col_name = String::new();
    let mut n = index;

    while n > 0 {
        let remainder = (n - 1) % 26;
        col_name.insert(0, (b'A' + remainder as u8) as char);
        n = (n - 1) / 26;
    }

    if col_name.is_empty() {
        col_name.push('A');
    }

    col_name
}

/// 1-based column number for column letters ("A" -> 1, "AV" -> 48).
#[must_use]
pub fn col_name_to_index(name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }

    let mut result = 0;

    for c in name.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }

        let val = (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        result = result * 26 + val;
    }

    Some(result)
}

/// 0-based offset of a column inside a row buffer.
#[must_use]
pub fn col_offset(name: &str) -> Option<usize> {
    col_name_to_index(name).map(|index| index - 1)
}

/// Column letters for a 0-based row-buffer offset.
#[must_use]
pub fn offset_to_col_name(offset: usize) -> String {
    index_to_col_name(offset + 1)
}

/// A1 notation for a block of `width` columns starting at column A.
#[must_use]
pub fn block_range(start_row: usize, height: usize, width: usize) -> String {
    let end_row = start_row + height.saturating_sub(1);
    format!("A{}:{}{}", start_row, index_to_col_name(width.max(1)), end_row)
}

/// Prefixes a range with its sheet title, quoting it the way Sheets expects.
#[must_use]
pub fn qualified_range(sheet_title: &str, range: &str) -> String {
    format!("'{}'!{}", sheet_title.replace('\'', "''"), range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_round_trip_across_the_two_letter_boundary() {
        assert_eq!(index_to_col_name(1), "A");
        assert_eq!(index_to_col_name(26), "Z");
        assert_eq!(index_to_col_name(27), "AA");
        assert_eq!(index_to_col_name(48), "AV");
        assert_eq!(col_name_to_index("av"), Some(48));
        assert_eq!(col_offset("AV"), Some(47));
        assert_eq!(offset_to_col_name(2), "C");
    }

    #[test]
    fn rejects_non_letters() {
        assert_eq!(col_name_to_index("A1"), None);
        assert_eq!(col_name_to_index(""), None);
    }

    #[test]
    fn builds_block_ranges() {
        assert_eq!(block_range(5, 2, 3), "A5:C6");
        assert_eq!(block_range(1, 1, 48), "A1:AV1");
        assert_eq!(qualified_range("Página1", "A1:B2"), "'Página1'!A1:B2");
        assert_eq!(qualified_range("Bob's", "A1"), "'Bob''s'!A1");
    }
}
