//! Number keys `1`..`9` select boxes `0`..`8`.

pub fn box_for_key(key: char, box_count: usize) -> Option<usize> {
    let digit = key.to_digit(10)? as usize;
    if digit == 0 {
        return None;
    }
    let box_index = digit - 1;
    (box_index < box_count).then_some(box_index)
}

/// Like [`box_for_key`] for a key name such as a terminal or DOM key string.
pub fn box_for_key_name(key: &str, box_count: usize) -> Option<usize> {
    let mut chars = key.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => box_for_key(c, box_count),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_map_to_zero_based_boxes() {
        assert_eq!(box_for_key('1', 4), Some(0));
        assert_eq!(box_for_key('4', 4), Some(3));
        assert_eq!(box_for_key('9', 9), Some(8));
    }

    #[test]
    fn other_keys_are_ignored() {
        assert_eq!(box_for_key('0', 4), None);
        assert_eq!(box_for_key('5', 4), None);
        assert_eq!(box_for_key('a', 4), None);
        assert_eq!(box_for_key_name("12", 20), None);
        assert_eq!(box_for_key_name(" 2 ", 2), Some(1));
        assert_eq!(box_for_key_name("", 2), None);
    }
}
