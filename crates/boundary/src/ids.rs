//! Identifiers for audit events and lifecycle requests.

// Excludes visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

const EVENT_ID_LEN: usize = 21;

/// A fresh random id over [`SAFE_ALPHABET`].
#[must_use]
pub fn event_id() -> String {
    nanoid::nanoid!(EVENT_ID_LEN, SAFE_ALPHABET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ids_use_safe_alphabet() {
        let id = event_id();
        assert_eq!(id.chars().count(), EVENT_ID_LEN);
        assert!(id.chars().all(|c| SAFE_ALPHABET.contains(&c)));
        assert_ne!(id, event_id());
    }
}
