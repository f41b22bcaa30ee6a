//! Object name sanitizing.

/// Make `raw` a legal destination object name.
///
/// Every byte outside `[0-9A-Za-z_]` becomes `_`, and a leading digit gets a
/// `_` prefix. Distinct inputs may map to the same output.
pub fn correct_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len() + 1);
    if raw.as_bytes().first().is_some_and(u8::is_ascii_digit) {
        name.push('_');
    }
    name.extend(raw.bytes().map(|b| {
        if b.is_ascii_alphanumeric() || b == b'_' {
            b as char
        } else {
            '_'
        }
    }));
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_legal(name: &str) -> bool {
        name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
            && !name.bytes().next().is_some_and(|b| b.is_ascii_digit())
    }

    #[test]
    fn test_replaces_illegal_bytes() {
        assert_eq!(correct_name("Radiance/RDQI"), "Radiance_RDQI");
        assert_eq!(correct_name("Solar Zenith"), "Solar_Zenith");
        assert_eq!(correct_name("already_fine"), "already_fine");
    }

    #[test]
    fn test_leading_digit_gets_prefix() {
        assert_eq!(correct_name("1KM_RefSB"), "_1KM_RefSB");
        assert_eq!(correct_name("250M"), "_250M");
    }

    #[test]
    fn test_multibyte_characters_become_one_underscore_per_byte() {
        assert_eq!(correct_name("µm"), "__m");
    }

    #[test]
    fn test_character_set_and_length_hold_for_every_input() {
        let inputs = [
            "", "a", "9", "/a/b", "x-y.z", "名前", "Band 1:VNIR", "__", "0_0", "Time ",
        ];
        for raw in inputs {
            let name = correct_name(raw);
            assert!(is_legal(&name), "{:?} -> {:?}", raw, name);
            let prefix = usize::from(raw.as_bytes().first().is_some_and(u8::is_ascii_digit));
            assert_eq!(name.len(), raw.len() + prefix);
        }
    }

    #[test]
    fn test_is_not_collision_free() {
        assert_eq!(correct_name("a/b"), correct_name("a b"));
    }
}
