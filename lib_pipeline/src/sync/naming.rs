//! Deterministic token name and symbol derivation from player names.

/// Token name for a ledger record: the player's full name, trimmed.
pub fn token_name(full_name: &str) -> String {
    full_name.trim().to_string()
}

/// Short symbolic code for a ledger record.
///
/// First initial plus the first three letters of the surname, uppercased.
/// A single-word name falls back to its first four characters. The same
/// input always yields the same code; collisions across players are
/// acceptable (the ledger address, not the symbol, identifies the record).
pub fn token_symbol(full_name: &str) -> String {
    let words: Vec<&str> = full_name.split_whitespace().collect();
    match words.as_slice() {
        [] => "PLYR".to_string(),
        [single] => single.chars().take(4).collect::<String>().to_uppercase(),
        [first, .., last] => {
            let initial: String = first.chars().take(1).collect();
            let tail: String = last.chars().take(3).collect();
            format!("{}{}", initial, tail).to_uppercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_word_names_use_initial_plus_surname() {
        assert_eq!(token_symbol("Lionel Messi"), "LMES");
        assert_eq!(token_symbol("Erling Haaland"), "EHAA");
    }

    #[test]
    fn multi_word_names_use_the_last_word_as_surname() {
        assert_eq!(token_symbol("Kevin De Bruyne"), "KBRU");
    }

    #[test]
    fn single_word_names_use_first_four_characters() {
        assert_eq!(token_symbol("Neymar"), "NEYM");
        assert_eq!(token_symbol("Edu"), "EDU");
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(token_symbol("Lionel Messi"), token_symbol("Lionel Messi"));
    }

    #[test]
    fn empty_name_falls_back() {
        assert_eq!(token_symbol("   "), "PLYR");
    }

    #[test]
    fn token_name_is_the_trimmed_full_name() {
        assert_eq!(token_name("  Lionel Messi "), "Lionel Messi");
    }
}
