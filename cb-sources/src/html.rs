use std::borrow::Cow;

/// Decode HTML character references (`&quot;`, `&#039;`, `&Uuml;`, ...) to
/// plain text using the full HTML5 entity set. Unknown references are left
/// as written.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(input)
}

#[cfg(test)]
mod tests {
    use super::decode_entities;

    #[test]
    fn decodes_quotes_and_apostrophes_from_trivia_payloads() {
        assert_eq!(
            decode_entities("Which &quot;Star Wars&quot; film isn&#039;t canon?"),
            "Which \"Star Wars\" film isn't canon?"
        );
        assert_eq!(decode_entities("Tom &amp; Jerry&#x27;s"), "Tom & Jerry's");
        assert_eq!(decode_entities("Pok&eacute;mon"), "Pokémon");
    }

    #[test]
    fn decodes_uppercase_accents_and_symbols() {
        let decoded = decode_entities(
            "&Uuml;ber &Aacute;frica &copy; &trade; &laquo;hi&raquo; &aring; &ecirc;",
        );
        assert_eq!(decoded, "Über África © ™ «hi» å ê");
        assert!(!decoded.contains('&'));
    }

    #[test]
    fn leaves_plain_and_unknown_references_untouched() {
        assert!(matches!(
            decode_entities("no entities here"),
            std::borrow::Cow::Borrowed(_)
        ));
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("a &bogus; b"), "a &bogus; b");
        assert_eq!(decode_entities("trailing &"), "trailing &");
    }
}
