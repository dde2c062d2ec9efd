//! Mail template splicing.

use crate::DigestError;

/// Delimiter the template frames its body slot with.
const DELIMITER: &str = "<hr>";

/// Splice `fragment` into `template` between the first and second
/// `<hr>` delimiter, replacing whatever was there.
///
/// Bytes before the first delimiter and after the second are preserved
/// verbatim. A template missing either delimiter is malformed.
pub fn splice_template(template: &str, fragment: &str) -> Result<String, DigestError> {
    let first = template
        .find(DELIMITER)
        .ok_or_else(|| DigestError::Template("missing first <hr> delimiter".to_string()))?;
    let after_first = first + DELIMITER.len();

    let second_rel = template[after_first..]
        .find(DELIMITER)
        .ok_or_else(|| DigestError::Template("missing second <hr> delimiter".to_string()))?;
    let second = after_first + second_rel;

    let mut out = String::with_capacity(template.len() + fragment.len());
    out.push_str(&template[..after_first]);
    out.push_str(fragment);
    out.push_str(&template[second..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replaces_only_the_slot_between_delimiters() {
        let template = "<html><body>header<hr>OLD BODY<hr>footer</body></html>";
        let result = splice_template(template, "<h2>Agenda</h2>").unwrap();
        assert_eq!(
            result,
            "<html><body>header<hr><h2>Agenda</h2><hr>footer</body></html>"
        );
    }

    #[test]
    fn preserves_bytes_outside_the_slot_verbatim() {
        let template = "before text\n<hr>\nslot\n<hr>\nafter text\nwith a third <hr> kept";
        let result = splice_template(template, "X").unwrap();
        assert!(result.starts_with("before text\n<hr>"));
        assert!(result.ends_with("\nafter text\nwith a third <hr> kept"));
        assert_eq!(result, "before text\n<hr>X<hr>\nafter text\nwith a third <hr> kept");
    }

    #[test]
    fn empty_slot_is_filled() {
        let result = splice_template("a<hr><hr>b", "body").unwrap();
        assert_eq!(result, "a<hr>body<hr>b");
    }

    #[test]
    fn missing_first_delimiter_is_fatal() {
        let err = splice_template("no delimiters here", "x").unwrap_err();
        assert!(matches!(err, DigestError::Template(_)));
    }

    #[test]
    fn missing_second_delimiter_is_fatal() {
        let err = splice_template("only one <hr> here", "x").unwrap_err();
        assert!(matches!(err, DigestError::Template(_)));
    }
}
