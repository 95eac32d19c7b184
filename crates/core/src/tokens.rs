//! Token scaling and text-span derivation.
//!
//! Tokens come from a separate feed whose page size can differ from the
//! annotation feed's. Everything here is pure.

use doc_model::{Bound, PageSize, Token};

/// Per-axis factor mapping token-page coordinates onto annotation-page ones.
pub fn scale_ratio(annotation_size: PageSize, token_size: PageSize) -> (f64, f64) {
    let ratio = |target: f64, source: f64| {
        if source > 0.0 && target > 0.0 {
            target / source
        } else {
            1.0
        }
    };
    (
        ratio(annotation_size.width, token_size.width),
        ratio(annotation_size.height, token_size.height),
    )
}

pub fn scale_tokens(tokens: &[Token], ratio: (f64, f64)) -> Vec<Token> {
    let (rx, ry) = ratio;
    tokens
        .iter()
        .map(|token| Token {
            x: token.x * rx,
            y: token.y * ry,
            width: token.width * rx,
            height: token.height * ry,
            ..token.clone()
        })
        .collect()
}

/// Group tokens into visual lines, one bound per line, in token order.
///
/// A token starts a new line when it does not share vertical extent with the
/// line being built.
pub fn line_spans(tokens: &[Token]) -> Vec<Bound> {
    let mut lines: Vec<Bound> = Vec::new();

    for token in tokens {
        let bound = token.bound();
        match lines.last_mut() {
            Some(line) if line.overlaps_vertically(&bound) => *line = line.union(&bound),
            _ => lines.push(bound),
        }
    }

    lines
}

/// Tokens whose bound lies inside `area`, e.g. to attach text to a new box.
pub fn tokens_within<'a>(tokens: &'a [Token], area: &Bound) -> Vec<&'a Token> {
    tokens.iter().filter(|token| area.contains_bound(&token.bound())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_compares_page_sizes_per_axis() {
        let ratio = scale_ratio(PageSize::new(200.0, 300.0), PageSize::new(100.0, 100.0));
        assert_eq!(ratio, (2.0, 3.0));
        assert_eq!(scale_ratio(PageSize::new(200.0, 300.0), PageSize::default()), (1.0, 1.0));
    }

    #[test]
    fn scaling_preserves_text() {
        let tokens = vec![Token::new("a", 1.0, 2.0, 3.0, 4.0)];
        let scaled = scale_tokens(&tokens, (2.0, 0.5));
        assert_eq!(scaled[0], Token::new("a", 2.0, 1.0, 6.0, 2.0));
    }

    #[test]
    fn wrapped_text_yields_one_span_per_line() {
        let tokens = vec![
            Token::new("first", 50.0, 10.0, 20.0, 10.0),
            Token::new("line", 75.0, 11.0, 20.0, 10.0),
            Token::new("second", 5.0, 30.0, 30.0, 10.0),
        ];

        let lines = line_spans(&tokens);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], Bound::new(50.0, 10.0, 45.0, 11.0));
        assert_eq!(lines[1], Bound::new(5.0, 30.0, 30.0, 10.0));
    }

    #[test]
    fn tokens_within_filters_by_containment() {
        let tokens =
            vec![Token::new("in", 1.0, 1.0, 2.0, 2.0), Token::new("out", 50.0, 50.0, 2.0, 2.0)];
        let inside = tokens_within(&tokens, &Bound::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].text, "in");
    }
}
