use thiserror::Error;

use crate::token::{CssToken, CssTokenizer};

/// Combinator between compound selectors in a complex selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: ancestor descendant
    Descendant,
    /// `>`: parent > child
    Child,
    /// `+`: prev + next
    NextSibling,
    /// `~`: prev ~ subsequent
    SubsequentSibling,
}

/// Attribute selector operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=val]`
    Eq,
    /// `[attr~=val]`
    Includes,
    /// `[attr|=val]`
    DashMatch,
    /// `[attr^=val]`
    Prefix,
    /// `[attr$=val]`
    Suffix,
    /// `[attr*=val]`
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Hover,
    Active,
    Focus,
    FocusVisible,
    FocusWithin,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    /// `nth-child(an+b)` with coefficients `(a, b)`.
    NthChild(i32, i32),
    NthLastChild(i32, i32),
    NthOfType(i32, i32),
    /// `:not(a, b)`; matches when none of the compounds match.
    Not(Vec<CompoundSelector>),
    /// `:is(...)`, `:where(...)` and the legacy `:matches(...)` / `:any(...)`.
    Is(Vec<ComplexSelector>),
    Link,
    Visited,
    AnyLink,
    Root,
    Empty,
    Enabled,
    Disabled,
    Checked,
    Required,
    Optional,
    PlaceholderShown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoElement {
    Before,
    After,
    FirstLine,
    FirstLetter,
    Placeholder,
    Selection,
}

/// A single simple selector component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// Type selector, e.g. `div`, `p`. Stored lowercased.
    Type(String),
    /// Universal selector `*`.
    Universal,
    /// ID selector `#foo`.
    Id(String),
    /// Class selector `.bar`.
    Class(String),
    /// Attribute selector `[name op value i]`.
    Attribute {
        name: String,
        op: AttrOp,
        value: Option<String>,
        case_insensitive: bool,
    },
    PseudoClass(PseudoClass),
    /// Pseudo-elements parse but never match a real element.
    PseudoElement(PseudoElement),
}

/// A compound selector is a sequence of simple selectors
/// without any combinator between them (e.g. `div.foo#bar`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

/// A complex selector is a chain of compound selectors separated by combinators.
/// Stored right-to-left for efficient matching: `parts[0]` is the rightmost
/// (subject) compound selector.
///
/// Each element is `(compound_selector, optional_combinator_to_the_left)`.
/// The last element's combinator is always `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<(CompoundSelector, Option<Combinator>)>,
}

impl ComplexSelector {
    /// The rightmost compound, i.e. the one the matched element itself must satisfy.
    pub fn subject(&self) -> &CompoundSelector {
        &self.parts[0].0
    }
}

/// Comma-separated list of complex selectors.
pub type SelectorList = Vec<ComplexSelector>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected {0} in selector")]
    UnexpectedToken(String),
    #[error("unexpected end of selector")]
    UnexpectedEnd,
    #[error("selector ends with a dangling combinator")]
    DanglingCombinator,
    #[error("unknown pseudo-class `:{0}`")]
    UnknownPseudoClass(String),
    #[error("unknown pseudo-element `::{0}`")]
    UnknownPseudoElement(String),
    #[error("`:{0}()` is not supported")]
    Unsupported(String),
    #[error("invalid an+b expression `{0}`")]
    InvalidNth(String),
}

/// Parse a comma-separated selector list.
///
/// Unlike a stylesheet parser, any invalid part rejects the whole list.
pub fn parse_selector_list(input: &str) -> Result<SelectorList, SelectorError> {
    let tokens = CssTokenizer::new(input).tokenize_all();
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(SelectorError::Empty);
    }
    let list = parser.parse_list()?;
    match parser.peek() {
        None => Ok(list),
        Some(tok) => Err(unexpected(tok)),
    }
}

struct Parser<'a> {
    tokens: &'a [CssToken],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a CssToken> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a CssToken> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    /// Skip whitespace, returning whether any was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek() == Some(&CssToken::Whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect_rparen(&mut self) -> Result<(), SelectorError> {
        self.skip_whitespace();
        match self.bump() {
            Some(CssToken::RParen) => Ok(()),
            Some(tok) => Err(unexpected(tok)),
            None => Err(SelectorError::UnexpectedEnd),
        }
    }

    /// Parse complex selectors until something other than a comma follows.
    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut list = Vec::new();
        loop {
            self.skip_whitespace();
            list.push(self.parse_complex()?);
            self.skip_whitespace();
            if self.peek() == Some(&CssToken::Comma) {
                self.pos += 1;
            } else {
                return Ok(list);
            }
        }
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let first = self.parse_compound()?;
        if first.simples.is_empty() {
            return Err(match self.peek() {
                Some(tok) => unexpected(tok),
                None => SelectorError::UnexpectedEnd,
            });
        }
        let mut parts_ltr = vec![(first, None)];

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(CssToken::Comma) | Some(CssToken::RParen) => break,
                Some(CssToken::Delim('>')) => Combinator::Child,
                Some(CssToken::Delim('+')) => Combinator::NextSibling,
                Some(CssToken::Delim('~')) => Combinator::SubsequentSibling,
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(tok) => return Err(unexpected(tok)),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_whitespace();
            }

            let compound = self.parse_compound()?;
            if compound.simples.is_empty() {
                return Err(match self.peek() {
                    None | Some(CssToken::Comma) | Some(CssToken::RParen) => {
                        SelectorError::DanglingCombinator
                    }
                    Some(tok) => unexpected(tok),
                });
            }
            parts_ltr.push((compound, Some(combinator)));
        }

        // Each entry's combinator links it to the entry on its left, so the
        // reversed list reads as a walk from the subject outwards.
        parts_ltr.reverse();
        Ok(ComplexSelector { parts: parts_ltr })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut simples = Vec::new();
        loop {
            match self.peek() {
                Some(CssToken::Ident(name)) if simples.is_empty() => {
                    simples.push(SimpleSelector::Type(name.to_ascii_lowercase()));
                    self.pos += 1;
                }
                Some(CssToken::Delim('*')) if simples.is_empty() => {
                    simples.push(SimpleSelector::Universal);
                    self.pos += 1;
                }
                Some(CssToken::Hash(id)) => {
                    simples.push(SimpleSelector::Id(id.clone()));
                    self.pos += 1;
                }
                Some(CssToken::Delim('.')) => {
                    self.pos += 1;
                    match self.bump() {
                        Some(CssToken::Ident(class)) => {
                            simples.push(SimpleSelector::Class(class.clone()))
                        }
                        Some(tok) => return Err(unexpected(tok)),
                        None => return Err(SelectorError::UnexpectedEnd),
                    }
                }
                Some(CssToken::LBracket) => {
                    self.pos += 1;
                    simples.push(self.parse_attribute()?);
                }
                Some(CssToken::Colon) => {
                    self.pos += 1;
                    simples.push(self.parse_pseudo()?);
                }
                _ => break,
            }
        }
        Ok(CompoundSelector { simples })
    }

    /// Parse the inside of `[...]`; the opening bracket is already consumed.
    fn parse_attribute(&mut self) -> Result<SimpleSelector, SelectorError> {
        self.skip_whitespace();
        let name = match self.bump() {
            Some(CssToken::Ident(name)) => name.to_ascii_lowercase(),
            Some(tok) => return Err(unexpected(tok)),
            None => return Err(SelectorError::UnexpectedEnd),
        };
        self.skip_whitespace();

        let op = match self.bump() {
            Some(CssToken::RBracket) => {
                return Ok(SimpleSelector::Attribute {
                    name,
                    op: AttrOp::Exists,
                    value: None,
                    case_insensitive: false,
                });
            }
            Some(CssToken::Delim('=')) => AttrOp::Eq,
            Some(CssToken::Delim(c @ ('~' | '|' | '^' | '$' | '*'))) => {
                let op = match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                };
                match self.bump() {
                    Some(CssToken::Delim('=')) => op,
                    Some(tok) => return Err(unexpected(tok)),
                    None => return Err(SelectorError::UnexpectedEnd),
                }
            }
            Some(tok) => return Err(unexpected(tok)),
            None => return Err(SelectorError::UnexpectedEnd),
        };

        self.skip_whitespace();
        let value = match self.bump() {
            Some(CssToken::Ident(v)) | Some(CssToken::String(v)) => v.clone(),
            Some(CssToken::Number(n)) => format_number(*n),
            Some(tok) => return Err(unexpected(tok)),
            None => return Err(SelectorError::UnexpectedEnd),
        };
        self.skip_whitespace();

        let mut case_insensitive = false;
        if let Some(CssToken::Ident(flag)) = self.peek() {
            match flag.as_str() {
                "i" | "I" => case_insensitive = true,
                "s" | "S" => {}
                _ => return Err(SelectorError::UnexpectedToken(format!("flag `{flag}`"))),
            }
            self.pos += 1;
            self.skip_whitespace();
        }

        match self.bump() {
            Some(CssToken::RBracket) => Ok(SimpleSelector::Attribute {
                name,
                op,
                value: Some(value),
                case_insensitive,
            }),
            Some(tok) => Err(unexpected(tok)),
            None => Err(SelectorError::UnexpectedEnd),
        }
    }

    /// Parse what follows a `:`.
    fn parse_pseudo(&mut self) -> Result<SimpleSelector, SelectorError> {
        if self.peek() == Some(&CssToken::Colon) {
            self.pos += 1;
            return match self.bump() {
                Some(CssToken::Ident(name)) => pseudo_element(name)
                    .map(SimpleSelector::PseudoElement)
                    .ok_or_else(|| SelectorError::UnknownPseudoElement(name.clone())),
                Some(tok) => Err(unexpected(tok)),
                None => Err(SelectorError::UnexpectedEnd),
            };
        }

        let name = match self.bump() {
            Some(CssToken::Ident(name)) => name.to_ascii_lowercase(),
            Some(CssToken::Function(name)) => {
                let name = name.to_ascii_lowercase();
                return self.parse_functional_pseudo(&name).map(SimpleSelector::PseudoClass);
            }
            Some(tok) => return Err(unexpected(tok)),
            None => return Err(SelectorError::UnexpectedEnd),
        };

        // CSS2 pseudo-elements are still accepted with a single colon.
        if let Some(pe @ (PseudoElement::Before
        | PseudoElement::After
        | PseudoElement::FirstLine
        | PseudoElement::FirstLetter)) = pseudo_element(&name)
        {
            return Ok(SimpleSelector::PseudoElement(pe));
        }

        let pc = match name.as_str() {
            "hover" => PseudoClass::Hover,
            "active" => PseudoClass::Active,
            "focus" => PseudoClass::Focus,
            "focus-visible" => PseudoClass::FocusVisible,
            "focus-within" => PseudoClass::FocusWithin,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-of-type" => PseudoClass::OnlyOfType,
            "link" => PseudoClass::Link,
            "visited" => PseudoClass::Visited,
            "any-link" => PseudoClass::AnyLink,
            "root" => PseudoClass::Root,
            "empty" => PseudoClass::Empty,
            "enabled" => PseudoClass::Enabled,
            "disabled" => PseudoClass::Disabled,
            "checked" => PseudoClass::Checked,
            "required" => PseudoClass::Required,
            "optional" => PseudoClass::Optional,
            "placeholder-shown" => PseudoClass::PlaceholderShown,
            _ => return Err(SelectorError::UnknownPseudoClass(name)),
        };
        Ok(SimpleSelector::PseudoClass(pc))
    }

    /// Parse `name(...)`; the function token is already consumed.
    fn parse_functional_pseudo(&mut self, name: &str) -> Result<PseudoClass, SelectorError> {
        let pc = match name {
            "not" => {
                let mut compounds = Vec::new();
                loop {
                    self.skip_whitespace();
                    let compound = self.parse_compound()?;
                    if compound.simples.is_empty() {
                        return Err(match self.peek() {
                            Some(tok) => unexpected(tok),
                            None => SelectorError::UnexpectedEnd,
                        });
                    }
                    compounds.push(compound);
                    self.skip_whitespace();
                    if self.peek() != Some(&CssToken::Comma) {
                        break;
                    }
                    self.pos += 1;
                }
                PseudoClass::Not(compounds)
            }
            "is" | "where" | "matches" | "any" | "-webkit-any" | "-moz-any" => {
                PseudoClass::Is(self.parse_list()?)
            }
            "nth-child" | "nth-last-child" | "nth-of-type" => {
                let (a, b) = self.parse_nth()?;
                return Ok(match name {
                    "nth-child" => PseudoClass::NthChild(a, b),
                    "nth-last-child" => PseudoClass::NthLastChild(a, b),
                    _ => PseudoClass::NthOfType(a, b),
                });
            }
            "has" => return Err(SelectorError::Unsupported(name.to_string())),
            _ => return Err(SelectorError::UnknownPseudoClass(format!("{name}()"))),
        };
        self.expect_rparen()?;
        Ok(pc)
    }

    /// Parse an `an+b` argument up to and including the closing paren.
    fn parse_nth(&mut self) -> Result<(i32, i32), SelectorError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(CssToken::RParen) => break,
                Some(CssToken::Whitespace) => {}
                Some(CssToken::Ident(s)) => text.push_str(s),
                Some(CssToken::Delim(c @ ('+' | '-'))) => text.push(*c),
                Some(CssToken::Number(n)) => push_signed(&mut text, *n),
                Some(CssToken::Dimension { value, unit }) => {
                    push_signed(&mut text, *value);
                    text.push_str(unit);
                }
                Some(tok) => return Err(unexpected(tok)),
                None => return Err(SelectorError::UnexpectedEnd),
            }
        }
        parse_an_plus_b(&text).ok_or(SelectorError::InvalidNth(text))
    }
}

fn pseudo_element(name: &str) -> Option<PseudoElement> {
    Some(match name.to_ascii_lowercase().as_str() {
        "before" => PseudoElement::Before,
        "after" => PseudoElement::After,
        "first-line" => PseudoElement::FirstLine,
        "first-letter" => PseudoElement::FirstLetter,
        "placeholder" => PseudoElement::Placeholder,
        "selection" => PseudoElement::Selection,
        _ => return None,
    })
}

/// Append a number token, keeping an explicit sign unless one precedes it.
fn push_signed(text: &mut String, n: f64) {
    if n.fract() != 0.0 {
        // Fractions are never valid; keep them so the error shows the input.
        text.push_str(&n.to_string());
        return;
    }
    let n = n as i64;
    if text.ends_with(['+', '-']) {
        text.push_str(&n.abs().to_string());
    } else if n >= 0 {
        text.push('+');
        text.push_str(&n.to_string());
    } else {
        text.push_str(&n.to_string());
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

/// Parse whitespace-free `an+b` text such as `2n+1`, `-n+3`, `odd` or `+4`.
fn parse_an_plus_b(text: &str) -> Option<(i32, i32)> {
    match text.to_ascii_lowercase().as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }
    let lower = text.to_ascii_lowercase();
    let Some(n_at) = lower.find('n') else {
        return Some((0, lower.parse().ok()?));
    };
    let a = match &lower[..n_at] {
        "" | "+" => 1,
        "-" => -1,
        coeff => coeff.parse().ok()?,
    };
    let rest = &lower[n_at + 1..];
    let b = if rest.is_empty() {
        0
    } else if rest.starts_with(['+', '-']) && rest.len() > 1 && !rest[1..].starts_with(['+', '-'])
    {
        rest.parse().ok()?
    } else {
        return None;
    };
    Some((a, b))
}

fn unexpected(tok: &CssToken) -> SelectorError {
    let text = match tok {
        CssToken::Ident(s) => format!("identifier `{s}`"),
        CssToken::Function(s) => format!("function `{s}(`"),
        CssToken::Hash(s) => format!("`#{s}`"),
        CssToken::String(s) => format!("string \"{s}\""),
        CssToken::Number(n) => format!("number `{}`", format_number(*n)),
        CssToken::Dimension { value, unit } => format!("`{}{unit}`", format_number(*value)),
        CssToken::Whitespace => "whitespace".to_string(),
        CssToken::Colon => "`:`".to_string(),
        CssToken::Comma => "`,`".to_string(),
        CssToken::LBracket => "`[`".to_string(),
        CssToken::RBracket => "`]`".to_string(),
        CssToken::LParen => "`(`".to_string(),
        CssToken::RParen => "`)`".to_string(),
        CssToken::Delim(c) => format!("`{c}`"),
    };
    SelectorError::UnexpectedToken(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> SelectorList {
        match parse_selector_list(input) {
            Ok(list) => list,
            Err(e) => panic!("failed to parse {input:?}: {e}"),
        }
    }

    #[test]
    fn test_simple_type_selector() {
        let selectors = parse("DIV");
        assert_eq!(selectors.len(), 1);
        assert_eq!(selectors[0].parts.len(), 1);
        assert_eq!(
            selectors[0].parts[0].0.simples,
            vec![SimpleSelector::Type("div".into())]
        );
    }

    #[test]
    fn test_class_and_id() {
        let selectors = parse("div.foo#bar");
        let simples = &selectors[0].subject().simples;
        assert_eq!(simples.len(), 3);
        assert_eq!(simples[0], SimpleSelector::Type("div".into()));
        assert_eq!(simples[1], SimpleSelector::Class("foo".into()));
        assert_eq!(simples[2], SimpleSelector::Id("bar".into()));
    }

    #[test]
    fn test_descendant_combinator() {
        let selectors = parse("div p");
        let parts = &selectors[0].parts;
        // RTL: p first, div second
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0.simples, vec![SimpleSelector::Type("p".into())]);
        assert_eq!(parts[0].1, Some(Combinator::Descendant));
        assert_eq!(parts[1].0.simples, vec![SimpleSelector::Type("div".into())]);
        assert_eq!(parts[1].1, None);
    }

    #[test]
    fn test_mixed_combinators() {
        let selectors = parse("form > .row + input ~ label");
        let combinators: Vec<_> = selectors[0].parts.iter().map(|(_, c)| c.clone()).collect();
        assert_eq!(
            combinators,
            vec![
                Some(Combinator::SubsequentSibling),
                Some(Combinator::NextSibling),
                Some(Combinator::Child),
                None,
            ]
        );
    }

    #[test]
    fn test_selector_list_comma() {
        assert_eq!(parse("h1, h2 ,h3").len(), 3);
    }

    #[test]
    fn test_attribute_selectors() {
        let selectors = parse(r#"[href][type="text"][lang|=en i]"#);
        let simples = &selectors[0].subject().simples;
        assert_eq!(
            simples[0],
            SimpleSelector::Attribute {
                name: "href".into(),
                op: AttrOp::Exists,
                value: None,
                case_insensitive: false,
            }
        );
        assert_eq!(
            simples[1],
            SimpleSelector::Attribute {
                name: "type".into(),
                op: AttrOp::Eq,
                value: Some("text".into()),
                case_insensitive: false,
            }
        );
        assert_eq!(
            simples[2],
            SimpleSelector::Attribute {
                name: "lang".into(),
                op: AttrOp::DashMatch,
                value: Some("en".into()),
                case_insensitive: true,
            }
        );
    }

    #[test]
    fn test_pseudo_classes() {
        let selectors = parse("input:checked:not(.a, [disabled])");
        let simples = &selectors[0].subject().simples;
        assert_eq!(simples[1], SimpleSelector::PseudoClass(PseudoClass::Checked));
        match &simples[2] {
            SimpleSelector::PseudoClass(PseudoClass::Not(inner)) => assert_eq!(inner.len(), 2),
            other => panic!("expected :not, got {other:?}"),
        }
    }

    #[test]
    fn test_is_takes_complex_selectors() {
        let selectors = parse(":is(ul > li, .item)");
        match &selectors[0].subject().simples[0] {
            SimpleSelector::PseudoClass(PseudoClass::Is(list)) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].parts.len(), 2);
            }
            other => panic!("expected :is, got {other:?}"),
        }
    }

    #[test]
    fn test_nth_child_forms() {
        let cases = [
            ("odd", (2, 1)),
            ("even", (2, 0)),
            ("3", (0, 3)),
            ("2n+1", (2, 1)),
            ("2n - 1", (2, -1)),
            ("-n+3", (-1, 3)),
            ("n", (1, 0)),
            ("+n + 2", (1, 2)),
        ];
        for (arg, expected) in cases {
            let selectors = parse(&format!("li:nth-child({arg})"));
            assert_eq!(
                selectors[0].subject().simples[1],
                SimpleSelector::PseudoClass(PseudoClass::NthChild(expected.0, expected.1)),
                "argument {arg:?}"
            );
        }
    }

    #[test]
    fn test_pseudo_element() {
        let selectors = parse("p::before, p:after");
        assert_eq!(
            selectors[0].subject().simples[1],
            SimpleSelector::PseudoElement(PseudoElement::Before)
        );
        assert_eq!(
            selectors[1].subject().simples[1],
            SimpleSelector::PseudoElement(PseudoElement::After)
        );
    }

    #[test]
    fn test_invalid_selectors() {
        assert_eq!(parse_selector_list(""), Err(SelectorError::Empty));
        assert_eq!(parse_selector_list("   "), Err(SelectorError::Empty));
        assert_eq!(
            parse_selector_list("div >"),
            Err(SelectorError::DanglingCombinator)
        );
        assert_eq!(
            parse_selector_list("a:bogus"),
            Err(SelectorError::UnknownPseudoClass("bogus".into()))
        );
        assert_eq!(
            parse_selector_list("a:has(b)"),
            Err(SelectorError::Unsupported("has".into()))
        );
        assert!(matches!(
            parse_selector_list("li:nth-child(2x)"),
            Err(SelectorError::InvalidNth(_))
        ));
        assert!(parse_selector_list("a,").is_err());
        assert!(parse_selector_list("[href").is_err());
        assert!(parse_selector_list("a{").is_err());
        assert!(parse_selector_list("> a").is_err());
    }
}
