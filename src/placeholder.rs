use std::collections::BTreeSet;

use crate::error::ParseError;

/// A piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text with escapes already resolved (`{{` is stored as `{`)
    Text(String),
    /// A named substitution slot, without its braces
    Placeholder(String),
}

/// A template split into literal text and placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Parser::new(input).parse()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of first appearance, duplicates removed.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) if seen.insert(name.as_str()) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Placeholder names as a set, the unit the coverage check compares.
    pub fn placeholder_set(&self) -> BTreeSet<String> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name.clone()),
                Segment::Text(_) => None,
            })
            .collect()
    }
}

/// Extract the ordered, de-duplicated placeholder names of a template.
///
/// ```
/// use globalprogram::extract_placeholders;
///
/// let names = extract_placeholders("{count} files for {name}, {count} new").unwrap();
/// assert_eq!(names, vec!["count", "name"]);
/// ```
pub fn extract_placeholders(input: &str) -> Result<Vec<String>, ParseError> {
    let template = Template::parse(input)?;
    Ok(template
        .placeholders()
        .into_iter()
        .map(str::to_string)
        .collect())
}

/// A parser for brace-delimited placeholders.
///
/// `{name}` is a placeholder, `{{` and `}}` are literal braces and a lone `}`
/// is kept as text. Placeholder names are taken verbatim, whitespace included.
pub struct Parser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser { input, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// Consumes the current character and advances the position by its UTF-8 width.
    fn consume(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn parse_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            match (c, self.peek_next()) {
                ('{', Some('{')) | ('}', Some('}')) => {
                    self.consume();
                    self.consume();
                    text.push(c);
                }
                ('{', _) => break,
                _ => {
                    self.consume();
                    text.push(c);
                }
            }
        }
        text
    }

    fn parse_placeholder(&mut self) -> Result<String, ParseError> {
        let offset = self.position;
        self.consume(); // Consume '{'
        let name_start = self.position;
        while let Some(c) = self.peek() {
            match c {
                '}' => {
                    let name = &self.input[name_start..self.position];
                    self.consume();
                    if name.is_empty() {
                        return Err(ParseError::EmptyName { offset });
                    }
                    return Ok(name.to_string());
                }
                '{' => return Err(ParseError::NestedOpen { offset }),
                _ => {
                    self.consume();
                }
            }
        }
        Err(ParseError::Unterminated { offset })
    }

    pub fn parse(&mut self) -> Result<Template, ParseError> {
        let mut segments = Vec::new();
        while self.position < self.input.len() {
            if self.peek() == Some('{') && self.peek_next() != Some('{') {
                segments.push(Segment::Placeholder(self.parse_placeholder()?));
            } else {
                let text = self.parse_text();
                // Adjacent text runs are merged so escapes never split a literal
                match segments.last_mut() {
                    Some(Segment::Text(previous)) => previous.push_str(&text),
                    _ => segments.push(Segment::Text(text)),
                }
            }
        }
        Ok(Template { segments })
    }
}
