//! Log message templates for the built-in logging hook
//!
//! A template is plain text with `{role}` placeholders, where `role` is one of
//! the action's declared argument roles or a zero-based argument index.
//! `{{` and `}}` produce literal braces.
//!
//! ```
//! use flux_actions_core::LogTemplate;
//!
//! let roles = vec!["namespace".to_string()];
//! let template = LogTemplate::parse("Namespace changed to: {namespace}.", &roles).unwrap();
//! assert_eq!(
//!     template.render(&["db.users".to_string()]),
//!     "Namespace changed to: db.users."
//! );
//! ```

use crate::error::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Arg(usize),
}

/// A parsed log message template, bound to an argument shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl LogTemplate {
    /// Parse `source`, resolving each placeholder against `roles`.
    pub fn parse(source: &str, roles: &[String]) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    text.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    text.push('}');
                }
                '}' => return Err(TemplateError::UnmatchedClose(pos)),
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        key.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed(pos));
                    }
                    let index = resolve(key.trim(), roles)?;
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Arg(index));
                }
                _ => text.push(ch),
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Substitute rendered argument values into the template.
    ///
    /// Placeholders whose index is out of range render as empty text.
    pub fn render(&self, values: &[String]) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Arg(index) => {
                    if let Some(value) = values.get(*index) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }

    /// The template text as written
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn resolve(key: &str, roles: &[String]) -> Result<usize, TemplateError> {
    if let Some(index) = roles.iter().position(|role| role == key) {
        return Ok(index);
    }
    match key.parse::<usize>() {
        Ok(index) if index < roles.len() => Ok(index),
        _ => Err(TemplateError::UnknownArgument(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_named_placeholder() {
        let t = LogTemplate::parse("Component {component} registered.", &roles(&["component"]))
            .unwrap();
        assert_eq!(
            t.render(&["DocumentList".to_string()]),
            "Component DocumentList registered."
        );
        assert_eq!(t.as_str(), "Component {component} registered.");
    }

    #[test]
    fn test_positional_placeholder() {
        let t = LogTemplate::parse("{1} then {0}", &roles(&["a", "b"])).unwrap();
        assert_eq!(t.render(&["x".to_string(), "y".to_string()]), "y then x");
    }

    #[test]
    fn test_escaped_braces() {
        let t = LogTemplate::parse("Filter {{ {filter} }}", &roles(&["filter"])).unwrap();
        assert_eq!(t.render(&["{a:1}".to_string()]), "Filter { {a:1} }");
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let err = LogTemplate::parse("Page {page}", &roles(&["id"])).unwrap_err();
        assert_eq!(err, TemplateError::UnknownArgument("page".to_string()));

        let err = LogTemplate::parse("Page {1}", &roles(&["id"])).unwrap_err();
        assert_eq!(err, TemplateError::UnknownArgument("1".to_string()));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert_eq!(
            LogTemplate::parse("oops {id", &roles(&["id"])).unwrap_err(),
            TemplateError::Unclosed(5)
        );
        assert_eq!(
            LogTemplate::parse("oops } here", &roles(&["id"])).unwrap_err(),
            TemplateError::UnmatchedClose(5)
        );
    }

    #[test]
    fn test_plain_text() {
        let t = LogTemplate::parse("Documents refreshed.", &[]).unwrap();
        assert_eq!(t.render(&[]), "Documents refreshed.");
    }
}
