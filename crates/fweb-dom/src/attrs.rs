#![forbid(unsafe_code)]

//! Mini-languages for classes, inline styles, and props.
//!
//! - Classes: whitespace-separated names.
//! - Style: `;`-separated `key: value` declarations.
//! - Props: whitespace-separated `key`, `key=value`, `key="quoted value"` or
//!   `key='quoted value'` entries. Bare keys mean `true`; values that parse
//!   as JSON numbers become numbers, everything else stays a string.

use indexmap::IndexMap;
use serde_json::Value;

/// A batch of class changes, applied in the order replace → remove → add →
/// toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassUpdate {
    pub add: Option<String>,
    pub remove: Option<String>,
    pub toggle: Option<String>,
    pub replace: Option<String>,
}

impl ClassUpdate {
    #[must_use]
    pub fn add(classes: impl Into<String>) -> Self {
        Self {
            add: Some(classes.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn remove(classes: impl Into<String>) -> Self {
        Self {
            remove: Some(classes.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn toggle(classes: impl Into<String>) -> Self {
        Self {
            toggle: Some(classes.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn replace(classes: impl Into<String>) -> Self {
        Self {
            replace: Some(classes.into()),
            ..Self::default()
        }
    }

    /// Apply to `classes`; returns whether anything changed.
    pub fn apply(&self, classes: &mut Vec<String>) -> bool {
        let before = classes.clone();
        if let Some(replace) = &self.replace {
            classes.clear();
            push_unique(classes, replace);
        }
        if let Some(remove) = &self.remove {
            let doomed: Vec<&str> = remove.split_whitespace().collect();
            classes.retain(|c| !doomed.contains(&c.as_str()));
        }
        if let Some(add) = &self.add {
            push_unique(classes, add);
        }
        if let Some(toggle) = &self.toggle {
            for name in toggle.split_whitespace() {
                match classes.iter().position(|c| c == name) {
                    Some(index) => {
                        classes.remove(index);
                    }
                    None => classes.push(name.to_string()),
                }
            }
        }
        *classes != before
    }
}

fn push_unique(classes: &mut Vec<String>, names: &str) {
    for name in names.split_whitespace() {
        if !classes.iter().any(|c| c == name) {
            classes.push(name.to_string());
        }
    }
}

/// Parse `;`-separated declarations. Entries without a colon are ignored.
#[must_use]
pub fn parse_style(source: &str) -> IndexMap<String, String> {
    source
        .split(';')
        .filter_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse a prop string.
///
/// ```
/// use fweb_dom::attrs::parse_props;
/// use serde_json::json;
///
/// let props = parse_props(r#"dense label="Hello world" size=3"#);
/// assert_eq!(props["dense"], json!(true));
/// assert_eq!(props["label"], json!("Hello world"));
/// assert_eq!(props["size"], json!(3));
/// ```
#[must_use]
pub fn parse_props(source: &str) -> IndexMap<String, Value> {
    let mut props = IndexMap::new();
    let mut chars = source.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            key.push(c);
        }
        if key.is_empty() {
            if chars.next().is_none() {
                break;
            }
            continue;
        }
        if chars.next_if_eq(&'=').is_none() {
            props.insert(key, Value::Bool(true));
            continue;
        }
        let value = match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                let mut raw = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                raw.push(escaped);
                            }
                        }
                        c if c == quote => break,
                        c => raw.push(c),
                    }
                }
                Value::String(raw)
            }
            _ => {
                let mut raw = String::new();
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    raw.push(c);
                }
                scalar(&raw)
            }
        };
        props.insert(key, value);
    }
    props
}

fn scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Number(_)) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(classes: &[String]) -> Vec<&str> {
        classes.iter().map(String::as_str).collect()
    }

    #[test]
    fn class_update_order() {
        let mut classes = vec!["a".to_string(), "b".to_string()];
        let update = ClassUpdate {
            add: Some("c a".into()),
            remove: Some("b".into()),
            toggle: Some("a d".into()),
            replace: None,
        };
        assert!(update.apply(&mut classes));
        assert_eq!(names(&classes), ["c", "d"]);
        assert!(!ClassUpdate::add("c").apply(&mut classes));
    }

    #[test]
    fn class_replace() {
        let mut classes = vec!["x".to_string()];
        ClassUpdate::replace("p q p").apply(&mut classes);
        assert_eq!(names(&classes), ["p", "q"]);
    }

    #[test]
    fn style_parsing() {
        let style = parse_style("color: red; margin:0 auto ;bogus; ;width:  10px");
        assert_eq!(style.len(), 3);
        assert_eq!(style["margin"], "0 auto");
        assert_eq!(style["width"], "10px");
    }

    #[test]
    fn props_quoting_and_escapes() {
        let props = parse_props(r#"a='it\'s' b=x=y c=-1.5 flat"#);
        assert_eq!(props["a"], json!("it's"));
        assert_eq!(props["b"], json!("x=y"));
        assert_eq!(props["c"], json!(-1.5));
        assert_eq!(props["flat"], json!(true));
    }

    #[test]
    fn props_empty_input() {
        assert!(parse_props("   ").is_empty());
    }
}
