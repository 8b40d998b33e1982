use std::collections::{BTreeMap, HashMap};

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    Null,
    Derived,
}

impl StepValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// References of a list value; a single reference counts as a list of one.
    #[must_use]
    pub fn references(&self) -> Vec<u64> {
        match self {
            StepValue::Reference(id) => vec![*id],
            StepValue::List(list) => list.iter().filter_map(StepValue::as_reference).collect(),
            _ => Vec::new(),
        }
    }

    /// True for references and lists that only hold references.
    #[must_use]
    pub fn is_relational(&self) -> bool {
        match self {
            StepValue::Reference(_) => true,
            StepValue::List(list) => {
                !list.is_empty() && list.iter().all(|v| matches!(v, StepValue::Reference(_)))
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, StepValue::Null | StepValue::Derived)
    }
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    pub entity_type: String,
    pub values: Vec<StepValue>,
}

impl StepEntity {
    #[must_use]
    pub fn string_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(StepValue::as_str)
    }

    #[must_use]
    pub fn reference_at(&self, index: usize) -> Option<u64> {
        self.values.get(index).and_then(StepValue::as_reference)
    }

    #[must_use]
    pub fn references_at(&self, index: usize) -> Vec<u64> {
        self.values
            .get(index)
            .map(StepValue::references)
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct StepFile {
    pub entities: BTreeMap<u64, StepEntity>,
    pub schema: String,
    by_type: HashMap<String, Vec<u64>>,
}

impl StepFile {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut statements = split_statements(content).into_iter();

        match statements.next() {
            Some(first) if first.trim() == "ISO-10303-21" => {}
            _ => {
                return Err(ParseError::InvalidStep {
                    message: "missing ISO-10303-21 header".to_string(),
                })
            }
        }

        let mut file = StepFile::default();
        let mut in_data = false;
        let mut saw_data = false;

        for statement in statements {
            let statement = statement.trim();

            if statement.starts_with("FILE_SCHEMA") {
                if let Some(start) = statement.find("('") {
                    if let Some(end) = statement[start + 2..].find('\'') {
                        file.schema = statement[start + 2..start + 2 + end].to_string();
                    }
                }
                continue;
            }

            if statement == "DATA" {
                in_data = true;
                saw_data = true;
                continue;
            }
            if statement == "ENDSEC" {
                in_data = false;
                continue;
            }

            if in_data && statement.starts_with('#') {
                if let Some(entity) = Self::parse_entity_line(statement) {
                    file.by_type
                        .entry(entity.entity_type.clone())
                        .or_default()
                        .push(entity.id);
                    file.entities.insert(entity.id, entity);
                }
            }
        }

        if !saw_data {
            return Err(ParseError::InvalidStep {
                message: "missing DATA section".to_string(),
            });
        }

        for ids in file.by_type.values_mut() {
            ids.sort_unstable();
        }

        Ok(file)
    }

    fn parse_entity_line(line: &str) -> Option<StepEntity> {
        // Format: #123=IFCWALL('guid',#ref,'name',...)
        let eq_pos = line.find('=')?;
        let id: u64 = line[1..eq_pos].trim().parse().ok()?;

        let rest = line[eq_pos + 1..].trim();
        let paren_pos = rest.find('(')?;
        if paren_pos == 0 || !rest.ends_with(')') {
            // Complex entity instances are not needed here.
            return None;
        }
        let entity_type = rest[..paren_pos].trim().to_ascii_uppercase();

        let values_str = &rest[paren_pos + 1..rest.len() - 1];
        let values = Self::parse_values(values_str);

        Some(StepEntity {
            id,
            entity_type,
            values,
        })
    }

    fn parse_values(s: &str) -> Vec<StepValue> {
        let mut values = Vec::new();
        let mut current = String::new();
        let mut in_string = false;
        let mut paren_depth = 0;

        for ch in s.chars() {
            match ch {
                '\'' => {
                    in_string = !in_string;
                    current.push(ch);
                }
                '(' if !in_string => {
                    paren_depth += 1;
                    current.push(ch);
                }
                ')' if !in_string => {
                    paren_depth -= 1;
                    current.push(ch);
                }
                ',' if !in_string && paren_depth == 0 => {
                    values.push(Self::parse_single_value(current.trim()));
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        if !current.trim().is_empty() {
            values.push(Self::parse_single_value(current.trim()));
        }

        values
    }

    fn parse_single_value(s: &str) -> StepValue {
        let s = s.trim();

        if s == "$" {
            return StepValue::Null;
        }
        if s == "*" {
            return StepValue::Derived;
        }
        if let Some(stripped) = s.strip_prefix('#') {
            if let Ok(id) = stripped.parse::<u64>() {
                return StepValue::Reference(id);
            }
        }
        if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
            let raw = &s[1..s.len() - 1];
            return StepValue::String(decode_step_string(raw));
        }
        if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
            let inner = &s[1..s.len() - 1];
            if inner == "T" {
                return StepValue::Boolean(true);
            }
            if inner == "F" {
                return StepValue::Boolean(false);
            }
            return StepValue::Enum(inner.to_string());
        }
        if s.starts_with('(') && s.ends_with(')') {
            let inner = &s[1..s.len() - 1];
            return StepValue::List(Self::parse_values(inner));
        }
        if let Ok(i) = s.parse::<i64>() {
            return StepValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return StepValue::Real(f);
        }
        // STEP reals may omit the fraction digits, e.g. "0."
        if let Some(f) = s.strip_suffix('.').and_then(|t| t.parse::<f64>().ok()) {
            return StepValue::Real(f);
        }
        // Typed value like IFCBOOLEAN(.T.)
        if let Some(paren_pos) = s.find('(') {
            if s.ends_with(')') {
                let inner = &s[paren_pos + 1..s.len() - 1];
                return Self::parse_single_value(inner);
            }
        }

        StepValue::String(s.to_string())
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Entities of exactly this (upper case) STEP type, in id order.
    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        self.by_type
            .get(&entity_type.to_ascii_uppercase())
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    /// Entity type names present in the file.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }
}

/// Splits STEP text into `;`-terminated statements, skipping comments and
/// line breaks outside of string literals.
fn split_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '/' if !in_string && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ';' if !in_string => {
                statements.push(std::mem::take(&mut current));
            }
            '\r' | '\n' if !in_string => {}
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }

    statements
}

/// Decode STEP/IFC encoded strings with Unicode escape sequences.
/// Supports:
/// - `\X2\XXXX\X0\` - 2-byte Unicode (BMP), can have multiple 4-char hex codes
/// - `\X\XX` - 1-byte ISO 8859-1
/// - `\\` - escaped backslash
/// - `''` - escaped apostrophe
fn decode_step_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('X') => {
                    chars.next(); // consume 'X'
                    match chars.peek() {
                        Some('2') => {
                            chars.next(); // consume '2'
                            chars.next(); // consume '\'

                            let mut hex = String::new();
                            while let Some(&c) = chars.peek() {
                                if c == '\\' {
                                    break;
                                }
                                hex.push(c);
                                chars.next();
                            }
                            // Skip \X0\
                            if chars.peek() == Some(&'\\') {
                                for _ in 0..4 {
                                    chars.next();
                                }
                            }
                            for chunk in hex.as_bytes().chunks(4) {
                                let decoded = std::str::from_utf8(chunk)
                                    .ok()
                                    .filter(|_| chunk.len() == 4)
                                    .and_then(|s| u32::from_str_radix(s, 16).ok())
                                    .and_then(char::from_u32);
                                if let Some(c) = decoded {
                                    result.push(c);
                                }
                            }
                        }
                        Some('\\') => {
                            chars.next(); // consume '\'
                            let mut hex = String::new();
                            for _ in 0..2 {
                                if let Some(&c) = chars.peek() {
                                    hex.push(c);
                                    chars.next();
                                }
                            }
                            if let Ok(code) = u8::from_str_radix(&hex, 16) {
                                result.push(char::from(code));
                            }
                        }
                        _ => {
                            result.push('\\');
                            result.push('X');
                        }
                    }
                }
                Some('\\') => {
                    chars.next();
                    result.push('\\');
                }
                Some('S') => {
                    // \S\X - single char shift (ISO 8859-1 high bit)
                    chars.next(); // 'S'
                    chars.next(); // '\'
                    if let Some(c) = chars.next().and_then(|c| char::from_u32(u32::from(c) + 128)) {
                        result.push(c);
                    }
                }
                _ => result.push('\\'),
            }
        } else if ch == '\'' {
            // '' is escaped apostrophe in STEP
            if chars.peek() == Some(&'\'') {
                chars.next();
            }
            result.push('\'');
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
/* a comment; with a semicolon */
#1=IFCPROJECT('0ProjectGuid',$,'My; Project',$,$,$,$,$,$);
#2=IFCWALL('1WallGuid',$,'Wall',$,$,
  #3,$,'T-1',.STANDARD.);
#4=IFCPROPERTYSINGLEVALUE('Width',$,IFCLENGTHMEASURE(0.25),$);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn parses_statements_across_lines_and_comments() {
        let file = StepFile::parse(SAMPLE).unwrap();
        assert_eq!(file.schema, "IFC4");
        assert_eq!(file.entities.len(), 3);

        let project = file.get_entity(1).unwrap();
        assert_eq!(project.string_at(2), Some("My; Project"));

        let wall = file.get_entity(2).unwrap();
        assert_eq!(wall.entity_type, "IFCWALL");
        assert_eq!(wall.reference_at(5), Some(3));
        assert_eq!(wall.values[8], StepValue::Enum("STANDARD".to_string()));
    }

    #[test]
    fn typed_values_unwrap_to_inner_value() {
        let file = StepFile::parse(SAMPLE).unwrap();
        let prop = file.get_entity(4).unwrap();
        assert_eq!(prop.values[2], StepValue::Real(0.25));
    }

    #[test]
    fn lists_keep_strings_with_commas_together() {
        let values = StepFile::parse_values("('a,b','c'),#5");
        assert_eq!(
            values,
            vec![
                StepValue::List(vec![
                    StepValue::String("a,b".to_string()),
                    StepValue::String("c".to_string()),
                ]),
                StepValue::Reference(5),
            ]
        );
    }

    #[test]
    fn rejects_content_without_header() {
        let err = StepFile::parse("hello world").unwrap_err();
        assert!(matches!(err, ParseError::InvalidStep { .. }));
    }

    #[test]
    fn rejects_content_without_data_section() {
        let err = StepFile::parse("ISO-10303-21;HEADER;ENDSEC;END-ISO-10303-21;").unwrap_err();
        assert!(err.to_string().contains("DATA"));
    }

    #[test]
    fn decodes_unicode_escapes() {
        assert_eq!(decode_step_string("Gr\\X2\\00FC\\X0\\n"), "Grün");
        assert_eq!(decode_step_string("\\X\\E4"), "ä");
        assert_eq!(decode_step_string("it''s"), "it's");
    }

    #[test]
    fn relational_values_are_detected() {
        assert!(StepValue::Reference(1).is_relational());
        assert!(StepValue::List(vec![StepValue::Reference(1)]).is_relational());
        assert!(!StepValue::List(vec![]).is_relational());
        assert!(!StepValue::String("x".to_string()).is_relational());
    }
}
