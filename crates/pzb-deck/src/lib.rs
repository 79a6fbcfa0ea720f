//! Keyword-card input deck parser for piezo beam runs.
//!
//! A deck is a sequence of cards. Each card starts with a `*KEYWORD` header
//! line, optionally followed by `, KEY=VALUE` parameters, and owns every
//! data line up to the next header. Lines starting with `**` are comments.
//! Data fields may be separated by commas, whitespace, or both.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub keyword: String,
    pub parameters: Vec<Parameter>,
    pub data_lines: Vec<DataLine>,
    pub line_start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: Option<String>,
}

/// One data line of a card together with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLine {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl Deck {
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ParseError {
            line: 0,
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::parse_str(&raw)
    }

    pub fn parse_str(raw: &str) -> Result<Self, ParseError> {
        let lines: Vec<&str> = raw.lines().collect();
        let mut cards = Vec::new();
        let mut i = 0usize;

        while i < lines.len() {
            let trimmed = lines[i].trim();

            if trimmed.is_empty() || is_comment(trimmed) {
                i += 1;
                continue;
            }

            if !trimmed.starts_with('*') {
                return Err(ParseError::new(i + 1, "expected card starting with '*'"));
            }

            let line_start = i + 1;
            let mut header = trimmed.trim_start_matches('*').trim().to_string();
            i += 1;
            if header.is_empty() {
                continue;
            }

            // Header continuation lines start with a comma.
            while i < lines.len() {
                let next = lines[i].trim();
                if next.starts_with(',') {
                    header.push_str(next);
                    i += 1;
                    continue;
                }
                break;
            }

            let (keyword, parameters) = parse_header(&header, line_start)?;

            let mut data_lines = Vec::new();
            while i < lines.len() {
                let candidate = lines[i].trim();
                if candidate.is_empty() || is_comment(candidate) {
                    i += 1;
                    continue;
                }
                if candidate.starts_with('*') {
                    break;
                }
                data_lines.push(DataLine {
                    line: i + 1,
                    text: candidate.to_string(),
                });
                i += 1;
            }

            cards.push(Card {
                keyword,
                parameters,
                data_lines,
                line_start,
            });
        }

        Ok(Deck { cards })
    }

    pub fn parse_file_with_includes(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let mut include_stack = Vec::<PathBuf>::new();
        let mut active = HashSet::<PathBuf>::new();
        Self::parse_file_with_includes_inner(path.as_ref(), &mut include_stack, &mut active)
    }

    fn parse_file_with_includes_inner(
        path: &Path,
        include_stack: &mut Vec<PathBuf>,
        active: &mut HashSet<PathBuf>,
    ) -> Result<Self, ParseError> {
        let normalized_path = normalize_path(path);
        if active.contains(&normalized_path) {
            let mut chain = include_stack
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>();
            chain.push(normalized_path.display().to_string());
            return Err(ParseError::new(
                0,
                format!("include cycle detected: {}", chain.join(" -> ")),
            ));
        }

        include_stack.push(normalized_path.clone());
        active.insert(normalized_path);

        let result = (|| -> Result<Self, ParseError> {
            let parsed = Self::parse_file(path)?;
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let mut expanded_cards = Vec::<Card>::new();

            for card in parsed.cards {
                if !card.is("INCLUDE") {
                    expanded_cards.push(card);
                    continue;
                }

                let raw_include = card.parameter("INPUT").ok_or_else(|| {
                    ParseError::new(card.line_start, "missing INPUT parameter in *INCLUDE card")
                })?;
                let include_path = resolve_include_path(base_dir, raw_include);
                let included =
                    Self::parse_file_with_includes_inner(&include_path, include_stack, active)
                        .map_err(|err| ParseError {
                            line: err.line,
                            message: format!(
                                "{} (while expanding include {})",
                                err.message,
                                include_path.display()
                            ),
                        })?;
                expanded_cards.extend(included.cards);
            }

            Ok(Self {
                cards: expanded_cards,
            })
        })();

        if let Some(path) = include_stack.pop() {
            active.remove(&path);
        }

        result
    }

    /// All cards whose keyword matches `keyword`, ignoring case, spaces and underscores.
    pub fn cards_named<'a>(&'a self, keyword: &str) -> impl Iterator<Item = &'a Card> + use<'a> {
        let wanted = normalized_keyword(keyword);
        self.cards
            .iter()
            .filter(move |card| normalized_keyword(&card.keyword) == wanted)
    }

    /// The single card named `keyword`.
    ///
    /// Returns `Ok(None)` when the card is absent and an error pointing at the
    /// second occurrence when it is repeated.
    pub fn unique_card(&self, keyword: &str) -> Result<Option<&Card>, ParseError> {
        let mut matches = self.cards_named(keyword);
        let first = matches.next();
        if let Some(duplicate) = matches.next() {
            return Err(ParseError::new(
                duplicate.line_start,
                format!("duplicate *{} card", duplicate.keyword),
            ));
        }
        Ok(first)
    }
}

impl Card {
    pub fn is(&self, keyword: &str) -> bool {
        normalized_keyword(&self.keyword) == normalized_keyword(keyword)
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        let wanted = normalized_keyword(key);
        self.parameters
            .iter()
            .find(|p| normalized_keyword(&p.key) == wanted)
            .and_then(|p| p.value.as_deref())
            .map(|v| v.trim().trim_matches('"').trim_matches('\''))
    }

    /// Parses the value of `key`, `Ok(None)` when absent.
    pub fn parse_parameter<T>(&self, key: &str) -> Result<Option<T>, ParseError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.parameter(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
                ParseError::new(
                    self.line_start,
                    format!("invalid {key} value '{raw}' in *{}: {e}", self.keyword),
                )
            }),
        }
    }

    /// Every data field of the card in reading order, tagged with its line.
    pub fn fields(&self) -> Vec<(usize, &str)> {
        self.data_lines
            .iter()
            .flat_map(|dl| split_fields(&dl.text).into_iter().map(move |f| (dl.line, f)))
            .collect()
    }

    /// Parses every data field as `T`, flattening line boundaries.
    pub fn values<T>(&self) -> Result<Vec<T>, ParseError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.fields()
            .into_iter()
            .map(|(line, field)| parse_field(line, field))
            .collect()
    }

    /// The line to blame for problems with the card body.
    pub fn body_line(&self) -> usize {
        self.data_lines
            .first()
            .map(|dl| dl.line)
            .unwrap_or(self.line_start)
    }
}

/// Splits a data line on commas and whitespace, dropping empty fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .collect()
}

pub fn parse_field<T>(line: usize, field: &str) -> Result<T, ParseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    // Fortran-style exponents show up in hand-written decks.
    let cleaned = field.replace(['d', 'D'], "e");
    cleaned
        .parse::<T>()
        .map_err(|e| ParseError::new(line, format!("invalid number '{field}': {e}")))
}

fn is_comment(line: &str) -> bool {
    line.starts_with("**")
}

fn parse_header(header: &str, line: usize) -> Result<(String, Vec<Parameter>), ParseError> {
    let fields = split_header_fields(header);
    let keyword_raw = fields.first().map(|s| s.as_str()).unwrap_or("").trim();
    if keyword_raw.is_empty() {
        return Err(ParseError::new(line, "empty card keyword"));
    }
    let keyword = keyword_raw.to_ascii_uppercase();
    let mut parameters = Vec::new();

    for part in fields.iter().skip(1) {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        if let Some((k, v)) = item.split_once('=') {
            parameters.push(Parameter {
                key: k.trim().to_ascii_uppercase(),
                value: Some(v.trim().to_string()),
            });
        } else {
            parameters.push(Parameter {
                key: item.to_ascii_uppercase(),
                value: None,
            });
        }
    }

    Ok((keyword, parameters))
}

fn split_header_fields(header: &str) -> Vec<String> {
    let mut fields = Vec::<String>::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in header.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            ',' if !in_single && !in_double => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn normalized_keyword(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_ascii_uppercase()
}

fn resolve_include_path(base_dir: &Path, include: &str) -> PathBuf {
    let raw_path = Path::new(include.trim());
    let joined = if raw_path.is_absolute() {
        raw_path.to_path_buf()
    } else {
        base_dir.join(raw_path)
    };
    normalize_path(&joined)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
