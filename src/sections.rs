// src/sections.rs
// Defensive parser for the labelled sections the model is asked to produce.
// The model may ignore the format, so anything without a recognized heading
// comes back as `ParsedAnswer::Unstructured`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Story,
    Connections,
    Provenance,
    Technical,
    Culture,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Story,
        SectionKind::Connections,
        SectionKind::Provenance,
        SectionKind::Technical,
        SectionKind::Culture,
    ];

    pub fn marker(&self) -> &'static str {
        match self {
            SectionKind::Story => "STORY",
            SectionKind::Connections => "CONNECTIONS",
            SectionKind::Provenance => "PROVENANCE",
            SectionKind::Technical => "TECHNICAL",
            SectionKind::Culture => "CULTURE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SectionKind::Story => "what the object is and the story behind it",
            SectionKind::Connections => "links to other works, periods, movements and places",
            SectionKind::Provenance => "origin, maker, date and the object's known history",
            SectionKind::Technical => "materials, techniques, composition and condition",
            SectionKind::Culture => "cultural, religious and social significance",
        }
    }

    pub fn from_marker(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.marker().eq_ignore_ascii_case(word))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedAnswer {
    Structured {
        /// Text before the first heading, if any
        preamble: Option<String>,
        sections: Vec<Section>,
    },
    Unstructured {
        text: String,
    },
}

impl ParsedAnswer {
    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedAnswer::Structured { .. })
    }

    /// Body of the first section of the given kind
    pub fn section(&self, kind: SectionKind) -> Option<&str> {
        match self {
            ParsedAnswer::Structured { sections, .. } => sections
                .iter()
                .find(|s| s.kind == kind)
                .map(|s| s.body.as_str()),
            ParsedAnswer::Unstructured { .. } => None,
        }
    }
}

/// Split a finished answer into labelled sections.
///
/// Accepted heading forms (case-insensitive): `## STORY`, `## STORY: ...`,
/// `**STORY**`, `**STORY:**`, `[STORY]`, `STORY: ...`. A bare word without
/// decoration or colon is treated as prose. Repeated headings produce
/// separate sections, in order.
pub fn parse(text: &str) -> ParsedAnswer {
    let mut preamble = String::new();
    let mut sections: Vec<Section> = Vec::new();

    for line in text.lines() {
        if let Some((kind, rest)) = parse_heading(line) {
            sections.push(Section {
                kind,
                body: rest.to_string(),
            });
            continue;
        }
        let target = match sections.last_mut() {
            Some(section) => &mut section.body,
            None => &mut preamble,
        };
        if !target.is_empty() {
            target.push('\n');
        }
        target.push_str(line);
    }

    if sections.is_empty() {
        return ParsedAnswer::Unstructured {
            text: text.to_string(),
        };
    }

    for section in &mut sections {
        section.body = section.body.trim().to_string();
    }
    let preamble = preamble.trim();

    ParsedAnswer::Structured {
        preamble: (!preamble.is_empty()).then(|| preamble.to_string()),
        sections,
    }
}

fn parse_heading(line: &str) -> Option<(SectionKind, &str)> {
    let mut s = line.trim();
    let mut decorated = false;

    if s.starts_with('#') {
        s = s.trim_start_matches('#').trim_start();
        decorated = true;
    }
    for wrap in ["**", "__"] {
        if let Some(inner) = s.strip_prefix(wrap) {
            s = inner;
            decorated = true;
        }
    }
    if let Some(inner) = s.strip_prefix('[') {
        s = inner;
        decorated = true;
    }

    let end = s.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(s.len());
    let (word, rest) = s.split_at(end);
    let kind = SectionKind::from_marker(word)?;

    let rest = rest.trim_start_matches(['*', '_', ']']);
    let (has_colon, rest) = match rest.strip_prefix(':') {
        Some(after) => (true, after.trim_start_matches(['*', '_', ']']).trim()),
        None => (false, rest.trim()),
    };

    if !has_colon && (!decorated || !rest.is_empty()) {
        return None;
    }
    Some((kind, rest))
}
