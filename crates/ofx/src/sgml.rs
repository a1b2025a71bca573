//! Minimal tag scanner shared by the response readers.
//!
//! OFX 1.x is SGML with unclosed leaf elements, OFX 2.x is XML, and servers
//! put any number of elements on one line. Scanning on `<` handles all three.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Element<'a> {
    /// Tag name as written, `/`-prefixed for closing tags.
    pub name: &'a str,
    /// Trimmed text between this tag and the next `<`.
    pub value: &'a str,
    /// Byte offset of the opening `<`.
    pub start: usize,
}

pub(crate) struct Elements<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Elements<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Element<'a>> {
        let start = self.pos + self.text[self.pos..].find('<')?;
        let Some(close) = self.text[start + 1..].find('>') else {
            self.pos = self.text.len();
            return None;
        };
        let name = self.text[start + 1..start + 1 + close].trim();
        let value_start = start + 1 + close + 1;
        let value_end = self.text[value_start..]
            .find('<')
            .map_or(self.text.len(), |i| value_start + i);
        self.pos = value_end;

        Some(Element {
            name,
            value: self.text[value_start..value_end].trim(),
            start,
        })
    }
}

pub(crate) fn elements(text: &str) -> Elements<'_> {
    Elements { text, pos: 0 }
}

/// Value of the first element named `tag` (case-insensitive), even if empty.
pub(crate) fn first_value<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    elements(text)
        .find(|e| e.name.eq_ignore_ascii_case(tag))
        .map(|e| e.value)
}

pub(crate) fn all_values<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    elements(text)
        .filter(|e| e.name.eq_ignore_ascii_case(tag))
        .map(|e| e.value)
        .collect()
}

/// Contents of every `<tag>...</tag>` aggregate. Nested aggregates of the same
/// name are not expected in OFX and are not handled.
pub(crate) fn blocks<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut open: Option<usize> = None;
    for element in elements(text) {
        if element.name.eq_ignore_ascii_case(tag) {
            open = Some(element.start);
        } else if let Some(closing) = element.name.strip_prefix('/') {
            if closing.trim().eq_ignore_ascii_case(tag) {
                if let Some(start) = open.take() {
                    found.push(&text[start..element.start]);
                }
            }
        }
    }
    found
}
