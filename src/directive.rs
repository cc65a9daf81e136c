//! Line classification for reStructuredText documents.
//!
//! Only the handful of constructs the crawler cares about are recognized:
//! the first section-title underline, the `toctree` directive, its
//! `:caption:` option, and the indented document references listed below
//! it. Everything else is body text.

/// Marker that opens a list of child documents.
pub const TOCTREE_MARKER: &str = "toctree::";

/// Option naming the group of the references that follow it.
pub const CAPTION_OPTION: &str = ":caption:";

/// A recognized construct, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// The line above the first underline.
    Title(&'a str),
    /// First `toctree::` line. Later markers are ignored.
    ToctreeMarker,
    CaptionDirective(&'a str),
    ReferenceLine(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeTitle,
    InBody,
    InToctree,
}

/// Streaming classifier over the lines of one document.
///
/// The title is looked up across the whole file, but captions and
/// references are only reported once the toctree marker has been seen.
#[derive(Debug)]
pub struct Tokens<'a> {
    lines: std::str::Split<'a, char>,
    state: State,
    title_seen: bool,
    prev: Option<&'a str>,
    pending: Option<Token<'a>>,
}

impl<'a> Tokens<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.split('\n'),
            state: State::BeforeTitle,
            title_seen: false,
            prev: None,
            pending: None,
        }
    }

    fn classify(&mut self, line: &'a str) -> Option<Token<'a>> {
        let prev = self.prev.replace(line);

        let title = if !self.title_seen && is_underline(line) {
            self.title_seen = true;
            if self.state == State::BeforeTitle {
                self.state = State::InBody;
            }
            // An underline on the first line has nothing above it.
            Some(Token::Title(prev.unwrap_or("")))
        } else {
            None
        };

        let directive = match self.state {
            State::BeforeTitle | State::InBody
                if line.contains(TOCTREE_MARKER) =>
            {
                self.state = State::InToctree;
                // The marker line may carry its own caption.
                self.pending = caption_of(line).map(Token::CaptionDirective);
                Some(Token::ToctreeMarker)
            }
            State::InToctree => caption_of(line)
                .map(Token::CaptionDirective)
                .or_else(|| reference_of(line).map(Token::ReferenceLine)),
            _ => None,
        };

        // An underline never matches a directive, so at most one is set.
        title.or(directive)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        loop {
            let raw = self.lines.next()?;
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if let Some(token) = self.classify(line) {
                return Some(token);
            }
        }
    }
}

/// A reference line together with the caption in force where it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReference<'a> {
    pub raw: &'a str,
    pub caption: &'a str,
}

/// Everything the extractor needs from one document's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument<'a> {
    pub title: &'a str,
    pub has_toctree: bool,
    /// References below the marker. Empty when `has_toctree` is false.
    pub references: Vec<CandidateReference<'a>>,
}

/// Parse one document.
///
/// `inherited_caption` applies to references that precede any caption
/// option.
pub fn parse<'a>(
    content: &'a str,
    inherited_caption: &'a str,
) -> ParsedDocument<'a> {
    let mut doc = ParsedDocument::default();
    let mut caption = inherited_caption;

    for token in Tokens::new(content) {
        match token {
            Token::Title(title) => doc.title = title,
            Token::ToctreeMarker => doc.has_toctree = true,
            Token::CaptionDirective(c) => caption = c,
            Token::ReferenceLine(raw) => {
                doc.references.push(CandidateReference { raw, caption });
            }
        }
    }

    doc
}

/// Split a raw reference into its directory segments and entry name.
///
/// ```
/// use docsift::directive::split_reference;
///
/// assert_eq!(split_reference("  /a/b/c"), (vec!["a", "b"], "c"));
/// assert_eq!(split_reference("index"), (vec![], "index"));
/// ```
pub fn split_reference(raw: &str) -> (Vec<&str>, &str) {
    let path = raw.trim();
    let path = path.strip_prefix('/').unwrap_or(path);
    let mut segments: Vec<&str> = path.split('/').collect();
    let entry = segments.pop().unwrap_or("");
    (segments, entry)
}

/// Join directory segments onto a current directory.
///
/// Directories are kept either empty or ending in `/`, so that
/// `dir + entry` is always a valid document path.
pub fn join_directory(current_dir: &str, segments: &[&str]) -> String {
    let mut dir = current_dir.replace('\\', "/");
    if !dir.is_empty() && !dir.ends_with('/') {
        dir.push('/');
    }
    for segment in segments.iter().filter(|s| !s.is_empty()) {
        dir.push_str(segment);
        dir.push('/');
    }
    dir
}

fn is_underline(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '=' || c == '-')
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn caption_of(line: &str) -> Option<&str> {
    let start = line.find(CAPTION_OPTION)? + CAPTION_OPTION.len();
    let rest = line[start..].trim_start();
    let end = rest
        .find(|c: char| !(is_word(c) || c.is_whitespace()))
        .unwrap_or(rest.len());
    let caption = rest[..end].trim_end();
    (!caption.is_empty()).then_some(caption)
}

fn reference_of(line: &str) -> Option<&str> {
    let path = line.trim_start();
    // Entries must be indented under the directive.
    if path.len() == line.len() || path.is_empty() {
        return None;
    }
    let path = path.strip_prefix('/').unwrap_or(path);
    let valid = path
        .split('/')
        .all(|segment| !segment.is_empty() && segment.chars().all(is_word));
    valid.then_some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws<'a>(doc: &ParsedDocument<'a>) -> Vec<&'a str> {
        doc.references.iter().map(|r| r.raw.trim()).collect()
    }

    #[test]
    fn title_is_line_above_first_underline() {
        let doc = parse("Intro\n=====\n\nSub\n---\n", "");
        assert_eq!(doc.title, "Intro");
    }

    #[test]
    fn title_strips_carriage_return() {
        let doc = parse("Intro\r\n=====\r\nbody\r\n", "");
        assert_eq!(doc.title, "Intro");
    }

    #[test]
    fn underline_on_first_line_gives_empty_title() {
        let doc = parse("=====\nIntro\n=====\n", "");
        assert_eq!(doc.title, "");
    }

    #[test]
    fn no_underline_gives_empty_title() {
        let doc = parse("just text\nmore text\n", "");
        assert_eq!(doc.title, "");
    }

    #[test]
    fn title_after_toctree_is_still_found() {
        let doc = parse(".. toctree::\n\n   a\n\nLate\n====\n", "");
        assert_eq!(doc.title, "Late");
        assert!(doc.has_toctree);
        assert_eq!(raws(&doc), vec!["a"]);
    }

    #[test]
    fn references_without_marker_are_ignored() {
        let doc = parse("Title\n=====\n\n  guides/setup\n  other\n", "");
        assert!(!doc.has_toctree);
        assert!(doc.references.is_empty());
    }

    #[test]
    fn references_before_marker_are_ignored() {
        let content = "T\n=\n  before\n.. toctree::\n\n  after\n";
        let doc = parse(content, "");
        assert_eq!(raws(&doc), vec!["after"]);
    }

    #[test]
    fn reference_shapes() {
        let content = ".. toctree::\n\
                       \x20  plain\n\
                       \x20  /rooted/path\n\
                       \x20  nested/deeper/leaf\n\
                       \x20  has-dash\n\
                       \x20  trailing \n\
                       \x20  dotted.rst\n\
                       unindented\n\
                       \x20  a//b\n\
                       \x20  Title <link>\n";
        let doc = parse(content, "");
        assert_eq!(
            raws(&doc),
            vec!["plain", "/rooted/path", "nested/deeper/leaf"]
        );
    }

    #[test]
    fn captions_scope_following_references() {
        let content = ".. toctree::\n\
                       \x20  first\n\
                       \x20  :caption: Guides\n\
                       \n\
                       \x20  second\n\
                       \x20  third\n\
                       .. toctree::\n\
                       \x20  :caption: API Reference\n\
                       \x20  fourth\n";
        let doc = parse(content, "Parent");
        let pairs: Vec<_> = doc
            .references
            .iter()
            .map(|r| (r.raw.trim(), r.caption))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("first", "Parent"),
                ("second", "Guides"),
                ("third", "Guides"),
                ("fourth", "API Reference"),
            ]
        );
    }

    #[test]
    fn caption_stops_at_punctuation_and_ignores_empty() {
        assert_eq!(caption_of("  :caption: Getting-Started"), Some("Getting"));
        assert_eq!(caption_of("  :caption:   Two Words  \r"), Some("Two Words"));
        assert_eq!(caption_of("  :caption:"), None);
        assert_eq!(caption_of("  :maxdepth: 2"), None);
    }

    #[test]
    fn caption_on_marker_line() {
        let doc = parse(".. toctree:: :caption: Inline\n   child\n", "");
        assert_eq!(doc.references[0].caption, "Inline");
    }

    #[test]
    fn token_stream_order() {
        let content = "Intro\n=====\n.. toctree::\n  :caption: Guides\n\n  guides/setup\n";
        let tokens: Vec<_> = Tokens::new(content).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Title("Intro"),
                Token::ToctreeMarker,
                Token::CaptionDirective("Guides"),
                Token::ReferenceLine("  guides/setup"),
            ]
        );
    }

    #[test]
    fn join_directory_normalizes() {
        assert_eq!(join_directory("", &[]), "");
        assert_eq!(join_directory("", &["guides"]), "guides/");
        assert_eq!(join_directory("guides/", &["sub", "x"]), "guides/sub/x/");
        assert_eq!(join_directory("a\\b", &[]), "a/b/");
    }
}
