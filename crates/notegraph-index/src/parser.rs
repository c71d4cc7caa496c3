//! Note parsing: frontmatter stripping, content hashing, heading blocks.

/// Block key used when a note has no heading lines.
pub const DOCUMENT_BLOCK_KEY: &str = "document";

/// One heading-delimited section of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    /// Trimmed heading line, or [`DOCUMENT_BLOCK_KEY`] for an unsegmented note.
    pub key: String,
    /// Text of the block, lines joined with newline.
    pub text: String,
    /// 1-indexed inclusive, offset by any stripped frontmatter lines.
    pub line_start: usize,
    pub line_end: usize,
}

/// Canonical representation of a note after frontmatter stripping.
#[derive(Debug, Clone)]
pub struct ParsedNote {
    /// Full post-frontmatter text, lines joined with newline.
    pub content: String,
    /// Hex-encoded blake3 hash of `content`.
    pub content_hash: String,
    /// Blocks ordered by `line_start`.
    pub blocks: Vec<ParsedBlock>,
}

/// Parse raw note text into its canonical content and blocks.
#[must_use]
pub fn parse_note(raw: &str) -> ParsedNote {
    let lines: Vec<&str> = raw.lines().collect();
    let offset = frontmatter_lines(&lines);
    let content_lines = &lines[offset..];

    let content = content_lines.join("\n");
    let content_hash = blake3::hash(content.as_bytes()).to_hex().to_string();

    ParsedNote {
        blocks: split_blocks(content_lines, offset),
        content,
        content_hash,
    }
}

/// Number of leading lines consumed by a `---` delimited metadata block.
///
/// An opening `---` without a closing one means no metadata block at all.
fn frontmatter_lines(lines: &[&str]) -> usize {
    if lines.first() != Some(&"---") {
        return 0;
    }
    match lines[1..].iter().position(|line| *line == "---") {
        Some(close) => close + 2,
        None => 0,
    }
}

fn is_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes)
        && trimmed[hashes..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
}

fn split_blocks(content_lines: &[&str], offset: usize) -> Vec<ParsedBlock> {
    if content_lines.is_empty() {
        return Vec::new();
    }

    let heading_indices: Vec<usize> = content_lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_heading(line))
        .map(|(i, _)| i)
        .collect();

    if heading_indices.is_empty() {
        return vec![ParsedBlock {
            key: DOCUMENT_BLOCK_KEY.into(),
            text: content_lines.join("\n"),
            line_start: offset + 1,
            line_end: offset + content_lines.len(),
        }];
    }

    heading_indices
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = heading_indices
                .get(i + 1)
                .map_or(content_lines.len(), |&next| next);
            ParsedBlock {
                key: content_lines[start].trim().to_string(),
                text: content_lines[start..end].join("\n"),
                line_start: offset + start + 1,
                line_end: offset + end,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_headings_yield_two_blocks_with_line_ranges() {
        let note = parse_note("# A\none\ntwo\n## B\nthree\nfour");
        assert_eq!(note.blocks.len(), 2);
        assert_eq!(note.blocks[0].key, "# A");
        assert_eq!((note.blocks[0].line_start, note.blocks[0].line_end), (1, 3));
        assert_eq!(note.blocks[1].key, "## B");
        assert_eq!((note.blocks[1].line_start, note.blocks[1].line_end), (4, 6));
    }

    #[test]
    fn no_headings_yield_single_document_block() {
        let note = parse_note("just some text\nacross two lines");
        assert_eq!(note.blocks.len(), 1);
        assert_eq!(note.blocks[0].key, DOCUMENT_BLOCK_KEY);
        assert_eq!((note.blocks[0].line_start, note.blocks[0].line_end), (1, 2));
        assert_eq!(note.blocks[0].text, note.content);
    }

    #[test]
    fn empty_input_yields_zero_blocks() {
        let note = parse_note("");
        assert!(note.blocks.is_empty());
        assert!(note.content.is_empty());
    }

    #[test]
    fn frontmatter_is_stripped_and_offsets_lines() {
        let note = parse_note("---\ntitle: test\n---\n# A\nbody");
        assert_eq!(note.content, "# A\nbody");
        assert_eq!(note.blocks.len(), 1);
        assert_eq!((note.blocks[0].line_start, note.blocks[0].line_end), (4, 5));
    }

    #[test]
    fn unterminated_frontmatter_is_kept_as_content() {
        let note = parse_note("---\ntitle: test\nbody");
        assert_eq!(note.content, "---\ntitle: test\nbody");
        assert_eq!(note.blocks.len(), 1);
        assert_eq!(note.blocks[0].key, DOCUMENT_BLOCK_KEY);
    }

    #[test]
    fn hash_covers_post_frontmatter_text_only() {
        let with = parse_note("---\na: 1\n---\nsame body");
        let without = parse_note("same body");
        assert_eq!(with.content_hash, without.content_hash);
    }

    #[test]
    fn hash_changes_with_content() {
        assert_ne!(parse_note("a").content_hash, parse_note("b").content_hash);
    }

    #[test]
    fn heading_requires_trailing_whitespace() {
        let note = parse_note("#tag is not a heading\n####### seven hashes either");
        assert_eq!(note.blocks.len(), 1);
        assert_eq!(note.blocks[0].key, DOCUMENT_BLOCK_KEY);
    }

    #[test]
    fn indented_heading_is_recognized() {
        let note = parse_note("  ## Indented\nbody");
        assert_eq!(note.blocks.len(), 1);
        assert_eq!(note.blocks[0].key, "## Indented");
    }

    #[test]
    fn preamble_before_first_heading_is_not_a_block() {
        let note = parse_note("intro line\n# First\nbody");
        assert_eq!(note.blocks.len(), 1);
        assert_eq!(note.blocks[0].key, "# First");
        assert_eq!((note.blocks[0].line_start, note.blocks[0].line_end), (2, 3));
    }

    #[test]
    fn block_text_matches_line_range() {
        let note = parse_note("# A\none\n## B\ntwo");
        assert_eq!(note.blocks[0].text, "# A\none");
        assert_eq!(note.blocks[1].text, "## B\ntwo");
    }
}
