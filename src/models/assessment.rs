/// One rendered unit of an assessment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssessmentBlock {
    Heading(String),
    Body(String),
}

const HEADING_MARKER: &str = "###";

/// Split assessment text into headings and body lines. A line beginning with
/// `###` is a heading with the marker stripped.
pub fn parse_assessment(text: &str) -> Vec<AssessmentBlock> {
    if text.is_empty() {
        return Vec::new();
    }
    text.lines()
        .map(|line| match line.strip_prefix(HEADING_MARKER) {
            Some(rest) => AssessmentBlock::Heading(rest.trim().to_string()),
            None => AssessmentBlock::Body(line.to_string()),
        })
        .collect()
}

/// Blocks for a collapsed view: every heading, but only the body lines that
/// fall within the first `max_lines` lines of the text.
pub fn collapsed(blocks: &[AssessmentBlock], max_lines: usize) -> Vec<&AssessmentBlock> {
    blocks
        .iter()
        .enumerate()
        .filter(|(i, block)| matches!(block, AssessmentBlock::Heading(_)) || *i < max_lines)
        .map(|(_, block)| block)
        .collect()
}
