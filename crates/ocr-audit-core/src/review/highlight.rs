use crate::quality::{detector, Span, UnusualPattern};

/// Kind of suspicious span, determining its markdown emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    RepeatedCharacters,
    MissingSpace,
    UnusualCharacters,
}

impl Mark {
    fn fence(self) -> &'static str {
        match self {
            Self::RepeatedCharacters => "****",
            Self::MissingSpace => "**",
            Self::UnusualCharacters => "***",
        }
    }
}

pub const LEGEND: &str =
    "**Legend:** ***unusual chars***, **missing space**, ****repeated chars****";

/// Non-overlapping suspicious spans in `text`, ordered by start.
///
/// Overlaps resolve left to right: the earliest start wins and, on equal starts, the
/// longer span wins.
pub fn suspicious_spans(text: &str) -> Vec<(Span, Mark)> {
    let mut spans: Vec<(Span, Mark)> = detector::repeated_runs(text)
        .map(|span| (span, Mark::RepeatedCharacters))
        .chain(detector::missing_space_spans(text).map(|span| (span, Mark::MissingSpace)))
        .chain(
            detector::unusual_spans(text, UnusualPattern::SymbolRun)
                .map(|span| (span, Mark::UnusualCharacters)),
        )
        .collect();
    spans.sort_by(|(a, _), (b, _)| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

    let mut kept: Vec<(Span, Mark)> = Vec::with_capacity(spans.len());
    for (span, mark) in spans {
        if kept.last().map_or(true, |((_, end), _)| span.0 >= *end) {
            kept.push((span, mark));
        }
    }
    kept
}

/// Wrap suspicious substrings of `text` in markdown emphasis for manual review.
pub fn highlight_suspicious_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 32);
    let mut cursor = 0;
    for ((start, end), mark) in suspicious_spans(text) {
        out.push_str(&text[cursor..start]);
        out.push_str(mark.fence());
        out.push_str(&text[start..end]);
        out.push_str(mark.fence());
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}
