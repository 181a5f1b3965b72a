//! Multi-pass citation scanning: longforms → shortforms → id-forms, with
//! overlap resolution and id-chain breakpoints.

use crate::citation::Citation;
use crate::template::{ChildPattern, RawMatch, Template};
use fancy_regex::Regex as FancyRegex;
use std::sync::Arc;

/// Resolves overlaps among a set of spans: sorts by start ascending (ties
/// broken by original position ascending), then walks that order keeping a
/// stack of accepted spans. Each new span that overlaps the stack's top is
/// compared against it directly: the shorter of the two is dropped, and on
/// a pop the new span is re-compared against what is now on top, so a long
/// span correctly survives a chain of several shorter ones it overlaps in
/// turn. Finally re-sorts the kept spans by start ascending (ties broken by
/// end descending).
///
/// Used both by [`Template::find_longform_matches`] (resolving overlaps
/// among one template's own regexes) and by [`list_cites`] (resolving
/// overlaps across all templates' longforms and shortforms).
pub(crate) fn resolve_overlaps<T: Clone>(
    items: &[T],
    span: impl Fn(&T) -> (usize, usize),
) -> Vec<T> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&ia, &ib| {
        let (sa, _) = span(&items[ia]);
        let (sb, _) = span(&items[ib]);
        sa.cmp(&sb).then(ia.cmp(&ib))
    });

    let mut kept: Vec<usize> = Vec::with_capacity(order.len());
    for index in order {
        let (start, end) = span(&items[index]);
        let mut discard = false;
        while let Some(&last) = kept.last() {
            let (last_start, last_end) = span(&items[last]);
            if start >= last_end {
                break;
            }
            // Overlap: drop whichever span is shorter; a length tie keeps
            // whichever of the two was already kept (stable under the
            // start-then-index sort above).
            if end - start > last_end - last_start {
                kept.pop();
            } else {
                discard = true;
                break;
            }
        }
        if !discard {
            kept.push(index);
        }
    }

    let mut kept: Vec<T> = kept.into_iter().map(|i| items[i].clone()).collect();
    kept.sort_by(|a, b| {
        let (sa, ea) = span(a);
        let (sb, eb) = span(b);
        sa.cmp(&sb).then(eb.cmp(&ea))
    });
    kept
}

/// Scans `text` against `templates` (in declaration order), producing an
/// ordered, non-overlapping list of citations.
///
/// `id_break` is an optional pattern; every one of its match starts is an
/// additional id-chain breakpoint, alongside every committed citation's
/// start.
pub(crate) fn list_cites(
    templates: &[Arc<Template>],
    text: &str,
    id_break: Option<&FancyRegex>,
) -> Vec<Citation> {
    // Pass 1: longforms, per template in declaration order.
    let mut longforms: Vec<Citation> = Vec::new();
    for template in templates {
        for raw in template.find_longform_matches(text, false, None) {
            longforms.push(Citation::from_longform(template.clone(), raw));
        }
    }
    longforms.sort_by(|a, b| a.span.start.cmp(&b.span.start));

    // Pass 2: shortforms, scanning the tail after each longform in
    // appearance order.
    let mut shortforms: Vec<Citation> = Vec::new();
    for longform in &longforms {
        let parent = Arc::new(clone_shell(longform));
        let mut cursor = longform.span.end;
        loop {
            let Some((child, next_cursor)) =
                next_child_match(text, cursor, text.len(), &parent.shortform_patterns, &parent, false)
            else {
                break;
            };
            cursor = next_cursor;
            let child = Arc::new(child);
            shortforms.push(clone_shell(&child));
        }
    }

    // Pass 3: merge & deduplicate longforms + shortforms.
    let mut committed: Vec<Citation> = Vec::new();
    committed.extend(longforms);
    committed.extend(shortforms);
    let committed = resolve_overlaps(&committed, |c| (c.span.start, c.span.end));

    // Pass 4: id-chain breakpoints.
    let mut breakpoints: Vec<usize> = committed.iter().map(|c| c.span.start).collect();
    if let Some(id_break) = id_break {
        for m in id_break.find_iter(text) {
            if let Ok(m) = m {
                breakpoints.push(m.start());
            }
        }
    }
    breakpoints.sort_unstable();
    breakpoints.dedup();

    // Pass 5: id-forms, chained from each committed citation.
    let mut id_citations: Vec<Citation> = Vec::new();
    for anchor in &committed {
        let boundary = breakpoints
            .iter()
            .copied()
            .find(|&b| b >= anchor.span.end)
            .unwrap_or(text.len());
        let mut parent = Arc::new(clone_shell(anchor));
        let mut cursor = anchor.span.end;
        loop {
            let Some((child, next_cursor)) =
                next_child_match(text, cursor, boundary, &parent.idform_patterns, &parent, true)
            else {
                break;
            };
            cursor = next_cursor;
            parent = Arc::new(child);
            id_citations.push(clone_shell(&parent));
        }
    }

    // Pass 6: final sort & overlap resolution across everything.
    let mut all: Vec<Citation> = Vec::new();
    all.extend(committed);
    all.extend(id_citations);
    resolve_overlaps(&all, |c| (c.span.start, c.span.end))
}

/// Finds the earliest-starting, then-longest, then-earliest-listed match
/// among `patterns` within `text[cursor..boundary]`, and builds a child
/// Citation from it.
fn next_child_match(
    text: &str,
    cursor: usize,
    boundary: usize,
    patterns: &[ChildPattern],
    parent: &Arc<Citation>,
    is_id: bool,
) -> Option<(Citation, usize)> {
    if cursor >= boundary {
        return None;
    }
    let window = &text[cursor..boundary];
    let mut best: Option<(usize, usize, usize, RawMatch, bool)> = None;
    for (pattern_index, pattern) in patterns.iter().enumerate() {
        let ChildPattern::Fixed(regex) = pattern else {
            continue;
        };
        if let Some(raw) = first_match(regex, window, cursor, parent) {
            let key = (raw.start, usize::MAX - (raw.end - raw.start), pattern_index);
            let better = match &best {
                None => true,
                Some((bs, blen, bidx, _, _)) => key < (*bs, *blen, *bidx),
            };
            if better {
                let has_named_captures = regex.as_str().contains("(?P<");
                best = Some((key.0, key.1, key.2, raw, has_named_captures));
            }
        }
    }
    let (_, _, _, raw, has_named_captures) = best?;
    let end = raw.end;
    let template = parent.template.clone();
    let citation = Citation::build_child(template, raw, parent.clone(), is_id, has_named_captures)?;
    Some((citation, end))
}

/// Finds the first match of `regex` in `window`, translating offsets back
/// into the full text's coordinate space.
fn first_match(
    regex: &FancyRegex,
    window: &str,
    cursor: usize,
    parent: &Arc<Citation>,
) -> Option<RawMatch> {
    let caps = regex.captures(window).ok().flatten()?;
    let whole = caps.get(0)?;
    let mut raw_tokens = indexmap::IndexMap::new();
    for token_name in parent.template.tokens.keys() {
        if let Some(value) = caps.name(token_name) {
            raw_tokens.insert(token_name.clone(), value.as_str().to_string());
        }
    }
    Some(RawMatch {
        start: cursor + whole.start(),
        end: cursor + whole.end(),
        text: whole.as_str().to_string(),
        raw_tokens,
        regex_index: 0,
    })
}

/// Citations are wrapped in `Arc` as soon as they might become a parent, but
/// `Vec<Citation>` (not `Vec<Arc<Citation>>`) is the public return type of
/// [`list_cites`]; this unwraps (or clones) the `Arc` contents back out. The
/// only state duplicated here is cheap (`Arc<Template>` clone, small
/// `IndexMap`s); regex handles are themselves `Arc`-shared so re-cloning a
/// citation never recompiles anything.
fn clone_shell(citation: &Citation) -> Citation {
    Citation {
        template: citation.template.clone(),
        span: citation.span,
        text: citation.text.clone(),
        raw_tokens: citation.raw_tokens.clone(),
        tokens: citation.tokens.clone(),
        url: citation.url.clone(),
        name: citation.name.clone(),
        parent: citation.parent.clone(),
        is_id: citation.is_id,
        idform_has_named_captures: citation.idform_has_named_captures,
        shortform_patterns: clone_patterns(&citation.shortform_patterns),
        idform_patterns: clone_patterns(&citation.idform_patterns),
    }
}

fn clone_patterns(patterns: &[ChildPattern]) -> Vec<ChildPattern> {
    patterns
        .iter()
        .map(|p| match p {
            ChildPattern::Fixed(r) => ChildPattern::Fixed(r.clone()),
            ChildPattern::Deferred(s) => ChildPattern::Deferred(s.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_overlaps_drops_shorter_overlapping_span() {
        let spans = vec![(0usize, 10usize), (5, 8)];
        let kept = resolve_overlaps(&spans, |s| *s);
        assert_eq!(kept, vec![(0, 10)]);
    }

    #[test]
    fn resolve_overlaps_keeps_non_overlapping_spans_in_order() {
        let spans = vec![(10usize, 20usize), (0, 5)];
        let kept = resolve_overlaps(&spans, |s| *s);
        assert_eq!(kept, vec![(0, 5), (10, 20)]);
    }

    #[test]
    fn resolve_overlaps_length_tie_keeps_earlier_original_index() {
        let spans = vec![(0usize, 5usize), (0, 5)];
        let kept = resolve_overlaps(&spans, |s| *s);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn resolve_overlaps_keeps_longer_span_even_when_it_starts_later() {
        let spans = vec![(0usize, 10usize), (5, 30)];
        let kept = resolve_overlaps(&spans, |s| *s);
        assert_eq!(kept, vec![(5, 30)]);
    }

    #[test]
    fn resolve_overlaps_chains_across_three_overlapping_spans() {
        let spans = vec![(0usize, 10usize), (5, 30), (20, 22)];
        let kept = resolve_overlaps(&spans, |s| *s);
        assert_eq!(kept, vec![(5, 30)]);
    }
}
