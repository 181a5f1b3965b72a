//! End-to-end scenarios exercising the full scan → citation → rewrite
//! pipeline together, as opposed to each module's own unit tests. Covers
//! non-overlap, ordering, id-chain containment, inheritance, round-trip
//! idempotence, URL determinism, broad-vs-strict supersetting, and
//! severability, using a small hand-authored template set rather than the
//! bundled one (so these tests don't depend on any particular
//! legal-citation URL scheme).

use crate::{insert_links, Citator, RewritePolicy};

fn test_citator() -> Citator {
    let mut citator = Citator::new();
    citator
        .load_yaml_str(
            r"
USC:
  tokens:
    title:
      regex: \d+
    section:
      regex: \d+
    subsection:
      regex: '\([A-Za-z0-9]+\)(?:\([A-Za-z0-9]+\))?'
      severable: true
  pattern:
    - '{title}\s*U\.?\s?S\.?\s?C\.?\s*§?\s*{section}(\s*{subsection})?'
  shortform pattern:
    - '§\s*(?P<section>\d+)(\s*(?P<subsection>\([a-z0-9]+\)))?'
  idform pattern:
    - 'Id\.(?:\s+at\s+(?P<subsection>\([a-z0-9]+\)))?'
  URL builder:
    parts:
      - 'https://example.test/usc/{title}/{section}'
      - '#{subsection}'

US Reports:
  tokens:
    volume:
      regex: \d+
    page:
      regex: \d+
    pincite:
      regex: \d+
  pattern:
    - '{volume}\s+U\.\s?S\.\s+{page}'
  shortform pattern:
    - '{same volume}\s+U\.\s?S\.\s+at\s+(?P<pincite>\d+)'
  URL builder:
    parts:
      - 'https://example.test/us/{volume}/{page}'
      - '#p{pincite}'
",
        )
        .unwrap();
    citator
}

#[test]
fn scenario_a_longform_shortform_id_and_resumed_citation() {
    let citator = test_citator();
    let text = "Federal law provides attorneys fees, 42 USC 1988 (b), and expert fees, Id. at (c). See Riverside v. Rivera, 477 U. S. 561 (1986). Riverside, 477 U. S. at 574.";
    let citations = citator.list_cites(text, None);
    let texts: Vec<&str> = citations.iter().map(|c| c.text.as_str()).collect();
    assert!(texts.iter().any(|t| t.contains("42 USC 1988")));
    assert!(texts.iter().any(|t| t.starts_with("Id. at (c)")));
    assert!(texts.iter().any(|t| t.contains("477 U. S. 561")));
    assert!(texts.iter().any(|t| t.contains("477 U. S. at 574")));

    let id_citation = citations.iter().find(|c| c.is_id).unwrap();
    assert_eq!(
        id_citation.url.as_deref(),
        Some("https://example.test/usc/42/1988#%28c%29")
    );
}

#[test]
fn scenario_b_new_longform_breaks_the_id_chain() {
    let citator = test_citator();
    let text = "42 USC 1983. See also 42 USC 2000.  Id.";
    let citations = citator.list_cites(text, None);
    let id_citation = citations.iter().find(|c| c.is_id).expect("an id citation");
    let parent = id_citation.parent.as_ref().expect("id citation has a parent");
    assert!(parent.text.contains("2000"));
}

#[test]
fn scenario_c_overlap_resolution_prefers_earlier_declared_template() {
    let mut citator = Citator::new();
    citator
        .load_yaml_str(
            r"
First:
  tokens:
    n:
      regex: \d+
  pattern: '{n}\s+widgets'
Second:
  tokens:
    n:
      regex: \d+
  pattern: '{n}\s+widgets'
",
        )
        .unwrap();
    let citations = citator.list_cites("42 widgets", None);
    assert_eq!(citations.len(), 1);
    assert_eq!(citations[0].template.name, "First");
}

#[test]
fn scenario_d_severable_subsections_share_an_authority() {
    let citator = test_citator();
    let text = "42 USC 1988 (B). 42 USC 1988 (B)(2).";
    let citations = citator.list_cites(text, None);
    let authorities = crate::list_authorities(
        &citations.into_iter().map(std::sync::Arc::new).collect::<Vec<_>>(),
    );
    assert_eq!(authorities.len(), 1);
    assert_eq!(authorities[0].citations.len(), 2);
}

#[test]
fn scenario_e_ignore_markup_wraps_the_surrounding_tag() {
    let citator = test_citator();
    let text = "42 USC 1988. <i>Id.</i>";
    let mut policy = RewritePolicy::default();
    policy.ignore_markup = true;
    let out = crate::scan_and_insert_links(&citator, text, None, &policy);
    assert!(out.contains("<i>Id.</i></a>"));
    assert!(out.contains("href=\"https://example.test/usc/42/1988\""));
}

#[test]
fn scenario_f_redundant_link_suppression() {
    let citator = test_citator();
    let text = "42 USC 1988. Id.";
    let citations: Vec<_> = citator.list_cites(text, None).into_iter().map(std::sync::Arc::new).collect();
    let mut policy = RewritePolicy::default();
    policy.redundant_links = false;
    let out = insert_links(text, &citations, &policy);
    assert_eq!(out.matches("<a").count(), 1);
    assert!(out.ends_with("Id."));
}

#[test]
fn invariant_non_overlap_and_order() {
    let citator = test_citator();
    let text = "42 USC 1988 (b). Id. at (c). 477 U. S. 561. 477 U. S. at 574.";
    let citations = citator.list_cites(text, None);
    for pair in citations.windows(2) {
        assert!(pair[0].span.start <= pair[1].span.start);
        assert!(pair[0].span.end <= pair[1].span.start);
    }
}

#[test]
fn invariant_broad_is_a_superset_of_strict() {
    let mut citator = Citator::new();
    citator
        .load_yaml_str(
            r"
USC:
  tokens:
    section:
      regex: \d+
  pattern: '{section} U\.S\.C\.'
  broad pattern: '{section}\s*usc'
",
        )
        .unwrap();
    let text = "1983 usc";
    let strict = citator.templates().next().unwrap().find_longform_matches(text, false, None);
    let broad = citator.templates().next().unwrap().find_longform_matches(text, true, None);
    assert!(strict.is_empty());
    assert_eq!(broad.len(), 1);
}

#[test]
fn invariant_url_depends_only_on_tokens_not_surrounding_text() {
    let citator = test_citator();
    let a = citator.cite("prefix 42 USC 1988 suffix", false).unwrap();
    let b = citator.cite("42 USC 1988", false).unwrap();
    assert_eq!(a.url, b.url);
}
