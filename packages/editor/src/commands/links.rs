use super::edit::{isolate, merge_text_runs, oriented, resolve};
use super::{Step, CHANGED};
use crate::{EditorSession, NoOpReason};
use scribe_model::{normalize_url, DocumentTree, NodeId, NodeKind, ResolvedSelection, Selection};

fn is_link(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Link { .. })
}

/// Wrap the selection in a link to `url`, or unwrap the links it touches.
///
/// Wrapping never changes the enclosed text nodes, only their parent. Text
/// already inside a link gets that link's URL updated instead.
pub(super) fn toggle_link(session: &mut EditorSession, url: Option<&str>) -> Step {
    let resolved = resolve(session)?;
    match url {
        None => unlink(session, &resolved),
        Some(raw) => {
            let url = normalize_url(raw).ok_or(NoOpReason::EmptyUrl)?;
            if resolved.is_collapsed() {
                update_link_at_caret(session, &resolved, url)
            } else {
                link_range(session, &resolved, url)
            }
        }
    }
}

/// Links overlapping the selection, in reading order
fn touched_links(tree: &DocumentTree, resolved: &ResolvedSelection) -> Vec<NodeId> {
    let mut nodes = vec![resolved.start.key];
    nodes.extend(resolved.leaves(tree));
    nodes.push(resolved.end.key);

    let mut links = Vec::new();
    for node in nodes {
        if let Some(link) = tree.closest(node, is_link) {
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }
    links
}

fn unlink(session: &mut EditorSession, resolved: &ResolvedSelection) -> Step {
    let Some(selection) = session.selection().cloned() else {
        return Err(NoOpReason::NoSelection.into());
    };
    let tree = session.tree_mut();
    let links = touched_links(tree, resolved);
    if links.is_empty() {
        return Err(NoOpReason::NotInLink.into());
    }

    let mut next = oriented(resolved.start, resolved.end, resolved.backward).with_format(selection.format);
    for link in links {
        let Some(parent) = tree.parent(link) else {
            continue;
        };
        for child in tree.children(link).to_vec() {
            tree.insert_before(link, child)?;
        }
        tree.remove(link)?;
        merge_text_runs(tree, parent, &mut next)?;
    }
    if next.resolve(tree).is_none() {
        next = Selection::caret_at_start(tree, tree.root());
    }
    session.set_selection(Some(next));
    Ok(CHANGED)
}

fn update_link_at_caret(session: &mut EditorSession, resolved: &ResolvedSelection, url: String) -> Step {
    let tree = session.tree_mut();
    let Some(link) = tree.closest(resolved.start.key, is_link) else {
        return Err(NoOpReason::NothingSelected.into());
    };
    match tree.kind_mut(link) {
        Some(NodeKind::Link { url: current }) if *current != url => {
            *current = url;
            Ok(CHANGED)
        }
        _ => Err(NoOpReason::AlreadyApplied.into()),
    }
}

fn link_range(session: &mut EditorSession, resolved: &ResolvedSelection, url: String) -> Step {
    let Some(selection) = session.selection().cloned() else {
        return Err(NoOpReason::NoSelection.into());
    };
    let tree = session.tree_mut();
    let (start, end) = isolate(tree, resolved.start, resolved.end)?;
    let leaves = oriented(start, end, false)
        .resolve(tree)
        .map(|r| r.leaves(tree))
        .unwrap_or_default();

    let mut changed = false;
    let mut touched_link = false;
    let mut groups: Vec<Vec<NodeId>> = Vec::new();
    for leaf in leaves {
        let Some(parent) = tree.parent(leaf) else {
            continue;
        };
        match tree.kind_mut(parent) {
            Some(NodeKind::Link { url: current }) => {
                touched_link = true;
                if *current != url {
                    *current = url.clone();
                    changed = true;
                }
                continue;
            }
            Some(kind) if kind.accepts_inline() => {}
            _ => continue,
        }

        let index = tree.index_in_parent(leaf);
        let extends_group = groups
            .last()
            .and_then(|g| g.last())
            .map(|prev| {
                tree.parent(*prev) == Some(parent)
                    && tree.index_in_parent(*prev).map(|i| i + 1) == index
            })
            .unwrap_or(false);
        match groups.last_mut() {
            Some(group) if extends_group => group.push(leaf),
            _ => groups.push(vec![leaf]),
        }
    }

    for group in groups {
        let Some(&first) = group.first() else {
            continue;
        };
        let link = tree.create(NodeKind::Link { url: url.clone() });
        tree.insert_before(first, link)?;
        for leaf in group {
            tree.append(link, leaf)?;
        }
        changed = true;
    }

    if !changed {
        let reason = if touched_link {
            NoOpReason::AlreadyApplied
        } else {
            NoOpReason::InvalidPosition("a link")
        };
        return Err(reason.into());
    }
    session.set_selection(Some(
        oriented(start, end, resolved.backward).with_format(selection.format),
    ));
    Ok(CHANGED)
}

#[cfg(test)]
mod tests {
    use crate::commands::{execute, Command, CommandOutcome};
    use crate::{EditorConfig, EditorSession, NoOpReason};
    use scribe_model::{NodeId, NodeKind, Point, Selection};
    use serde_json::json;

    fn session_with_text(text: &str) -> (EditorSession, NodeId) {
        let (session, _) = EditorSession::from_value("links", &json!(text), EditorConfig::default());
        let tree = session.tree();
        let leaf = tree.first_text_descendant(tree.root()).unwrap();
        (session, leaf)
    }

    fn toggle(session: &mut EditorSession, url: Option<&str>) -> CommandOutcome {
        execute(
            session,
            &Command::ToggleLink {
                url: url.map(str::to_string),
            },
        )
        .unwrap()
    }

    fn select(session: &mut EditorSession, selection: Selection) {
        execute(session, &Command::SetSelection { selection }).unwrap();
    }

    #[test]
    fn test_link_url_is_normalized() {
        let (mut session, leaf) = session_with_text("visit example");
        select(
            &mut session,
            Selection::range(Point::text(leaf, 6), Point::text(leaf, 13)),
        );

        assert!(toggle(&mut session, Some("example.com")).tree_changed());
        assert_eq!(
            session.render(),
            r#"<p>visit <a href="https://example.com" rel="noopener noreferrer" target="_blank">example</a></p>"#
        );
    }

    #[test]
    fn test_blank_url_is_noop() {
        let (mut session, leaf) = session_with_text("text");
        select(
            &mut session,
            Selection::range(Point::text(leaf, 0), Point::text(leaf, 4)),
        );
        let before = session.serialize();

        assert_eq!(
            toggle(&mut session, Some("  ")),
            CommandOutcome::NoOp(NoOpReason::EmptyUrl)
        );
        assert_eq!(session.serialize(), before);
    }

    #[test]
    fn test_explicit_http_url_is_preserved() {
        let (mut session, leaf) = session_with_text("text");
        select(
            &mut session,
            Selection::range(Point::text(leaf, 0), Point::text(leaf, 4)),
        );
        toggle(&mut session, Some("http://x.com"));

        let tree = session.tree();
        let link = tree.parent(leaf).unwrap();
        assert_eq!(
            tree.kind(link),
            Some(&NodeKind::Link {
                url: "http://x.com".to_string()
            })
        );
    }

    #[test]
    fn test_link_wrap_keeps_text_nodes() {
        let (mut session, leaf) = session_with_text("whole");
        select(
            &mut session,
            Selection::range(Point::text(leaf, 0), Point::text(leaf, 5)),
        );

        toggle(&mut session, Some("https://a.test"));
        let tree = session.tree();
        let link = tree.parent(leaf).unwrap();
        assert!(matches!(tree.kind(link), Some(NodeKind::Link { .. })));
        assert_eq!(tree.kind(leaf).and_then(|k| k.text_value()), Some("whole"));

        let caret = Selection::caret(Point::text(leaf, 2));
        select(&mut session, caret);
        assert!(toggle(&mut session, None).tree_changed());

        let tree = session.tree();
        assert_eq!(session.render(), "<p>whole</p>");
        assert!(tree.contains(leaf));
        assert!(session.selection().unwrap().resolve(tree).is_some());
    }

    #[test]
    fn test_caret_inside_link_updates_url() {
        let (mut session, leaf) = session_with_text("site");
        select(
            &mut session,
            Selection::range(Point::text(leaf, 0), Point::text(leaf, 4)),
        );
        toggle(&mut session, Some("a.test"));
        select(&mut session, Selection::caret(Point::text(leaf, 1)));

        assert!(toggle(&mut session, Some("b.test")).tree_changed());
        assert_eq!(
            toggle(&mut session, Some("b.test")),
            CommandOutcome::NoOp(NoOpReason::AlreadyApplied)
        );
        assert!(session.render().contains(r#"href="https://b.test""#));
    }

    #[test]
    fn test_caret_outside_link_is_noop() {
        let (mut session, leaf) = session_with_text("plain");
        select(&mut session, Selection::caret(Point::text(leaf, 2)));

        assert_eq!(
            toggle(&mut session, Some("a.test")),
            CommandOutcome::NoOp(NoOpReason::NothingSelected)
        );
        assert_eq!(
            toggle(&mut session, None),
            CommandOutcome::NoOp(NoOpReason::NotInLink)
        );
    }
}
