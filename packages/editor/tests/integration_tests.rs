//! Integration tests for editor crate

use anyhow::{Context, Result};
use scribe_editor::{
    BlockType, ChangeCallbackEffect, Command, CommandOutcome, DataUrlDecoder, DecodeError, DocumentChange,
    EditorConfig, EditorSession, ImageFile, ImagePayload, InsertPayload, NoOpReason, NodeId, NodeKind,
    Pipeline, Point, PostEffect, Selection, TableAction, TextFormat, ToolbarState, ToolbarStateEffect,
    UpdateEvent,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn pipeline(stored: Value) -> Pipeline {
    let (session, _) = EditorSession::from_value("integration", &stored, EditorConfig::default());
    Pipeline::new(session)
}

fn paragraphs(texts: &[&str]) -> Value {
    let children: Vec<Value> = texts
        .iter()
        .map(|t| json!({ "type": "paragraph", "children": [{ "type": "text", "text": t }] }))
        .collect();
    json!({ "root": { "type": "root", "children": children } })
}

/// Text node of the `n`th top-level block
fn text_of_block(pipeline: &Pipeline, n: usize) -> Result<NodeId> {
    let tree = pipeline.session().tree();
    let block = *tree.children(tree.root()).get(n).context("no such block")?;
    tree.first_text_descendant(block).context("block has no text")
}

fn select(pipeline: &mut Pipeline, anchor: Point, focus: Point) -> Result<CommandOutcome> {
    Ok(pipeline.apply(Command::SetSelection {
        selection: Selection::range(anchor, focus),
    })?)
}

#[test]
fn test_format_state_is_intersection_of_selected_text() -> Result<()> {
    let mut pipeline = pipeline(json!({ "root": { "type": "root", "children": [
        { "type": "paragraph", "children": [{ "type": "text", "text": "bold", "format": 1 }] },
        { "type": "paragraph", "children": [{ "type": "text", "text": "both", "format": 3 }] }
    ]}}));
    let first = text_of_block(&pipeline, 0)?;
    let second = text_of_block(&pipeline, 1)?;
    select(&mut pipeline, Point::text(first, 0), Point::text(second, 4))?;

    let state = pipeline.toolbar_state();
    assert!(state.is_active(TextFormat::BOLD));
    assert!(!state.is_active(TextFormat::ITALIC));

    // Every selected run is bold, so bold comes off everywhere
    let outcome = pipeline.apply(Command::FormatText {
        format: TextFormat::BOLD,
    })?;
    assert!(outcome.tree_changed());
    assert_eq!(pipeline.session().render(), "<p>bold</p><p><em>both</em></p>");
    assert_eq!(pipeline.toolbar_state().active_formats, TextFormat::empty());

    // Not every run is italic, so italic goes on everywhere
    pipeline.apply(Command::FormatText {
        format: TextFormat::ITALIC,
    })?;
    assert_eq!(pipeline.session().render(), "<p><em>bold</em></p><p><em>both</em></p>");
    Ok(())
}

#[test]
fn test_block_transform_is_idempotent() -> Result<()> {
    let mut pipeline = pipeline(json!("hello"));
    let heading = Command::TransformBlock {
        target: BlockType::Heading { level: 2 },
    };

    assert!(pipeline.apply(heading.clone())?.tree_changed());
    let once = pipeline.session().serialize();
    assert_eq!(
        pipeline.apply(heading)?,
        CommandOutcome::NoOp(NoOpReason::AlreadyApplied)
    );
    assert_eq!(pipeline.session().serialize(), once);
    assert_eq!(pipeline.session().render(), "<h2>hello</h2>");
    assert_eq!(
        pipeline.toolbar_state().block_type,
        Some(BlockType::Heading { level: 2 })
    );
    Ok(())
}

#[test]
fn test_link_url_is_normalized() -> Result<()> {
    let mut pipeline = pipeline(json!("see example"));
    let text = text_of_block(&pipeline, 0)?;
    select(&mut pipeline, Point::text(text, 4), Point::text(text, 11))?;

    let outcome = pipeline.apply(Command::ToggleLink {
        url: Some("  example.com ".into()),
    })?;
    assert!(outcome.tree_changed());
    assert_eq!(
        pipeline.session().render(),
        "<p>see <a href=\"https://example.com\" rel=\"noopener noreferrer\" target=\"_blank\">example</a></p>"
    );

    let state = pipeline.toolbar_state();
    assert!(state.in_link);
    assert_eq!(state.link_url.as_deref(), Some("https://example.com"));

    pipeline.apply(Command::ToggleLink { url: None })?;
    assert_eq!(pipeline.session().render(), "<p>see example</p>");
    Ok(())
}

#[test]
fn test_table_actions() -> Result<()> {
    let mut pipeline = pipeline(json!(""));
    pipeline.apply(Command::InsertNode {
        node: InsertPayload::Table {
            rows: 2,
            columns: 2,
            header_row: false,
        },
    })?;
    assert!(pipeline.toolbar_state().in_table);

    let shape = |pipeline: &Pipeline| -> Vec<usize> {
        let tree = pipeline.session().tree();
        let table = tree.children(tree.root())[0];
        tree.children(table).iter().map(|row| tree.children(*row).len()).collect()
    };
    assert_eq!(shape(&pipeline), vec![2, 2]);

    pipeline.dispatch(Command::MutateTable {
        action: TableAction::InsertRowAfter,
    });
    pipeline.dispatch(Command::MutateTable {
        action: TableAction::InsertColumnBefore,
    });
    let reports = pipeline.flush()?;
    assert_eq!(reports.len(), 1);
    assert_eq!(shape(&pipeline), vec![3, 3, 3]);

    pipeline.apply(Command::MutateTable {
        action: TableAction::DeleteRow,
    })?;
    assert_eq!(shape(&pipeline), vec![3, 3]);
    assert!(pipeline.session().tree().validate().is_ok());
    Ok(())
}

#[test]
fn test_table_action_outside_table_is_noop() -> Result<()> {
    let mut pipeline = pipeline(json!("plain"));
    assert_eq!(
        pipeline.apply(Command::MutateTable {
            action: TableAction::DeleteColumn
        })?,
        CommandOutcome::NoOp(NoOpReason::NotInTable)
    );
    Ok(())
}

#[test]
fn test_stale_selection_is_noop() -> Result<()> {
    let mut pipeline = pipeline(paragraphs(&["ab", "cd"]));
    let first = text_of_block(&pipeline, 0)?;
    let second = text_of_block(&pipeline, 1)?;
    select(&mut pipeline, Point::text(first, 1), Point::text(second, 1))?;

    pipeline.apply(Command::DeleteSelection)?;
    assert_eq!(pipeline.session().render(), "<p>ad</p>");
    assert!(!pipeline.session().tree().contains(second));

    let before = pipeline.session().serialize();
    let outcome = pipeline.apply(Command::SetSelection {
        selection: Selection::caret(Point::text(second, 0)),
    })?;
    assert_eq!(outcome, CommandOutcome::NoOp(NoOpReason::StaleSelection));
    assert_eq!(pipeline.session().serialize(), before);
    Ok(())
}

#[test]
fn test_one_notification_per_transaction() -> Result<()> {
    let toolbar: Rc<RefCell<Vec<ToolbarState>>> = Rc::default();
    let changes: Rc<RefCell<Vec<DocumentChange>>> = Rc::default();

    let mut pipeline = pipeline(json!(""));
    let seen = toolbar.clone();
    pipeline.add_effect(Box::new(ToolbarStateEffect::new(move |state| {
        seen.borrow_mut().push(state.clone())
    })));
    let sink = changes.clone();
    pipeline.add_effect(Box::new(ChangeCallbackEffect::new(move |change| {
        sink.borrow_mut().push(change)
    })));

    pipeline.dispatch(Command::FormatText {
        format: TextFormat::BOLD,
    });
    pipeline.dispatch(Command::InsertText {
        text: "Hello".into(),
    });
    pipeline.dispatch(Command::TransformBlock {
        target: BlockType::Quote,
    });
    let reports = pipeline.flush()?;

    assert_eq!(reports.len(), 1);
    assert!(reports[0].outcomes.iter().all(CommandOutcome::is_applied));
    assert_eq!(toolbar.borrow().len(), 1);
    assert_eq!(toolbar.borrow()[0].block_type, Some(BlockType::Quote));

    let changes = changes.borrow();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].transaction, reports[0].id);
    assert_eq!(changes[0].excerpt, "Hello");
    assert_eq!(pipeline.session().render(), "<blockquote><strong>Hello</strong></blockquote>");
    Ok(())
}

/// Keeps typing after every transaction
struct Echo {
    seen: Rc<RefCell<Vec<u64>>>,
}

impl PostEffect for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn on_update(&mut self, event: &UpdateEvent<'_>) -> Vec<Command> {
        self.seen.borrow_mut().push(event.transaction);
        vec![Command::InsertText { text: "x".into() }]
    }
}

#[test]
fn test_reentrant_transactions_are_bounded() -> Result<()> {
    let config = EditorConfig {
        max_reentrant_transactions: 3,
        ..EditorConfig::default()
    };
    let (session, _) = EditorSession::from_value("echo", &json!(""), config);
    let mut pipeline = Pipeline::new(session);
    let seen: Rc<RefCell<Vec<u64>>> = Rc::default();
    pipeline.add_effect(Box::new(Echo { seen: seen.clone() }));

    pipeline.dispatch(Command::InsertText { text: "a".into() });
    let reports = pipeline.flush()?;

    // The original transaction plus three follow-ups, each notified in order
    assert_eq!(reports.len(), 4);
    assert_eq!(seen.borrow().as_slice(), &[1, 2, 3, 4]);
    assert_eq!(pipeline.pending(), 0);
    assert_eq!(pipeline.session().render(), "<p>axxx</p>");
    Ok(())
}

#[test]
fn test_image_ticket_survives_edits_but_not_teardown() -> Result<()> {
    let mut pipeline = pipeline(json!("ab"));
    let ticket = pipeline.begin_image_insert();
    pipeline.apply(Command::InsertText { text: "c".into() })?;

    let outcome = pipeline.complete_image_insert(ticket, Ok(ImagePayload::new("/cat.png", "cat")))?;
    assert!(outcome.tree_changed());
    assert!(pipeline.session().render().contains("<img src=\"/cat.png\" alt=\"cat\""));

    let late = pipeline.begin_image_insert();
    let before = pipeline.session().serialize();
    pipeline.teardown();
    assert_eq!(
        pipeline.complete_image_insert(late, Ok(ImagePayload::new("/dog.png", "dog")))?,
        CommandOutcome::NoOp(NoOpReason::SessionClosed)
    );
    assert_eq!(pipeline.session().serialize(), before);
    assert!(pipeline.session().to_json_string().is_err());
    assert_eq!(
        pipeline.apply(Command::InsertText { text: "d".into() })?,
        CommandOutcome::NoOp(NoOpReason::SessionClosed)
    );
    Ok(())
}

#[test]
fn test_decode_failure_is_dropped() -> Result<()> {
    let mut pipeline = pipeline(json!("ab"));
    let before = pipeline.session().serialize();

    let outcome = pipeline.insert_image_file(
        &ImageFile::new("notes.txt", b"not an image".to_vec()),
        &DataUrlDecoder::default(),
    )?;
    assert_eq!(
        outcome,
        CommandOutcome::NoOp(NoOpReason::DecodeFailed(DecodeError::UnsupportedFormat(
            "notes.txt".into()
        )))
    );
    assert_eq!(pipeline.session().serialize(), before);

    let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
    let outcome = pipeline.insert_image_file(&ImageFile::new("pixel.png", png), &DataUrlDecoder::default())?;
    assert!(outcome.tree_changed());
    assert!(pipeline.session().render().contains("src=\"data:image/png;base64,"));
    Ok(())
}

#[test]
fn test_undo_redo_across_transactions() -> Result<()> {
    let mut pipeline = pipeline(json!(""));
    pipeline.apply(Command::InsertText { text: "one".into() })?;
    pipeline.apply(Command::TransformBlock {
        target: BlockType::Heading { level: 1 },
    })?;
    assert_eq!(pipeline.session().render(), "<h1>one</h1>");

    pipeline.undo()?.context("nothing to undo")?;
    assert_eq!(pipeline.session().render(), "<p>one</p>");
    pipeline.undo()?.context("nothing to undo")?;
    assert!(pipeline.session().tree().is_blank());
    assert!(pipeline.undo()?.is_none());

    pipeline.redo()?.context("nothing to redo")?;
    assert_eq!(pipeline.session().render(), "<p>one</p>");

    // A new edit drops the redo branch
    pipeline.apply(Command::InsertText { text: "!".into() })?;
    assert!(!pipeline.can_redo());
    assert_eq!(pipeline.session().render(), "<p>one!</p>");
    Ok(())
}

#[test]
fn test_change_callback_carries_json_and_excerpt() -> Result<()> {
    let changes: Rc<RefCell<Vec<DocumentChange>>> = Rc::default();
    let mut pipeline = pipeline(json!(""));
    let sink = changes.clone();
    pipeline.add_effect(Box::new(ChangeCallbackEffect::new(move |change| {
        sink.borrow_mut().push(change)
    })));

    let long = "word ".repeat(60);
    pipeline.apply(Command::InsertText { text: long.clone() })?;

    let changes = changes.borrow();
    let change = changes.last().context("no change emitted")?;
    let stored: Value = serde_json::from_str(&change.json)?;
    assert_eq!(stored["root"]["type"], "root");

    let (reloaded, report) = EditorSession::from_value("reload", &stored, EditorConfig::default());
    assert!(report.is_clean());
    assert_eq!(reloaded.render(), pipeline.session().render());

    assert_eq!(change.excerpt.chars().count(), 213);
    assert!(change.excerpt.ends_with("..."));
    assert!(long.starts_with(change.excerpt.trim_end_matches("...")));
    Ok(())
}

#[test]
fn test_code_block_round_trip_through_commands() -> Result<()> {
    let mut pipeline = pipeline(json!("let x = 1;"));
    pipeline.apply(Command::TransformBlock {
        target: BlockType::Code {
            language: Some("rust".into()),
        },
    })?;

    let tree = pipeline.session().tree();
    let block = tree.children(tree.root())[0];
    assert!(matches!(tree.kind(block), Some(NodeKind::CodeBlock { .. })));
    let html = pipeline.session().render();
    assert!(html.starts_with("<pre class=\"code-block\" data-language=\"rust\" data-gutter=\"1\""));
    Ok(())
}

/// Serialize, reload and check nothing was lost or repaired
fn assert_reloads_identically(pipeline: &Pipeline) -> Result<()> {
    let stored = pipeline.session().serialize();
    let (reloaded, report) = EditorSession::from_value("reload", &stored, EditorConfig::default());
    assert!(report.is_clean(), "repairs on reload: {report:?}");
    assert_eq!(reloaded.serialize(), stored);
    assert_eq!(reloaded.render(), pipeline.session().render());

    let text = pipeline.session().to_json_string()?;
    let (from_text, report) = EditorSession::from_value("reload-text", &Value::String(text), EditorConfig::default());
    assert!(report.is_clean());
    assert_eq!(from_text.serialize(), stored);
    Ok(())
}

#[test]
fn test_edited_document_round_trips() -> Result<()> {
    let mut pipeline = pipeline(paragraphs(&["bold words", "see example", "pic"]));

    let pic = text_of_block(&pipeline, 2)?;
    pipeline.apply(Command::SetSelection {
        selection: Selection::caret(Point::text(pic, 3)),
    })?;
    pipeline.apply(Command::InsertNode {
        node: InsertPayload::Image(ImagePayload::new("/cat.png", "cat")),
    })?;
    let tree = pipeline.session().tree();
    let image = tree
        .document_order()
        .into_iter()
        .find(|id| matches!(tree.kind(*id), Some(NodeKind::Image(_))))
        .context("image not inserted")?;
    let resized = pipeline.apply(Command::ResizeImage {
        node: image,
        width: 320,
        height: 20,
    })?;
    assert!(resized.tree_changed());

    let first = text_of_block(&pipeline, 0)?;
    select(&mut pipeline, Point::text(first, 0), Point::text(first, 4))?;
    pipeline.apply(Command::FormatText {
        format: TextFormat::BOLD,
    })?;
    pipeline.apply(Command::FormatText {
        format: TextFormat::ITALIC,
    })?;

    let second = text_of_block(&pipeline, 1)?;
    select(&mut pipeline, Point::text(second, 4), Point::text(second, 11))?;
    pipeline.apply(Command::ToggleLink {
        url: Some("example.com".into()),
    })?;

    let second = text_of_block(&pipeline, 1)?;
    pipeline.apply(Command::SetSelection {
        selection: Selection::caret(Point::text(second, 0)),
    })?;
    pipeline.apply(Command::InsertNode {
        node: InsertPayload::Table {
            rows: 2,
            columns: 2,
            header_row: true,
        },
    })?;
    assert!(pipeline.toolbar_state().in_table);
    pipeline.apply(Command::MutateTable {
        action: TableAction::InsertRowAfter,
    })?;

    let html = pipeline.session().render();
    assert!(html.contains("<strong><em>bold</em></strong> words"));
    assert!(html.contains("href=\"https://example.com\""));
    assert!(html.contains("width=\"320\" height=\"80\""));
    assert!(html.contains("<th>"));
    assert_eq!(html.matches("<tr>").count(), 3);

    assert_reloads_identically(&pipeline)
}

#[test]
fn test_list_at_numeric_limit_round_trips() -> Result<()> {
    let mut pipeline = pipeline(json!({ "root": { "type": "root", "children": [
        { "type": "list", "listType": "number", "start": u32::MAX, "children": [
            { "type": "listitem", "children": [{ "type": "text", "text": "last" }] }
        ]},
        { "type": "paragraph", "children": [{ "type": "text", "text": "next" }] }
    ]}}));
    let next = text_of_block(&pipeline, 1)?;
    pipeline.apply(Command::SetSelection {
        selection: Selection::caret(Point::text(next, 0)),
    })?;
    assert!(pipeline
        .apply(Command::TransformBlock {
            target: BlockType::NumberList,
        })?
        .tree_changed());

    assert_eq!(
        pipeline.session().render(),
        format!("<ol start=\"{}\"><li>last</li><li>next</li></ol>", u32::MAX)
    );
    assert_reloads_identically(&pipeline)
}

#[test]
fn test_json_lookalike_text_round_trips() -> Result<()> {
    for literal in [r#"{"a": 1}"#, "[1, 2, 3]", r#""quoted""#] {
        let pipeline = pipeline(json!(literal));
        let tree = pipeline.session().tree();
        assert_eq!(tree.text_content(tree.root()), literal);
        assert_reloads_identically(&pipeline)?;
    }

    let mut typed = pipeline(json!(""));
    typed.apply(Command::InsertText {
        text: r#"{"root": 1}"#.into(),
    })?;
    let tree = typed.session().tree();
    assert_eq!(tree.text_content(tree.root()), r#"{"root": 1}"#);
    assert_reloads_identically(&typed)
}
