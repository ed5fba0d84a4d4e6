//! Locked-pages workflow tests.
//!
//! A locked script is exported once, edited, and exported again with the
//! lock state from the first artifact.

use slugline::{
    Element, ElementType, ExportOptions, Format, FormatProfile, LockState, MarkPolicy,
    RevisionColor, Script, ScriptType, export,
};

fn el(id: &str, t: ElementType, content: &str) -> Element {
    Element::new(id, t, content)
}

/// Ten scenes of heading, action, cue and dialogue: enough for several pages.
fn long_script() -> Vec<Element> {
    let mut elements = Vec::new();
    for scene in 1..=10 {
        elements.push(el(
            &format!("h{scene}"),
            ElementType::SceneHeading,
            &format!("INT. ROOM {scene} - DAY"),
        ));
        elements.push(el(
            &format!("a{scene}"),
            ElementType::Action,
            &"The clock ticks on the wall while nobody moves. ".repeat(6),
        ));
        elements.push(el(&format!("c{scene}"), ElementType::Character, "JANE"));
        elements.push(el(
            &format!("d{scene}"),
            ElementType::Dialogue,
            &"We should have left an hour ago. ".repeat(4),
        ));
    }
    elements
}

fn locked_script(revision: u32) -> Script {
    Script::new("s1", "Clockwork", ScriptType::Screenplay)
        .locked()
        .with_revision(revision)
}

#[test]
fn test_edit_keeps_earlier_pages() {
    let elements = long_script();
    let first = export(&locked_script(0), &elements, &ExportOptions::new(Format::Fdx)).unwrap();
    assert!(first.page_count >= 3);

    // Grow the action of scene 8; everything before it must stay put.
    let mut edited = elements.clone();
    let target = edited.iter().position(|e| e.id == "a8").unwrap();
    edited[target].content.push_str(&" Then the lights fail.".repeat(20));

    let options = ExportOptions::new(Format::Fdx).with_lock(first.lock_state());
    let second = export(&locked_script(1), &edited, &options).unwrap();

    let before = &first.page_assignment.placements()[..target];
    let after = &second.page_assignment.placements()[..target];
    assert_eq!(before, after);
    assert!(second.page_count >= first.page_count);

    assert_eq!(second.elements[target].revision_mark.as_ref().unwrap().color, RevisionColor::Blue);
    assert!(second.elements[..target].iter().all(|e| e.revision_mark.is_none()));

    let xml = String::from_utf8(second.bytes).unwrap();
    assert!(xml.contains("<Revisions ActiveSet=\"1\""));
    assert!(xml.contains("Name=\"Blue Revision\""));
}

#[test]
fn test_inserted_scene_gets_letter() {
    let elements = long_script();
    let first = export(&locked_script(0), &elements, &ExportOptions::new(Format::Txt)).unwrap();
    assert_eq!(first.scene_numbers["h4"], "4");

    let mut edited = elements.clone();
    let at = edited.iter().position(|e| e.id == "h5").unwrap();
    edited.insert(at, el("new", ElementType::SceneHeading, "EXT. STREET - DAY"));

    let options = ExportOptions::new(Format::Txt).with_lock(first.lock_state());
    let second = export(&locked_script(1), &edited, &options).unwrap();
    assert_eq!(second.scene_numbers["h4"], "4");
    assert_eq!(second.scene_numbers["new"], "4A");
    assert_eq!(second.scene_numbers["h5"], "5");
    assert_eq!(second.scene_numbers["h10"], "10");
}

#[test]
fn test_lock_applies_only_to_locked_scripts() {
    let elements = long_script();
    let unlocked = Script::new("s1", "Clockwork", ScriptType::Screenplay);
    let tight = FormatProfile::for_script_type(ScriptType::Screenplay).with_lines_per_page(30);
    let first = export(
        &unlocked,
        &elements,
        &ExportOptions::new(Format::Txt).with_profile(tight),
    )
    .unwrap();
    let fresh = export(&unlocked, &elements, &ExportOptions::new(Format::Txt)).unwrap();
    assert!(first.page_count > fresh.page_count);

    // An unlocked script ignores the prior layout entirely.
    let options = ExportOptions::new(Format::Txt).with_lock(first.lock_state());
    let repaginated = export(&unlocked, &elements, &options).unwrap();
    assert_eq!(repaginated.page_assignment, fresh.page_assignment);

    // A locked one with no edits keeps every prior placement.
    let kept = export(&locked_script(0), &elements, &options).unwrap();
    assert_eq!(kept.page_assignment, first.page_assignment);
    assert_eq!(kept.page_count, first.page_count);
}

#[test]
fn test_cumulative_marks_survive_next_pass() {
    let elements = long_script();
    let first = export(&locked_script(0), &elements, &ExportOptions::new(Format::Txt)).unwrap();

    let mut pass1 = elements.clone();
    pass1[1].content = "The clock stops.".to_string();
    let second = export(
        &locked_script(1),
        &pass1,
        &ExportOptions::new(Format::Txt).with_lock(first.lock_state()),
    )
    .unwrap();

    let mut pass2 = pass1.clone();
    pass2[3].content = "Too late now.".to_string();
    let lock = second.lock_state().with_mark_policy(MarkPolicy::Cumulative);
    let third = export(
        &locked_script(2),
        &pass2,
        &ExportOptions::new(Format::Txt).with_lock(lock),
    )
    .unwrap();

    assert_eq!(third.elements[1].revision_mark.as_ref().unwrap().level, 1);
    assert_eq!(third.elements[3].revision_mark.as_ref().unwrap().level, 2);
    assert_eq!(third.elements[3].revision_mark.as_ref().unwrap().color, RevisionColor::Pink);
}

#[test]
fn test_lock_state_survives_json() {
    let elements = long_script();
    let first = export(&locked_script(0), &elements, &ExportOptions::new(Format::Txt)).unwrap();
    let lock = first.lock_state();

    let json = serde_json::to_string(&lock).unwrap();
    let restored: LockState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, lock);
}
