use proptest::prelude::*;
use rtbridge_core::text::{byte_offset, utf16_len};
use rtbridge_core::{Collaborator, StringChange, StringChangeKind};
use rtbridge_memory::{MemoryBackend, MemoryText};
use rtbridge_observable::ObservableString;
use tokio::sync::mpsc::UnboundedReceiver;

const FRAGMENT: &str = "[ab \u{e9}\u{1F600}\u{10348}]{0,4}";

#[derive(Debug, Clone)]
enum Edit {
    Insert { at: usize, text: String },
    Remove { from: usize, to: usize },
    Set(String),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (any::<usize>(), FRAGMENT).prop_map(|(at, text)| Edit::Insert { at, text }),
        (any::<usize>(), any::<usize>()).prop_map(|(from, to)| Edit::Remove { from, to }),
        FRAGMENT.prop_map(Edit::Set),
    ]
}

/// UTF-16 indices that fall between characters.
fn boundaries(text: &str) -> Vec<usize> {
    let mut out = vec![0];
    let mut index = 0;
    for ch in text.chars() {
        index += ch.len_utf16();
        out.push(index);
    }
    out
}

fn pick(text: &str, seed: usize) -> usize {
    let candidates = boundaries(text);
    candidates[seed % candidates.len()]
}

fn drain(rx: &mut UnboundedReceiver<StringChange>) -> Vec<StringChange> {
    let mut out = Vec::new();
    while let Ok(change) = rx.try_recv() {
        out.push(change);
    }
    out
}

fn replay(changes: &[StringChange]) -> String {
    let mut text = String::new();
    for change in changes {
        match change.kind {
            StringChangeKind::Insert => {
                let at = byte_offset(&text, change.start).unwrap();
                text.insert_str(at, &change.value);
            }
            StringChangeKind::Remove => {
                let from = byte_offset(&text, change.start).unwrap();
                let to = byte_offset(&text, change.end).unwrap();
                assert_eq!(&text[from..to], change.value);
                text.replace_range(from..to, "");
            }
            StringChangeKind::Set => text = change.value.clone(),
        }
    }
    text
}

proptest! {
    #[test]
    fn edits_from_both_sessions_match_reference(
        edits in prop::collection::vec((any::<bool>(), edit()), 1..24)
    ) {
        let backend = MemoryBackend::new();
        let alice = backend.join(Collaborator::new("u1", "s1", "Alice", "#f00"));
        let bob = backend.join(Collaborator::new("u2", "s2", "Bob", "#0f0"));
        let sides: [ObservableString<MemoryText>; 2] = [
            ObservableString::new(alice.text("doc")),
            ObservableString::new(bob.text("doc")),
        ];
        let mut receivers = [sides[0].subscribe(), sides[1].subscribe()];
        let mut reference = String::new();

        for (by_bob, edit) in edits {
            let side = &sides[usize::from(by_bob)];
            match edit {
                Edit::Insert { at, text } => {
                    let at = pick(&reference, at);
                    side.insert(at, &text).unwrap();
                    reference.insert_str(byte_offset(&reference, at).unwrap(), &text);
                }
                Edit::Remove { from, to } => {
                    let (a, b) = (pick(&reference, from), pick(&reference, to));
                    let (start, end) = (a.min(b), a.max(b));
                    side.remove(start, end).unwrap();
                    let range = byte_offset(&reference, start).unwrap()
                        ..byte_offset(&reference, end).unwrap();
                    reference.replace_range(range, "");
                }
                Edit::Set(text) => {
                    side.set_text(&text).unwrap();
                    reference = text;
                }
            }
            prop_assert_eq!(side.len().unwrap(), utf16_len(&reference));
        }

        for (side, rx) in sides.iter().zip(receivers.iter_mut()) {
            prop_assert_eq!(side.text().unwrap(), reference.clone());
            prop_assert_eq!(replay(&drain(rx)), reference.clone());
        }
    }
}
